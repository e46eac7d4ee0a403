//! Module: qlfilter-config
//! Responsibility: TOML description of entity models, filterable kinds and
//! filter options.
//! Does not own: schema validation; the registry builder checks that the
//! described graph is consistent.
//! Boundary: pure data, deserialized once at startup.


use serde::Deserialize;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error as ThisError;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

///
/// FilterConfig
///
/// Root of a configuration document.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FilterConfig {
    pub options: FilterOptions,
    pub virtual_properties: BTreeMap<String, String>,
    pub entities: Vec<EntityConfig>,
    pub kinds: Vec<KindConfig>,
}

impl FilterConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;

        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml_str(&source)
    }

    // Shape checks only; cross references are left to the registry.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(name) = self
            .virtual_properties
            .keys()
            .find(|name| name.is_empty() || name.contains(['{', '}', '$']))
        {
            return Err(ConfigError::Invalid(format!(
                "virtual property name '{name}' must be non-empty and free of '$', '{{' and '}}'"
            )));
        }

        for entity in &self.entities {
            if entity.name.is_empty() {
                return Err(ConfigError::Invalid("entity model with an empty name".to_string()));
            }
            if entity.attributes.iter().any(|attribute| attribute.name.is_empty()) {
                return Err(ConfigError::Invalid(format!(
                    "entity model '{}' has an attribute with an empty name",
                    entity.name
                )));
            }
        }

        for kind in &self.kinds {
            if kind.name.is_empty() || kind.model.is_empty() {
                return Err(ConfigError::Invalid(
                    "entity kinds need both a name and a model".to_string(),
                ));
            }
            if kind.fields.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "entity kind '{}' declares no fields",
                    kind.name
                )));
            }
        }

        Ok(())
    }
}

///
/// FilterOptions
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FilterOptions {
    /// Compare text case-insensitively.
    pub ignore_case: bool,

    /// The database already compares text case-insensitively, so compiled
    /// predicates skip explicit upper-casing.
    pub case_insensitive_db: bool,

    pub like_dialect: LikeDialectConfig,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            ignore_case: true,
            case_insensitive_db: false,
            like_dialect: LikeDialectConfig::Standard,
        }
    }
}

///
/// LikeDialectConfig
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum LikeDialectConfig {
    #[default]
    Standard,
    #[serde(alias = "sql_server", alias = "mssql")]
    Sqlserver,
}

///
/// EntityConfig
///
/// One entity model: its identifier and attributes.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EntityConfig {
    pub name: String,

    #[serde(default)]
    pub identifier: Option<String>,

    #[serde(default)]
    pub attributes: Vec<AttributeConfig>,
}

///
/// AttributeConfig
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct AttributeConfig {
    pub name: String,

    #[serde(flatten)]
    pub kind: AttributeKindConfig,
}

///
/// AttributeKindConfig
///
/// `kind = "..."` selects the shape; relationship kinds name their target
/// model.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttributeKindConfig {
    Text,
    Integer,
    Boolean,
    Symbol {
        #[serde(default)]
        set: Option<String>,
        symbols: Vec<String>,
    },
    Reference {
        target: String,
    },
    Collection {
        target: String,
    },
    Map {
        #[serde(default)]
        value_type: ScalarTypeConfig,
    },
}

///
/// ScalarTypeConfig
///
/// Value type of a native map attribute.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ScalarTypeConfig {
    #[default]
    Text,
    Integer,
    Boolean,
}

///
/// KindConfig
///
/// A filterable entity kind: the fields exposed on one model, plus legacy
/// default sub-attributes for bare relationship selectors.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct KindConfig {
    pub name: String,
    pub model: String,

    #[serde(default)]
    pub fields: Vec<FieldConfig>,

    #[serde(default)]
    pub legacy_defaults: BTreeMap<String, String>,
}

///
/// FieldConfig
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FieldConfig {
    pub name: String,

    /// Model attribute behind the field; defaults to `name`.
    #[serde(default)]
    pub attribute: Option<String>,

    #[serde(default)]
    pub sub_attributes: Vec<String>,

    #[serde(default)]
    pub map: Option<MapConfig>,

    #[serde(default)]
    pub identifier: Option<String>,
}

impl FieldConfig {
    #[must_use]
    pub fn attribute(&self) -> &str {
        self.attribute.as_deref().unwrap_or(&self.name)
    }
}

///
/// MapConfig
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(tag = "storage", rename_all = "snake_case")]
pub enum MapConfig {
    Native,
    Entries { key: String, value: String },
}
