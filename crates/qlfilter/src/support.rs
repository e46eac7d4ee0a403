//! Module: support
//! Responsibility: the application-facing filter service; one registry,
//! one set of options, an ordered transformer chain.
//! Does not own: any filter semantics; every call delegates to the core.
//! Boundary: filter text in, compiled filters, queries or selections out.

use crate::{
    error::SupportError,
    registry::{build_registry, like_dialect},
    transform::{NodeTransformer, VirtualPropertyTransformer},
};
use qlfilter_config::FilterConfig;
use qlfilter_core::{
    ast::FilterNode,
    backend::{
        jpql::{self, JpqlQuery},
        memory::{MemoryBackend, MemoryOptions},
    },
    compile::{CompileOptions, compile},
    entity::Entity,
    error::FilterError,
    matcher::EntityMatcher,
    parse::parse,
    predicate::{CompiledFilter, LikeDialect},
    schema::SchemaRegistry,
};
use std::{fmt, path::Path, sync::Arc};

///
/// SupportOptions
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SupportOptions {
    pub ignore_case: bool,
    pub case_insensitive_db: bool,
    pub like_dialect: LikeDialect,
}

impl SupportOptions {
    /// Compiled predicates only upper-case when the database would not
    /// already ignore case.
    #[must_use]
    pub const fn compile_options(self) -> CompileOptions {
        CompileOptions {
            ignore_case: self.ignore_case && !self.case_insensitive_db,
        }
    }

    #[must_use]
    pub const fn memory_options(self) -> MemoryOptions {
        MemoryOptions {
            case_insensitive_collation: self.case_insensitive_db,
        }
    }

    /// The direct matcher has no collation, so it folds for either reason.
    #[must_use]
    pub const fn matcher_ignore_case(self) -> bool {
        self.ignore_case || self.case_insensitive_db
    }
}

impl Default for SupportOptions {
    fn default() -> Self {
        Self {
            ignore_case: true,
            case_insensitive_db: false,
            like_dialect: LikeDialect::Standard,
        }
    }
}

///
/// FilterSupport
///
/// Cheap to clone; the registry and transformers are shared.
///

#[derive(Clone)]
pub struct FilterSupport {
    registry: Arc<SchemaRegistry>,
    options: SupportOptions,
    transformers: Vec<Arc<dyn NodeTransformer>>,
}

impl FilterSupport {
    #[must_use]
    pub fn new(registry: impl Into<Arc<SchemaRegistry>>, options: SupportOptions) -> Self {
        Self {
            registry: registry.into(),
            options,
            transformers: Vec::new(),
        }
    }

    /// Registry, options and virtual properties from one configuration.
    pub fn from_config(config: &FilterConfig) -> Result<Self, SupportError> {
        let registry = build_registry(config)?;
        let options = SupportOptions {
            ignore_case: config.options.ignore_case,
            case_insensitive_db: config.options.case_insensitive_db,
            like_dialect: like_dialect(config.options.like_dialect),
        };

        let mut support = Self::new(registry, options);
        if !config.virtual_properties.is_empty() {
            support = support.with_transformer(VirtualPropertyTransformer::new(
                config.virtual_properties.iter().map(|(name, value)| (name, value.clone())),
            ));
        }

        tracing::info!(
            kinds = support.registry.kinds().count(),
            virtual_properties = config.virtual_properties.len(),
            ?options,
            "filter support ready"
        );

        Ok(support)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SupportError> {
        let config = FilterConfig::load(path)?;

        Self::from_config(&config)
    }

    /// Append `transformer` to the chain run after parsing.
    #[must_use]
    pub fn with_transformer(mut self, transformer: impl NodeTransformer + 'static) -> Self {
        self.transformers.push(Arc::new(transformer));
        self
    }

    #[must_use]
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    #[must_use]
    pub const fn options(&self) -> SupportOptions {
        self.options
    }

    /// Selectors accepted for `entity_kind`, in declaration order.
    #[must_use]
    pub fn expected_fields(&self, entity_kind: &str) -> Vec<String> {
        self.registry.expected_field_list(entity_kind)
    }

    /// Parse `filter` and run the transformer chain over the tree.
    pub fn parse(&self, filter: &str) -> Result<FilterNode, FilterError> {
        let mut node = parse(filter)?;
        for transformer in &self.transformers {
            node = transformer.transform(node)?;
        }

        Ok(node)
    }

    /// Check that `filter` compiles for `entity_kind` without running it.
    pub fn validate(&self, entity_kind: &str, filter: &str) -> Result<(), FilterError> {
        self.compile(entity_kind, filter).map(|_| ())
    }

    pub fn compile(&self, entity_kind: &str, filter: &str) -> Result<CompiledFilter, FilterError> {
        let node = self.parse(filter)?;

        compile(&self.registry, entity_kind, &node, self.options.compile_options()).inspect_err(
            |err| tracing::debug!(entity_kind, filter, kind = %err.kind(), %err, "filter rejected"),
        )
    }

    pub fn to_jpql(&self, entity_kind: &str, filter: &str) -> Result<JpqlQuery, FilterError> {
        let compiled = self.compile(entity_kind, filter)?;

        Ok(jpql::render(&compiled, self.options.like_dialect)?)
    }

    /// Entities of `entities` selected by `filter`, evaluated through the
    /// compiled predicate.
    pub fn filter<'e>(
        &self,
        entity_kind: &str,
        filter: &str,
        entities: &'e [Entity],
    ) -> Result<Vec<&'e Entity>, FilterError> {
        let compiled = self.compile(entity_kind, filter)?;
        let query = MemoryBackend::prepare(&compiled, self.options.memory_options())?;

        Ok(query.filter(entities)?)
    }

    /// Matcher evaluating trees directly against entities of `entity_kind`.
    #[must_use]
    pub fn matcher<'a>(&'a self, entity_kind: &'a str) -> EntityMatcher<'a> {
        EntityMatcher::new(&self.registry, entity_kind, self.options.matcher_ignore_case())
    }

    /// Whether `entity` satisfies `filter`, evaluated directly on the tree.
    pub fn matches(
        &self,
        entity_kind: &str,
        filter: &str,
        entity: &Entity,
    ) -> Result<bool, FilterError> {
        let node = self.parse(filter)?;

        self.matcher(entity_kind).matches(&node, entity)
    }
}

impl fmt::Debug for FilterSupport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterSupport")
            .field("registry", &self.registry)
            .field("options", &self.options)
            .field("transformers", &self.transformers.len())
            .finish()
    }
}
