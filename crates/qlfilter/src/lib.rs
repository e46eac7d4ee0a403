//! ## Crate layout
//! - `core`: filter language, schema registry, predicate compiler and the
//!   reference backends.
//! - `config`: TOML configuration model.
//! - `registry`: configuration to schema registry wiring.
//! - `support`: the `FilterSupport` service used by applications.
//! - `transform`: AST hooks run between parsing and compilation.
//!
//! The `prelude` module mirrors what an application touches day to day.

pub use qlfilter_config as config;
pub use qlfilter_core as core;

pub mod error;
pub mod registry;
pub mod support;
pub mod transform;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use error::SupportError;
pub use support::{FilterSupport, SupportOptions};

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        core::{
            ast::{ComparisonOperator, FilterNode},
            backend::jpql::JpqlQuery,
            entity::Entity,
            error::{ErrorKind, FilterError},
            predicate::{CompiledFilter, LikeDialect},
            schema::SchemaRegistry,
            value::Value,
        },
        support::{FilterSupport, SupportOptions},
        transform::{NodeTransformer, VirtualPropertyTransformer},
    };
}
