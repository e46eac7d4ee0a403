//! Core of qlfilter: the filter language, the schema registry, the
//! filter-to-predicate compiler, and the reference backends.

// public exports are one module level down
pub mod ast;
pub mod backend;
pub mod compile;
pub mod entity;
pub mod error;
pub mod matcher;
pub mod normalize;
pub mod parse;
pub mod predicate;
pub mod resolve;
pub mod schema;
pub mod value;

pub(crate) mod semantics;

// test
#[cfg(test)]
pub(crate) mod test_fixtures;
#[cfg(test)]
mod tests;

///
/// Prelude
///
/// Prelude contains the filter vocabulary only.
/// No backends, compiler internals or helpers are re-exported here.
///

pub mod prelude {
    pub use crate::{
        ast::{ComparisonOperator, FilterNode},
        entity::Entity,
        predicate::CompiledFilter,
        schema::{AttributeModel, EntityModel, FieldSpec, SchemaRegistry},
        value::{SymbolSet, Value, ValueType},
    };
}
