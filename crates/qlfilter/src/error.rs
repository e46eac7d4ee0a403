use qlfilter_config::ConfigError;
use qlfilter_core::{error::FilterError, schema::SchemaError};
use thiserror::Error as ThisError;

///
/// SupportError
///
/// Failure while assembling a `FilterSupport`, or a filter failure surfaced
/// through it.
///

#[derive(Debug, ThisError)]
pub enum SupportError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid schema: {0}")]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Filter(#[from] FilterError),
}
