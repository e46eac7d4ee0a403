use qlfilter::{SupportError, core::error::FilterError};
use std::path::PathBuf;
use thiserror::Error as ThisError;

///
/// CliError
///

#[derive(Debug, ThisError)]
pub enum CliError {
    #[error(transparent)]
    Support(#[from] SupportError),

    #[error("{kind}: {source}", kind = .source.kind())]
    Filter {
        #[from]
        source: FilterError,
    },

    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("entity {path}: {message}")]
    Entity { path: String, message: String },

    #[error("unknown entity kind '{0}'")]
    UnknownKind(String),
}
