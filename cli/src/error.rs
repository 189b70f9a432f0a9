use std::path::PathBuf;

use msg2capnp_compiler::{CompileError, ProviderError};
use msg2capnp_schema::SchemaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("File not found {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to write {}: {source}", .path.display())]
    Output {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// `2` for problems with what was asked for, `1` for everything that
    /// failed while doing it.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::InputNotFound(_) | CliError::InvalidArgument(_) | CliError::Schema(_) => 2,
            _ => 1,
        }
    }
}
