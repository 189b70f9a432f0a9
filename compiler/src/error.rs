use msg2capnp_schema::{QualifiedType, SchemaError};
use thiserror::Error;

/// Failures of a message-metadata source.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Unknown message type {0}")]
    UnknownType(QualifiedType),

    #[error("Unknown package \"{0}\"")]
    UnknownPackage(String),

    #[error("Message source unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid definition for {ty}: {source}")]
    InvalidDefinition {
        ty:     QualifiedType,
        #[source]
        source: SchemaError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Verifier error: {0}")]
    VerifierError(String),
}
