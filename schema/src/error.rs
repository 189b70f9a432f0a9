use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Parse error at line {line}, column {column}: {msg}")]
    ParseError {
        msg:    String,
        line:   usize,
        column: usize,
    },

    #[error("Invalid qualified type {0}")]
    InvalidQualifiedType(String),

    #[error("Invalid field \"{name}\": {msg}")]
    InvalidField {
        name: String,
        msg:  String,
    },

    #[error("Bundle error: {0}")]
    BundleError(String),
}
