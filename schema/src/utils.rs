use crate::error::SchemaError;

/// JSON-style quoting, used for names in messages and for import paths.
pub fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text))
}

pub fn error(msg: &str, line: usize, column: usize) -> SchemaError {
    SchemaError::ParseError {
        msg: msg.to_string(),
        line,
        column,
    }
}
