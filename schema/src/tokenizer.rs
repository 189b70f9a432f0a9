use regex::Regex;
use lazy_static::lazy_static;
use crate::utils::{quote, error};
use crate::error::SchemaError;

lazy_static! {
    pub static ref TOKEN_REGEX:   Regex = Regex::new(r"(#[^\n]*|=|\n|(?:<=|[^\s=#])+|[ \t\r\f\v]+)").unwrap();
    pub static ref WHITESPACE_RX: Regex = Regex::new(r"^[ \t\r\f\v]+$").unwrap();
}

#[derive(Debug, PartialEq)]
pub struct Token {
    pub text:   String,
    pub line:   usize,
    pub column: usize,
}

/// Splits `.msg` text into tokens. Comments and whitespace are dropped;
/// every token remembers the line it came from, which is how the parser
/// finds declaration boundaries.
pub fn tokenize_msg(text: &str) -> Result<Vec<Token>, SchemaError> {
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut column = 1;
    let mut last_end = 0;

    for mat in TOKEN_REGEX.find_iter(text) {
        let start = mat.start();
        let end   = mat.end();
        let part  = mat.as_str();

        if start > last_end {
            let unexpected = &text[last_end..start];
            return Err(error(
                &format!("Syntax error: {}", quote(unexpected)),
                line,
                column,
            ));
        }

        if part == "\n" {
            line += 1;
            column = 1;
        } else {
            if !WHITESPACE_RX.is_match(part) && !part.starts_with('#') {
                tokens.push(Token {
                    text: part.to_string(),
                    line,
                    column,
                });
            }
            column += part.chars().count();
        }

        last_end = end;
    }

    if last_end != text.len() {
        let unexpected = &text[last_end..];
        return Err(error(
            &format!("Syntax error: {}", quote(unexpected)),
            line,
            column,
        ));
    }

    Ok(tokens)
}
