use crate::{
    error::SchemaError,
    tokenizer::{tokenize_msg, Token},
    types::{FieldSpec, MessageDefinition, QualifiedType},
    utils::{error, quote},
};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref FIELD_NAME: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").unwrap();
    static ref FIELD_TYPE: Regex = Regex::new(
        r"^[A-Za-z][A-Za-z0-9_]*(/(msg/)?[A-Za-z][A-Za-z0-9_]*)?(<=\d+)?(\[(<=)?\d*\])?$"
    ).unwrap();
}

/// Parses the text of one `.msg` file declared by `ty`.
///
/// Each non-empty line is either a field (`TYPE NAME [DEFAULT]`) or a
/// constant (`TYPE NAME=VALUE`). Constants carry no layout and are skipped.
pub fn parse_msg(ty: &QualifiedType, text: &str) -> Result<MessageDefinition, SchemaError> {
    let tokens = tokenize_msg(text)?;
    let mut fields = Vec::new();

    for line in tokens.chunk_by(|a, b| a.line == b.line) {
        if let Some(field) = parse_declaration(ty, line)? {
            fields.push(field);
        }
    }

    Ok(MessageDefinition {
        ty: ty.clone(),
        fields,
    })
}

fn parse_declaration(ty: &QualifiedType, line: &[Token]) -> Result<Option<FieldSpec>, SchemaError> {
    let type_tok = match line.first() {
        Some(tok) => tok,
        None => return Ok(None),
    };

    if !FIELD_TYPE.is_match(&type_tok.text) {
        return Err(error(
            &format!("Expected field type but found {}", quote(&type_tok.text)),
            type_tok.line,
            type_tok.column,
        ));
    }

    let name_tok = match line.get(1) {
        Some(tok) => tok,
        None => {
            return Err(error(
                &format!("Expected field name after {}", quote(&type_tok.text)),
                type_tok.line,
                type_tok.column + type_tok.text.chars().count(),
            ))
        }
    };

    if !FIELD_NAME.is_match(&name_tok.text) {
        return Err(error(
            &format!("Expected identifier but found {}", quote(&name_tok.text)),
            name_tok.line,
            name_tok.column,
        ));
    }

    // Constant
    if line.get(2).is_some_and(|tok| tok.text == "=") {
        return Ok(None);
    }

    FieldSpec::from_declaration(ty.package(), &name_tok.text, &type_tok.text)
        .map(Some)
        .map_err(|e| error(&e.to_string(), type_tok.line, type_tok.column))
}
