//! Concatenated message definitions, as embedded in recorded logs: the root
//! definition first, then one section per dependency, each introduced by a
//! separator line of `=` characters and a `MSG: pkg/Type` header.

use crate::{
    error::SchemaError,
    parser::parse_msg,
    types::{MessageDefinition, QualifiedType},
    utils::quote,
};

fn is_separator(line: &str) -> bool {
    let line = line.trim();
    line.len() >= 3 && line.chars().all(|c| c == '=')
}

/// Splits and parses a definition bundle whose first section declares `root`.
pub fn split_bundle(root: &QualifiedType, text: &str) -> Result<Vec<MessageDefinition>, SchemaError> {
    let mut sections: Vec<(QualifiedType, String)> = vec![(root.clone(), String::new())];

    for line in text.lines() {
        if is_separator(line) {
            sections.push((root.clone(), String::new()));
            continue;
        }

        let last = sections.len() - 1;
        let (ty, body) = &mut sections[last];
        if last > 0 && body.trim().is_empty() {
            if let Some(header) = line.trim().strip_prefix("MSG:") {
                *ty = header.trim().parse()?;
                body.clear();
                continue;
            }
        }
        body.push_str(line);
        body.push('\n');
    }

    let mut definitions: Vec<MessageDefinition> = Vec::with_capacity(sections.len());
    for (index, (ty, body)) in sections.iter().enumerate() {
        if index > 0 && ty == root {
            if body.trim().is_empty() {
                continue;
            }
            return Err(SchemaError::BundleError(format!(
                "section {} of {} has no MSG header",
                index,
                quote(&root.to_string())
            )));
        }
        if definitions.iter().any(|d| &d.ty == ty) {
            continue;
        }
        definitions.push(parse_msg(ty, body)?);
    }

    Ok(definitions)
}
