use std::collections::HashMap;

use lazy_static::lazy_static;
use msg2capnp_schema::{utils::quote, QualifiedType};
use regex::Regex;
use tracing::warn;

use crate::{error::CompileError, field::FieldDecl};

lazy_static! {
    static ref CAPNP_IDENTIFIER: Regex = Regex::new(r"^[a-z][A-Za-z0-9]*$").unwrap();
}

/// Returns `Ok(())` if the declarations of `ty` can be emitted, or
/// `Err(CompileError::VerifierError(_))` otherwise.
pub fn verify_fields(ty: &QualifiedType, fields: &[FieldDecl]) -> Result<(), CompileError> {
    let mut seen: Vec<&str> = Vec::with_capacity(fields.len());

    for field in fields {
        if !CAPNP_IDENTIFIER.is_match(&field.name) {
            return Err(CompileError::VerifierError(format!(
                "The field name {} in {} is not a valid identifier",
                quote(&field.name),
                quote(&ty.to_string())
            )));
        }
        if seen.contains(&field.name.as_str()) {
            return Err(CompileError::VerifierError(format!(
                "The field {} is declared twice in {}",
                quote(&field.name),
                quote(&ty.to_string())
            )));
        }
        seen.push(&field.name);
    }

    Ok(())
}

/// Imports are keyed by short name, so two dependencies from different
/// packages with the same short name cannot both be referenced.
pub fn check_imports(ty: &QualifiedType, imports: &[QualifiedType]) -> Result<(), CompileError> {
    let mut by_name: HashMap<&str, &QualifiedType> = HashMap::new();

    for import in imports {
        if let Some(previous) = by_name.insert(import.name(), import) {
            warn!("{} imports both {} and {}", ty, previous, import);
            return Err(CompileError::VerifierError(format!(
                "{} and {} are both imported by {} as {}",
                quote(&previous.to_string()),
                quote(&import.to_string()),
                quote(&ty.to_string()),
                quote(import.name())
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decl(name: &str) -> FieldDecl {
        FieldDecl {
            name:        name.to_string(),
            target_type: "Int32".to_string(),
        }
    }

    fn ty(s: &str) -> QualifiedType {
        s.parse().unwrap()
    }

    #[test]
    fn test_accepts_distinct_fields() {
        assert!(verify_fields(&ty("a/A"), &[decl("x"), decl("frameId")]).is_ok());
        assert!(verify_fields(&ty("a/A"), &[]).is_ok());
    }

    #[test]
    fn test_rejects_duplicate_after_normalization() {
        let err = verify_fields(&ty("a/A"), &[decl("frameId"), decl("frameId")]).unwrap_err();
        assert!(matches!(err, CompileError::VerifierError(_)));
    }

    #[test]
    fn test_rejects_invalid_identifier() {
        assert!(verify_fields(&ty("a/A"), &[decl("2d")]).is_err());
        assert!(verify_fields(&ty("a/A"), &[decl("")]).is_err());
    }

    #[test]
    fn test_rejects_uppercase_first_letter() {
        let err = verify_fields(&ty("a/A"), &[decl("XOffset")]).unwrap_err();
        assert!(matches!(err, CompileError::VerifierError(_)));
        assert!(verify_fields(&ty("a/A"), &[decl("xOffset")]).is_ok());
    }

    #[test]
    fn test_check_imports() {
        let imports = vec![ty("a_msgs/Status"), ty("b_msgs/Point"), ty("c_msgs/Status")];
        assert!(matches!(
            check_imports(&ty("x/X"), &imports),
            Err(CompileError::VerifierError(_))
        ));
        assert!(check_imports(&ty("x/X"), &imports[..2]).is_ok());
    }
}
