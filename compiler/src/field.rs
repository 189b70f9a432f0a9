use msg2capnp_schema::{Arity, FieldSpec};
use serde::Serialize;

use crate::{
    mapping::{list_of, map_array_element, map_scalar},
    naming::{capitalize_if_string, normalize_field_name},
};

/// A field as it appears in the generated struct, before ordinals are assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDecl {
    pub name:        String,
    pub target_type: String,
}

/// Short name of a nested message: `geometry_msgs/Point` → `Point`.
fn short_name(source_type: &str) -> &str {
    source_type.rsplit('/').next().unwrap_or(source_type)
}

/// The Cap'n Proto token for one element (or scalar) of `source_type`.
/// Nested messages keep their short name exactly, so the token always
/// matches the imported symbol.
fn element_token(source_type: &str, in_list: bool) -> String {
    let mapped = if in_list {
        map_array_element(source_type).or_else(|| map_scalar(source_type))
    } else {
        map_scalar(source_type)
    };
    match mapped {
        Some(token) => capitalize_if_string(token),
        None => short_name(source_type).to_string(),
    }
}

/// Translates one ROS field into its Cap'n Proto declaration.
///
/// Static and dynamic arrays both become `List(...)`; the declared length of
/// a static array is dropped because the target has no fixed-capacity list.
/// Nested messages are referenced by short name only; their package lives in
/// the import line.
pub fn build_field(spec: &FieldSpec) -> FieldDecl {
    let target_type = match spec.arity {
        Arity::DynamicArray | Arity::StaticArray(_) => list_of(&element_token(&spec.source_type, true)),
        Arity::Scalar => element_token(&spec.source_type, false),
    };

    FieldDecl {
        name: normalize_field_name(&spec.name),
        target_type,
    }
}
