//! ROS → Cap'n Proto type tables.
//!
//! Scalars and array elements are looked up in separate tables. The array
//! table only lists primitives that are meaningful inside a `List(...)`;
//! other builtins fall back to their scalar mapping, and anything that is not
//! a builtin is a nested message referenced by its short name.

pub use msg2capnp_schema::types::{
    element_type, is_bounded_array, is_builtin, is_dynamic_array, is_static_array, BUILTIN_TYPES,
};

pub const SCALAR_TYPE_MAPPING: [(&str, &str); 17] = [
    ("int8",     "Int8"),
    ("uint8",    "UInt8"),
    ("int16",    "Int16"),
    ("uint16",   "UInt16"),
    ("int32",    "Int32"),
    ("uint32",   "UInt32"),
    ("int64",    "Int64"),
    ("uint64",   "UInt64"),
    ("float32",  "Float32"),
    ("float64",  "Float64"),
    ("string",   "Text"),
    ("wstring",  "Text"),
    ("bool",     "Bool"),
    ("char",     "Int8"),
    ("byte",     "Int8"),
    ("time",     "Int64"),
    ("duration", "Int64"),
];

pub const ARRAY_TYPE_MAPPING: [(&str, &str); 8] = [
    ("float64", "Float64"),
    ("float32", "Float32"),
    ("uint16",  "UInt16"),
    ("uint8",   "UInt8"),
    ("uint32",  "UInt32"),
    ("uint64",  "UInt64"),
    ("string",  "Text"),
    ("wstring", "Text"),
];

/// Wraps an element type in the target's only container.
pub fn list_of(element: &str) -> String {
    format!("List({})", element)
}

pub fn map_scalar(source: &str) -> Option<&'static str> {
    SCALAR_TYPE_MAPPING
        .iter()
        .find(|(ros, _)| *ros == source)
        .map(|(_, capnp)| *capnp)
}

pub fn map_array_element(source: &str) -> Option<&'static str> {
    ARRAY_TYPE_MAPPING
        .iter()
        .find(|(ros, _)| *ros == source)
        .map(|(_, capnp)| *capnp)
}

/// Case-insensitive: `string`, `String`, `wstring` all qualify.
pub fn is_string_type(t: &str) -> bool {
    t.to_ascii_lowercase().contains("string")
}

/// Distinct Cap'n Proto scalar names produced by the scalar table. A message
/// type with one of these short names would shadow the builtin.
pub fn target_scalar_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = Vec::new();
    for (_, capnp) in SCALAR_TYPE_MAPPING.iter() {
        if !names.contains(capnp) {
            names.push(*capnp);
        }
    }
    names
}
