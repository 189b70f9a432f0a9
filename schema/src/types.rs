use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Serialize, Serializer};

use crate::{error::SchemaError, utils::quote};

/// Primitive types understood natively by ROS messages. None of these
/// require a generated schema of their own. `wstring` is the ROS 2 wide string.
pub const BUILTIN_TYPES: [&str; 17] = [
    "int8", "uint8", "int16", "uint16", "int32", "uint32", "int64", "uint64",
    "float32", "float64", "string", "wstring", "bool", "char", "byte", "time", "duration",
];

lazy_static! {
    static ref NAME_SEGMENT:  Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").unwrap();
    static ref STATIC_ARRAY:  Regex = Regex::new(r"\[(\d+)\]$").unwrap();
    static ref BOUNDED_ARRAY: Regex = Regex::new(r"\[<=(\d+)\]$").unwrap();
}

pub fn is_builtin(t: &str) -> bool {
    BUILTIN_TYPES.contains(&t)
}

/// `float64[]`, `geometry_msgs/Point[]`
pub fn is_dynamic_array(t: &str) -> bool {
    t.ends_with("[]")
}

/// `float64[3]`
pub fn is_static_array(t: &str) -> bool {
    STATIC_ARRAY.is_match(t)
}

/// `float64[<=3]`, a ROS 2 bounded sequence.
pub fn is_bounded_array(t: &str) -> bool {
    BOUNDED_ARRAY.is_match(t)
}

/// Strips array notation and string bounds: `string<=8[4]` becomes `string`.
pub fn element_type(t: &str) -> &str {
    let t = match t.find('[') {
        Some(idx) => &t[..idx],
        None => t,
    };
    match t.find("<=") {
        Some(idx) => &t[..idx],
        None => t,
    }
}

/// A message type identified as `package/ShortName`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedType {
    package: String,
    name:    String,
}

impl QualifiedType {
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> Self {
        QualifiedType {
            package: package.into(),
            name:    name.into(),
        }
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    /// The short name, which is also the generated struct name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl FromStr for QualifiedType {
    type Err = SchemaError;

    /// Accepts `pkg/Type` as well as the ROS 2 spelling `pkg/msg/Type`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        let (package, name) = match parts.as_slice() {
            [package, name] => (*package, *name),
            [package, "msg", name] => (*package, *name),
            _ => return Err(SchemaError::InvalidQualifiedType(quote(s))),
        };
        if !NAME_SEGMENT.is_match(package) || !NAME_SEGMENT.is_match(name) {
            return Err(SchemaError::InvalidQualifiedType(quote(s)));
        }
        Ok(QualifiedType::new(package, name))
    }
}

impl fmt::Display for QualifiedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.package, self.name)
    }
}

impl Serialize for QualifiedType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// How many values a field holds. Static bounds are kept for diagnostics
/// only; both array kinds compile to the same container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Arity {
    Scalar,
    StaticArray(usize),
    DynamicArray,
}

impl Arity {
    pub fn is_array(&self) -> bool {
        !matches!(self, Arity::Scalar)
    }
}

/// One declared field. For arrays `source_type` is the element type.
/// Nested message types are always stored fully qualified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub name:        String,
    pub source_type: String,
    pub arity:       Arity,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, source_type: impl Into<String>, arity: Arity) -> Self {
        FieldSpec {
            name:        name.into(),
            source_type: source_type.into(),
            arity,
        }
    }

    /// Builds a field from a raw declaration such as `geometry_msgs/Point[3] corners`,
    /// qualifying relative message names against `package`.
    pub fn from_declaration(package: &str, name: &str, raw_type: &str) -> Result<Self, SchemaError> {
        let invalid = |msg: &str| SchemaError::InvalidField {
            name: name.to_string(),
            msg:  msg.to_string(),
        };

        if name.is_empty() {
            return Err(invalid("field name is empty"));
        }
        if raw_type.is_empty() {
            return Err(invalid("field type is empty"));
        }

        let arity = if is_dynamic_array(raw_type) || is_bounded_array(raw_type) {
            Arity::DynamicArray
        } else if let Some(caps) = STATIC_ARRAY.captures(raw_type) {
            let len = caps[1]
                .parse::<usize>()
                .map_err(|_| invalid(&format!("invalid array length in {}", quote(raw_type))))?;
            Arity::StaticArray(len)
        } else if raw_type.contains('[') {
            return Err(invalid(&format!("malformed array type {}", quote(raw_type))));
        } else {
            Arity::Scalar
        };

        let element = element_type(raw_type);
        if element.is_empty() {
            return Err(invalid("field type is empty"));
        }

        Ok(FieldSpec::new(name, qualify(package, element)?, arity))
    }

    pub fn is_builtin(&self) -> bool {
        is_builtin(&self.source_type)
    }

    /// The nested message this field references, if any.
    pub fn message_type(&self) -> Result<Option<QualifiedType>, SchemaError> {
        if self.is_builtin() {
            return Ok(None);
        }
        self.source_type.parse().map(Some)
    }
}

fn qualify(package: &str, element: &str) -> Result<String, SchemaError> {
    if is_builtin(element) {
        return Ok(element.to_string());
    }
    let qualified = if element.contains('/') {
        element.parse::<QualifiedType>()?
    } else if element == "Header" {
        QualifiedType::new("std_msgs", "Header")
    } else {
        format!("{}/{}", package, element).parse::<QualifiedType>()?
    };
    Ok(qualified.to_string())
}

/// The fields of one message type, in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageDefinition {
    pub ty:     QualifiedType,
    pub fields: Vec<FieldSpec>,
}
