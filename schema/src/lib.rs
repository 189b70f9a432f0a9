//! msg2capnp-schema
//!
//! Source-side model for ROS message definitions:
//!  1) `QualifiedType`, `FieldSpec` and `Arity`, the shapes the compiler consumes,
//!  2) Builtin-type and array-notation predicates for raw type strings,
//!  3) A tokenizer + parser for `.msg` text,
//!  4) A splitter for concatenated definition bundles (`MSG: pkg/Type` sections),
//!  5) Error types (`SchemaError`).
//!
//! ```
//! use msg2capnp_schema::*;
//!
//! let ty: QualifiedType = "geometry_msgs/Point".parse().unwrap();
//! let def = parse_msg(&ty, "float64 x\nfloat64 y\nfloat64 z\n").unwrap();
//! assert_eq!(def.fields.len(), 3);
//! assert_eq!(def.fields[0].arity, Arity::Scalar);
//! ```

pub mod error;
pub mod utils;
pub mod types;
pub mod tokenizer;
pub mod parser;
pub mod bundle;

pub use bundle::split_bundle;
pub use error::SchemaError;
pub use parser::parse_msg;
pub use types::*;
