//! msg2capnp-compiler
//!
//! This crate implements:
//!  1) The ROS → Cap'n Proto type mapping tables and naming rules,
//!  2) A dependency resolver that closes a seed set of message types,
//!  3) A field declaration builder and verifier,
//!  4) Schema rendering (`compile_schema_to_capnp` → `String`) with random file ids,
//!  5) Output partitioning, `MetadataProvider` implementations, and `CompileError`.

pub mod error;
pub mod types;
pub mod traits;
pub mod mapping;
pub mod naming;
pub mod id;
pub mod policy;
pub mod resolver;
pub mod field;
pub mod verifier;
pub mod gen_capnp;
pub mod partition;
pub mod provider;
pub mod compiler;

pub use compiler::{compile_type, compile_types, Compilation, CompileOptions, CompiledSchema};
pub use error::{CompileError, ProviderError};
pub use gen_capnp::compile_schema_to_capnp;
pub use id::IdGenerator;
pub use policy::PolicySet;
pub use resolver::{resolve, ConfigConflict, Resolution, Resolver};
pub use traits::MetadataProvider;
