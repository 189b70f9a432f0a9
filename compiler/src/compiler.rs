use std::path::PathBuf;

use msg2capnp_schema::QualifiedType;
use rand::RngCore;
use serde::Serialize;
use tracing::{debug, error};

use crate::{
    error::CompileError,
    field::build_field,
    gen_capnp::{compile_schema_to_capnp, render, DEFAULT_NAMESPACE},
    id::IdGenerator,
    partition::path_for,
    policy::PolicySet,
    resolver::{ConfigConflict, Resolver},
    traits::MetadataProvider,
    types::GeneratedSchema,
    verifier::{check_imports, verify_fields},
};

#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Follow nested message fields; `false` generates only the seeds.
    pub expand_subtypes: bool,
    /// C++ namespace written into every schema.
    pub namespace:       String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            expand_subtypes: true,
            namespace:       DEFAULT_NAMESPACE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CompiledSchema {
    pub schema: GeneratedSchema,
    /// Relative to the output root.
    pub path:   PathBuf,
    #[serde(skip)]
    pub text:   String,
}

#[derive(Debug, Default)]
pub struct Compilation {
    pub schemas:   Vec<CompiledSchema>,
    pub conflicts: Vec<ConfigConflict>,
    /// Types that resolved but could not be rendered.
    pub failures:  Vec<(QualifiedType, CompileError)>,
}

impl Compilation {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Compiles a single, already-resolved message type.
pub fn compile_type<P, R>(
    ty: &QualifiedType,
    provider: &P,
    ids: &mut IdGenerator<R>,
    namespace: &str,
) -> Result<CompiledSchema, CompileError>
where
    P: MetadataProvider + ?Sized,
    R: RngCore,
{
    let fields = provider.fields(ty)?;

    let decls: Vec<_> = fields.iter().map(build_field).collect();
    verify_fields(ty, &decls)?;

    let mut imports: Vec<QualifiedType> = Vec::new();
    for field in &fields {
        if let Some(dependency) = field.message_type()? {
            if dependency != *ty && !imports.contains(&dependency) {
                imports.push(dependency);
            }
        }
    }
    check_imports(ty, &imports)?;

    let schema = render(ty, decls, imports, ids, namespace);
    let text = compile_schema_to_capnp(&schema);
    debug!("Compiled {} ({} fields, {} imports)", ty, schema.fields.len(), schema.imports.len());

    Ok(CompiledSchema {
        schema,
        path: path_for(ty),
        text,
    })
}

/// Resolves `seeds` and compiles every resulting type.
///
/// Denied seeds are dropped before resolution. Resolution failures abort the
/// whole run, since imports must only name types that will be generated;
/// failures while compiling individual types are collected in
/// [`Compilation::failures`] and the remaining types are still compiled.
pub fn compile_types<P, R, I>(
    seeds: I,
    policy: &PolicySet,
    provider: &P,
    options: &CompileOptions,
    ids: &mut IdGenerator<R>,
) -> Result<Compilation, CompileError>
where
    P: MetadataProvider + ?Sized,
    R: RngCore,
    I: IntoIterator<Item = QualifiedType>,
{
    let seeds = policy.filter_seeds(seeds);
    let resolution = Resolver::new(provider, policy)
        .expand_subtypes(options.expand_subtypes)
        .resolve(seeds)?;

    let mut compilation = Compilation {
        conflicts: resolution.conflicts,
        ..Compilation::default()
    };

    for ty in resolution.types {
        match compile_type(&ty, provider, ids, &options.namespace) {
            Ok(compiled) => compilation.schemas.push(compiled),
            Err(e) => {
                error!("Failed to compile {}: {}", ty, e);
                compilation.failures.push((ty, e));
            }
        }
    }

    Ok(compilation)
}
