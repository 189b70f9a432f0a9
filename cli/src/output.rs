use std::fs;
use std::path::{Path, PathBuf};

use msg2capnp_compiler::CompiledSchema;
use msg2capnp_schema::QualifiedType;
use serde::Serialize;
use tracing::error;

use crate::error::CliError;

/// One line of the `--manifest` report.
#[derive(Debug, Serialize)]
pub struct ManifestEntry<'a> {
    #[serde(rename = "type")]
    pub ty:   &'a QualifiedType,
    pub path: PathBuf,
    pub id:   String,
}

/// Writes `schema` under `root`, creating its package directory and
/// replacing any existing file.
pub fn write_schema(root: &Path, schema: &CompiledSchema) -> Result<PathBuf, CliError> {
    let path = root.join(&schema.path);
    let wrap = |source| CliError::Output {
        path: path.clone(),
        source,
    };
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(wrap)?;
    }
    fs::write(&path, &schema.text).map_err(wrap)?;
    Ok(path)
}

/// Writes every schema, continuing past failures. Returns the manifest
/// entries of the written files and the number that failed.
pub fn write_all<'a>(root: &Path, schemas: &'a [CompiledSchema]) -> (Vec<ManifestEntry<'a>>, usize) {
    let mut written = Vec::new();
    let mut failed = 0;

    for schema in schemas {
        let ty = &schema.schema.qualified_type;
        match write_schema(root, schema) {
            Ok(path) => {
                println!("Generating schema (.capnp) file for {} at {}", ty, path.display());
                written.push(ManifestEntry {
                    ty,
                    path,
                    id: format!("{:#018x}", schema.schema.unique_id),
                });
            }
            Err(e) => {
                error!("{}", e);
                failed += 1;
            }
        }
    }

    (written, failed)
}

pub fn write_manifest(path: &Path, entries: &[ManifestEntry]) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(entries)?;
    fs::write(path, json + "\n").map_err(|source| CliError::Output {
        path: path.to_path_buf(),
        source,
    })
}
