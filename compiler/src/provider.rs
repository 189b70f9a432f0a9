//! `MetadataProvider` implementations.
//!
//! - [`MemoryProvider`]: definitions held in memory (recorded logs, tests),
//! - [`PackagePathProvider`]: `<package>/msg/*.msg` files under search paths,
//! - [`FallbackProvider`]: asks a primary source first, then a secondary one.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use msg2capnp_schema::{parse_msg, split_bundle, FieldSpec, MessageDefinition, QualifiedType};
use regex::Regex;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::{error::ProviderError, traits::MetadataProvider};

lazy_static! {
    static ref PACKAGE_NAME: Regex = Regex::new(r"<name>\s*([^<\s]+)\s*</name>").unwrap();
}

pub const MSG_EXTENSION: &str = "msg";

#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    definitions: BTreeMap<QualifiedType, Vec<FieldSpec>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        MemoryProvider::default()
    }

    /// Replaces any earlier definition of the same type.
    pub fn insert(&mut self, ty: QualifiedType, fields: Vec<FieldSpec>) {
        self.definitions.insert(ty, fields);
    }

    pub fn insert_definition(&mut self, definition: MessageDefinition) {
        self.insert(definition.ty, definition.fields);
    }

    /// Parses `.msg` text for `ty` and stores it.
    pub fn insert_msg(&mut self, ty: &QualifiedType, text: &str) -> Result<(), ProviderError> {
        let definition = parse_msg(ty, text).map_err(|source| ProviderError::InvalidDefinition {
            ty: ty.clone(),
            source,
        })?;
        self.insert_definition(definition);
        Ok(())
    }

    /// Stores every section of a concatenated definition bundle. Types that
    /// are already known keep their first definition.
    pub fn insert_bundle(&mut self, root: &QualifiedType, text: &str) -> Result<(), ProviderError> {
        let definitions = split_bundle(root, text).map_err(|source| ProviderError::InvalidDefinition {
            ty: root.clone(),
            source,
        })?;
        for definition in definitions {
            if !self.contains(&definition.ty) {
                self.insert_definition(definition);
            }
        }
        Ok(())
    }

    pub fn contains(&self, ty: &QualifiedType) -> bool {
        self.definitions.contains_key(ty)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl MetadataProvider for MemoryProvider {
    fn fields(&self, ty: &QualifiedType) -> Result<Vec<FieldSpec>, ProviderError> {
        self.definitions
            .get(ty)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownType(ty.clone()))
    }

    fn list_types(&self) -> Result<Vec<QualifiedType>, ProviderError> {
        Ok(self.definitions.keys().cloned().collect())
    }
}

/// Finds ROS packages (directories holding a `package.xml`) under a set of
/// search roots and serves the `.msg` files in their `msg/` directories.
///
/// When a package is found more than once, the first root wins.
#[derive(Debug, Clone, Default)]
pub struct PackagePathProvider {
    packages: BTreeMap<String, PathBuf>,
}

impl PackagePathProvider {
    pub fn discover<P: AsRef<Path>>(roots: &[P]) -> Result<Self, ProviderError> {
        let mut packages: BTreeMap<String, PathBuf> = BTreeMap::new();

        for root in roots {
            let root = root.as_ref();
            if !root.is_dir() {
                debug!("Skipping missing package path {}", root.display());
                continue;
            }

            let manifests = WalkDir::new(root)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|entry| match entry {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                        None
                    }
                })
                .filter(|entry| entry.file_type().is_file() && entry.file_name() == "package.xml");

            for manifest in manifests {
                let package_dir = match manifest.path().parent() {
                    Some(dir) => dir.to_path_buf(),
                    None => continue,
                };
                let msg_dir = package_dir.join(MSG_EXTENSION);
                if !msg_dir.is_dir() {
                    continue;
                }
                let name = package_name(manifest.path(), &package_dir)?;
                if packages.contains_key(&name) {
                    debug!("Package {} at {} is shadowed", name, package_dir.display());
                    continue;
                }
                debug!("Found message package {} at {}", name, package_dir.display());
                packages.insert(name, msg_dir);
            }
        }

        Ok(PackagePathProvider { packages })
    }

    /// Splits a `ROS_PACKAGE_PATH`-style list.
    pub fn split_search_path(value: &str) -> Vec<PathBuf> {
        std::env::split_paths(value)
            .filter(|p| !p.as_os_str().is_empty())
            .collect()
    }

    pub fn packages(&self) -> impl Iterator<Item = &str> {
        self.packages.keys().map(String::as_str)
    }

    pub fn msg_path(&self, ty: &QualifiedType) -> Result<PathBuf, ProviderError> {
        let msg_dir = self
            .packages
            .get(ty.package())
            .ok_or_else(|| ProviderError::UnknownPackage(ty.package().to_string()))?;
        Ok(msg_dir.join(format!("{}.{}", ty.name(), MSG_EXTENSION)))
    }
}

fn package_name(manifest: &Path, package_dir: &Path) -> Result<String, ProviderError> {
    let text = fs::read_to_string(manifest)?;
    if let Some(caps) = PACKAGE_NAME.captures(&text) {
        return Ok(caps[1].to_string());
    }
    Ok(package_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default())
}

impl MetadataProvider for PackagePathProvider {
    fn fields(&self, ty: &QualifiedType) -> Result<Vec<FieldSpec>, ProviderError> {
        let path = self.msg_path(ty)?;
        if !path.is_file() {
            return Err(ProviderError::UnknownType(ty.clone()));
        }
        let text = fs::read_to_string(&path)?;
        let definition = parse_msg(ty, &text).map_err(|source| ProviderError::InvalidDefinition {
            ty: ty.clone(),
            source,
        })?;
        Ok(definition.fields)
    }

    fn list_types(&self) -> Result<Vec<QualifiedType>, ProviderError> {
        let mut types = Vec::new();
        for (package, msg_dir) in &self.packages {
            let mut names: Vec<String> = fs::read_dir(msg_dir)?
                .filter_map(Result::ok)
                .map(|entry| entry.path())
                .filter(|path| path.extension().is_some_and(|ext| ext == MSG_EXTENSION))
                .filter_map(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
                .collect();
            names.sort();
            for name in names {
                match format!("{}/{}", package, name).parse::<QualifiedType>() {
                    Ok(ty) => types.push(ty),
                    Err(e) => warn!("Skipping {}.{} in {}: {}", name, MSG_EXTENSION, msg_dir.display(), e),
                }
            }
        }
        Ok(types)
    }
}

/// Serves definitions from `primary` and falls back to `secondary` for
/// types the primary does not know.
pub struct FallbackProvider<A, B> {
    primary:   A,
    secondary: B,
}

impl<A: MetadataProvider, B: MetadataProvider> FallbackProvider<A, B> {
    pub fn new(primary: A, secondary: B) -> Self {
        FallbackProvider { primary, secondary }
    }
}

impl<A: MetadataProvider, B: MetadataProvider> MetadataProvider for FallbackProvider<A, B> {
    fn fields(&self, ty: &QualifiedType) -> Result<Vec<FieldSpec>, ProviderError> {
        match self.primary.fields(ty) {
            Err(ProviderError::UnknownType(_)) | Err(ProviderError::UnknownPackage(_)) => {
                self.secondary.fields(ty)
            }
            other => other,
        }
    }

    /// The primary's types, in order, followed by any additional ones from the secondary.
    fn list_types(&self) -> Result<Vec<QualifiedType>, ProviderError> {
        let mut types = self.primary.list_types()?;
        for ty in self.secondary.list_types()? {
            if !types.contains(&ty) {
                types.push(ty);
            }
        }
        Ok(types)
    }
}
