use std::path::PathBuf;

use msg2capnp_schema::QualifiedType;

pub const SCHEMA_EXTENSION: &str = "capnp";

/// Suffix of the ROS message-package family, dropped from directory names.
pub const PACKAGE_FAMILY_SUFFIX: &str = "_msgs";

/// `geometry_msgs` → `geometry`. Everything from the first `_msgs` on is
/// dropped; a package name that would become empty is kept whole.
pub fn package_dir(package: &str) -> &str {
    match package.split(PACKAGE_FAMILY_SUFFIX).next() {
        Some(dir) if !dir.is_empty() => dir,
        _ => package,
    }
}

/// Relative output path of the schema generated for `ty`.
pub fn path_for(ty: &QualifiedType) -> PathBuf {
    PathBuf::from(package_dir(ty.package())).join(format!("{}.{}", ty.name(), SCHEMA_EXTENSION))
}
