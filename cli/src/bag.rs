//! Message definitions embedded in recordings: MCAP files and ROS 1 bags.
//!
//! ROS recordings store, per channel or connection, the root type name and
//! its full definition bundle (`ros1msg` or `ros2msg` schema encoding). Every
//! recorded root type becomes a seed; the bundles serve as the first source
//! of field lists.

use std::fs;
use std::path::Path;

use memmap2::Mmap;
use msg2capnp_compiler::{provider::MemoryProvider, MetadataProvider, ProviderError};
use msg2capnp_schema::{FieldSpec, QualifiedType};
use tracing::{debug, warn};

use crate::{error::CliError, ros1bag};

pub const ROS1_SCHEMA_ENCODING: &str = "ros1msg";
pub const ROS2_SCHEMA_ENCODING: &str = "ros2msg";
pub const MCAP_MAGIC: &[u8] = b"\x89MCAP0\r\n";

pub struct BagProvider {
    definitions: MemoryProvider,
    recorded:    Vec<QualifiedType>,
}

impl BagProvider {
    /// Opens an MCAP recording or a ROS 1 bag, told apart by their magic bytes.
    pub fn open(path: &Path) -> Result<Self, CliError> {
        if !path.is_file() {
            return Err(CliError::InputNotFound(path.to_path_buf()));
        }

        let file = fs::File::open(path)?;
        let mmap = unsafe { Mmap::map(&file) }?;

        let schemas = if ros1bag::is_ros1_bag(&mmap) {
            debug!("Reading {} as a ROS 1 bag", path.display());
            ros1bag::read_connections(&mmap)?
                .into_iter()
                .map(|c| (c.ty, ROS1_SCHEMA_ENCODING.to_string(), c.definition))
                .collect()
        } else if mmap.starts_with(MCAP_MAGIC) {
            debug!("Reading {} as an MCAP recording", path.display());
            mcap_schemas(&mmap, path)?
        } else {
            return Err(ProviderError::Unavailable(format!(
                "{} is neither an MCAP recording nor a ROS 1 bag (V2.0)",
                path.display()
            ))
            .into());
        };

        BagProvider::from_schemas(schemas)
    }

    /// Builds the provider from `(name, encoding, data)` schema records.
    /// Records in other encodings are skipped with a warning.
    pub fn from_schemas<I>(schemas: I) -> Result<Self, CliError>
    where
        I: IntoIterator<Item = (String, String, String)>,
    {
        let mut definitions = MemoryProvider::new();
        let mut recorded: Vec<QualifiedType> = Vec::new();

        for (name, encoding, data) in schemas {
            if encoding != ROS1_SCHEMA_ENCODING && encoding != ROS2_SCHEMA_ENCODING {
                warn!("Skipping recorded type {}: unsupported schema encoding {:?}", name, encoding);
                continue;
            }
            let ty: QualifiedType = name.parse()?;
            if recorded.contains(&ty) {
                continue;
            }
            definitions.insert_bundle(&ty, &data)?;
            recorded.push(ty);
        }

        debug!(
            "Recording holds {} root types and {} definitions",
            recorded.len(),
            definitions.len()
        );
        Ok(BagProvider { definitions, recorded })
    }

    /// The root types of all recorded channels, in topic order.
    pub fn recorded_types(&self) -> &[QualifiedType] {
        &self.recorded
    }
}

fn mcap_schemas(data: &[u8], path: &Path) -> Result<Vec<(String, String, String)>, ProviderError> {
    let summary = mcap::read::Summary::read(data)
        .map_err(|e| ProviderError::Unavailable(format!("{}: {}", path.display(), e)))?
        .ok_or_else(|| ProviderError::Unavailable(format!("{} has no summary section", path.display())))?;

    let mut channels: Vec<_> = summary.channels.values().collect();
    channels.sort_by(|a, b| a.topic.cmp(&b.topic));

    let mut schemas = Vec::new();
    for channel in channels {
        match &channel.schema {
            Some(schema) => schemas.push((
                schema.name.clone(),
                schema.encoding.clone(),
                String::from_utf8_lossy(&schema.data).into_owned(),
            )),
            None => debug!("Channel {} has no schema", channel.topic),
        }
    }
    Ok(schemas)
}

impl MetadataProvider for BagProvider {
    fn fields(&self, ty: &QualifiedType) -> Result<Vec<FieldSpec>, ProviderError> {
        self.definitions.fields(ty)
    }

    fn list_types(&self) -> Result<Vec<QualifiedType>, ProviderError> {
        Ok(self.recorded.clone())
    }
}
