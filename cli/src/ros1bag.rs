//! Connection records of ROS 1 bag files, format version 2.0.
//!
//! A bag is the magic line followed by records, each a length-prefixed
//! header (`name=value` fields, `op` selects the record kind) and a
//! length-prefixed body. Connection records carry the message type and its
//! full definition bundle. They appear in the index section and, for bags
//! that were never reindexed, inside uncompressed chunks.

use std::collections::HashMap;

use msg2capnp_compiler::ProviderError;
use tracing::debug;

pub const ROSBAG_MAGIC: &[u8] = b"#ROSBAG V2.0\n";

const OP_CHUNK: u8 = 0x05;
const OP_CONNECTION: u8 = 0x07;

#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub topic:      String,
    pub ty:         String,
    pub definition: String,
}

fn malformed(msg: &str) -> ProviderError {
    ProviderError::Unavailable(format!("Malformed ROS bag: {}", msg))
}

struct Reader<'a> {
    data: &'a [u8],
    pos:  usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Reader { data, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], ProviderError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| malformed(&format!("record ends past byte {}", self.data.len())))?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn read_u32(&mut self) -> Result<u32, ProviderError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_block(&mut self) -> Result<&'a [u8], ProviderError> {
        let len = self.read_u32()? as usize;
        self.take(len)
    }
}

/// `name=value` fields of a record header or connection body.
fn fields(bytes: &[u8]) -> Result<HashMap<&str, &[u8]>, ProviderError> {
    let mut reader = Reader::new(bytes);
    let mut fields = HashMap::new();
    while !reader.is_empty() {
        let field = reader.read_block()?;
        let eq = field
            .iter()
            .position(|b| *b == b'=')
            .ok_or_else(|| malformed("header field without '='"))?;
        let name = std::str::from_utf8(&field[..eq]).map_err(|_| malformed("non-UTF-8 field name"))?;
        fields.insert(name, &field[eq + 1..]);
    }
    Ok(fields)
}

fn text_field(fields: &HashMap<&str, &[u8]>, name: &str) -> Result<String, ProviderError> {
    let value = fields
        .get(name)
        .ok_or_else(|| malformed(&format!("connection record without {}", name)))?;
    Ok(String::from_utf8_lossy(value).into_owned())
}

pub fn is_ros1_bag(data: &[u8]) -> bool {
    data.starts_with(ROSBAG_MAGIC)
}

/// Every connection in the bag, one per message type, sorted by topic.
pub fn read_connections(data: &[u8]) -> Result<Vec<Connection>, ProviderError> {
    if !is_ros1_bag(data) {
        return Err(malformed("missing #ROSBAG V2.0 header"));
    }
    let mut connections = Vec::new();
    scan_records(&data[ROSBAG_MAGIC.len()..], &mut connections, true)?;
    connections.sort_by(|a, b| a.topic.cmp(&b.topic));
    Ok(connections)
}

fn scan_records(data: &[u8], out: &mut Vec<Connection>, top_level: bool) -> Result<(), ProviderError> {
    let mut reader = Reader::new(data);
    while !reader.is_empty() {
        let header = fields(reader.read_block()?)?;
        let body = reader.read_block()?;

        match header.get("op").and_then(|op| op.first()) {
            Some(&OP_CONNECTION) => {
                let body = fields(body)?;
                let connection = Connection {
                    topic:      text_field(&header, "topic")?,
                    ty:         text_field(&body, "type")?,
                    definition: text_field(&body, "message_definition")?,
                };
                if !out.iter().any(|c| c.ty == connection.ty) {
                    out.push(connection);
                }
            }
            Some(&OP_CHUNK) if top_level => match header.get("compression").copied() {
                Some(b"none") => scan_records(body, out, false)?,
                compression => debug!(
                    "Skipping {} chunk",
                    String::from_utf8_lossy(compression.unwrap_or_default())
                ),
            },
            _ => {}
        }
    }
    Ok(())
}
