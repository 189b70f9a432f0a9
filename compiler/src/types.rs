use msg2capnp_schema::QualifiedType;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaField {
    pub ordinal:     u32,
    pub name:        String,
    pub target_type: String,
}

/// Everything needed to print one `.capnp` file. Built once per type per
/// run and not modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedSchema {
    pub qualified_type: QualifiedType,
    pub unique_id:      u64,
    pub namespace:      String,
    pub imports:        Vec<QualifiedType>,
    pub fields:         Vec<SchemaField>,
}

impl GeneratedSchema {
    pub fn struct_name(&self) -> &str {
        self.qualified_type.name()
    }
}
