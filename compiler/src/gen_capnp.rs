use msg2capnp_schema::{utils::quote, QualifiedType};
use rand::RngCore;

use crate::{
    field::FieldDecl,
    id::IdGenerator,
    partition::SCHEMA_EXTENSION,
    types::{GeneratedSchema, SchemaField},
};

pub const GEN_COMMENT_NOTIF: &str =
    "# Generated by msg2capnp. This file should not be modified by hand.";
pub const CAPNP_NAMESPACE_INCLUDE: &str = "using Cxx = import \"/capnp/c++.capnp\";";
pub const DEFAULT_NAMESPACE: &str = "gams::types";

/// Assembles the schema for `ty`: a fresh file id, ordinals assigned densely
/// from zero in the order `fields` are given.
pub fn render<R: RngCore>(
    ty: &QualifiedType,
    fields: Vec<FieldDecl>,
    imports: Vec<QualifiedType>,
    ids: &mut IdGenerator<R>,
    namespace: &str,
) -> GeneratedSchema {
    let fields = fields
        .into_iter()
        .zip(0u32..)
        .map(|(decl, ordinal)| SchemaField {
            ordinal,
            name: decl.name,
            target_type: decl.target_type,
        })
        .collect();

    GeneratedSchema {
        qualified_type: ty.clone(),
        unique_id: ids.new_id(),
        namespace: namespace.to_string(),
        imports,
        fields,
    }
}

fn import_line(import: &QualifiedType) -> String {
    format!(
        "using import {}.{};",
        quote(&format!("{}.{}", import.name(), SCHEMA_EXTENSION)),
        import.name()
    )
}

/// Prints the `.capnp` text for one generated schema.
pub fn compile_schema_to_capnp(schema: &GeneratedSchema) -> String {
    let mut capnp_code: Vec<String> = Vec::new();

    capnp_code.push(GEN_COMMENT_NOTIF.to_string());
    capnp_code.push(format!("@{:#018x};", schema.unique_id));
    capnp_code.push("".to_string());

    capnp_code.push("# Namespace setup".to_string());
    capnp_code.push(CAPNP_NAMESPACE_INCLUDE.to_string());
    capnp_code.push(format!("$Cxx.namespace({});", quote(&schema.namespace)));
    capnp_code.push("".to_string());

    if !schema.imports.is_empty() {
        capnp_code.push("# Capnfile Imports".to_string());
        for import in &schema.imports {
            capnp_code.push(import_line(import));
        }
        capnp_code.push("".to_string());
    }

    capnp_code.push("# Type definition".to_string());
    capnp_code.push(format!("struct {} {{", schema.struct_name()));
    for field in &schema.fields {
        capnp_code.push(format!(
            "  {} @{} :{};",
            field.name, field.ordinal, field.target_type
        ));
    }
    capnp_code.push("}".to_string());
    capnp_code.push("".to_string());

    capnp_code.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(s: &str) -> QualifiedType {
        s.parse().unwrap()
    }

    fn decl(name: &str, target_type: &str) -> FieldDecl {
        FieldDecl {
            name:        name.to_string(),
            target_type: target_type.to_string(),
        }
    }

    #[test]
    fn test_render_assigns_dense_ordinals() {
        let mut ids = IdGenerator::seeded(1);
        let schema = render(
            &ty("a_msgs/A"),
            vec![decl("x", "Int32"), decl("name", "Text"), decl("samples", "List(Float64)")],
            vec![],
            &mut ids,
            DEFAULT_NAMESPACE,
        );
        let ordinals: Vec<u32> = schema.fields.iter().map(|f| f.ordinal).collect();
        assert_eq!(ordinals, vec![0, 1, 2]);
        assert_ne!(schema.unique_id & (1 << 63), 0);
    }

    #[test]
    fn test_compile_schema_to_capnp() {
        let schema = GeneratedSchema {
            qualified_type: ty("nav_msgs/Odometry"),
            unique_id:      0x8000_0000_0000_00ab,
            namespace:      DEFAULT_NAMESPACE.to_string(),
            imports:        vec![ty("std_msgs/Header"), ty("geometry_msgs/PoseWithCovariance")],
            fields:         vec![
                SchemaField { ordinal: 0, name: "header".into(), target_type: "Header".into() },
                SchemaField { ordinal: 1, name: "childFrameId".into(), target_type: "Text".into() },
                SchemaField { ordinal: 2, name: "pose".into(), target_type: "PoseWithCovariance".into() },
            ],
        };

        let expected = "\
# Generated by msg2capnp. This file should not be modified by hand.
@0x80000000000000ab;

# Namespace setup
using Cxx = import \"/capnp/c++.capnp\";
$Cxx.namespace(\"gams::types\");

# Capnfile Imports
using import \"Header.capnp\".Header;
using import \"PoseWithCovariance.capnp\".PoseWithCovariance;

# Type definition
struct Odometry {
  header @0 :Header;
  childFrameId @1 :Text;
  pose @2 :PoseWithCovariance;
}
";
        assert_eq!(compile_schema_to_capnp(&schema), expected);
    }

    #[test]
    fn test_no_import_section_without_imports() {
        let mut ids = IdGenerator::seeded(3);
        let schema = render(&ty("std_msgs/Empty"), vec![], vec![], &mut ids, "custom::ns");
        let text = compile_schema_to_capnp(&schema);
        assert!(!text.contains("using import"));
        assert!(text.contains("$Cxx.namespace(\"custom::ns\");"));
        assert!(text.ends_with("struct Empty {\n}\n"));
    }
}
