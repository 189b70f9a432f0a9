#![cfg(test)]

use msg2capnp_compiler::{
    compile_types,
    provider::MemoryProvider,
    CompileOptions,
    IdGenerator,
    PolicySet,
};
use msg2capnp_schema::QualifiedType;

fn ty(s: &str) -> QualifiedType {
    s.parse().expect("valid qualified type")
}

fn import_lines(text: &str) -> Vec<&str> {
    text.lines().filter(|l| l.starts_with("using import")).collect()
}

#[test]
fn test_compile_scalar_string_and_array_fields() {
    let mut provider = MemoryProvider::new();
    provider
        .insert_msg(&ty("demo_msgs/Sample"), "int32 x\nstring name\nfloat64[] samples\n")
        .expect("insert_msg failed");

    let mut ids = IdGenerator::seeded(11);
    let compilation = compile_types(
        vec![ty("demo_msgs/Sample")],
        &PolicySet::with_builtin_denials(),
        &provider,
        &CompileOptions::default(),
        &mut ids,
    )
    .expect("compile_types failed");

    assert!(compilation.is_complete());
    assert_eq!(compilation.schemas.len(), 1);

    let compiled = &compilation.schemas[0];
    let fields: Vec<(u32, &str, &str)> = compiled
        .schema
        .fields
        .iter()
        .map(|f| (f.ordinal, f.name.as_str(), f.target_type.as_str()))
        .collect();
    assert_eq!(
        fields,
        vec![(0, "x", "Int32"), (1, "name", "Text"), (2, "samples", "List(Float64)")]
    );

    assert!(compiled.text.contains("struct Sample {"));
    assert!(compiled.text.contains("  samples @2 :List(Float64);"));
    assert_eq!(compiled.path, std::path::PathBuf::from("demo").join("Sample.capnp"));
    println!("Generated schema:\n{}", compiled.text);
}

#[test]
fn test_nested_dependency_is_imported() {
    let mut provider = MemoryProvider::new();
    provider.insert_msg(&ty("a_msgs/A"), "B child\nB[] children\n").unwrap();
    provider.insert_msg(&ty("a_msgs/B"), "float32 value\n").unwrap();

    let mut ids = IdGenerator::seeded(5);
    let compilation = compile_types(
        vec![ty("a_msgs/A")],
        &PolicySet::with_builtin_denials(),
        &provider,
        &CompileOptions::default(),
        &mut ids,
    )
    .unwrap();

    let types: Vec<&QualifiedType> = compilation
        .schemas
        .iter()
        .map(|s| &s.schema.qualified_type)
        .collect();
    assert_eq!(types, vec![&ty("a_msgs/A"), &ty("a_msgs/B")]);

    let a = &compilation.schemas[0].text;
    let b = &compilation.schemas[1].text;
    assert_eq!(import_lines(a), vec!["using import \"B.capnp\".B;"]);
    assert!(import_lines(b).is_empty());
    assert!(a.contains("  children @1 :List(B);"));
}

#[test]
fn test_denied_dependency_still_imported() {
    let mut provider = MemoryProvider::new();
    provider.insert_msg(&ty("robot_msgs/Status"), "std_msgs/Bool ok\nstring detail\n").unwrap();
    provider.insert_msg(&ty("std_msgs/Bool"), "bool data\n").unwrap();

    let mut ids = IdGenerator::seeded(9);
    let compilation = compile_types(
        vec![ty("robot_msgs/Status")],
        &PolicySet::with_builtin_denials(),
        &provider,
        &CompileOptions::default(),
        &mut ids,
    )
    .unwrap();

    assert_eq!(compilation.conflicts.len(), 1);
    assert_eq!(compilation.conflicts[0].dependency, ty("std_msgs/Bool"));
    assert_eq!(compilation.conflicts[0].required_by, ty("robot_msgs/Status"));

    let status = &compilation.schemas[0].text;
    assert_eq!(import_lines(status), vec!["using import \"Bool.capnp\".Bool;"]);
    assert_eq!(compilation.schemas.len(), 2);
}

#[test]
fn test_denied_seed_is_skipped() {
    let mut provider = MemoryProvider::new();
    provider.insert_msg(&ty("std_msgs/Bool"), "bool data\n").unwrap();
    provider.insert_msg(&ty("std_msgs/Header"), "uint32 seq\ntime stamp\nstring frame_id\n").unwrap();

    let mut ids = IdGenerator::seeded(2);
    let compilation = compile_types(
        vec![ty("std_msgs/Bool"), ty("std_msgs/Header")],
        &PolicySet::with_builtin_denials(),
        &provider,
        &CompileOptions::default(),
        &mut ids,
    )
    .unwrap();

    assert_eq!(compilation.schemas.len(), 1);
    assert_eq!(compilation.schemas[0].schema.qualified_type, ty("std_msgs/Header"));
    assert!(compilation.schemas[0].text.contains("  frameId @2 :Text;"));
}

#[test]
fn test_reruns_differ_only_in_file_id() {
    let mut provider = MemoryProvider::new();
    provider
        .insert_msg(&ty("geo_msgs/Polygon"), "geo_msgs/Point[] points\nuint8[4] flags\n")
        .unwrap();
    provider.insert_msg(&ty("geo_msgs/Point"), "float64 x\nfloat64 y\n").unwrap();

    let run = || {
        let mut ids = IdGenerator::from_entropy();
        compile_types(
            vec![ty("geo_msgs/Polygon")],
            &PolicySet::new(),
            &provider,
            &CompileOptions::default(),
            &mut ids,
        )
        .unwrap()
    };
    let first = run();
    let second = run();

    assert_eq!(first.schemas.len(), second.schemas.len());
    for (a, b) in first.schemas.iter().zip(second.schemas.iter()) {
        assert_ne!(a.schema.unique_id, b.schema.unique_id);
        assert_eq!(a.schema.fields, b.schema.fields);

        let strip = |text: &str| -> Vec<String> {
            text.lines()
                .filter(|l| !l.starts_with("@0x"))
                .map(str::to_string)
                .collect()
        };
        assert_eq!(strip(&a.text), strip(&b.text));
    }
}

#[test]
fn test_no_subtypes_generates_only_seeds() {
    let mut provider = MemoryProvider::new();
    provider.insert_msg(&ty("a_msgs/A"), "B child\n").unwrap();
    provider.insert_msg(&ty("a_msgs/B"), "int8 v\n").unwrap();

    let options = CompileOptions {
        expand_subtypes: false,
        ..CompileOptions::default()
    };
    let mut ids = IdGenerator::seeded(4);
    let compilation =
        compile_types(vec![ty("a_msgs/A")], &PolicySet::new(), &provider, &options, &mut ids).unwrap();

    assert_eq!(compilation.schemas.len(), 1);
    assert_eq!(import_lines(&compilation.schemas[0].text), vec!["using import \"B.capnp\".B;"]);
}

#[test]
fn test_render_failure_does_not_stop_other_types() {
    let mut provider = MemoryProvider::new();
    provider.insert_msg(&ty("a_msgs/A"), "B b\nC c\n").unwrap();
    provider.insert_msg(&ty("a_msgs/B"), "int32 frame_id\nint32 frameId\n").unwrap();
    provider.insert_msg(&ty("a_msgs/C"), "int32 v\n").unwrap();

    let mut ids = IdGenerator::seeded(8);
    let compilation = compile_types(
        vec![ty("a_msgs/A")],
        &PolicySet::new(),
        &provider,
        &CompileOptions::default(),
        &mut ids,
    )
    .unwrap();

    assert!(!compilation.is_complete());
    assert_eq!(compilation.failures.len(), 1);
    assert_eq!(compilation.failures[0].0, ty("a_msgs/B"));
    assert_eq!(compilation.schemas.len(), 2);
}

#[test]
fn test_unknown_seed_aborts_resolution() {
    let provider = MemoryProvider::new();
    let mut ids = IdGenerator::seeded(1);
    let result = compile_types(
        vec![ty("ghost_msgs/Ghost")],
        &PolicySet::new(),
        &provider,
        &CompileOptions::default(),
        &mut ids,
    );
    assert!(result.is_err());
}

#[test]
fn test_lowercase_nested_name_matches_its_import() {
    let mut provider = MemoryProvider::new();
    provider.insert_msg(&ty("a_msgs/A"), "b_msgs/string_pair pair\n").unwrap();
    provider.insert_msg(&ty("b_msgs/string_pair"), "string first\nstring second\n").unwrap();

    let mut ids = IdGenerator::seeded(6);
    let compilation = compile_types(
        vec![ty("a_msgs/A")],
        &PolicySet::new(),
        &provider,
        &CompileOptions::default(),
        &mut ids,
    )
    .unwrap();

    let a = &compilation.schemas[0].text;
    let b = &compilation.schemas[1].text;
    assert_eq!(import_lines(a), vec!["using import \"string_pair.capnp\".string_pair;"]);
    assert!(a.contains("  pair @0 :string_pair;"));
    assert!(b.contains("struct string_pair {"));
}

#[test]
fn test_wstring_fields_render_as_text() {
    let mut provider = MemoryProvider::new();
    provider
        .insert_msg(&ty("diag_msgs/Report"), "wstring label\nint32 code\nwstring<=16[] notes\n")
        .unwrap();

    let mut ids = IdGenerator::seeded(12);
    let compilation = compile_types(
        vec![ty("diag_msgs/Report")],
        &PolicySet::with_builtin_denials(),
        &provider,
        &CompileOptions::default(),
        &mut ids,
    )
    .unwrap();

    assert!(compilation.is_complete());
    assert_eq!(compilation.schemas.len(), 1);
    let text = &compilation.schemas[0].text;
    assert!(text.contains("  label @0 :Text;"));
    assert!(text.contains("  code @1 :Int32;"));
    assert!(text.contains("  notes @2 :List(Text);"));
    assert!(import_lines(text).is_empty());
}

#[test]
fn test_short_name_clash_fails_the_importing_type() {
    let mut provider = MemoryProvider::new();
    provider.insert_msg(&ty("robot_msgs/Summary"), "arm_msgs/Status arm\nbase_msgs/Status base\n").unwrap();
    provider.insert_msg(&ty("arm_msgs/Status"), "bool ok\n").unwrap();
    provider.insert_msg(&ty("base_msgs/Status"), "uint8 level\n").unwrap();

    let mut ids = IdGenerator::seeded(13);
    let compilation = compile_types(
        vec![ty("robot_msgs/Summary")],
        &PolicySet::new(),
        &provider,
        &CompileOptions::default(),
        &mut ids,
    )
    .unwrap();

    assert!(!compilation.is_complete());
    assert_eq!(compilation.failures.len(), 1);
    assert_eq!(compilation.failures[0].0, ty("robot_msgs/Summary"));
    assert_eq!(compilation.schemas.len(), 2);
}

#[test]
fn test_uppercase_field_name_fails_verification() {
    let mut provider = MemoryProvider::new();
    provider.insert_msg(&ty("a_msgs/Offsets"), "float64 X_offset\nfloat64 y_offset\n").unwrap();

    let mut ids = IdGenerator::seeded(14);
    let compilation = compile_types(
        vec![ty("a_msgs/Offsets")],
        &PolicySet::new(),
        &provider,
        &CompileOptions::default(),
        &mut ids,
    )
    .unwrap();

    assert!(compilation.schemas.is_empty());
    assert_eq!(compilation.failures.len(), 1);
}
