mod common;

use common::{find, member_names, parse, reflect_units, test_settings};
use declgraph::error::ConflictKind;
use declgraph::{DeclKind, ReflectError, ReflectionPipeline};
use std::sync::Arc;

fn merge_error(sources: &[(&str, &str)]) -> ReflectError {
    let units = sources.iter().map(|(name, code)| parse(name, code)).collect();
    match ReflectionPipeline::new(Arc::new(test_settings())).run(units) {
        Ok(_) => panic!("Expected the merge to fail"),
        Err(err) => err,
    }
}

#[test]
fn test_shared_definition_merges_once() {
    let output = reflect_units(&[
        ("a.cpp", "struct S { int x; };\nvoid fa();\n"),
        ("b.cpp", "struct S { int x; };\nvoid fb();\n"),
    ]);
    let db = &output.database;

    assert_eq!(member_names(db, "S"), vec!["x"]);
    assert_eq!(find(db, "S").location().file.as_ref(), "a.cpp");
    assert!(db.find_declaration("fa()").is_some());
    assert!(db.find_declaration("fb()").is_some());
    assert_eq!(db.layout_of(find(db, "S::x")).unwrap().byte_offset, 0);
}

#[test]
fn test_kind_conflict_fails_the_merge() {
    let err = merge_error(&[("a.cpp", "struct S {};\n"), ("b.cpp", "union S {};\n")]);
    let conflict = match err {
        ReflectError::Merge(conflict) => conflict,
        other => panic!("Expected a merge conflict, got {other}"),
    };

    assert_eq!(conflict.qualified_name, "S");
    assert_eq!(
        conflict.kind,
        ConflictKind::Kind {
            first: DeclKind::Struct,
            second: DeclKind::Union
        }
    );
    assert_eq!(conflict.first.file.as_ref(), "a.cpp");
    assert_eq!(conflict.second.file.as_ref(), "b.cpp");
}

#[test]
fn test_different_members_fail_the_merge() {
    let err = merge_error(&[
        ("a.cpp", "struct S { int x; };\n"),
        ("b.cpp", "struct S { long x; };\n"),
    ]);
    assert!(matches!(
        err,
        ReflectError::Merge(ref conflict) if conflict.kind == ConflictKind::Layout
    ));
    assert_eq!(err.status_code(), "MERGE_CONFLICT");
}

#[test]
fn test_definition_in_later_unit_completes_declaration() {
    let output = reflect_units(&[
        ("a.cpp", "class c1;\n"),
        ("b.cpp", "class c1 { int m1; };\n"),
    ]);
    let db = &output.database;
    let c1 = find(db, "c1");

    assert!(c1.is_definition());
    assert_eq!(c1.location().file.as_ref(), "b.cpp");
    assert_eq!(member_names(db, "c1"), vec!["m1"]);
    assert_eq!(db.size_of(c1).unwrap().size, 4);
}

#[test]
fn test_function_declared_in_one_unit_defined_in_another() {
    let output = reflect_units(&[
        ("a.cpp", "/// Adds two numbers.\nint add(int a, int b);\n"),
        ("b.cpp", "int add(int a, int b) { return a + b; }\n"),
    ]);
    let db = &output.database;
    let add = find(db, "add(int, int)");

    assert!(add.is_definition());
    assert_eq!(add.location().file.as_ref(), "b.cpp");
    assert_eq!(
        db.documentation_of(add).unwrap().brief_text,
        "Adds two numbers."
    );
}

#[test]
fn test_documentation_filled_from_later_unit() {
    let output = reflect_units(&[
        ("a.cpp", "struct S { int x; };\n"),
        ("b.cpp", "/// Documented here.\nstruct S { int x; };\n"),
    ]);
    let db = &output.database;
    assert_eq!(
        db.documentation_of(find(db, "S")).unwrap().brief_text,
        "Documented here."
    );
}

#[test]
fn test_anonymous_namespaces_stay_per_unit() {
    let output = reflect_units(&[
        ("a.cpp", "namespace { int x; }\n"),
        ("b.cpp", "namespace { int x; }\n"),
    ]);
    let db = &output.database;

    assert!(db.find_declaration("(anonymous namespace@a.cpp)::x").is_some());
    assert!(db.find_declaration("(anonymous namespace@b.cpp)::x").is_some());
}

#[test]
fn test_named_namespaces_union_members() {
    let output = reflect_units(&[
        ("a.cpp", "namespace ns { void f(); }\n"),
        ("b.cpp", "namespace ns { void g(); }\n"),
    ]);
    let db = &output.database;
    let ns = find(db, "ns");

    let children: Vec<&str> = db.children_of(ns).map(|d| d.segment()).collect();
    assert_eq!(children, vec!["f()", "g()"]);
}
