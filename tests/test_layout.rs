mod common;

use common::{find, member_names, reflect, reflect_with, test_settings};
use declgraph::{AggregateLayout, FieldLayout, QueryError};
use declgraph::config::TypeLayoutSpec;
use declgraph::error::Severity;

fn offset(db: &declgraph::ReflectionDatabase, name: &str) -> u64 {
    db.layout_of(find(db, name)).unwrap().byte_offset
}

#[test]
fn test_natural_alignment_and_padding() {
    let output = reflect("struct Basic { char c; int i; double d; };\n");
    let db = &output.database;

    assert_eq!(offset(db, "Basic::c"), 0);
    assert_eq!(offset(db, "Basic::i"), 4);
    assert_eq!(offset(db, "Basic::d"), 8);
    assert_eq!(
        db.size_of(find(db, "Basic")).unwrap(),
        AggregateLayout { size: 16, align: 8 }
    );
}

#[test]
fn test_bitfields_share_storage_units() {
    let output = reflect(
        r#"
struct Bits {
    unsigned int a : 3;
    unsigned int b : 5;
    unsigned int : 0;
    unsigned int c : 4;
    char tail;
};
"#,
    );
    let db = &output.database;

    assert_eq!(
        db.layout_of(find(db, "Bits::a")).unwrap(),
        FieldLayout {
            byte_offset: 0,
            bit_width: Some(3),
            bit_offset: Some(0)
        }
    );
    assert_eq!(
        db.layout_of(find(db, "Bits::b")).unwrap(),
        FieldLayout {
            byte_offset: 0,
            bit_width: Some(5),
            bit_offset: Some(3)
        }
    );
    // The zero-width bitfield closes the first unit
    let c = db.layout_of(find(db, "Bits::c")).unwrap();
    assert_eq!((c.byte_offset, c.bit_offset), (4, Some(0)));
    assert_eq!(offset(db, "Bits::tail"), 8);
    assert_eq!(db.size_of(find(db, "Bits")).unwrap().size, 12);

    let members = member_names(db, "Bits");
    assert_eq!(members.len(), 5);
    assert!(members[2].starts_with("(unnamed bitfield at "));
}

#[test]
fn test_union_members_start_at_zero() {
    let output = reflect("union U { char c; double d; int arr[3]; };\n");
    let db = &output.database;

    for member in ["U::c", "U::d", "U::arr"] {
        assert_eq!(offset(db, member), 0, "{member}");
    }
    assert_eq!(
        db.size_of(find(db, "U")).unwrap(),
        AggregateLayout { size: 16, align: 8 }
    );
}

#[test]
fn test_anonymous_union_members_are_promoted() {
    let output = reflect(
        r#"
struct Outer {
    int tag;
    union {
        int i;
        double d;
    };
    char after;
};
"#,
    );
    let db = &output.database;
    let outer = find(db, "Outer");

    let members = db.list_members(outer).unwrap();
    let names: Vec<&str> = members.iter().map(|m| m.name()).collect();
    assert_eq!(names, vec!["tag", "", "i", "d", "after"]);

    assert_eq!(db.layout_of(members[1]).unwrap().byte_offset, 8);
    assert_eq!(db.layout_of(members[2]).unwrap().byte_offset, 8);
    assert_eq!(db.layout_of(members[3]).unwrap().byte_offset, 8);
    assert_eq!(db.layout_of(members[4]).unwrap().byte_offset, 16);
    assert_eq!(db.size_of(outer).unwrap().size, 24);
}

#[test]
fn test_pointers_arrays_and_nested_aggregates() {
    let output = reflect(
        r#"
struct Inner { int a; char b; };
struct Wrap {
    char c;
    Inner in;
    char* p;
    short s[3];
};
"#,
    );
    let db = &output.database;

    assert_eq!(
        db.size_of(find(db, "Inner")).unwrap(),
        AggregateLayout { size: 8, align: 4 }
    );
    assert_eq!(offset(db, "Wrap::in"), 4);
    assert_eq!(offset(db, "Wrap::p"), 16);
    assert_eq!(offset(db, "Wrap::s"), 24);
    assert_eq!(
        db.size_of(find(db, "Wrap")).unwrap(),
        AggregateLayout { size: 32, align: 8 }
    );
}

#[test]
fn test_polymorphic_aggregate_reserves_vptr() {
    let output = reflect("struct V { virtual void f(); int x; };\n");
    let db = &output.database;

    assert_eq!(offset(db, "V::x"), 8);
    assert_eq!(db.size_of(find(db, "V")).unwrap().size, 16);
}

#[test]
fn test_vptr_reservation_can_be_disabled() {
    let mut settings = test_settings();
    settings.layout.reserve_vptr = false;
    let output = reflect_with(
        settings,
        &[("unit.cpp", "struct V { virtual void f(); int x; };\n")],
    );
    let db = &output.database;

    assert_eq!(offset(db, "V::x"), 0);
    assert_eq!(db.size_of(find(db, "V")).unwrap().size, 4);
}

#[test]
fn test_configured_type_layouts() {
    let mut settings = test_settings();
    settings
        .layout
        .types
        .insert("handle_t".to_string(), TypeLayoutSpec { size: 16, align: 16 });
    let output = reflect_with(settings, &[("unit.cpp", "struct H { char c; handle_t h; };\n")]);
    let db = &output.database;

    assert_eq!(offset(db, "H::h"), 16);
    assert_eq!(
        db.size_of(find(db, "H")).unwrap(),
        AggregateLayout { size: 32, align: 16 }
    );
}

#[test]
fn test_empty_struct_has_size_one() {
    let output = reflect("struct Empty {};\n");
    let db = &output.database;
    assert_eq!(
        db.size_of(find(db, "Empty")).unwrap(),
        AggregateLayout { size: 1, align: 1 }
    );
}

#[test]
fn test_unresolved_member_type_leaves_no_layout() {
    let output = reflect("struct Bad { Unknown u; int x; };\nstruct Fwd;\n");
    let db = &output.database;

    assert_eq!(
        db.size_of(find(db, "Bad")).unwrap_err(),
        QueryError::LayoutUnavailable("Bad".to_string())
    );
    assert!(matches!(
        db.layout_of(find(db, "Bad::x")),
        Err(QueryError::LayoutUnavailable(_))
    ));
    assert!(db.size_of(find(db, "Fwd")).is_err());

    let layout_warnings: Vec<_> = output
        .diagnostics
        .iter()
        .filter(|d| d.diagnostic.status_code() == "LAYOUT_UNAVAILABLE")
        .collect();
    assert_eq!(layout_warnings.len(), 1);
    assert_eq!(layout_warnings[0].diagnostic.severity(), Severity::Warning);
    assert_eq!(output.error_count(), 0);
}

#[test]
fn test_template_primary_has_no_layout() {
    let output = reflect("template<typename T> struct Box { T value; };\n");
    let db = &output.database;
    assert!(matches!(
        db.size_of(find(db, "Box")),
        Err(QueryError::LayoutUnavailable(_))
    ));
}

#[test]
fn test_layout_queries_check_kind() {
    let output = reflect("struct S { int x; };\nint g;\n");
    let db = &output.database;
    assert!(matches!(
        db.layout_of(find(db, "S")),
        Err(QueryError::WrongKind { .. })
    ));
    assert!(matches!(
        db.size_of(find(db, "g")),
        Err(QueryError::WrongKind { .. })
    ));
}
