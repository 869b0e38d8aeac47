use serde_json::{json, Value};

use neomap_core::error::NeomapError;
use neomap_core::metadata::NULL_SENTINEL;
use neomap_core::value::{bolt_to_json, json_to_bolt, node_to_flat, type_name};
use neo4rs::BoltType;

#[test]
fn test_bolt_integer_to_json() {
    let v = BoltType::Integer(neo4rs::BoltInteger { value: 42 });
    assert_eq!(bolt_to_json(v).unwrap(), json!(42));
}

#[test]
fn test_bolt_string_to_json() {
    let v = BoltType::String(neo4rs::BoltString {
        value: "hello".to_string(),
    });
    assert_eq!(bolt_to_json(v).unwrap(), json!("hello"));
}

#[test]
fn test_bolt_bool_and_null_to_json() {
    let v = BoltType::Boolean(neo4rs::BoltBoolean { value: true });
    assert_eq!(bolt_to_json(v).unwrap(), json!(true));
    let v = BoltType::Null(neo4rs::BoltNull);
    assert_eq!(bolt_to_json(v).unwrap(), Value::Null);
}

#[test]
fn test_bolt_list_to_json() {
    let v = BoltType::List(neo4rs::BoltList {
        value: vec![
            BoltType::Integer(neo4rs::BoltInteger { value: 1 }),
            BoltType::String(neo4rs::BoltString {
                value: "two".to_string(),
            }),
        ],
    });
    assert_eq!(bolt_to_json(v).unwrap(), json!([1, "two"]));
}

#[test]
fn test_bolt_bytes_to_lowercase_hex() {
    let v = BoltType::Bytes(neo4rs::BoltBytes::new(bytes::Bytes::from(vec![
        0xde, 0xad, 0x01,
    ])));
    assert_eq!(bolt_to_json(v).unwrap(), json!("dead01"));
}

#[test]
fn test_non_finite_float_is_an_error() {
    let v = BoltType::Float(neo4rs::BoltFloat::new(f64::NAN));
    assert!(matches!(
        bolt_to_json(v),
        Err(NeomapError::Mapping(_))
    ));
}

#[test]
fn test_relationship_is_not_a_property_value() {
    let rel = neo4rs::BoltUnboundedRelation::new(
        neo4rs::BoltInteger::new(1),
        neo4rs::BoltString::from("KNOWS"),
        Vec::<(neo4rs::BoltString, BoltType)>::new()
            .into_iter()
            .collect(),
    );
    let err = bolt_to_json(BoltType::UnboundedRelation(rel)).unwrap_err();
    match err {
        NeomapError::TypeMismatch { got, .. } => {
            assert_eq!(got, "UnboundedRelationship");
        }
        other => panic!("expected TypeMismatch, got: {other}"),
    }
}

#[test]
fn test_type_name_covers_common_variants() {
    assert_eq!(type_name(&BoltType::Null(neo4rs::BoltNull)), "Null");
    assert_eq!(
        type_name(&BoltType::Integer(neo4rs::BoltInteger { value: 1 })),
        "Integer"
    );
}

#[test]
fn test_json_scalars_to_bolt() {
    assert!(matches!(json_to_bolt(&json!(null)), BoltType::Null(_)));
    assert!(matches!(json_to_bolt(&json!(true)), BoltType::Boolean(_)));
    match json_to_bolt(&json!(42)) {
        BoltType::Integer(i) => assert_eq!(i.value, 42),
        other => panic!("expected Integer, got: {}", type_name(&other)),
    }
    match json_to_bolt(&json!(1.5)) {
        BoltType::Float(f) => assert_eq!(f.value, 1.5),
        other => panic!("expected Float, got: {}", type_name(&other)),
    }
    match json_to_bolt(&json!("hi")) {
        BoltType::String(s) => assert_eq!(s.value, "hi"),
        other => panic!("expected String, got: {}", type_name(&other)),
    }
}

#[test]
fn test_json_array_and_object_to_bolt() {
    match json_to_bolt(&json!([1, 2])) {
        BoltType::List(xs) => assert_eq!(xs.value.len(), 2),
        other => panic!("expected List, got: {}", type_name(&other)),
    }
    match json_to_bolt(&json!({"a": 1})) {
        BoltType::Map(m) => assert_eq!(m.value.len(), 1),
        other => panic!("expected Map, got: {}", type_name(&other)),
    }
}

#[test]
fn test_node_to_flat_extracts_the_sentinel() {
    let node = neo4rs::BoltNode::new(
        neo4rs::BoltInteger::new(1),
        vec![BoltType::from("Person")].into(),
        vec![
            (neo4rs::BoltString::from("name"), BoltType::from("Ada")),
            (
                neo4rs::BoltString::from(NULL_SENTINEL),
                BoltType::List(neo4rs::BoltList {
                    value: vec![BoltType::from("age")],
                }),
            ),
        ]
        .into_iter()
        .collect(),
    );
    let record = node_to_flat(&node).unwrap();
    assert_eq!(record.get("name"), Some(&json!("Ada")));
    assert_eq!(record.get(NULL_SENTINEL), None);
    assert!(record.is_null("age"));
}
