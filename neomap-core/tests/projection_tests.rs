use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use neomap_core::descriptor::{Entity, EntityDescriptor, FieldDescriptor};
use neomap_core::error::NeomapError;
use neomap_core::expr::Expr;
use neomap_core::flatten::FlatRecord;
use neomap_core::metadata::EntityMetadata;
use neomap_core::projection::{predicate, project, resolve_name, PairValue};
use neomap_core::registry::EntityRegistry;

#[derive(Debug, Serialize, Deserialize)]
struct Address {
    street: String,
    city: String,
    postcode: Option<String>,
}

impl Entity for Address {
    const LABEL: &'static str = "Address";
    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::new::<Address>(
            "Address",
            "Address",
            vec![
                FieldDescriptor::scalar("street"),
                FieldDescriptor::scalar("city"),
                FieldDescriptor::scalar("postcode"),
            ],
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct GeoAddress {
    street: String,
    city: String,
    postcode: Option<String>,
    lat: f64,
}

impl Entity for GeoAddress {
    const LABEL: &'static str = "Address";
    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::new::<GeoAddress>(
            "GeoAddress",
            "Address",
            vec![FieldDescriptor::scalar("lat")],
        )
        .extending(<Address as Entity>::descriptor)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Person {
    name: String,
    nickname: Option<String>,
    home: Address,
}

impl Entity for Person {
    const LABEL: &'static str = "Person";
    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::new::<Person>(
            "Person",
            "Person",
            vec![
                FieldDescriptor::scalar("name"),
                FieldDescriptor::scalar("nickname").renamed("alias"),
                FieldDescriptor::complex("home", <Address as Entity>::descriptor),
            ],
        )
    }
}

fn person_meta() -> Arc<EntityMetadata> {
    EntityRegistry::new().metadata::<Person>().unwrap()
}

fn person_meta_with_geo() -> Arc<EntityMetadata> {
    let registry = EntityRegistry::new();
    registry.register::<GeoAddress>();
    registry.metadata::<Person>().unwrap()
}

fn ada_record() -> FlatRecord {
    let mut record = FlatRecord::new();
    record.insert("name", "Ada");
    record.insert("alias", "Lady A");
    record.insert("home_street", "1 Main");
    record.insert("home_city", "Leeds");
    record.null_keys.push("home_postcode".to_owned());
    record
}

#[test]
fn test_record_member_names_auto_resolve() {
    let meta = person_meta();
    let expr = Expr::record([
        // Declared names are ignored for entity-parameter access; the
        // resolved flat name wins.
        ("who", Expr::field("name")),
        ("called", Expr::field("nickname")),
    ]);
    let pairs = project(&expr, &ada_record(), &meta).unwrap();
    assert_eq!(pairs.pairs.len(), 2);
    assert_eq!(pairs.pairs[0].name, "name");
    assert_eq!(pairs.pairs[0].value, PairValue::Literal(json!("Ada")));
    assert_eq!(pairs.pairs[1].name, "alias");
    assert_eq!(pairs.pairs[1].value, PairValue::Literal(json!("Lady A")));
}

#[test]
fn test_complex_member_expands_to_leaves() {
    let meta = person_meta();
    let pairs = project(&Expr::field("home"), &ada_record(), &meta).unwrap();
    let names: Vec<&str> = pairs.pairs.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["home_street", "home_city", "home_postcode"]);
    // Absent leaves project as null, not as an error.
    assert_eq!(pairs.pairs[2].value, PairValue::Literal(json!(null)));
}

#[test]
fn test_derived_leaves_expand_only_when_present() {
    let meta = person_meta_with_geo();

    let pairs = project(&Expr::field("home"), &ada_record(), &meta).unwrap();
    assert!(pairs.pairs.iter().all(|p| p.name != "home_lat"));

    let mut geo = ada_record();
    geo.insert("home_lat", 53.9);
    let pairs = project(&Expr::field("home"), &geo, &meta).unwrap();
    let lat = pairs.pairs.iter().find(|p| p.name == "home_lat").unwrap();
    assert_eq!(lat.value, PairValue::Literal(json!(53.9)));
}

#[test]
fn test_nested_leaf_access() {
    let meta = person_meta();
    let expr = Expr::record([("city", Expr::field("home").get("city"))]);
    let pairs = project(&expr, &ada_record(), &meta).unwrap();
    assert_eq!(pairs.pairs.len(), 1);
    assert_eq!(pairs.pairs[0].name, "home_city");
    assert_eq!(pairs.pairs[0].value, PairValue::Literal(json!("Leeds")));
}

#[test]
fn test_var_member_is_a_bare_reference() {
    let meta = person_meta();
    let expr = Expr::record([("total", Expr::var("other").get("score"))]);
    let pairs = project(&expr, &ada_record(), &meta).unwrap();
    assert_eq!(pairs.pairs[0].name, "total");
    assert_eq!(
        pairs.pairs[0].value,
        PairValue::Reference("other.score".to_owned())
    );
    assert_eq!(pairs.references, vec!["other.score".to_owned()]);
}

#[test]
fn test_raw_member_bypasses_renaming() {
    let meta = person_meta();
    // "nickname" is renamed to "alias" in metadata; the raw marker keeps
    // the literal member name.
    let expr = Expr::record([("x", Expr::field("nickname").raw())]);
    let pairs = project(&expr, &ada_record(), &meta).unwrap();
    assert_eq!(pairs.pairs[0].name, "nickname");
    assert_eq!(pairs.pairs[0].value, PairValue::Literal(json!(null)));
}

#[test]
fn test_call_member_renders_textually() {
    let meta = person_meta();
    let expr = Expr::record([(
        "nick",
        Expr::call("coalesce", [Expr::field("nickname"), Expr::lit("n/a").unwrap()]),
    )]);
    let pairs = project(&expr, &ada_record(), &meta).unwrap();
    assert_eq!(pairs.pairs[0].name, "nick");
    assert_eq!(
        pairs.pairs[0].value,
        PairValue::Reference("coalesce(alias, \"n/a\")".to_owned())
    );
}

#[test]
fn test_reference_member_requires_a_declared_name() {
    let meta = person_meta();
    let expr = Expr::record([("", Expr::var("other"))]);
    let err = project(&expr, &ada_record(), &meta).unwrap_err();
    assert!(matches!(err, NeomapError::ExpressionShape(_)));
}

#[test]
fn test_unsupported_projection_shape_is_an_error() {
    let meta = person_meta();
    let err = project(&Expr::lit(1).unwrap(), &ada_record(), &meta).unwrap_err();
    assert!(matches!(err, NeomapError::ExpressionShape(_)));
}

#[test]
fn test_unknown_field_is_an_error() {
    let meta = person_meta();
    let err = project(&Expr::field("missing"), &ada_record(), &meta).unwrap_err();
    assert!(matches!(err, NeomapError::MissingField { .. }));
}

#[test]
fn test_predicate_single_assignment() {
    let meta = person_meta();
    let expr = Expr::field("name").eq(Expr::lit("Ada").unwrap());
    let pairs = predicate(&expr, &meta).unwrap();
    assert_eq!(pairs.pairs.len(), 1);
    assert_eq!(pairs.pairs[0].name, "name");
    assert_eq!(pairs.pairs[0].value, PairValue::Literal(json!("Ada")));
}

#[test]
fn test_predicate_targets_the_flat_leaf_name() {
    let meta = person_meta();
    let expr = Expr::field("home")
        .get("city")
        .eq(Expr::lit("Leeds").unwrap());
    let pairs = predicate(&expr, &meta).unwrap();
    assert_eq!(pairs.pairs[0].name, "home_city");
}

#[test]
fn test_predicate_conjunction_preserves_order() {
    let meta = person_meta();
    let expr = Expr::all([
        Expr::field("name").eq(Expr::lit("Ada").unwrap()),
        Expr::field("home").get("city").eq(Expr::lit("Leeds").unwrap()),
    ]);
    let pairs = predicate(&expr, &meta).unwrap();
    let names: Vec<&str> = pairs.pairs.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["name", "home_city"]);
}

#[test]
fn test_predicate_reference_right_side() {
    let meta = person_meta();
    let expr = Expr::field("name").eq(Expr::var("other").get("name"));
    let pairs = predicate(&expr, &meta).unwrap();
    assert_eq!(
        pairs.pairs[0].value,
        PairValue::Reference("other.name".to_owned())
    );
}

#[test]
fn test_assigning_a_whole_complex_field_is_ambiguous() {
    let meta = person_meta();
    let expr = Expr::field("home").eq(Expr::lit(1).unwrap());
    let err = predicate(&expr, &meta).unwrap_err();
    assert!(matches!(err, NeomapError::ExpressionShape(_)));
}

#[test]
fn test_predicate_rejects_non_assignments() {
    let meta = person_meta();
    let err = predicate(&Expr::field("name"), &meta).unwrap_err();
    assert!(matches!(err, NeomapError::ExpressionShape(_)));

    let expr = Expr::all([Expr::field("name").eq(Expr::lit("A").unwrap()), Expr::var("x")]);
    let err = predicate(&expr, &meta).unwrap_err();
    assert!(matches!(err, NeomapError::ExpressionShape(_)));
}

#[test]
fn test_resolve_name_for_order_keys() {
    let meta = person_meta();
    assert_eq!(resolve_name(&Expr::field("name"), &meta).unwrap(), "name");
    assert_eq!(
        resolve_name(&Expr::field("home").get("street"), &meta).unwrap(),
        "home_street"
    );
    // The raw marker resolves without consulting metadata at all.
    assert_eq!(
        resolve_name(&Expr::field("custom").raw(), &meta).unwrap(),
        "custom"
    );
}
