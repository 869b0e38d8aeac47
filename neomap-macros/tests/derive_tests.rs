use serde::{Deserialize, Serialize};

use neomap_core::descriptor::{Entity as EntityTrait, FieldKind};
use neomap_core::registry::EntityRegistry;
use neomap_macros::Entity;

#[derive(Debug, Entity, Serialize, Deserialize)]
#[entity(label = "Address")]
#[allow(dead_code)]
struct Address {
    street: String,
    city: String,
}

#[derive(Debug, Entity, Serialize, Deserialize)]
#[entity(label = "Address", extends = Address)]
#[allow(dead_code)]
struct GeoAddress {
    // Inherited fields stay on the struct for serde but are declared once,
    // on the base descriptor.
    #[entity(skip)]
    street: String,
    #[entity(skip)]
    city: String,
    lat: f64,
}

#[derive(Debug, Entity, Serialize, Deserialize)]
#[entity(label = "Person")]
#[allow(dead_code)]
struct Person {
    name: String,
    #[entity(rename = "years")]
    age: i64,
    #[entity(complex)]
    home: Address,
    employer_id: i64,
    #[entity(navigation, foreign_key = "employer_id")]
    employer: Option<String>,
    #[entity(skip)]
    cached: bool,
}

#[derive(Debug, Entity, Serialize, Deserialize)]
#[allow(dead_code)]
struct Widget {
    id: i64,
}

#[test]
fn test_label_attribute() {
    assert_eq!(Person::LABEL, "Person");
    assert_eq!(GeoAddress::LABEL, "Address");
}

#[test]
fn test_label_defaults_to_type_name() {
    assert_eq!(Widget::LABEL, "Widget");
}

#[test]
fn test_descriptor_fields() {
    let descriptor = Person::descriptor();
    assert_eq!(descriptor.type_name, "Person");
    assert_eq!(descriptor.label, "Person");

    let names: Vec<&str> = descriptor.fields.iter().map(|f| f.name).collect();
    // skip drops the field entirely.
    assert_eq!(names, vec!["name", "age", "home", "employer_id", "employer"]);

    let age = &descriptor.fields[1];
    assert_eq!(age.serialized, "years");
    assert!(matches!(age.kind, FieldKind::Scalar));

    let home = &descriptor.fields[2];
    assert!(home.kind.is_complex());

    let employer = &descriptor.fields[4];
    assert!(employer.kind.is_navigation());
    assert_eq!(employer.foreign_key, Some("employer_id"));
}

#[test]
fn test_extends_builds_the_lineage() {
    let descriptor = GeoAddress::descriptor();
    assert_eq!(descriptor.depth(), 1);
    let lineage = descriptor.lineage();
    assert_eq!(lineage[0].type_name, "Address");
    assert_eq!(lineage[1].type_name, "GeoAddress");
}

#[test]
fn test_derived_descriptor_resolves_through_the_registry() {
    let registry = EntityRegistry::new();
    let meta = registry.metadata::<Person>().unwrap();

    assert!(meta.match_names.contains("years"));
    assert!(meta.match_names.contains("home_street"));
    assert!(meta.match_names.contains("home_city"));
    // Navigation fields never reach the flat record.
    assert!(!meta.match_names.contains("employer"));

    let fk = meta
        .leaves()
        .find(|f| f.flat_name == "employer_id")
        .expect("foreign key scalar resolved");
    assert_eq!(fk.foreign_key_for, Some("employer"));

    // Registering Person pulled its complex field type in too.
    assert!(registry.contains::<Address>());
}
