use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use neomap::prelude::*;

#[derive(Debug, Entity, Serialize, Deserialize)]
#[entity(label = "Address")]
#[allow(dead_code)]
struct Address {
    street: String,
    city: String,
}

#[derive(Debug, Entity, Serialize, Deserialize)]
#[entity(label = "Person")]
#[allow(dead_code)]
struct Person {
    name: String,
    age: Option<i64>,
    #[entity(complex)]
    home: Address,
}

fn registry() -> Arc<EntityRegistry> {
    Arc::new(EntityRegistry::new())
}

fn ada() -> Person {
    Person {
        name: "Ada".into(),
        age: None,
        home: Address {
            street: "1 Main".into(),
            city: "Leeds".into(),
        },
    }
}

#[test]
fn test_match_with_predicate() {
    let built = GraphQuery::<Person>::match_node("p", registry())
        .where_pred(Expr::field("name").eq(Expr::lit("Ada").unwrap()))
        .build()
        .unwrap();
    assert_eq!(built.cypher, "MATCH (p:Person) WHERE p.name = $p0 RETURN p");
    assert_eq!(built.params.get("p0"), Some(&json!("Ada")));
}

#[test]
fn test_inline_mode_renders_literals_in_place() {
    let built = GraphQuery::<Person>::match_node("p", registry())
        .param_mode(ParamMode::Inline)
        .where_pred(Expr::field("name").eq(Expr::lit("Ada").unwrap()))
        .build()
        .unwrap();
    assert_eq!(
        built.cypher,
        "MATCH (p:Person) WHERE p.name = \"Ada\" RETURN p"
    );
    assert!(built.params.is_empty());
}

#[test]
fn test_predicate_reaches_complex_leaves() {
    let built = GraphQuery::<Person>::match_node("p", registry())
        .where_pred(Expr::field("home").get("city").eq(Expr::lit("Leeds").unwrap()))
        .build()
        .unwrap();
    assert!(built.cypher.contains("WHERE p.home_city = $p0"));
}

#[test]
fn test_create_sets_flattened_properties_and_sentinel() {
    let built = GraphQuery::create("p", registry(), &ada())
        .unwrap()
        .build()
        .unwrap();

    assert!(built.cypher.starts_with("CREATE (p:Person) SET "));
    assert!(built.cypher.contains("p.name = $p"));
    assert!(built.cypher.contains("p.home_street = $p"));
    assert!(built.cypher.contains(&format!("p.{NULL_SENTINEL} = $p")));
    assert!(built.cypher.ends_with(" RETURN p"));

    // age was None: it rides in the sentinel list, not as a property.
    assert!(!built.cypher.contains("p.age"));
    assert!(built.params.values().any(|v| v == &json!(["age"])));
    assert!(built.params.values().any(|v| v == &json!("Leeds")));
}

#[test]
fn test_merge_matches_on_key_then_sets_everything() {
    let built = GraphQuery::merge(
        "p",
        registry(),
        &ada(),
        Expr::field("name").eq(Expr::lit("Ada").unwrap()),
    )
    .unwrap()
    .build()
    .unwrap();

    assert!(built.cypher.starts_with("MERGE (p:Person {name: $p0}) SET "));
    assert_eq!(built.params.get("p0"), Some(&json!("Ada")));
    assert!(built.cypher.contains("p.home_street = $p"));
    assert!(built.cypher.contains(&format!("p.{NULL_SENTINEL} = $p")));
}

#[test]
fn test_set_entity_after_match() {
    let built = GraphQuery::<Person>::match_node("p", registry())
        .where_pred(Expr::field("name").eq(Expr::lit("Ada").unwrap()))
        .set_entity(&ada())
        .unwrap()
        .build()
        .unwrap();
    let where_at = built.cypher.find(" WHERE ").unwrap();
    let set_at = built.cypher.find(" SET ").unwrap();
    assert!(where_at < set_at);
    assert!(built.cypher.contains("p.home_city = $p"));
}

#[test]
fn test_returning_projection() {
    let built = GraphQuery::<Person>::match_node("p", registry())
        .returning(Expr::record([
            ("who", Expr::field("name")),
            ("total", Expr::call("count", [Expr::var("p")])),
        ]))
        .build()
        .unwrap();
    assert!(built
        .cypher
        .ends_with("RETURN p.name AS name, count(p) AS total"));
}

#[test]
fn test_with_order_and_limit() {
    let built = GraphQuery::<Person>::match_node("p", registry())
        .with(&["q"])
        .order_by(Expr::field("name"), Direction::Asc)
        .order_by(Expr::field("home").get("city"), Direction::Desc)
        .limit(10)
        .build()
        .unwrap();
    assert_eq!(
        built.cypher,
        "MATCH (p:Person) WITH p, q RETURN p ORDER BY p.name ASC, p.home_city DESC LIMIT 10"
    );
}

#[test]
fn test_placeholders_span_clauses() {
    let built = GraphQuery::<Person>::match_node("p", registry())
        .where_pred(Expr::all([
            Expr::field("name").eq(Expr::lit("Ada").unwrap()),
            Expr::field("home").get("city").eq(Expr::lit("Leeds").unwrap()),
        ]))
        .set_entity(&ada())
        .unwrap()
        .build()
        .unwrap();
    // One counter across WHERE and SET: no placeholder is reused.
    assert_eq!(built.params.get("p0"), Some(&json!("Ada")));
    assert_eq!(built.params.get("p1"), Some(&json!("Leeds")));
    // SET re-binds every property plus the sentinel after the two WHERE
    // parameters: p2..p5.
    assert_eq!(built.params.len(), 6);
    assert!(built.params.contains_key("p5"));
}
