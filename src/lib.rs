#![doc = r#"
A typed object-graph mapping layer for Neo4j in Rust.

`neomap` maps plain Rust structs to flat Neo4j node property maps and back.
Complex (owned) fields are flattened into `parent_child` properties, `None`
values are tracked through a sentinel side list so they survive storage, and
derived entity types are matched back structurally when reading. A small
expression language projects typed field access into Cypher fragments.
Built on [`neo4rs`] 0.8.

# Quick start

## Define entities

```rust
use neomap::prelude::*;
use serde::{Serialize, Deserialize};

#[derive(Entity, Serialize, Deserialize)]
#[entity(label = "Address")]
struct Address {
    street: String,
    city: String,
}

#[derive(Entity, Serialize, Deserialize)]
#[entity(label = "Person")]
struct Person {
    name: String,
    age: Option<i64>,
    #[entity(complex)]
    home: Address,
}
```

The derive builds an [`EntityDescriptor`](prelude::EntityDescriptor) for the
struct. `#[entity(complex)]` marks a field whose own fields are flattened
into the parent record (`home_street`, `home_city`); `#[entity(extends =
Base)]` splices a base type's fields in; `#[entity(navigation)]` marks a
field stored as a foreign key rather than flattened.

## Flatten and reconstruct

```rust
# use neomap::prelude::*;
# use std::sync::Arc;
# use serde::{Serialize, Deserialize};
# #[derive(Entity, Serialize, Deserialize)]
# #[entity(label = "Address")]
# struct Address { street: String, city: String }
# #[derive(Entity, Serialize, Deserialize)]
# #[entity(label = "Person")]
# struct Person { name: String, age: Option<i64>, #[entity(complex)] home: Address }
# fn example() -> Result<(), NeomapError> {
let registry = EntityRegistry::new();
let meta = registry.metadata::<Person>()?;

let person = Person {
    name: "Ada".into(),
    age: None,
    home: Address { street: "1 Main".into(), city: "Leeds".into() },
};

let record = flatten(&person, &meta)?;
assert_eq!(record.get("home_city").unwrap(), "Leeds");
assert!(record.is_null("age"));

let back: Person = unflatten(&record, &meta)?;
assert_eq!(back.home.street, "1 Main");
# Ok(())
# }
```

## Query

```rust,no_run
use neomap::prelude::*;
use std::sync::Arc;
# use serde::{Serialize, Deserialize};
# #[derive(Entity, Serialize, Deserialize)]
# #[entity(label = "Person")]
# struct Person { name: String, age: Option<i64> }
# async fn example(graph: &neo4rs::Graph) -> Result<(), NeomapError> {
let registry = Arc::new(EntityRegistry::new());

// Exactly one entity (error if empty):
let person: Person = GraphQuery::<Person>::match_node("p", Arc::clone(&registry))
    .where_pred(Expr::field("name").eq(Expr::lit("Ada")?))
    .fetch_one(graph)
    .await?;

// All matching entities, ordered:
let people: Vec<Person> = GraphQuery::<Person>::match_node("p", Arc::clone(&registry))
    .order_by(Expr::field("name"), Direction::Asc)
    .fetch_all(graph)
    .await?;

// Streaming, one entity at a time:
let mut stream = GraphQuery::<Person>::match_node("p", Arc::clone(&registry))
    .fetch_stream(graph)
    .await?;
while let Some(result) = stream.next().await {
    let person = result?;
}

// Create:
GraphQuery::create("p", Arc::clone(&registry), &person)?
    .run(graph)
    .await?;
# Ok(())
# }
```

Predicates use assignment intent: `Expr::field("name").eq(...)` renders as
`p.name = $p0` in a `WHERE` clause. Literals bind as parameters by default;
[`ParamMode::Inline`](prelude::ParamMode) renders them as literal JSON text
instead.

## Polymorphic reads

Register derived types up front, then match records structurally:

```rust
# use neomap::prelude::*;
# use std::any::TypeId;
# use serde::{Serialize, Deserialize};
# #[derive(Entity, Serialize, Deserialize)]
# #[entity(label = "Animal")]
# struct Animal { name: String }
# #[derive(Entity, Serialize, Deserialize)]
# #[entity(label = "Animal", extends = Animal)]
# struct Dog { #[entity(skip)] name: String, breed: String }
# fn example() -> Result<(), NeomapError> {
let registry = EntityRegistry::new();
registry.register::<Animal>();
registry.register::<Dog>();

let mut record = FlatRecord::new();
record.insert("name", "Rex");
record.insert("breed", "collie");

// Most specific registered type whose fields are all present wins.
let boxed = unflatten_dynamic(&record, TypeId::of::<Animal>(), &registry)?;
let dog = boxed.downcast::<Dog>().ok().unwrap();
assert_eq!(dog.breed, "collie");
# Ok(())
# }
```

# Null tracking

A flat property map cannot distinguish "property absent" from "property was
`None`". Every stored record therefore carries a sentinel list property
([`NULL_SENTINEL`](prelude::NULL_SENTINEL)) naming the keys that were null
at write time; [`unflatten`](prelude::unflatten) restores those as `None`
and structural matching counts them as present.

# Error handling

Fallible operations return [`NeomapError`](prelude::NeomapError). Schema
shape problems (null complex values, nested complex fields, no structurally
matching type, sentinel name collisions) are distinct variants, so callers
can tell data errors from mapping-configuration errors.

[`neo4rs`]: https://docs.rs/neo4rs
"#]

pub mod prelude;
pub mod query;
pub mod stream;

pub use neomap_core as core;
pub use neomap_macros::Entity;

pub use neomap_core::descriptor::Entity as EntityTrait;
pub use neomap_core::error::NeomapError;
