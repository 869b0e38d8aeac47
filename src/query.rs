//! Typed query building and execution.
//!
//! [`GraphQuery`] combines the entity registry, the projection engine, and
//! the fragment writer into a small fluent builder over one matched node,
//! then executes through [`neo4rs`] with typed fetch helpers.

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;

use neo4rs::{BoltType, Graph, Txn};
use serde_json::Value;
use tracing::debug;

use neomap_core::descriptor::Entity;
use neomap_core::error::NeomapError;
use neomap_core::expr::Expr;
use neomap_core::flatten::{self, FlatRecord};
use neomap_core::fragment::{Direction, FragmentWriter, ParamMode};
use neomap_core::metadata::NULL_SENTINEL;
use neomap_core::projection::{self, Pair, PairValue, Pairs};
use neomap_core::registry::EntityRegistry;
use neomap_core::value::{json_to_bolt, node_to_flat};

use crate::stream::EntityStream;

enum QueryKind {
    Match,
    Create(FlatRecord),
    Merge { key: Expr, record: FlatRecord },
}

/// A fluent, typed query over one matched (or created) node of entity `T`.
///
/// # Examples
///
/// ```rust,no_run
/// # use std::sync::Arc;
/// # use neomap::prelude::*;
/// # use serde::{Serialize, Deserialize};
/// # #[derive(Entity, Serialize, Deserialize)]
/// # #[entity(label = "Person")]
/// # struct Person { name: String }
/// # async fn example(graph: &neo4rs::Graph) -> Result<(), NeomapError> {
/// let registry = Arc::new(EntityRegistry::new());
/// let person: Person = GraphQuery::<Person>::match_node("p", Arc::clone(&registry))
///     .where_pred(Expr::field("name").eq(Expr::lit("Ada")?))
///     .fetch_one(graph)
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct GraphQuery<T> {
    registry: Arc<EntityRegistry>,
    alias: String,
    kind: QueryKind,
    mode: ParamMode,
    where_pred: Option<Expr>,
    set_record: Option<FlatRecord>,
    returning: Option<Expr>,
    with_items: Option<Vec<String>>,
    order: Vec<(Expr, Direction)>,
    limit: Option<u64>,
    _marker: PhantomData<T>,
}

impl<T> GraphQuery<T>
where
    T: Entity + serde::Serialize + serde::de::DeserializeOwned + Send,
{
    /// Start a `MATCH (alias:Label)` query.
    pub fn match_node(alias: impl Into<String>, registry: Arc<EntityRegistry>) -> Self {
        registry.register::<T>();
        GraphQuery {
            registry,
            alias: alias.into(),
            kind: QueryKind::Match,
            mode: ParamMode::Parameterized,
            where_pred: None,
            set_record: None,
            returning: None,
            with_items: None,
            order: Vec::new(),
            limit: None,
            _marker: PhantomData,
        }
    }

    /// Start a `CREATE (alias:Label) SET ...` query from a flattened entity.
    pub fn create(
        alias: impl Into<String>,
        registry: Arc<EntityRegistry>,
        entity: &T,
    ) -> Result<Self, NeomapError> {
        let meta = registry.metadata::<T>()?;
        let record = flatten::flatten(entity, &meta)?;
        let mut query = Self::match_node(alias, registry);
        query.kind = QueryKind::Create(record);
        Ok(query)
    }

    /// Start a `MERGE (alias:Label {key: ...}) SET ...` upsert: match or
    /// create on `key` (an assignment-style predicate over the entity's
    /// fields), then write every flattened property.
    pub fn merge(
        alias: impl Into<String>,
        registry: Arc<EntityRegistry>,
        entity: &T,
        key: Expr,
    ) -> Result<Self, NeomapError> {
        let meta = registry.metadata::<T>()?;
        let record = flatten::flatten(entity, &meta)?;
        let mut query = Self::match_node(alias, registry);
        query.kind = QueryKind::Merge { key, record };
        Ok(query)
    }

    /// Switch literal rendering between bound parameters (default) and
    /// inline JSON text.
    pub fn param_mode(mut self, mode: ParamMode) -> Self {
        self.mode = mode;
        self
    }

    /// Filter with an assignment-style predicate expression.
    pub fn where_pred(mut self, pred: Expr) -> Self {
        self.where_pred = Some(pred);
        self
    }

    /// `SET` the matched node's properties from a flattened entity.
    pub fn set_entity(mut self, entity: &T) -> Result<Self, NeomapError> {
        let meta = self.registry.metadata::<T>()?;
        self.set_record = Some(flatten::flatten(entity, &meta)?);
        Ok(self)
    }

    /// Project the output shape instead of returning the whole node.
    pub fn returning(mut self, projection: Expr) -> Self {
        self.returning = Some(projection);
        self
    }

    /// Carry additional aliases through a `WITH` clause.
    pub fn with(mut self, items: &[&str]) -> Self {
        self.with_items = Some(items.iter().map(|s| (*s).to_owned()).collect());
        self
    }

    /// Order by an entity field.
    pub fn order_by(mut self, key: Expr, direction: Direction) -> Self {
        self.order.push((key, direction));
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Assemble the Cypher text and parameter map.
    pub fn build(self) -> Result<BuiltQuery, NeomapError> {
        let meta = self.registry.metadata::<T>()?;
        let mut writer = FragmentWriter::new(self.alias.clone(), self.mode);
        let mut text = String::new();
        let mut params = BTreeMap::new();

        match &self.kind {
            QueryKind::Match => {
                text.push_str(&format!("MATCH ({}:{})", self.alias, meta.label));
            }
            QueryKind::Create(record) => {
                text.push_str(&format!("CREATE ({}:{})", self.alias, meta.label));
                let frag = writer.set_fragment(&record_pairs(record));
                text.push_str(&format!(" SET {}", frag.text));
                params.extend(frag.params);
            }
            QueryKind::Merge { key, record } => {
                let key_pairs = projection::predicate(key, &meta)?;
                let key_frag = writer.map_fragment(&key_pairs);
                text.push_str(&format!(
                    "MERGE ({}:{} {{{}}})",
                    self.alias, meta.label, key_frag.text
                ));
                params.extend(key_frag.params);
                let frag = writer.set_fragment(&record_pairs(record));
                text.push_str(&format!(" SET {}", frag.text));
                params.extend(frag.params);
            }
        }

        if let Some(pred) = &self.where_pred {
            let pairs = projection::predicate(pred, &meta)?;
            let frag = writer.where_fragment(&pairs);
            text.push_str(&format!(" WHERE {}", frag.text));
            params.extend(frag.params);
        }

        if let Some(record) = &self.set_record {
            let frag = writer.set_fragment(&record_pairs(record));
            text.push_str(&format!(" SET {}", frag.text));
            params.extend(frag.params);
        }

        if let Some(items) = &self.with_items {
            let mut all = vec![self.alias.clone()];
            all.extend(items.iter().cloned());
            text.push_str(&format!(" WITH {}", all.join(", ")));
        }

        match &self.returning {
            Some(projection) => {
                let pairs = projection::project(projection, &FlatRecord::new(), &meta)?;
                let frag = writer.return_fragment(&pairs);
                text.push_str(&format!(" RETURN {}", frag.text));
            }
            None => text.push_str(&format!(" RETURN {}", self.alias)),
        }

        if !self.order.is_empty() {
            let mut keys = Vec::with_capacity(self.order.len());
            for (expr, direction) in &self.order {
                keys.push((projection::resolve_name(expr, &meta)?, *direction));
            }
            let frag = writer.order_fragment(&keys);
            text.push_str(&format!(" ORDER BY {}", frag.text));
        }

        if let Some(n) = self.limit {
            text.push_str(&format!(" LIMIT {n}"));
        }

        debug!(cypher = %text, "built query");
        Ok(BuiltQuery {
            cypher: text,
            params,
            alias: self.alias,
        })
    }

    /// Build and return exactly one entity (error if the result is empty).
    pub async fn fetch_one(self, graph: &Graph) -> Result<T, NeomapError> {
        let registry = Arc::clone(&self.registry);
        self.build()?.fetch_one_with(graph, &registry).await
    }

    /// Build and return zero or one entity.
    pub async fn fetch_optional(self, graph: &Graph) -> Result<Option<T>, NeomapError> {
        let registry = Arc::clone(&self.registry);
        self.build()?.fetch_optional_with(graph, &registry).await
    }

    /// Build and collect all matching entities.
    pub async fn fetch_all(self, graph: &Graph) -> Result<Vec<T>, NeomapError> {
        let registry = Arc::clone(&self.registry);
        self.build()?.fetch_all_with(graph, &registry).await
    }

    /// Build and stream entities one at a time.
    pub async fn fetch_stream(self, graph: &Graph) -> Result<EntityStream<T>, NeomapError> {
        let registry = Arc::clone(&self.registry);
        self.build()?.fetch_stream_with(graph, &registry).await
    }

    /// Build and run inside an existing transaction, returning exactly one
    /// entity.
    pub async fn fetch_one_in(self, txn: &mut Txn) -> Result<T, NeomapError> {
        let registry = Arc::clone(&self.registry);
        self.build()?.fetch_one_in_with(txn, &registry).await
    }

    /// Build and run inside an existing transaction, returning zero or one
    /// entity.
    pub async fn fetch_optional_in(self, txn: &mut Txn) -> Result<Option<T>, NeomapError> {
        let registry = Arc::clone(&self.registry);
        self.build()?.fetch_optional_in_with(txn, &registry).await
    }

    /// Build and run inside an existing transaction, collecting all rows.
    pub async fn fetch_all_in(self, txn: &mut Txn) -> Result<Vec<T>, NeomapError> {
        let registry = Arc::clone(&self.registry);
        self.build()?.fetch_all_in_with(txn, &registry).await
    }

    /// Build and execute for side effects only (CREATE/SET without reads).
    pub async fn run(self, graph: &Graph) -> Result<(), NeomapError> {
        let built = self.build()?;
        graph.run(built.to_query()).await?;
        Ok(())
    }
}

/// Literal pairs for a whole flat record, sentinel included, in key order.
fn record_pairs(record: &FlatRecord) -> Pairs {
    let mut pairs: Vec<Pair> = record
        .values
        .iter()
        .map(|(k, v)| Pair {
            name: k.clone(),
            value: PairValue::Literal(v.clone()),
        })
        .collect();
    let nulls: Vec<Value> = record
        .null_keys
        .iter()
        .map(|k| Value::String(k.clone()))
        .collect();
    pairs.push(Pair {
        name: NULL_SENTINEL.to_owned(),
        value: PairValue::Literal(Value::Array(nulls)),
    });
    Pairs {
        pairs,
        references: Vec::new(),
    }
}

/// An assembled query: Cypher text plus its parameter map.
pub struct BuiltQuery {
    pub cypher: String,
    pub params: BTreeMap<String, Value>,
    alias: String,
}

impl BuiltQuery {
    /// Bind the parameter map into a [`neo4rs::Query`].
    pub fn to_query(&self) -> neo4rs::Query {
        let mut query = neo4rs::query(&self.cypher);
        for (key, value) in &self.params {
            query = query.param(key, json_to_bolt(value));
        }
        query
    }

    async fn fetch_one_with<T>(
        &self,
        graph: &Graph,
        registry: &EntityRegistry,
    ) -> Result<T, NeomapError>
    where
        T: Entity + serde::de::DeserializeOwned,
    {
        let meta = registry.metadata::<T>()?;
        let mut stream = graph.execute(self.to_query()).await?;
        let row = stream
            .next()
            .await?
            .ok_or_else(|| NeomapError::missing_field("row", "fetch_one"))?;
        row_to_entity(&row, &self.alias, &meta)
    }

    async fn fetch_optional_with<T>(
        &self,
        graph: &Graph,
        registry: &EntityRegistry,
    ) -> Result<Option<T>, NeomapError>
    where
        T: Entity + serde::de::DeserializeOwned,
    {
        let meta = registry.metadata::<T>()?;
        let mut stream = graph.execute(self.to_query()).await?;
        match stream.next().await? {
            Some(row) => Ok(Some(row_to_entity(&row, &self.alias, &meta)?)),
            None => Ok(None),
        }
    }

    async fn fetch_all_with<T>(
        &self,
        graph: &Graph,
        registry: &EntityRegistry,
    ) -> Result<Vec<T>, NeomapError>
    where
        T: Entity + serde::de::DeserializeOwned,
    {
        let meta = registry.metadata::<T>()?;
        let mut stream = graph.execute(self.to_query()).await?;
        let mut out = Vec::new();
        while let Some(row) = stream.next().await? {
            out.push(row_to_entity(&row, &self.alias, &meta)?);
        }
        Ok(out)
    }

    async fn fetch_one_in_with<T>(
        &self,
        txn: &mut Txn,
        registry: &EntityRegistry,
    ) -> Result<T, NeomapError>
    where
        T: Entity + serde::de::DeserializeOwned,
    {
        let meta = registry.metadata::<T>()?;
        let mut stream = txn.execute(self.to_query()).await?;
        let row = stream
            .next(txn.handle())
            .await?
            .ok_or_else(|| NeomapError::missing_field("row", "fetch_one_in"))?;
        row_to_entity(&row, &self.alias, &meta)
    }

    async fn fetch_optional_in_with<T>(
        &self,
        txn: &mut Txn,
        registry: &EntityRegistry,
    ) -> Result<Option<T>, NeomapError>
    where
        T: Entity + serde::de::DeserializeOwned,
    {
        let meta = registry.metadata::<T>()?;
        let mut stream = txn.execute(self.to_query()).await?;
        match stream.next(txn.handle()).await? {
            Some(row) => Ok(Some(row_to_entity(&row, &self.alias, &meta)?)),
            None => Ok(None),
        }
    }

    async fn fetch_all_in_with<T>(
        &self,
        txn: &mut Txn,
        registry: &EntityRegistry,
    ) -> Result<Vec<T>, NeomapError>
    where
        T: Entity + serde::de::DeserializeOwned,
    {
        let meta = registry.metadata::<T>()?;
        let mut stream = txn.execute(self.to_query()).await?;
        let mut out = Vec::new();
        while let Some(row) = stream.next(txn.handle()).await? {
            out.push(row_to_entity(&row, &self.alias, &meta)?);
        }
        Ok(out)
    }

    async fn fetch_stream_with<T>(
        &self,
        graph: &Graph,
        registry: &EntityRegistry,
    ) -> Result<EntityStream<T>, NeomapError>
    where
        T: Entity + serde::de::DeserializeOwned + Send,
    {
        use futures::TryStreamExt;
        let meta = registry.metadata::<T>()?;
        let detached = graph.execute(self.to_query()).await?;
        let stream = detached.into_stream().into_stream();
        Ok(EntityStream::new(Box::pin(stream), self.alias.clone(), meta))
    }
}

/// Extract the aliased node from a row and unflatten it into `T`.
pub fn row_to_entity<T>(
    row: &neo4rs::Row,
    alias: &str,
    meta: &neomap_core::metadata::EntityMetadata,
) -> Result<T, NeomapError>
where
    T: Entity + serde::de::DeserializeOwned,
{
    let value: BoltType = row
        .get(alias)
        .map_err(|_| NeomapError::missing_field(alias, T::LABEL))?;
    let node = match value {
        BoltType::Node(node) => node,
        other => {
            return Err(NeomapError::type_mismatch(
                "Node",
                neomap_core::value::type_name(&other),
                T::LABEL,
            ));
        }
    };
    let record = node_to_flat(&node)?;
    flatten::unflatten(&record, meta)
        .map_err(|e| e.with_context(format!("{}::{}", T::LABEL, alias)))
}
