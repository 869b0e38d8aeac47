//! Streaming query results with automatic entity mapping.

use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

use futures::stream::Stream;

use neomap_core::descriptor::Entity;
use neomap_core::error::NeomapError;
use neomap_core::metadata::EntityMetadata;

/// A typed stream of query results, unflattened row by row.
///
/// Created by [`GraphQuery::fetch_stream`](crate::query::GraphQuery::fetch_stream).
/// Each call to [`next()`](Self::next) pulls the next row from the database,
/// extracts the aliased node, and rebuilds `T` from its flat record.
///
/// # Example
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
/// let mut stream = GraphQuery::<Person>::match_node("p", registry)
///     .fetch_stream(graph)
///     .await?;
///
/// while let Some(result) = stream.next().await {
///     let person = result?;
///     println!("{}", person.name);
/// }
/// # Ok(())
/// # }
/// ```
pub struct EntityStream<T> {
    inner: Pin<Box<dyn Stream<Item = Result<neo4rs::Row, neo4rs::Error>> + Send>>,
    alias: String,
    meta: Arc<EntityMetadata>,
    _marker: PhantomData<T>,
}

impl<T> EntityStream<T>
where
    T: Entity + serde::de::DeserializeOwned,
{
    pub(crate) fn new(
        inner: Pin<Box<dyn Stream<Item = Result<neo4rs::Row, neo4rs::Error>> + Send>>,
        alias: String,
        meta: Arc<EntityMetadata>,
    ) -> Self {
        Self {
            inner,
            alias,
            meta,
            _marker: PhantomData,
        }
    }

    /// Pull the next row from the stream and rebuild it as `T`.
    ///
    /// Returns `None` when the stream is exhausted.
    pub async fn next(&mut self) -> Option<Result<T, NeomapError>> {
        use futures::StreamExt;
        match self.inner.next().await {
            None => None,
            Some(Err(e)) => Some(Err(NeomapError::Neo4j(e))),
            Some(Ok(row)) => Some(crate::query::row_to_entity(&row, &self.alias, &self.meta)),
        }
    }
}
