//! Vector store abstraction for nearest-neighbour queries.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// A nearest-neighbour query against one collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPointsRequest {
    pub collection_name: String,
    pub vector: Vec<f32>,
    /// Named vector to search, for collections with more than one.
    pub using: Option<String>,
    pub limit: u64,
    pub with_vectors: bool,
    pub with_payload: bool,
}

/// One hit, as ranked by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPoint {
    pub id: Option<String>,
    pub score: f32,
    pub version: u64,
    pub payload: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub points: Vec<ScoredPoint>,
}

/// A storage backend able to answer nearest-neighbour queries.
///
/// Results are returned in the order the backend ranked them.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Backend label used in errors and logs.
    fn backend(&self) -> &str;

    async fn query_points(&self, request: QueryPointsRequest) -> Result<QueryResponse>;
}
