//! Qdrant vector store backend.
//!
//! Provides [`QdrantVectorStore`] over the [qdrant-client](https://docs.rs/qdrant-client)
//! gRPC API.
//!
//! ```rust,ignore
//! use soil_rag::qdrant::QdrantVectorStore;
//!
//! let store = QdrantVectorStore::new("http://localhost:6334", None)?;
//! ```

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{Query, QueryPointsBuilder, Value as QdrantValue};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{RagError, Result};
use crate::vectorstore::{QueryPointsRequest, QueryResponse, ScoredPoint, VectorStore};

pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";

/// A [`VectorStore`] backed by [Qdrant](https://qdrant.tech/).
pub struct QdrantVectorStore {
    client: Qdrant,
}

impl QdrantVectorStore {
    /// Build a client for `url`. No connection is made until the first query.
    pub fn new(url: &str, api_key: Option<String>) -> Result<Self> {
        let client = Qdrant::from_url(url).api_key(api_key).build().map_err(Self::map_err)?;
        Ok(Self { client })
    }

    pub fn from_client(client: Qdrant) -> Self {
        Self { client }
    }

    fn map_err(e: qdrant_client::QdrantError) -> RagError {
        RagError::VectorStoreError { backend: "qdrant".to_string(), message: e.to_string() }
    }
}

/// Render a Qdrant payload value as JSON.
pub(crate) fn payload_value_to_json(value: &QdrantValue) -> Value {
    match &value.kind {
        None | Some(Kind::NullValue(_)) => Value::Null,
        Some(Kind::BoolValue(b)) => Value::Bool(*b),
        Some(Kind::IntegerValue(i)) => Value::from(*i),
        Some(Kind::DoubleValue(d)) => {
            serde_json::Number::from_f64(*d).map(Value::Number).unwrap_or(Value::Null)
        }
        Some(Kind::StringValue(s)) => Value::String(s.clone()),
        Some(Kind::ListValue(list)) => {
            Value::Array(list.values.iter().map(payload_value_to_json).collect())
        }
        Some(Kind::StructValue(s)) => Value::Object(
            s.fields.iter().map(|(k, v)| (k.clone(), payload_value_to_json(v))).collect(),
        ),
    }
}

fn point_from_qdrant(point: qdrant_client::qdrant::ScoredPoint) -> ScoredPoint {
    let id = point.id.and_then(|pid| pid.point_id_options).map(|opt| match opt {
        PointIdOptions::Uuid(s) => s,
        PointIdOptions::Num(n) => n.to_string(),
    });
    let payload: Map<String, Value> =
        point.payload.iter().map(|(k, v)| (k.clone(), payload_value_to_json(v))).collect();
    ScoredPoint { id, score: point.score, version: point.version, payload }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    fn backend(&self) -> &str {
        "qdrant"
    }

    async fn query_points(&self, request: QueryPointsRequest) -> Result<QueryResponse> {
        let mut query = QueryPointsBuilder::new(request.collection_name.clone())
            .query(Query::new_nearest(request.vector))
            .limit(request.limit)
            .with_vectors(request.with_vectors)
            .with_payload(request.with_payload);
        if let Some(using) = request.using {
            query = query.using(using);
        }

        let response = self.client.query(query).await.map_err(Self::map_err)?;
        debug!(
            collection = %request.collection_name,
            hits = response.result.len(),
            "qdrant query complete"
        );

        Ok(QueryResponse { points: response.result.into_iter().map(point_from_qdrant).collect() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qdrant_client::qdrant::{ListValue, Struct};
    use serde_json::json;
    use std::collections::HashMap;

    fn v(kind: Kind) -> QdrantValue {
        QdrantValue { kind: Some(kind) }
    }

    #[test]
    fn test_payload_conversion() {
        let mut fields = HashMap::new();
        fields.insert("fonte".to_string(), v(Kind::StringValue("Boletim 100".into())));
        fields.insert("pagina".to_string(), v(Kind::IntegerValue(42)));
        let value = v(Kind::StructValue(Struct { fields }));
        assert_eq!(payload_value_to_json(&value), json!({"fonte": "Boletim 100", "pagina": 42}));

        let list = v(Kind::ListValue(ListValue {
            values: vec![v(Kind::DoubleValue(1.5)), v(Kind::BoolValue(true)), v(Kind::NullValue(0))],
        }));
        assert_eq!(payload_value_to_json(&list), json!([1.5, true, null]));
    }

    #[test]
    fn test_nan_becomes_null() {
        assert_eq!(payload_value_to_json(&v(Kind::DoubleValue(f64::NAN))), Value::Null);
    }

    #[test]
    fn test_point_conversion() {
        let mut payload = HashMap::new();
        payload.insert("text".to_string(), v(Kind::StringValue("Aplicar calcário".into())));
        let point = qdrant_client::qdrant::ScoredPoint {
            id: Some(7u64.into()),
            payload,
            score: 0.83,
            version: 3,
            ..Default::default()
        };
        let converted = point_from_qdrant(point);
        assert_eq!(converted.id.as_deref(), Some("7"));
        assert_eq!(converted.version, 3);
        assert_eq!(converted.payload["text"], "Aplicar calcário");
    }
}
