//! The soil fertilization knowledge base.

use std::sync::Arc;

use tracing::{Instrument, info};

use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::vectorstore::{QueryPointsRequest, QueryResponse, VectorStore};

/// Collection holding the indexed fertilization bulletin.
pub const KNOWLEDGE_COLLECTION: &str = "sb100";
/// Named dense vector inside [`KNOWLEDGE_COLLECTION`].
pub const DENSE_VECTOR_NAME: &str = "vetor_denso";
pub const RESULT_LIMIT: u64 = 4;

/// Where and how many hits each query asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalSettings {
    pub collection: String,
    pub vector_name: String,
    pub limit: u64,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            collection: KNOWLEDGE_COLLECTION.to_string(),
            vector_name: DENSE_VECTOR_NAME.to_string(),
            limit: RESULT_LIMIT,
        }
    }
}

/// Embeds a question and looks up the closest passages.
pub struct KnowledgeBase {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    settings: RetrievalSettings,
}

impl KnowledgeBase {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store, settings: RetrievalSettings::default() }
    }

    pub fn with_settings(mut self, settings: RetrievalSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &RetrievalSettings {
        &self.settings
    }

    /// Embed `query` and return the store's ranked hits unchanged.
    ///
    /// Embedding and store errors are returned as they were raised.
    pub async fn query_database(&self, query: &str) -> Result<QueryResponse> {
        let span = soil_telemetry::knowledge_query_span(&self.settings.collection, self.settings.limit);
        async {
            info!("Querying knowledge database...");
            let vector = self.embedder.embed(query).await?;
            let request = QueryPointsRequest {
                collection_name: self.settings.collection.clone(),
                vector,
                using: Some(self.settings.vector_name.clone()),
                limit: self.settings.limit,
                with_vectors: false,
                with_payload: true,
            };
            self.store.query_points(request).await
        }
        .instrument(span)
        .await
    }
}
