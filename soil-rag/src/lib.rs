//! # soil-rag
//!
//! Retrieval from the soil fertilization knowledge base.
//!
//! A question is embedded by an [`EmbeddingProvider`], the nearest passages are
//! fetched from a [`VectorStore`], and the ranked hits are handed back to the
//! model untouched. [`KnowledgeBaseTool`] exposes this as the `query_database`
//! tool.
//!
//! | Feature  | What it enables                                  |
//! |----------|--------------------------------------------------|
//! | `openai` | `OpenAIEmbeddingProvider` via reqwest (default)   |
//! | `qdrant` | `QdrantVectorStore` via qdrant-client (default)   |

pub mod embedding;
pub mod error;
pub mod knowledge_base;
pub mod tool;
pub mod vectorstore;

#[cfg(feature = "openai")]
pub mod openai;
#[cfg(feature = "qdrant")]
pub mod qdrant;

pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use knowledge_base::{
    DENSE_VECTOR_NAME, KNOWLEDGE_COLLECTION, KnowledgeBase, RESULT_LIMIT, RetrievalSettings,
};
pub use tool::{KnowledgeBaseTool, QUERY_DATABASE_TOOL};
pub use vectorstore::{QueryPointsRequest, QueryResponse, ScoredPoint, VectorStore};

#[cfg(feature = "openai")]
pub use openai::OpenAIEmbeddingProvider;
#[cfg(feature = "qdrant")]
pub use qdrant::QdrantVectorStore;
