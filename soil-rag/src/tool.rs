//! The `query_database` tool.

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use soil_core::{SoilError, Tool, ToolContext};
use tracing::error;

use crate::knowledge_base::KnowledgeBase;

pub const QUERY_DATABASE_TOOL: &str = "query_database";

#[derive(Debug, Deserialize, JsonSchema)]
struct QueryDatabaseArgs {
    /// Question or keywords to look up in the soil fertilization knowledge base
    query: String,
}

/// Exposes [`KnowledgeBase::query_database`] to the model.
///
/// Failures keep the underlying [`RagError`](crate::RagError) as the error
/// source, so callers can recover it with [`SoilError::tool_source`].
pub struct KnowledgeBaseTool {
    knowledge_base: Arc<KnowledgeBase>,
    schema: Value,
}

impl KnowledgeBaseTool {
    pub fn new(knowledge_base: Arc<KnowledgeBase>) -> Self {
        Self { knowledge_base, schema: soil_tool::schema_for::<QueryDatabaseArgs>() }
    }
}

#[async_trait]
impl Tool for KnowledgeBaseTool {
    fn name(&self) -> &str {
        QUERY_DATABASE_TOOL
    }

    fn description(&self) -> &str {
        "Tool for querying the knowledge database about agricultural topics when needed"
    }

    fn parameters_schema(&self) -> Option<Value> {
        Some(self.schema.clone())
    }

    async fn execute(&self, _ctx: Arc<dyn ToolContext>, args: Value) -> soil_core::Result<Value> {
        let QueryDatabaseArgs { query } = serde_json::from_value(args)
            .map_err(|e| SoilError::tool(QUERY_DATABASE_TOOL, format!("invalid arguments: {e}")))?;
        if query.trim().is_empty() {
            return Err(SoilError::tool(QUERY_DATABASE_TOOL, "query must not be empty"));
        }

        let response = self.knowledge_base.query_database(&query).await.map_err(|e| {
            error!(error = %e, "query_database failed");
            SoilError::tool(QUERY_DATABASE_TOOL, e)
        })?;

        Ok(serde_json::to_value(response)?)
    }
}
