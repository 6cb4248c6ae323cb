use crate::config::{AdvisorConfig, ConfigError};
use soil_agent::{AgentResponse, LlmAgent, LlmAgentBuilder, ToolFailurePolicy};
use soil_core::{Llm, SoilError};
use soil_memory::{DEFAULT_SESSION_TABLE, MemoryService, PostgresMemoryService};
use soil_model::GroqClient;
use soil_rag::{KnowledgeBase, KnowledgeBaseTool, OpenAIEmbeddingProvider, QdrantVectorStore, RagError};
use soil_tool::calculator_toolset;
use std::sync::Arc;
use tracing::info;

pub const AGENT_NAME: &str = "soil_advisor";

pub const INSTRUCTIONS: &str = "\
You are a helpful assistants to help farmers with soil recommendations.
Use the knowledge_base when necessary to answer questions about soil fertilization.
If you don't know the answer, just say you don't know. Do not try to make up an answer.
If the answer needs to show specific data create tables for explanation.

Keep your answers conversational and easy to understand but concise.";

#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Rag(#[from] RagError),

    #[error(transparent)]
    Agent(#[from] SoilError),
}

/// The services an advisor is assembled from.
pub struct AdvisorParts {
    pub model: Arc<dyn Llm>,
    pub knowledge_base: Arc<KnowledgeBase>,
    pub memory: Arc<dyn MemoryService>,
    pub tool_failure_policy: ToolFailurePolicy,
    pub debug: bool,
}

/// Soil fertilization assistant: the knowledge base, calculator tools and
/// per-user memories around one model.
#[derive(Debug)]
pub struct SoilAdvisor {
    agent: LlmAgent,
}

impl SoilAdvisor {
    pub fn new(agent: LlmAgent) -> Self {
        Self { agent }
    }

    pub fn from_parts(parts: AdvisorParts) -> Result<Self, SoilError> {
        let agent = LlmAgentBuilder::new(AGENT_NAME)
            .description("Answers farmer questions about soil fertilization")
            .model(parts.model)
            .instruction(INSTRUCTIONS)
            .tool(Arc::new(KnowledgeBaseTool::new(parts.knowledge_base)))
            .toolset(Arc::new(calculator_toolset()))
            .memory_service(parts.memory)
            .enable_user_memories(true)
            .tool_failure_policy(parts.tool_failure_policy)
            .debug(parts.debug)
            .build()?;
        Ok(Self::new(agent))
    }

    /// Build every client from `config` and create the memory tables.
    pub async fn from_config(config: &AdvisorConfig) -> Result<Self, SetupError> {
        let model = GroqClient::new(config.groq.clone())?;

        let mut embedder = OpenAIEmbeddingProvider::new(&config.embedding.url)
            .with_model(&config.embedding.model)
            .with_dimensions(config.embedding.dimensions);
        if let Some(key) = &config.embedding.api_key {
            embedder = embedder.with_api_key(key);
        }
        let store = QdrantVectorStore::new(&config.qdrant.url, config.qdrant.api_key.clone())?;
        let knowledge_base = KnowledgeBase::new(Arc::new(embedder), Arc::new(store))
            .with_settings(config.qdrant.retrieval.clone());

        let memory = PostgresMemoryService::new(config.postgres.connect_lazy()?)
            .with_tables(&config.postgres.memory_table, DEFAULT_SESSION_TABLE)?;
        memory.migrate().await?;

        info!(
            model = %config.groq.model,
            qdrant = %config.qdrant.url,
            collection = %config.qdrant.retrieval.collection,
            "soil advisor ready"
        );

        Ok(Self::from_parts(AdvisorParts {
            model: Arc::new(model),
            knowledge_base: Arc::new(knowledge_base),
            memory: Arc::new(memory),
            tool_failure_policy: config.tool_failure_policy,
            debug: config.debug,
        })?)
    }

    /// Answer `message` within the user's session.
    pub async fn agent_run(
        &self,
        user_id: &str,
        session_id: &str,
        message: &str,
    ) -> Result<AgentResponse, SoilError> {
        self.agent.run(user_id, session_id, message).await
    }

    pub fn agent(&self) -> &LlmAgent {
        &self.agent
    }
}
