//! # soil-agent
//!
//! A tool-calling LLM agent with per-session history and per-user memories.
//!
//! ```rust,ignore
//! let agent = LlmAgentBuilder::new("soil_advisor")
//!     .model(Arc::new(groq))
//!     .instruction("You are a helpful assistant...")
//!     .tool(Arc::new(knowledge_tool))
//!     .toolset(Arc::new(soil_tool::calculator_toolset()))
//!     .memory_service(Arc::new(memory))
//!     .enable_user_memories(true)
//!     .build()?;
//!
//! let response = agent.run("user_123", "session_456", "Meu nome é junior").await?;
//! println!("{}", response.text);
//! ```

pub mod llm_agent;
pub mod memory_extractor;

pub use llm_agent::{
    AgentResponse, DEFAULT_MAX_ITERATIONS, LlmAgent, LlmAgentBuilder, ToolFailurePolicy,
};
pub use memory_extractor::{MemoryExtractor, parse_memories};
