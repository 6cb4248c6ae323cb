//! # soil-advisor
//!
//! A conversational assistant that answers farmer questions about soil
//! fertilization. It looks passages up in a Qdrant knowledge base, does
//! arithmetic with calculator tools, and remembers facts about each user in
//! PostgreSQL.
//!
//! ```rust,no_run
//! use soil_advisor::{AdvisorConfig, SoilAdvisor};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! dotenvy::dotenv().ok();
//! let config = AdvisorConfig::from_env()?;
//! let advisor = SoilAdvisor::from_config(&config).await?;
//!
//! let response = advisor.agent_run("user_123", "session_456", "Meu nome é junior").await?;
//! println!("{}", response.text);
//! # Ok(())
//! # }
//! ```
//!
//! ## Environment
//!
//! | variable | default |
//! |----------|---------|
//! | `POSTGRES_URL` | unset; overrides the discrete fields |
//! | `POSTGRES_HOST` / `POSTGRES_PORT` | `localhost` / `5432` |
//! | `POSTGRES_USER` / `POSTGRES_PASSWORD` / `POSTGRES_DB` | `agno_user` / `agno_password_123` / `agno_db` |
//! | `QDRANT_URL` / `QDRANT_API_KEY` | `http://localhost:6334` / unset |
//! | `EMBEDDING_URL` / `EMBEDDING_MODEL` | `http://localhost:8080/v1` / `Qwen/Qwen3-Embedding-0.6B` |
//! | `GROQ_API_KEY` / `GROQ_MODEL` | unset / `llama-3.3-70b-versatile` |
//! | `TOOL_FAILURE_POLICY` | `propagate` (or `degrade`) |
//! | `SOIL_DEBUG` | `false` |

pub mod advisor;
pub mod cli;
pub mod config;

pub use advisor::{AGENT_NAME, AdvisorParts, INSTRUCTIONS, SetupError, SoilAdvisor};
pub use cli::Cli;
pub use config::{
    AdvisorConfig, ConfigError, EmbeddingConfig, PostgresConfig, PostgresConnection, QdrantConfig,
};
