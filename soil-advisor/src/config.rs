//! Connection settings read from the environment.
//!
//! Every section has a `from_lookup` constructor taking a variable lookup, so
//! tests can supply values without touching the process environment, and a
//! `from_env` shorthand. Call `dotenvy::dotenv()` first to seed the environment
//! from a `.env` file.

use soil_agent::ToolFailurePolicy;
use soil_model::GroqConfig;
use soil_model::groq::DEFAULT_GROQ_MODEL;
use soil_rag::RetrievalSettings;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use std::str::FromStr;

pub const DEFAULT_POSTGRES_HOST: &str = "localhost";
pub const DEFAULT_POSTGRES_PORT: u16 = 5432;
pub const DEFAULT_POSTGRES_USER: &str = "agno_user";
pub const DEFAULT_POSTGRES_PASSWORD: &str = "agno_password_123";
pub const DEFAULT_POSTGRES_DB: &str = "agno_db";

pub use soil_rag::qdrant::DEFAULT_QDRANT_URL;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid POSTGRES_PORT '{value}': {source}")]
    InvalidPort {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    #[error("invalid {name}: {message}")]
    Invalid { name: &'static str, message: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Non-empty value of `name`.
fn lookup_non_empty(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).filter(|v| !v.trim().is_empty())
}

fn parse_flag(name: &'static str, value: Option<String>) -> Result<bool> {
    match value.as_deref().map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") | Some("0") | Some("false") | Some("no") | Some("off") => Ok(false),
        Some("1") | Some("true") | Some("yes") | Some("on") => Ok(true),
        Some(other) => Err(ConfigError::Invalid { name, message: format!("'{other}' is not a boolean") }),
    }
}

/// How to reach the relational store.
#[derive(Clone, PartialEq, Eq)]
pub enum PostgresConnection {
    /// `POSTGRES_URL`, used as-is.
    Url(String),
    Fields { host: String, port: u16, user: String, password: String, database: String },
}

impl std::fmt::Debug for PostgresConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Url(_) => f.debug_tuple("Url").field(&"<redacted>").finish(),
            Self::Fields { host, port, user, database, .. } => f
                .debug_struct("Fields")
                .field("host", host)
                .field("port", port)
                .field("user", user)
                .field("password", &"<redacted>")
                .field("database", database)
                .finish(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresConfig {
    pub connection: PostgresConnection,
    pub memory_table: String,
}

impl PostgresConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// A non-empty `POSTGRES_URL` wins and the discrete variables are ignored.
    /// Otherwise each unset variable falls back to its default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let connection = match lookup("POSTGRES_URL").filter(|url| !url.is_empty()) {
            Some(url) => PostgresConnection::Url(url),
            None => {
                let port = match lookup("POSTGRES_PORT") {
                    Some(value) => value
                        .trim()
                        .parse::<u16>()
                        .map_err(|source| ConfigError::InvalidPort { value, source })?,
                    None => DEFAULT_POSTGRES_PORT,
                };
                let field = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());
                PostgresConnection::Fields {
                    host: field("POSTGRES_HOST", DEFAULT_POSTGRES_HOST),
                    port,
                    user: field("POSTGRES_USER", DEFAULT_POSTGRES_USER),
                    password: field("POSTGRES_PASSWORD", DEFAULT_POSTGRES_PASSWORD),
                    database: field("POSTGRES_DB", DEFAULT_POSTGRES_DB),
                }
            }
        };

        Ok(Self { connection, memory_table: soil_memory::DEFAULT_MEMORY_TABLE.to_string() })
    }

    pub fn connect_options(&self) -> Result<PgConnectOptions> {
        match &self.connection {
            PostgresConnection::Url(url) => PgConnectOptions::from_str(url).map_err(|e| {
                ConfigError::Invalid { name: "POSTGRES_URL", message: e.to_string() }
            }),
            PostgresConnection::Fields { host, port, user, password, database } => {
                Ok(PgConnectOptions::new()
                    .host(host)
                    .port(*port)
                    .username(user)
                    .password(password)
                    .database(database))
            }
        }
    }

    /// Pool that connects on first use, so bad credentials surface there.
    pub fn connect_lazy(&self) -> Result<PgPool> {
        Ok(PgPoolOptions::new().max_connections(5).connect_lazy_with(self.connect_options()?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QdrantConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub retrieval: RetrievalSettings,
}

impl QdrantConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            url: lookup_non_empty(&lookup, "QDRANT_URL").unwrap_or_else(|| DEFAULT_QDRANT_URL.to_string()),
            api_key: lookup_non_empty(&lookup, "QDRANT_API_KEY"),
            retrieval: RetrievalSettings::default(),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct EmbeddingConfig {
    pub url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub dimensions: usize,
}

impl std::fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field("url", &self.url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

impl EmbeddingConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let dimensions = match lookup_non_empty(&lookup, "EMBEDDING_DIMENSIONS") {
            Some(value) => value.trim().parse::<usize>().map_err(|e| ConfigError::Invalid {
                name: "EMBEDDING_DIMENSIONS",
                message: format!("'{value}': {e}"),
            })?,
            None => soil_rag::openai::DEFAULT_EMBEDDING_DIMENSIONS,
        };

        Ok(Self {
            url: lookup_non_empty(&lookup, "EMBEDDING_URL")
                .unwrap_or_else(|| soil_rag::openai::DEFAULT_EMBEDDING_URL.to_string()),
            model: lookup_non_empty(&lookup, "EMBEDDING_MODEL")
                .unwrap_or_else(|| soil_rag::openai::DEFAULT_EMBEDDING_MODEL.to_string()),
            api_key: lookup_non_empty(&lookup, "EMBEDDING_API_KEY"),
            dimensions,
        })
    }
}

/// `GROQ_API_KEY` may be absent; the model call reports it.
pub fn groq_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> GroqConfig {
    let mut config = GroqConfig::new(
        lookup("GROQ_API_KEY").unwrap_or_default(),
        lookup_non_empty(&lookup, "GROQ_MODEL").unwrap_or_else(|| DEFAULT_GROQ_MODEL.to_string()),
    );
    if let Some(base_url) = lookup_non_empty(&lookup, "GROQ_BASE_URL") {
        config = config.with_base_url(base_url);
    }
    config
}

/// Everything the advisor needs at startup.
#[derive(Debug, Clone)]
pub struct AdvisorConfig {
    pub postgres: PostgresConfig,
    pub qdrant: QdrantConfig,
    pub embedding: EmbeddingConfig,
    pub groq: GroqConfig,
    pub tool_failure_policy: ToolFailurePolicy,
    pub debug: bool,
}

impl AdvisorConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let tool_failure_policy = match lookup_non_empty(&lookup, "TOOL_FAILURE_POLICY") {
            Some(value) => value.parse::<ToolFailurePolicy>().map_err(|e| ConfigError::Invalid {
                name: "TOOL_FAILURE_POLICY",
                message: e.to_string(),
            })?,
            None => ToolFailurePolicy::default(),
        };

        Ok(Self {
            postgres: PostgresConfig::from_lookup(&lookup)?,
            qdrant: QdrantConfig::from_lookup(&lookup),
            embedding: EmbeddingConfig::from_lookup(&lookup)?,
            groq: groq_from_lookup(&lookup),
            tool_failure_policy,
            debug: parse_flag("SOIL_DEBUG", lookup("SOIL_DEBUG"))?,
        })
    }
}
