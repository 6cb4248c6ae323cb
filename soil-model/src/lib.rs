//! # soil-model
//!
//! Chat model clients for the soil advisor.
//!
//! - [`GroqClient`] - Groq's OpenAI-compatible chat completions API
//! - [`MockLlm`] - scripted model for tests
//!
//! ```rust,no_run
//! use soil_model::{GroqClient, GroqConfig};
//!
//! let api_key = std::env::var("GROQ_API_KEY").unwrap_or_default();
//! let model = GroqClient::new(GroqConfig::new(api_key, "llama-3.3-70b-versatile")).unwrap();
//! ```

pub mod groq;
pub mod mock;
pub mod retry;

pub use groq::{GroqClient, GroqConfig};
pub use mock::MockLlm;
pub use retry::RetryConfig;
