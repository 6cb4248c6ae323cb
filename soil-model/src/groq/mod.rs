//! Groq chat completions provider.
//!
//! Groq serves an OpenAI-compatible API; this client speaks it directly over
//! `reqwest`, with tool calling and server-sent-event streaming.
//!
//! ```rust,ignore
//! use soil_model::groq::{GroqClient, GroqConfig};
//!
//! let client = GroqClient::new(GroqConfig::new(api_key, "llama-3.3-70b-versatile"))?;
//! ```

mod client;
mod config;
mod convert;

pub use client::GroqClient;
pub use config::{DEFAULT_GROQ_MODEL, GROQ_API_BASE, GroqConfig};
