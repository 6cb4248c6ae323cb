//! # soil-core
//!
//! Core traits and types shared by the soil advisor crates.
//!
//! - [`Llm`] / [`LlmRequest`] / [`LlmResponse`] - the model seam
//! - [`Tool`] / [`Toolset`] / [`ToolContext`] - callable capabilities
//! - [`Content`] / [`Part`] - conversation messages
//! - [`Event`] - steps of an agent run
//! - [`SoilError`] / [`Result`] - unified error handling
//!
//! ```rust,ignore
//! #[async_trait]
//! pub trait Tool: Send + Sync {
//!     fn name(&self) -> &str;
//!     fn description(&self) -> &str;
//!     async fn execute(&self, ctx: Arc<dyn ToolContext>, args: Value) -> Result<Value>;
//! }
//! ```

pub mod context;
pub mod error;
pub mod event;
pub mod model;
pub mod tool;
pub mod types;

pub use context::{ReadonlyContext, StaticContext};
pub use error::{BoxError, Result, SoilError};
pub use event::Event;
pub use model::{
    FinishReason, GenerateContentConfig, Llm, LlmRequest, LlmResponse, LlmResponseStream,
    UsageMetadata,
};
pub use tool::{CallContext, Tool, ToolContext, Toolset};
pub use types::{
    Content, FunctionResponseData, Part, ROLE_FUNCTION, ROLE_MODEL, ROLE_SYSTEM, ROLE_USER,
};
