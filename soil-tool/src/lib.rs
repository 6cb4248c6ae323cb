//! # soil-tool
//!
//! Tools the soil advisor can call.
//!
//! - [`FunctionTool`] - a tool backed by an async closure
//! - [`BasicToolset`] - a named group of tools
//! - [`calculator_toolset`] - add, subtract, multiply, divide, exponentiate,
//!   factorial, is_prime and square_root
//!
//! ```rust,no_run
//! use soil_tool::FunctionTool;
//! use soil_core::{ToolContext, Result};
//! use serde_json::{json, Value};
//! use std::sync::Arc;
//!
//! async fn hectares(_ctx: Arc<dyn ToolContext>, args: Value) -> Result<Value> {
//!     let m2 = args["square_meters"].as_f64().unwrap_or_default();
//!     Ok(json!({ "hectares": m2 / 10_000.0 }))
//! }
//!
//! let tool = FunctionTool::new("hectares", "Convert square meters to hectares", hectares);
//! ```

pub mod calculator;
mod function_tool;
pub mod schema;
pub mod toolset;

pub use calculator::{CalculatorOp, calculator_toolset};
pub use function_tool::FunctionTool;
pub use schema::schema_for;
pub use soil_core::{Tool, ToolContext, Toolset};
pub use toolset::BasicToolset;
