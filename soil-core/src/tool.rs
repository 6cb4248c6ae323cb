use crate::{Content, ReadonlyContext, Result, StaticContext};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// A capability the model may invoke by name.
///
/// The name, description and parameter schema are what the model sees when it
/// decides whether to call the tool, so they should describe the tool in terms
/// the model can act on.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;

    /// JSON schema of the arguments object.
    fn parameters_schema(&self) -> Option<Value> {
        None
    }

    /// Function declaration sent to the model.
    fn declaration(&self) -> Value {
        let mut decl = serde_json::json!({
            "name": self.name(),
            "description": self.description(),
        });
        if let Some(params) = self.parameters_schema() {
            decl["parameters"] = params;
        }
        decl
    }

    async fn execute(&self, ctx: Arc<dyn ToolContext>, args: Value) -> Result<Value>;
}

#[async_trait]
pub trait ToolContext: ReadonlyContext {
    fn function_call_id(&self) -> &str;
}

/// [`ToolContext`] for a single function call within an invocation.
#[derive(Debug, Clone)]
pub struct CallContext {
    invocation: Arc<StaticContext>,
    function_call_id: String,
}

impl CallContext {
    pub fn new(invocation: Arc<StaticContext>, function_call_id: impl Into<String>) -> Self {
        Self { invocation, function_call_id: function_call_id.into() }
    }
}

#[async_trait]
impl ReadonlyContext for CallContext {
    fn invocation_id(&self) -> &str {
        self.invocation.invocation_id()
    }

    fn agent_name(&self) -> &str {
        self.invocation.agent_name()
    }

    fn user_id(&self) -> &str {
        self.invocation.user_id()
    }

    fn session_id(&self) -> &str {
        self.invocation.session_id()
    }

    fn user_content(&self) -> &Content {
        self.invocation.user_content()
    }
}

#[async_trait]
impl ToolContext for CallContext {
    fn function_call_id(&self) -> &str {
        &self.function_call_id
    }
}

#[async_trait]
pub trait Toolset: Send + Sync {
    fn name(&self) -> &str;
    async fn tools(&self, ctx: Arc<dyn ReadonlyContext>) -> Result<Vec<Arc<dyn Tool>>>;
}
