use crate::types::Content;
use async_trait::async_trait;

/// Read-only view of the invocation a tool or callback runs inside.
#[async_trait]
pub trait ReadonlyContext: Send + Sync {
    fn invocation_id(&self) -> &str;
    fn agent_name(&self) -> &str;
    fn user_id(&self) -> &str;
    fn session_id(&self) -> &str;
    fn user_content(&self) -> &Content;
}

/// Plain [`ReadonlyContext`] holding owned values.
///
/// Used by the agent loop, and handy in tests that need a context without an agent.
#[derive(Debug, Clone)]
pub struct StaticContext {
    pub invocation_id: String,
    pub agent_name: String,
    pub user_id: String,
    pub session_id: String,
    pub user_content: Content,
}

impl StaticContext {
    pub fn new(
        invocation_id: impl Into<String>,
        agent_name: impl Into<String>,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
        user_content: Content,
    ) -> Self {
        Self {
            invocation_id: invocation_id.into(),
            agent_name: agent_name.into(),
            user_id: user_id.into(),
            session_id: session_id.into(),
            user_content,
        }
    }
}

#[async_trait]
impl ReadonlyContext for StaticContext {
    fn invocation_id(&self) -> &str {
        &self.invocation_id
    }

    fn agent_name(&self) -> &str {
        &self.agent_name
    }

    fn user_id(&self) -> &str {
        &self.user_id
    }

    fn session_id(&self) -> &str {
        &self.session_id
    }

    fn user_content(&self) -> &Content {
        &self.user_content
    }
}
