//! Span helpers for agent, model, tool, and retrieval operations

use tracing::Span;

/// Span covering one agent turn.
///
/// ```
/// use soil_telemetry::agent_run_span;
/// let span = agent_run_span("soil_advisor", "inv-123", "user_123", "session_456");
/// let _enter = span.enter();
/// ```
pub fn agent_run_span(agent_name: &str, invocation_id: &str, user_id: &str, session_id: &str) -> Span {
    tracing::info_span!(
        "agent.run",
        agent.name = agent_name,
        invocation.id = invocation_id,
        user.id = user_id,
        session.id = session_id,
    )
}

pub fn model_call_span(model_name: &str) -> Span {
    tracing::info_span!("model.call", model.name = model_name)
}

pub fn tool_execute_span(tool_name: &str) -> Span {
    tracing::info_span!("tool.execute", tool.name = tool_name)
}

/// Span around a knowledge-base query.
pub fn knowledge_query_span(collection: &str, limit: u64) -> Span {
    tracing::info_span!("knowledge.query", collection = collection, limit = limit)
}

pub fn memory_span(operation: &str, user_id: &str) -> Span {
    tracing::debug_span!("memory", memory.operation = operation, user.id = user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spans_can_be_entered() {
        let span = agent_run_span("a", "inv", "u", "s");
        let _a = span.enter();
        let _b = model_call_span("llama-3.3-70b-versatile").entered();
        let _c = tool_execute_span("query_database").entered();
        let _d = knowledge_query_span("sb100", 4).entered();
        let _e = memory_span("add", "u").entered();
    }
}
