//! Asks the model which durable facts about the user a message contains.

use futures::StreamExt;
use serde_json::Value;
use soil_core::{Content, Llm, LlmRequest, Result, SoilError};
use soil_memory::UserMemory;
use std::sync::Arc;

const EXTRACTION_PROMPT: &str = "\
You maintain long-term memories about a user of a soil fertilization assistant.
Read the user's message and list the new facts worth remembering across conversations:
their name, location, farm, crops, soil conditions, equipment, and stated preferences.
Do not repeat facts already known. Ignore questions and small talk.
Write each fact as a short third-person sentence in English.
Reply with a JSON array of strings only, or [] when there is nothing to remember.";

pub struct MemoryExtractor {
    model: Arc<dyn Llm>,
}

impl MemoryExtractor {
    pub fn new(model: Arc<dyn Llm>) -> Self {
        Self { model }
    }

    pub async fn extract(&self, message: &str, known: &[UserMemory]) -> Result<Vec<String>> {
        let mut prompt = EXTRACTION_PROMPT.to_string();
        if !known.is_empty() {
            prompt.push_str("\n\nAlready known:\n");
            for memory in known {
                prompt.push_str("- ");
                prompt.push_str(&memory.memory);
                prompt.push('\n');
            }
        }

        let request = LlmRequest::new(
            self.model.name(),
            vec![Content::system(prompt), Content::user(message)],
        );
        let mut stream = self.model.generate_content(request, false).await?;

        let mut reply = String::new();
        while let Some(chunk) = stream.next().await {
            if let Some(content) = chunk?.content {
                reply.push_str(&content.text());
            }
        }

        parse_memories(&reply)
            .ok_or_else(|| SoilError::Agent(format!("unparseable memory extraction: {reply}")))
    }
}

/// Parse a JSON array of strings, tolerating code fences and surrounding prose.
pub fn parse_memories(reply: &str) -> Option<Vec<String>> {
    let start = reply.find('[')?;
    let end = reply.rfind(']')?;
    if end < start {
        return None;
    }
    let values: Vec<Value> = serde_json::from_str(&reply[start..=end]).ok()?;
    Some(
        values
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.trim().to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
    )
}
