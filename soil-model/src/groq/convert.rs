//! Wire types and conversions for Groq's OpenAI-compatible chat API.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use soil_core::{Content, FinishReason, LlmResponse, Part, ROLE_MODEL, UsageMetadata};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Tool {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDef,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionDef {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
    /// Groq reports streaming usage here on the last chunk.
    #[serde(default)]
    pub x_groq: Option<XGroq>,
}

impl ChatCompletionResponse {
    pub fn usage(&self) -> Option<UsageMetadata> {
        self.usage
            .as_ref()
            .or_else(|| self.x_groq.as_ref().and_then(|x| x.usage.as_ref()))
            .map(Usage::to_metadata)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct XGroq {
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub delta: Option<DeltaMessage>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct DeltaMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<DeltaToolCall>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeltaToolCall {
    pub index: u32,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub function: Option<DeltaFunction>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct DeltaFunction {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    fn to_metadata(&self) -> UsageMetadata {
        UsageMetadata {
            prompt_token_count: self.prompt_tokens as i32,
            candidates_token_count: self.completion_tokens as i32,
            total_token_count: self.total_tokens as i32,
        }
    }
}

fn wire_role(role: &str) -> &str {
    match role {
        "model" | "assistant" => "assistant",
        "function" | "tool" => "tool",
        other => other,
    }
}

/// Convert one content into chat messages.
///
/// Each function response becomes its own `tool` message, since the API pairs
/// tool results with calls one `tool_call_id` at a time.
pub fn content_to_messages(content: &Content) -> Vec<Message> {
    let role = wire_role(&content.role);
    let mut text_parts = Vec::new();
    let mut tool_calls = Vec::new();
    let mut tool_results = Vec::new();

    for part in &content.parts {
        match part {
            Part::Text { text } => text_parts.push(text.clone()),
            Part::FunctionCall { name, args, id } => tool_calls.push(ToolCall {
                id: id.clone().unwrap_or_else(|| format!("call_{}", tool_calls.len())),
                call_type: "function".to_string(),
                function: FunctionCall { name: name.clone(), arguments: args.to_string() },
            }),
            Part::FunctionResponse { function_response, id } => tool_results.push(Message {
                role: "tool".to_string(),
                content: Some(function_response.response.to_string()),
                tool_calls: None,
                tool_call_id: Some(
                    id.clone().unwrap_or_else(|| function_response.name.clone()),
                ),
            }),
        }
    }

    let mut messages = Vec::new();
    if !text_parts.is_empty() || !tool_calls.is_empty() {
        messages.push(Message {
            role: role.to_string(),
            content: if text_parts.is_empty() { None } else { Some(text_parts.join("\n")) },
            tool_calls: if tool_calls.is_empty() { None } else { Some(tool_calls) },
            tool_call_id: None,
        });
    }
    messages.extend(tool_results);
    messages
}

/// Convert tool declarations, ordered by name for a stable request body.
pub fn convert_tools(tools: &HashMap<String, Value>) -> Vec<Tool> {
    let ordered: BTreeMap<_, _> = tools.iter().collect();
    ordered
        .into_values()
        .filter_map(|decl| {
            let name = decl.get("name")?.as_str()?;
            let description = decl.get("description").and_then(Value::as_str).unwrap_or("");
            let parameters = decl
                .get("parameters")
                .cloned()
                .unwrap_or_else(|| serde_json::json!({"type": "object", "properties": {}}));
            Some(Tool {
                tool_type: "function".to_string(),
                function: FunctionDef {
                    name: name.to_string(),
                    description: description.to_string(),
                    parameters,
                },
            })
        })
        .collect()
}

/// Arguments arrive as a JSON string; a malformed string becomes an empty object.
pub fn parse_arguments(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return serde_json::json!({});
    }
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::warn!(error = %e, arguments = raw, "Malformed tool call arguments");
        serde_json::json!({})
    })
}

pub fn from_response(response: &ChatCompletionResponse) -> LlmResponse {
    let choice = response.choices.first();
    let finish_reason =
        choice.and_then(|c| c.finish_reason.as_deref()).map(FinishReason::from_openai);

    let content = choice.and_then(|c| c.message.as_ref()).and_then(|msg| {
        let mut parts = Vec::new();
        if let Some(text) = msg.content.as_ref().filter(|t| !t.is_empty()) {
            parts.push(Part::text_part(text.clone()));
        }
        for tc in msg.tool_calls.iter().flatten() {
            parts.push(Part::function_call(
                tc.function.name.clone(),
                parse_arguments(&tc.function.arguments),
                Some(tc.id.clone()),
            ));
        }
        (!parts.is_empty()).then(|| Content { role: ROLE_MODEL.to_string(), parts })
    });

    LlmResponse {
        content,
        usage_metadata: response.usage(),
        finish_reason,
        partial: false,
        turn_complete: true,
        error_code: None,
        error_message: None,
    }
}

/// Tool-call fragments accumulated across streamed chunks, keyed by index.
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    calls: BTreeMap<u32, (String, String, String)>,
}

impl ToolCallAccumulator {
    pub fn push(&mut self, delta: &DeltaToolCall) {
        let entry = self.calls.entry(delta.index).or_insert_with(|| {
            (format!("call_{}", delta.index), String::new(), String::new())
        });
        if let Some(id) = &delta.id {
            entry.0 = id.clone();
        }
        if let Some(func) = &delta.function {
            if let Some(name) = &func.name {
                entry.1 = name.clone();
            }
            if let Some(args) = &func.arguments {
                entry.2.push_str(args);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Drain into function-call parts, in index order.
    pub fn take_parts(&mut self) -> Vec<Part> {
        std::mem::take(&mut self.calls)
            .into_values()
            .map(|(id, name, args)| Part::function_call(name, parse_arguments(&args), Some(id)))
            .collect()
    }
}

/// Splits an SSE byte stream into lines. Bytes are buffered until a newline
/// arrives, so a character split across network chunks decodes intact.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    pending: Vec<u8>,
}

impl SseLineBuffer {
    /// Append `bytes` and return every line they complete.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(end) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=end).collect();
            lines.push(decode_line(&line[..end]));
        }
        lines
    }

    /// The unterminated tail left when the stream ends.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.pending);
        let line = decode_line(&rest);
        (!line.is_empty()).then_some(line)
    }
}

fn decode_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim().to_string()
}

/// Turns streamed `data:` lines into [`LlmResponse`]s.
#[derive(Debug, Default)]
pub struct StreamAssembler {
    tool_calls: ToolCallAccumulator,
}

impl StreamAssembler {
    pub fn line(&mut self, line: &str) -> Option<LlmResponse> {
        let data = line.strip_prefix("data:")?.trim_start();
        if data == "[DONE]" {
            return None;
        }

        let chunk = match serde_json::from_str::<ChatCompletionResponse>(data) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, data, "Failed to parse Groq chunk");
                return None;
            }
        };
        let choice = chunk.choices.first()?;
        let delta = choice.delta.clone().unwrap_or_default();
        for tc in delta.tool_calls.iter().flatten() {
            self.tool_calls.push(tc);
        }
        let text = delta.content.filter(|t| !t.is_empty());

        match choice.finish_reason.as_deref() {
            None => text.map(|text| partial_text(&text)),
            Some(reason) => {
                let mut parts = Vec::new();
                if let Some(text) = text {
                    parts.push(Part::text_part(text));
                }
                parts.extend(self.tool_calls.take_parts());
                Some(final_chunk(parts, Some(FinishReason::from_openai(reason)), chunk.usage()))
            }
        }
    }

    /// Tool calls still pending when the stream closed without a finish reason.
    pub fn finish(&mut self) -> Option<LlmResponse> {
        if self.tool_calls.is_empty() {
            return None;
        }
        Some(final_chunk(self.tool_calls.take_parts(), Some(FinishReason::ToolCalls), None))
    }
}

pub fn partial_text(text: &str) -> LlmResponse {
    LlmResponse {
        content: Some(Content::model(text)),
        usage_metadata: None,
        finish_reason: None,
        partial: true,
        turn_complete: false,
        error_code: None,
        error_message: None,
    }
}

pub fn final_chunk(
    parts: Vec<Part>,
    finish_reason: Option<FinishReason>,
    usage: Option<UsageMetadata>,
) -> LlmResponse {
    LlmResponse {
        content: (!parts.is_empty()).then(|| Content { role: ROLE_MODEL.to_string(), parts }),
        usage_metadata: usage,
        finish_reason,
        partial: false,
        turn_complete: true,
        error_code: None,
        error_message: None,
    }
}
