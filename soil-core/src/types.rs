use serde::{Deserialize, Serialize};

pub const ROLE_SYSTEM: &str = "system";
pub const ROLE_USER: &str = "user";
pub const ROLE_MODEL: &str = "model";
pub const ROLE_FUNCTION: &str = "function";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponseData {
    pub name: String,
    pub response: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    FunctionCall {
        name: String,
        args: serde_json::Value,
        /// Tool call ID assigned by OpenAI-style providers.
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    FunctionResponse {
        function_response: FunctionResponseData,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },
}

impl Content {
    pub fn new(role: impl Into<String>) -> Self {
        Self { role: role.into(), parts: Vec::new() }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(ROLE_USER).with_text(text)
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(ROLE_SYSTEM).with_text(text)
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::new(ROLE_MODEL).with_text(text)
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.parts.push(Part::Text { text: text.into() });
        self
    }

    pub fn with_part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    /// Concatenation of all text parts, in order.
    pub fn text(&self) -> String {
        self.parts.iter().filter_map(Part::text).collect::<Vec<_>>().join("")
    }

    pub fn has_function_calls(&self) -> bool {
        self.parts.iter().any(|p| matches!(p, Part::FunctionCall { .. }))
    }
}

impl Part {
    /// Returns the text content if this is a Text part, None otherwise
    pub fn text(&self) -> Option<&str> {
        match self {
            Part::Text { text } => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn text_part(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn function_call(
        name: impl Into<String>,
        args: serde_json::Value,
        id: Option<String>,
    ) -> Self {
        Part::FunctionCall { name: name.into(), args, id }
    }

    pub fn function_response(
        name: impl Into<String>,
        response: serde_json::Value,
        id: Option<String>,
    ) -> Self {
        Part::FunctionResponse {
            function_response: FunctionResponseData { name: name.into(), response },
            id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_creation() {
        let content = Content::new("user").with_text("Hello");
        assert_eq!(content.role, "user");
        assert_eq!(content.parts.len(), 1);
    }

    #[test]
    fn test_content_text_joins_text_parts() {
        let content = Content::model("Nitrogen ")
            .with_part(Part::function_call("add", json!({"a": 1, "b": 2}), None))
            .with_text("matters");
        assert_eq!(content.text(), "Nitrogen matters");
        assert!(content.has_function_calls());
    }

    #[test]
    fn test_part_text_accessor() {
        assert_eq!(Part::text_part("hello").text(), Some("hello"));
        assert_eq!(Part::function_call("add", json!({}), None).text(), None);
    }

    #[test]
    fn test_function_response_serializes_camel_case() {
        let part = Part::function_response("add", json!({"result": 3}), Some("call_1".into()));
        let value = serde_json::to_value(&part).unwrap();
        assert_eq!(value["functionResponse"]["name"], "add");
        assert_eq!(value["id"], "call_1");
    }

    #[test]
    fn test_untagged_parts_deserialize() {
        let content: Content = serde_json::from_value(json!({
            "role": "model",
            "parts": [
                {"text": "hi"},
                {"name": "query_database", "args": {"query": "fósforo"}, "id": "c1"}
            ]
        }))
        .unwrap();
        assert!(matches!(&content.parts[0], Part::Text { text } if text == "hi"));
        assert!(
            matches!(&content.parts[1], Part::FunctionCall { name, .. } if name == "query_database")
        );
    }
}
