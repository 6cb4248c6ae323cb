use async_trait::async_trait;
use soil_core::{Llm, LlmRequest, LlmResponse, LlmResponseStream, Result, SoilError};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Scripted model for tests.
///
/// Each call to `generate_content` consumes the next scripted turn and records
/// the request it was given. Running out of turns is a model error.
#[derive(Clone)]
pub struct MockLlm {
    name: String,
    turns: Arc<Mutex<VecDeque<Vec<LlmResponse>>>>,
    requests: Arc<Mutex<Vec<LlmRequest>>>,
}

impl MockLlm {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            turns: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Script a turn answered by a single response.
    pub fn with_response(self, response: LlmResponse) -> Self {
        self.with_turn(vec![response])
    }

    /// Script a turn answered by a sequence of (possibly partial) responses.
    pub fn with_turn(self, responses: Vec<LlmResponse>) -> Self {
        if let Ok(mut turns) = self.turns.lock() {
            turns.push_back(responses);
        }
        self
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn remaining_turns(&self) -> usize {
        self.turns.lock().map(|t| t.len()).unwrap_or_default()
    }
}

#[async_trait]
impl Llm for MockLlm {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate_content(&self, req: LlmRequest, _stream: bool) -> Result<LlmResponseStream> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(req);
        }
        let responses = self
            .turns
            .lock()
            .map_err(|_| SoilError::Model("mock state poisoned".into()))?
            .pop_front()
            .ok_or_else(|| SoilError::Model(format!("{}: no scripted response left", self.name)))?;

        let stream = async_stream::stream! {
            for response in responses {
                yield Ok(response);
            }
        };
        Ok(Box::pin(stream))
    }
}
