use super::config::GroqConfig;
use super::convert::{
    self, ChatCompletionRequest, ChatCompletionResponse, SseLineBuffer, StreamAssembler,
};
use crate::retry::{
    AttemptError, RetryConfig, execute_with_retry, is_retryable_status_code, parse_retry_after,
};
use async_stream::try_stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, header::RETRY_AFTER};
use soil_core::{Llm, LlmRequest, LlmResponseStream, SoilError};

/// Chat client for Groq-hosted models.
pub struct GroqClient {
    client: Client,
    config: GroqConfig,
    retry_config: RetryConfig,
}

impl GroqClient {
    pub fn new(config: GroqConfig) -> Result<Self, SoilError> {
        let client = Client::builder()
            .build()
            .map_err(|e| SoilError::Model(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config, retry_config: RetryConfig::default() })
    }

    #[must_use]
    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry_config
    }

    pub fn config(&self) -> &GroqConfig {
        &self.config
    }

    fn build_request(&self, request: &LlmRequest, stream: bool) -> ChatCompletionRequest {
        let messages = request.contents.iter().flat_map(convert::content_to_messages).collect();

        let tools = if request.tools.is_empty() {
            None
        } else {
            Some(convert::convert_tools(&request.tools))
        };

        let config = request.config.as_ref();
        let max_tokens = config
            .and_then(|c| c.max_output_tokens)
            .and_then(|t| u32::try_from(t).ok())
            .or(self.config.max_tokens);

        ChatCompletionRequest {
            model: self.config.model.clone(),
            messages,
            temperature: config.and_then(|c| c.temperature),
            top_p: config.and_then(|c| c.top_p),
            max_tokens,
            stream: Some(stream),
            tools,
        }
    }
}

#[async_trait]
impl Llm for GroqClient {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn generate_content(
        &self,
        request: LlmRequest,
        stream: bool,
    ) -> Result<LlmResponseStream, SoilError> {
        let api_url = self.config.chat_completions_url();
        let api_key = self.config.api_key.clone();
        let chat_request = self.build_request(&request, stream);
        let client = self.client.clone();
        let retry_config = self.retry_config.clone();

        let response_stream = try_stream! {
            // Retries cover sending the request; a stream that fails midway is not replayed.
            let response = execute_with_retry(&retry_config, || {
                let client = client.clone();
                let api_url = api_url.clone();
                let api_key = api_key.clone();
                let chat_request = chat_request.clone();
                async move {
                    let sent =
                        client.post(&api_url).bearer_auth(&api_key).json(&chat_request).send().await;
                    let response = match sent {
                        Ok(response) => response,
                        Err(e) => {
                            let error = SoilError::Model(format!("Groq API request failed: {}", e));
                            return Err(if e.is_timeout() || e.is_connect() {
                                AttemptError::transient(error)
                            } else {
                                AttemptError::Fatal(error)
                            });
                        }
                    };

                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }

                    let retry_after = response
                        .headers()
                        .get(RETRY_AFTER)
                        .and_then(|value| value.to_str().ok())
                        .and_then(parse_retry_after);
                    let error_text = response.text().await.unwrap_or_default();
                    if is_retryable_status_code(status.as_u16()) {
                        let error = SoilError::Model(format!(
                            "Groq API error ({}, retryable): {}",
                            status, error_text
                        ));
                        Err(AttemptError::Transient { error, retry_after })
                    } else {
                        Err(AttemptError::Fatal(SoilError::Model(format!(
                            "Groq API error ({}, non-retryable): {}",
                            status, error_text
                        ))))
                    }
                }
            })
            .await?;

            if stream {
                let mut byte_stream = response.bytes_stream();
                let mut lines = SseLineBuffer::default();
                let mut assembler = StreamAssembler::default();

                while let Some(chunk) = byte_stream.next().await {
                    let chunk = chunk
                        .map_err(|e| SoilError::Model(format!("Stream read error: {}", e)))?;
                    for line in lines.push(&chunk) {
                        if let Some(response) = assembler.line(&line) {
                            yield response;
                        }
                    }
                }

                if let Some(response) = lines.finish().and_then(|line| assembler.line(&line)) {
                    yield response;
                }
                if let Some(response) = assembler.finish() {
                    yield response;
                }
            } else {
                let response_text = response.text().await
                    .map_err(|e| SoilError::Model(format!("Failed to read response: {}", e)))?;

                let chat_response: ChatCompletionResponse = serde_json::from_str(&response_text)
                    .map_err(|e| SoilError::Model(format!(
                        "Failed to parse response: {} - {}",
                        e, response_text
                    )))?;

                yield convert::from_response(&chat_response);
            }
        };

        Ok(Box::pin(response_stream))
    }
}
