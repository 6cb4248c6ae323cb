use futures::StreamExt;
use serde_json::json;
use soil_core::{Content, FinishReason, Llm, LlmRequest, Part, SoilError};
use soil_model::{GroqClient, GroqConfig, RetryConfig};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> GroqClient {
    let config = GroqConfig::new("gsk_test", "llama-3.3-70b-versatile")
        .with_base_url(format!("{}/openai/v1", server.uri()));
    GroqClient::new(config).unwrap().with_retry_config(
        RetryConfig::default()
            .with_max_retries(2)
            .with_initial_delay(Duration::ZERO)
            .with_max_delay(Duration::ZERO),
    )
}

#[tokio::test]
async fn test_non_streaming_text_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .and(header("authorization", "Bearer gsk_test"))
        .and(body_partial_json(json!({
            "model": "llama-3.3-70b-versatile",
            "stream": false,
            "messages": [{"role": "system", "content": "Seja breve."}, {"role": "user", "content": "Olá"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1,
            "model": "llama-3.3-70b-versatile",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Olá! Como posso ajudar?"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 6, "total_tokens": 18}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let req = LlmRequest::new("x", vec![Content::system("Seja breve."), Content::user("Olá")]);
    let responses: Vec<_> = client.generate_content(req, false).await.unwrap().collect().await;

    assert_eq!(responses.len(), 1);
    let resp = responses.into_iter().next().unwrap().unwrap();
    assert_eq!(resp.content.unwrap().text(), "Olá! Como posso ajudar?");
    assert_eq!(resp.finish_reason, Some(FinishReason::Stop));
    assert_eq!(resp.usage_metadata.unwrap().total_token_count, 18);
}

#[tokio::test]
async fn test_tools_are_sent_and_tool_calls_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .and(body_partial_json(json!({
            "tools": [{"type": "function", "function": {"name": "query_database"}}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {"name": "query_database", "arguments": "{\"query\":\"adubação de milho\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let req = LlmRequest::new("x", vec![Content::user("Como adubar milho?")]).with_tool(
        "query_database",
        json!({"name": "query_database", "description": "kb", "parameters": {"type": "object"}}),
    );
    let mut stream = client.generate_content(req, false).await.unwrap();
    let resp = stream.next().await.unwrap().unwrap();

    assert_eq!(resp.finish_reason, Some(FinishReason::ToolCalls));
    let content = resp.content.unwrap();
    match &content.parts[0] {
        Part::FunctionCall { name, args, id } => {
            assert_eq!(name, "query_database");
            assert_eq!(args["query"], "adubação de milho");
            assert_eq!(id.as_deref(), Some("call_abc"));
        }
        other => panic!("expected function call, got {other:?}"),
    }
}

#[tokio::test]
async fn test_streaming_partials_then_final() {
    let server = MockServer::start().await;
    let sse = [
        r#"data: {"choices":[{"index":0,"delta":{"role":"assistant","content":"Cal"}}]}"#,
        r#"data: {"choices":[{"index":0,"delta":{"content":"agem"}}]}"#,
        r#"data: {"choices":[{"index":0,"delta":{},"finish_reason":"stop"}],"x_groq":{"usage":{"prompt_tokens":3,"completion_tokens":2,"total_tokens":5}}}"#,
        "data: [DONE]",
    ]
    .join("\n\n");
    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse, "text/event-stream"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let responses: Vec<_> = client
        .generate_content(LlmRequest::new("x", vec![Content::user("?")]), true)
        .await
        .unwrap()
        .collect()
        .await;

    let responses: Vec<_> = responses.into_iter().map(Result::unwrap).collect();
    assert_eq!(responses.len(), 3);
    assert!(responses[0].partial && responses[1].partial);
    let text: String =
        responses.iter().filter_map(|r| r.content.as_ref()).map(Content::text).collect();
    assert_eq!(text, "Calagem");
    let last = &responses[2];
    assert!(last.turn_complete);
    assert_eq!(last.usage_metadata.unwrap().total_token_count, 5);
}

#[tokio::test]
async fn test_streaming_tool_call_fragments() {
    let server = MockServer::start().await;
    let sse = [
        r#"data: {"choices":[{"index":0,"delta":{"tool_calls":[{"index":0,"id":"call_1","type":"function","function":{"name":"multiply","arguments":"{\"a\":"}}]}}]}"#,
        r#"data: {"choices":[{"index":0,"delta":{"tool_calls":[{"index":0,"function":{"arguments":"4,\"b\":2.5}"}}]}}]}"#,
        r#"data: {"choices":[{"index":0,"delta":{},"finish_reason":"tool_calls"}]}"#,
        "data: [DONE]",
    ]
    .join("\n\n");
    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse, "text/event-stream"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let responses: Vec<_> = client
        .generate_content(LlmRequest::new("x", vec![Content::user("4 x 2.5")]), true)
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(responses.len(), 1);
    let resp = responses.into_iter().next().unwrap().unwrap();
    assert_eq!(resp.finish_reason, Some(FinishReason::ToolCalls));
    let content = resp.content.unwrap();
    assert!(matches!(
        &content.parts[0],
        Part::FunctionCall { name, args, .. } if name == "multiply" && args["b"] == 2.5
    ));
}

fn request_complete(request: &[u8]) -> bool {
    let Some(header_end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
        return false;
    };
    let headers = String::from_utf8_lossy(&request[..header_end]).to_ascii_lowercase();
    let body_len = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    request.len() >= header_end + 4 + body_len
}

/// Answer one request with `pieces` as separately flushed HTTP chunks.
async fn serve_chunked(pieces: Vec<Vec<u8>>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        while !request_complete(&request) {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                return;
            }
            request.extend_from_slice(&buf[..n]);
        }

        socket
            .write_all(
                b"HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\ntransfer-encoding: chunked\r\n\r\n",
            )
            .await
            .unwrap();
        for piece in pieces {
            socket.write_all(format!("{:x}\r\n", piece.len()).as_bytes()).await.unwrap();
            socket.write_all(&piece).await.unwrap();
            socket.write_all(b"\r\n").await.unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        socket.write_all(b"0\r\n\r\n").await.unwrap();
        socket.flush().await.unwrap();
    });
    format!("http://{addr}/openai/v1")
}

#[tokio::test]
async fn test_streamed_text_split_inside_a_character() {
    let body = concat!(
        r#"data: {"choices":[{"index":0,"delta":{"content":"adubação"}}]}"#,
        "\n\n",
        r#"data: {"choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#,
        "\n\ndata: [DONE]\n\n",
    )
    .as_bytes()
    .to_vec();
    // second byte of the two-byte "ç" starts the next chunk
    let cut = body.iter().position(|b| *b == 0xC3).unwrap() + 1;
    let base_url = serve_chunked(vec![body[..cut].to_vec(), body[cut..].to_vec()]).await;

    let config = GroqConfig::new("gsk_test", "llama-3.3-70b-versatile").with_base_url(base_url);
    let client = GroqClient::new(config).unwrap().with_retry_config(RetryConfig::disabled());
    let responses: Vec<_> = client
        .generate_content(LlmRequest::new("x", vec![Content::user("?")]), true)
        .await
        .unwrap()
        .collect()
        .await;

    let text: String = responses
        .into_iter()
        .map(Result::unwrap)
        .filter_map(|r| r.content)
        .map(|c| c.text())
        .collect();
    assert_eq!(text, "adubação");
}

#[tokio::test]
async fn test_stream_closed_without_finish_reason_keeps_tool_calls() {
    let server = MockServer::start().await;
    // no finish_reason chunk and no trailing newline
    let sse = r#"data: {"choices":[{"index":0,"delta":{"tool_calls":[{"index":0,"id":"call_9","type":"function","function":{"name":"divide","arguments":"{\"a\":10,\"b\":4}"}}]}}]}"#;
    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse, "text/event-stream"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let responses: Vec<_> = client
        .generate_content(LlmRequest::new("x", vec![Content::user("10 / 4")]), true)
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(responses.len(), 1);
    let resp = responses.into_iter().next().unwrap().unwrap();
    assert!(resp.turn_complete);
    assert!(matches!(
        &resp.content.unwrap().parts[0],
        Part::FunctionCall { name, args, .. } if name == "divide" && args["b"] == 4
    ));
}

#[tokio::test]
async fn test_retries_on_rate_limit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "ok"}, "finish_reason": "stop"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut stream =
        client.generate_content(LlmRequest::new("x", vec![Content::user("?")]), false).await.unwrap();
    let resp = stream.next().await.unwrap().unwrap();
    assert_eq!(resp.content.unwrap().text(), "ok");
}

#[tokio::test]
async fn test_retry_after_hint_is_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "0.01")
                .set_body_string("tokens per minute exceeded"),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "pronto"}, "finish_reason": "stop"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut stream =
        client.generate_content(LlmRequest::new("x", vec![Content::user("?")]), false).await.unwrap();
    let resp = stream.next().await.unwrap().unwrap();
    assert_eq!(resp.content.unwrap().text(), "pronto");
}

#[tokio::test]
async fn test_outage_exhausts_retries() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("over capacity"))
        .expect(3)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut stream =
        client.generate_content(LlmRequest::new("x", vec![Content::user("?")]), false).await.unwrap();
    let err = stream.next().await.unwrap().unwrap_err();
    assert!(err.to_string().contains("503"));
    assert!(err.to_string().contains("over capacity"));
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut stream =
        client.generate_content(LlmRequest::new("x", vec![Content::user("?")]), false).await.unwrap();
    let err = stream.next().await.unwrap().unwrap_err();
    match err {
        SoilError::Model(msg) => {
            assert!(msg.contains("401"));
            assert!(msg.contains("non-retryable"));
        }
        other => panic!("unexpected error {other:?}"),
    }
}
