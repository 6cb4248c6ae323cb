use async_trait::async_trait;
use futures::StreamExt;
use soil_core::{Content, Llm, LlmRequest, LlmResponse, LlmResponseStream, Result, SoilError};

struct EchoModel;

#[async_trait]
impl Llm for EchoModel {
    fn name(&self) -> &str {
        "echo"
    }

    async fn generate_content(&self, req: LlmRequest, stream: bool) -> Result<LlmResponseStream> {
        let last = req.contents.last().map(Content::text).unwrap_or_default();
        let out = async_stream::stream! {
            if stream {
                for word in last.split_whitespace() {
                    let mut resp = LlmResponse::new(Content::model(format!("{word} ")));
                    resp.partial = true;
                    resp.turn_complete = false;
                    yield Ok(resp);
                }
            }
            yield Ok(LlmResponse::new(Content::model(last.clone())));
        };
        Ok(Box::pin(out))
    }
}

struct BrokenModel;

#[async_trait]
impl Llm for BrokenModel {
    fn name(&self) -> &str {
        "broken"
    }

    async fn generate_content(&self, _req: LlmRequest, _stream: bool) -> Result<LlmResponseStream> {
        Err(SoilError::Model("rate limited".into()))
    }
}

#[tokio::test]
async fn test_non_streaming_yields_single_final_response() {
    let model = EchoModel;
    let req = LlmRequest::new("echo", vec![Content::user("adubo nitrogenado")]);
    let responses: Vec<_> = model.generate_content(req, false).await.unwrap().collect().await;
    assert_eq!(responses.len(), 1);
    let resp = responses[0].as_ref().unwrap();
    assert!(resp.turn_complete);
    assert_eq!(resp.content.as_ref().unwrap().text(), "adubo nitrogenado");
}

#[tokio::test]
async fn test_streaming_yields_partials_then_final() {
    let model = EchoModel;
    let req = LlmRequest::new("echo", vec![Content::user("calagem do solo")]);
    let responses: Vec<_> = model.generate_content(req, true).await.unwrap().collect().await;
    assert_eq!(responses.len(), 3);
    assert!(responses[0].as_ref().unwrap().partial);
    assert!(responses[2].as_ref().unwrap().turn_complete);
}

#[tokio::test]
async fn test_model_error_surfaces_before_stream() {
    let result = BrokenModel.generate_content(LlmRequest::new("x", vec![]), false).await;
    assert!(matches!(result, Err(SoilError::Model(msg)) if msg == "rate limited"));
}
