//! HTTP invoker for the transformation service.

use super::StageInvoker;
use crate::config::PipelineConfig;
use crate::core::{InvocationOutcome, StageId};
use crate::errors::OkrflowError;
use crate::input::StageInput;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::debug;

/// Posts a stage's input to its REST endpoint and returns the JSON body.
#[derive(Debug, Clone)]
pub struct HttpStageInvoker {
    stage: StageId,
    url: String,
    client: reqwest::Client,
}

impl HttpStageInvoker {
    /// Creates an invoker with its own client.
    pub fn new(stage: StageId, config: &PipelineConfig) -> Result<Self, OkrflowError> {
        let client = Self::build_client(config)?;
        Ok(Self::with_client(stage, client, config))
    }

    /// Creates an invoker sharing an existing client.
    #[must_use]
    pub fn with_client(stage: StageId, client: reqwest::Client, config: &PipelineConfig) -> Self {
        Self {
            stage,
            url: config.endpoint_url(stage.endpoint()),
            client,
        }
    }

    /// Builds a client with the configured timeout, user agent and headers.
    pub fn build_client(config: &PipelineConfig) -> Result<reqwest::Client, OkrflowError> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        for (key, value) in &config.headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| OkrflowError::Config(format!("invalid header name '{key}': {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| OkrflowError::Config(format!("invalid value for header '{key}': {e}")))?;
            headers.insert(name, value);
        }

        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .default_headers(headers);
        if config.no_proxy {
            builder = builder.no_proxy();
        }
        builder
            .build()
            .map_err(|e| OkrflowError::Config(format!("failed to build HTTP client: {e}")))
    }

    /// Endpoint this invoker posts to.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn post(&self, input: &StageInput) -> Result<serde_json::Value, String> {
        let response = self
            .client
            .post(&self.url)
            .json(&input.to_payload())
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                body
            };
            return Err(format!("{}: {detail}", status.as_u16()));
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| format!("invalid response body: {e}"))
    }
}

#[async_trait]
impl StageInvoker for HttpStageInvoker {
    fn stage(&self) -> StageId {
        self.stage
    }

    async fn invoke(&self, input: &StageInput) -> InvocationOutcome {
        debug!(stage = %self.stage, url = %self.url, "Posting stage input");
        self.post(input).await.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serves one canned response and returns the raw request it received.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}/api", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if request_complete(&request) {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });

        (base, handle)
    }

    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some(split) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..split]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        raw.len() >= split + 4 + content_length
    }

    fn request_body(raw: &str) -> serde_json::Value {
        let (_, body) = raw.split_once("\r\n\r\n").unwrap();
        serde_json::from_str(body).unwrap()
    }

    #[tokio::test]
    async fn test_posts_payload_and_returns_body() {
        let (base, server) = serve_once("200 OK", r#"{"activities":{"output":"done"}}"#).await;
        let config = PipelineConfig::new().with_base_url(base).without_proxy();
        let invoker = HttpStageInvoker::new(StageId::Aggregate, &config).unwrap();

        let input = StageInput::Logs {
            logs: vec!["Read 'Clean Code' chapters 1-3".to_string()],
        };
        let outcome = invoker.invoke(&input).await;
        assert_eq!(
            outcome,
            InvocationOutcome::success(json!({"activities": {"output": "done"}}))
        );

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /api/aggregate HTTP/1.1"));
        assert_eq!(request_body(&raw), json!({"logs": ["Read 'Clean Code' chapters 1-3"]}));
    }

    #[tokio::test]
    async fn test_error_status_becomes_failure_reason() {
        let (base, server) = serve_once("500 Internal Server Error", r#"{"detail":"model offline"}"#).await;
        let config = PipelineConfig::new().with_base_url(base).without_proxy();
        let invoker = HttpStageInvoker::new(StageId::MapGraph, &config).unwrap();

        let outcome = invoker.invoke(&StageInput::Themes { themes: json!(["x"]) }).await;
        assert_eq!(
            outcome.reason(),
            Some(r#"500: {"detail":"model offline"}"#)
        );

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /api/map-graph HTTP/1.1"));
        assert_eq!(request_body(&raw), json!({"input": ["x"]}));
    }

    #[tokio::test]
    async fn test_non_json_body_is_a_failure() {
        let (base, _server) = serve_once("200 OK", "<html>oops</html>").await;
        let config = PipelineConfig::new().with_base_url(base).without_proxy();
        let invoker = HttpStageInvoker::new(StageId::InferIntent, &config).unwrap();

        let outcome = invoker.invoke(&StageInput::Activities { activities: json!({}) }).await;
        assert!(outcome.reason().unwrap().starts_with("invalid response body"));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_a_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}/api", listener.local_addr().unwrap());
        drop(listener);

        let config = PipelineConfig::new()
            .with_base_url(base)
            .with_timeout(2.0)
            .without_proxy();
        let invoker = HttpStageInvoker::new(StageId::GenerateOkr, &config).unwrap();
        let outcome = invoker
            .invoke(&StageInput::OutcomesWithGraph {
                outcomes: json!({}),
                graph: json!({}),
            })
            .await;
        assert!(!outcome.is_success());
        assert!(!outcome.reason().unwrap().is_empty());
    }

    #[test]
    fn test_url_and_bad_headers() {
        let config = PipelineConfig::new();
        let invoker = HttpStageInvoker::new(StageId::GenerateOutcomes, &config).unwrap();
        assert_eq!(invoker.url(), "http://localhost:8000/api/generate-outcomes");

        let bad = PipelineConfig::new().with_header("bad header", "x");
        assert!(matches!(
            HttpStageInvoker::build_client(&bad),
            Err(OkrflowError::Config(_))
        ));
    }
}
