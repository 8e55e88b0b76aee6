//! HTTP client for the model-invocation runtime.
//!
//! Posts an [`InvocationRequest`] as JSON and reads the response body as
//! newline-delimited JSON events. Lines are forwarded without parsing.

use std::time::Duration;

use agent_builder_core::invocation::runtime::{AgentRuntime, EventStream};
use agent_builder_types::config::RuntimeConfig;
use agent_builder_types::error::RuntimeError;
use agent_builder_types::invocation::InvocationRequest;
use futures_util::StreamExt;

/// Implements [`AgentRuntime`] against an HTTP endpoint.
pub struct HttpAgentRuntime {
    client: reqwest::Client,
    /// Invocation endpoint. Invocations fail with `NotConfigured` when unset.
    url: Option<String>,
}

impl HttpAgentRuntime {
    pub fn new(config: &RuntimeConfig) -> Result<Self, RuntimeError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| RuntimeError::Request(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }
}

impl AgentRuntime for HttpAgentRuntime {
    fn invoke(&self, request: InvocationRequest) -> EventStream {
        let client = self.client.clone();
        let url = self.url.clone();

        Box::pin(async_stream::try_stream! {
            let url = url.ok_or(RuntimeError::NotConfigured)?;

            let response = client
                .post(&url)
                .header("Accept", "application/x-ndjson")
                .json(&request)
                .send()
                .await
                .map_err(|e| RuntimeError::Request(format!("HTTP request failed: {e}")))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                tracing::warn!(status = %status, body = %body, "runtime error response");
                Err(RuntimeError::Status {
                    status: status.as_u16(),
                    body,
                })?;
                unreachable!()
            }

            let mut byte_stream = response.bytes_stream();
            let mut buffer = Vec::new();

            while let Some(chunk) = byte_stream.next().await {
                let chunk = chunk.map_err(|e| RuntimeError::Stream(format!("response body read: {e}")))?;
                buffer.extend_from_slice(&chunk);
                for line in drain_lines(&mut buffer)? {
                    yield line;
                }
            }

            // Final event without a trailing newline
            if !buffer.is_empty() {
                let rest = String::from_utf8(std::mem::take(&mut buffer))
                    .map_err(|e| RuntimeError::Stream(format!("utf8 decode: {e}")))?;
                if !rest.trim().is_empty() {
                    yield format!("{}\n", rest.trim_end());
                }
            }
        })
    }
}

/// Remove every complete line from `buffer`, keeping the trailing partial one.
///
/// Returned lines keep their `\n`; blank lines are dropped.
fn drain_lines(buffer: &mut Vec<u8>) -> Result<Vec<String>, RuntimeError> {
    let mut lines = Vec::new();
    while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
        let raw: Vec<u8> = buffer.drain(..=pos).collect();
        let line = String::from_utf8(raw)
            .map_err(|e| RuntimeError::Stream(format!("utf8 decode: {e}")))?;
        if !line.trim().is_empty() {
            lines.push(line);
        }
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_builder_types::invocation::ModelInfo;

    fn request() -> InvocationRequest {
        InvocationRequest {
            session_id: "s1".to_string(),
            messages: Vec::new(),
            system_prompt: "sys".to_string(),
            prompt: serde_json::json!("hi"),
            files: Vec::new(),
            model: ModelInfo {
                model_id: "m1".to_string(),
                region: "us-east-1".to_string(),
            },
            user_id: "alice".to_string(),
            mcp_servers: Vec::new(),
            agent_id: "a1".to_string(),
            code_execution_enabled: false,
            max_iterations: 20,
            cache_fields: Vec::new(),
        }
    }

    #[test]
    fn test_drain_lines_keeps_partial_tail() {
        let mut buffer = b"{\"a\":1}\n\n{\"b\":2}\n{\"c\"".to_vec();
        let lines = drain_lines(&mut buffer).unwrap();
        assert_eq!(lines, vec!["{\"a\":1}\n", "{\"b\":2}\n"]);
        assert_eq!(buffer, b"{\"c\"");
    }

    #[tokio::test]
    async fn test_unconfigured_runtime_fails_first_item() {
        let runtime = HttpAgentRuntime::new(&RuntimeConfig::default()).unwrap();
        assert!(!runtime.is_configured());

        let mut stream = runtime.invoke(request());
        let first = stream.next().await.unwrap();
        assert!(matches!(first, Err(RuntimeError::NotConfigured)));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_runtime_is_request_error() {
        // Bind then drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = RuntimeConfig {
            url: Some(format!("http://{addr}/invocations")),
            ..RuntimeConfig::default()
        };
        let runtime = HttpAgentRuntime::new(&config).unwrap();
        let mut stream = runtime.invoke(request());
        let first = stream.next().await.unwrap();
        assert!(matches!(first, Err(RuntimeError::Request(_))));
    }
}
