//! REST API access.
//!
//! [`AgentApi`] is the seam the cache store talks through; [`HttpAgentApi`]
//! implements it with `reqwest` against a running server.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use agent_builder_types::agent::{AgentContent, AgentId, AgentView, CloneAgentRequest, FavoriteToggle};
use agent_builder_types::config::IdentityConfig;
use agent_builder_types::invocation::InvokeAgentRequest;
use agent_builder_types::page::{AgentPage, PageRequest};
use futures_util::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::cache::ListKind;
use crate::error::ClientError;

/// Default request timeout in seconds. Invocation streams are not bounded by it.
pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Event lines of a streamed invocation.
pub type InvocationLines = Pin<Box<dyn Stream<Item = Result<String, ClientError>> + Send>>;

/// Agent operations used by [`crate::store::AgentStore`].
pub trait AgentApi: Send + Sync + 'static {
    fn list_agents(
        &self,
        kind: ListKind,
        page: &PageRequest,
    ) -> impl Future<Output = Result<AgentPage, ClientError>> + Send;

    fn get_agent(
        &self,
        agent_id: &AgentId,
    ) -> impl Future<Output = Result<AgentView, ClientError>> + Send;

    fn create_agent(
        &self,
        content: &AgentContent,
    ) -> impl Future<Output = Result<AgentView, ClientError>> + Send;

    fn update_agent(
        &self,
        agent_id: &AgentId,
        content: &AgentContent,
    ) -> impl Future<Output = Result<AgentView, ClientError>> + Send;

    fn delete_agent(&self, agent_id: &AgentId)
    -> impl Future<Output = Result<(), ClientError>> + Send;

    fn clone_agent(
        &self,
        request: &CloneAgentRequest,
    ) -> impl Future<Output = Result<AgentView, ClientError>> + Send;

    fn toggle_favorite(
        &self,
        agent_id: &AgentId,
    ) -> impl Future<Output = Result<FavoriteToggle, ClientError>> + Send;
}

/// Error body returned by the server.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: String,
    #[serde(default)]
    current_version: Option<i64>,
}

/// HTTP implementation of [`AgentApi`].
///
/// Every request carries the identity headers the server expects from its
/// upstream authorizer.
pub struct HttpAgentApi {
    client: reqwest::Client,
    base_url: String,
    user_id: String,
    email: Option<String>,
    identity: IdentityConfig,
}

impl HttpAgentApi {
    pub fn new(base_url: impl Into<String>, user_id: impl Into<String>) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ClientError::Request(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_id: user_id.into(),
            email: None,
            identity: IdentityConfig::default(),
        })
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Use non-default identity header names.
    pub fn with_identity_headers(mut self, identity: IdentityConfig) -> Self {
        self.identity = identity;
        self
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method, self.url(path))
            .header(self.identity.user_header.as_str(), &self.user_id);
        if let Some(email) = &self.email {
            builder = builder.header(self.identity.email_header.as_str(), email);
        }
        builder
    }

    async fn send<T: DeserializeOwned>(&self, builder: reqwest::RequestBuilder) -> Result<T, ClientError> {
        let response = builder
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Stream the event lines of one invocation turn.
    ///
    /// Lines are yielded as sent by the server, including the terminal
    /// error event if the runtime fails mid-stream.
    pub async fn invoke_agent(
        &self,
        agent_id: &AgentId,
        turn: &InvokeAgentRequest,
    ) -> Result<InvocationLines, ClientError> {
        let response = self
            .request(reqwest::Method::POST, &format!("/agents/{agent_id}/invoke"))
            .header("Accept", "application/x-ndjson")
            .json(turn)
            .send()
            .await?;
        let response = check_status(response).await?;

        let mut bytes = response.bytes_stream();
        Ok(Box::pin(async_stream::try_stream! {
            let mut buffer = String::new();
            while let Some(chunk) = bytes.next().await {
                let chunk = chunk.map_err(|e| ClientError::Request(e.to_string()))?;
                buffer.push_str(&String::from_utf8_lossy(&chunk));
                while let Some(pos) = buffer.find('\n') {
                    let line: String = buffer.drain(..=pos).collect();
                    if !line.trim().is_empty() {
                        yield line.trim_end().to_string();
                    }
                }
            }
            if !buffer.trim().is_empty() {
                yield buffer.trim_end().to_string();
            }
        }))
    }
}

/// Turn a non-success response into [`ClientError::Api`].
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let (message, current_version) = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => (body.error, body.current_version),
        Err(_) => (text.chars().take(200).collect(), None),
    };
    tracing::debug!(status = status.as_u16(), %message, "api error response");

    Err(ClientError::Api {
        status: status.as_u16(),
        message,
        current_version,
    })
}

/// Query string for a page request.
fn page_query(page: &PageRequest) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();
    if let Some(limit) = page.limit {
        query.push(("limit", limit.to_string()));
    }
    if let Some(token) = &page.next_token {
        query.push(("nextToken", token.clone()));
    }
    query
}

impl AgentApi for HttpAgentApi {
    async fn list_agents(&self, kind: ListKind, page: &PageRequest) -> Result<AgentPage, ClientError> {
        let builder = self
            .request(reqwest::Method::GET, kind.path())
            .query(&page_query(page));
        self.send(builder).await
    }

    async fn get_agent(&self, agent_id: &AgentId) -> Result<AgentView, ClientError> {
        let builder = self.request(reqwest::Method::GET, &format!("/agents/{agent_id}"));
        self.send(builder).await
    }

    async fn create_agent(&self, content: &AgentContent) -> Result<AgentView, ClientError> {
        let builder = self.request(reqwest::Method::POST, "/agents").json(content);
        self.send(builder).await
    }

    async fn update_agent(
        &self,
        agent_id: &AgentId,
        content: &AgentContent,
    ) -> Result<AgentView, ClientError> {
        let builder = self
            .request(reqwest::Method::PUT, &format!("/agents/{agent_id}"))
            .json(content);
        self.send(builder).await
    }

    async fn delete_agent(&self, agent_id: &AgentId) -> Result<(), ClientError> {
        let response = self
            .request(reqwest::Method::DELETE, &format!("/agents/{agent_id}"))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn clone_agent(&self, request: &CloneAgentRequest) -> Result<AgentView, ClientError> {
        let builder = self.request(reqwest::Method::POST, "/agents/clone").json(request);
        self.send(builder).await
    }

    async fn toggle_favorite(&self, agent_id: &AgentId) -> Result<FavoriteToggle, ClientError> {
        let builder = self.request(reqwest::Method::POST, &format!("/agents/{agent_id}/favorite"));
        self.send(builder).await
    }
}
