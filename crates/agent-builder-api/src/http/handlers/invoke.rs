//! Agent invocation handler.
//!
//! Streams the runtime's newline-delimited JSON events straight through to
//! the client.

use std::convert::Infallible;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use futures_util::StreamExt;

use agent_builder_types::invocation::InvokeAgentRequest;

use crate::http::error::AppError;
use crate::http::extractors::auth::Identity;
use crate::http::extractors::json::JsonBody;
use crate::state::AppState;

/// POST /agents/{id}/invoke - Run one turn of an agent.
///
/// The agent is resolved before the stream starts, so a missing or
/// invisible agent is still a normal 404. Runtime failures after that point
/// arrive as a final `internalServerException` event in a 200 stream.
pub async fn invoke_agent(
    State(state): State<AppState>,
    Identity(caller): Identity,
    Path(agent_id): Path<String>,
    JsonBody(body): JsonBody<InvokeAgentRequest>,
) -> Result<Response, AppError> {
    let view = state.agent_service.get_agent(&caller, &agent_id).await?;

    let lines = state
        .invocation_service
        .invoke(&view.agent, &caller, body)
        .map(Ok::<_, Infallible>);

    Ok((
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        Body::from_stream(lines),
    )
        .into_response())
}
