//! Agent CRUD and social handlers for the REST API.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use agent_builder_types::agent::{AgentContent, AgentView, CloneAgentRequest, FavoriteToggle};
use agent_builder_types::page::AgentPage;

use crate::http::error::AppError;
use crate::http::extractors::auth::Identity;
use crate::http::extractors::json::JsonBody;
use crate::http::extractors::query::Page;
use crate::state::AppState;

/// POST /agents - Create an agent owned by the caller.
pub async fn create_agent(
    State(state): State<AppState>,
    Identity(caller): Identity,
    JsonBody(body): JsonBody<AgentContent>,
) -> Result<(StatusCode, Json<AgentView>), AppError> {
    let agent = state.agent_service.create_agent(&caller, body).await?;
    Ok((StatusCode::CREATED, Json(agent)))
}

/// GET /agents - The caller's agents, annotated with favorite state.
pub async fn list_agents(
    State(state): State<AppState>,
    Identity(caller): Identity,
    Page(page): Page,
) -> Result<Json<AgentPage>, AppError> {
    let agents = state
        .agent_service
        .list_agents_with_favorites(&caller, &page)
        .await?;
    Ok(Json(agents))
}

/// GET /agents/my - The caller's agents.
pub async fn list_my_agents(
    State(state): State<AppState>,
    Identity(caller): Identity,
    Page(page): Page,
) -> Result<Json<AgentPage>, AppError> {
    let agents = state.agent_service.list_user_agents(&caller, &page).await?;
    Ok(Json(agents))
}

/// GET /agents/public - All public agents.
pub async fn list_public_agents(
    State(state): State<AppState>,
    Identity(caller): Identity,
    Page(page): Page,
) -> Result<Json<AgentPage>, AppError> {
    let agents = state.agent_service.list_public_agents(&caller, &page).await?;
    Ok(Json(agents))
}

/// GET /agents/favorites - The caller's favorites, including placeholders.
pub async fn list_favorite_agents(
    State(state): State<AppState>,
    Identity(caller): Identity,
    Page(page): Page,
) -> Result<Json<AgentPage>, AppError> {
    let agents = state
        .agent_service
        .list_favorite_agents(&caller, &page)
        .await?;
    Ok(Json(agents))
}

/// GET /agents/{id} - One agent the caller owns or that is public.
pub async fn get_agent(
    State(state): State<AppState>,
    Identity(caller): Identity,
    Path(agent_id): Path<String>,
) -> Result<Json<AgentView>, AppError> {
    let agent = state.agent_service.get_agent(&caller, &agent_id).await?;
    Ok(Json(agent))
}

/// PUT /agents/{id} - Replace the content of an owned agent.
pub async fn update_agent(
    State(state): State<AppState>,
    Identity(caller): Identity,
    Path(agent_id): Path<String>,
    JsonBody(body): JsonBody<AgentContent>,
) -> Result<Json<AgentView>, AppError> {
    let agent = state
        .agent_service
        .update_agent(&caller, &agent_id, body)
        .await?;
    Ok(Json(agent))
}

/// DELETE /agents/{id} - Delete an owned agent.
pub async fn delete_agent(
    State(state): State<AppState>,
    Identity(caller): Identity,
    Path(agent_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.agent_service.delete_agent(&caller, &agent_id).await?;
    Ok(Json(serde_json::json!({ "agentId": agent_id, "deleted": true })))
}

/// POST /agents/clone - Copy a readable agent into a new private agent.
pub async fn clone_agent(
    State(state): State<AppState>,
    Identity(caller): Identity,
    JsonBody(body): JsonBody<CloneAgentRequest>,
) -> Result<(StatusCode, Json<AgentView>), AppError> {
    let agent = state
        .agent_service
        .clone_agent(&caller, &body.agent_id, body.name)
        .await?;
    Ok((StatusCode::CREATED, Json(agent)))
}

/// POST /agents/{id}/favorite - Toggle the caller's favorite.
pub async fn toggle_favorite(
    State(state): State<AppState>,
    Identity(caller): Identity,
    Path(agent_id): Path<String>,
) -> Result<Json<FavoriteToggle>, AppError> {
    let toggle = state.agent_service.toggle_favorite(&caller, &agent_id).await?;
    Ok(Json(toggle))
}
