//! Query parameter extractors for list endpoints.

use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use serde::Deserialize;

use agent_builder_types::page::PageRequest;

use crate::http::error::AppError;

/// Query parameters shared by every list endpoint.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    /// Maximum results; clamped server-side.
    pub limit: Option<u32>,
    /// Continuation token from the previous page.
    #[serde(alias = "exclusiveStartKey")]
    pub next_token: Option<String>,
}

/// Pagination request parsed from the query string.
///
/// Wraps `Query<ListQuery>` so malformed parameters produce the JSON error
/// body instead of axum's plain-text rejection.
pub struct Page(pub PageRequest);

impl<S: Send + Sync> FromRequestParts<S> for Page {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(query) = Query::<ListQuery>::from_request_parts(parts, state).await?;
        Ok(Page(PageRequest {
            limit: query.limit,
            next_token: query.next_token,
        }))
    }
}
