//! Caller identity extractor.
//!
//! Authentication happens upstream: the authorizer in front of this service
//! injects the caller's user id (and optionally email) as request headers.
//! Header names come from `[identity]` in the config.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use agent_builder_types::error::AgentError;
use agent_builder_types::user::Caller;

use crate::http::error::AppError;
use crate::state::AppState;

/// The authenticated caller of a request.
pub struct Identity(pub Caller);

impl FromRequestParts<AppState> for Identity {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let identity = &state.config.identity;

        let user_id = header_value(parts, &identity.user_header)?.ok_or_else(|| {
            AppError::Agent(AgentError::Unauthorized(format!(
                "missing caller identity header '{}'",
                identity.user_header
            )))
        })?;

        let mut caller = Caller::new(user_id);
        if let Some(email) = header_value(parts, &identity.email_header)? {
            caller = caller.with_email(email);
        }
        Ok(Identity(caller))
    }
}

/// Trimmed, non-empty header value.
fn header_value(parts: &Parts, name: &str) -> Result<Option<String>, AppError> {
    let Some(value) = parts.headers.get(name) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| {
        AppError::Agent(AgentError::Unauthorized(format!(
            "invalid '{name}' header encoding"
        )))
    })?;
    let value = value.trim();
    Ok((!value.is_empty()).then(|| value.to_string()))
}
