//! Opaque page tokens.
//!
//! A token is the URL-safe base64 of the store's continuation key. Callers
//! must treat it as opaque; on the way back in, a token for a different
//! partition than the one being listed is rejected.

use agent_builder_types::error::AgentError;
use agent_builder_types::storage::ItemKey;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

pub fn encode(key: &ItemKey) -> Result<String, AgentError> {
    let json = serde_json::to_vec(key)
        .map_err(|e| AgentError::Storage(format!("failed to encode page token: {e}")))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

/// Decode `token` into a continuation key inside partition `pk`.
pub fn decode(token: &str, pk: &str) -> Result<ItemKey, AgentError> {
    let invalid = || AgentError::validation("invalid nextToken");

    let bytes = URL_SAFE_NO_PAD.decode(token.trim()).map_err(|_| invalid())?;
    let key: ItemKey = serde_json::from_slice(&bytes).map_err(|_| invalid())?;
    if key.pk != pk {
        return Err(invalid());
    }
    Ok(key)
}

/// Decode an optional token.
pub fn decode_opt(token: Option<&str>, pk: &str) -> Result<Option<ItemKey>, AgentError> {
    match token {
        Some(t) if !t.trim().is_empty() => decode(t, pk).map(Some),
        _ => Ok(None),
    }
}
