//! Cursor pagination types shared by the API and its clients.

use serde::{Deserialize, Serialize};

use crate::agent::AgentView;

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;

/// Hard ceiling on page size, applied server-side whatever the client asks.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// A caller's request for one page of a list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    pub limit: Option<u32>,
    /// Opaque continuation token from a previous page.
    pub next_token: Option<String>,
}

impl PageRequest {
    pub fn first(limit: u32) -> Self {
        Self {
            limit: Some(limit),
            next_token: None,
        }
    }

    pub fn after(limit: u32, next_token: impl Into<String>) -> Self {
        Self {
            limit: Some(limit),
            next_token: Some(next_token.into()),
        }
    }
}

/// One page of agents as returned by every list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPage {
    pub agents: Vec<AgentView>,
    /// Present only when more items remain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

impl AgentPage {
    pub fn has_more(&self) -> bool {
        self.next_token.is_some()
    }
}
