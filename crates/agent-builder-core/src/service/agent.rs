//! Agent management service.
//!
//! Validates caller identity and request payloads, then delegates to
//! [`AgentRepository`]. Typed errors from the repository pass through
//! unchanged.

use std::collections::HashSet;

use agent_builder_types::agent::{AgentContent, AgentId, AgentView, FavoriteToggle};
use agent_builder_types::error::AgentError;
use agent_builder_types::page::{AgentPage, PageRequest};
use agent_builder_types::user::{Caller, UserId};

use crate::repository::agent::AgentRepository;
use crate::storage::item_store::ItemStore;

pub use agent_builder_types::agent::MAX_NAME_LEN;

pub const MAX_DESCRIPTION_LEN: usize = 1_000;
pub const MAX_SYSTEM_PROMPT_LEN: usize = 20_000;
pub const MAX_MODEL_ID_LEN: usize = 200;
pub const MAX_TAGS: usize = 20;
pub const MAX_TAG_LEN: usize = 50;
pub const MAX_MCP_SERVERS: usize = 20;

/// Service orchestrating the agent lifecycle for authenticated callers.
///
/// Generic over the item store so the same logic runs against SQLite in the
/// server and the in-memory store in tests.
pub struct AgentService<S: ItemStore> {
    repo: AgentRepository<S>,
    /// Tool servers agents may reference. Empty means unrestricted.
    available_mcp_servers: HashSet<String>,
}

impl<S: ItemStore> AgentService<S> {
    pub fn new(repo: AgentRepository<S>, available_mcp_servers: Vec<String>) -> Self {
        Self {
            repo,
            available_mcp_servers: available_mcp_servers.into_iter().collect(),
        }
    }

    pub async fn create_agent(
        &self,
        caller: &Caller,
        content: AgentContent,
    ) -> Result<AgentView, AgentError> {
        validate_caller(&caller.user_id)?;
        let content = self.validate_content(content)?;
        self.repo.create_agent(caller, content).await
    }

    pub async fn get_agent(&self, caller: &Caller, agent_id: &str) -> Result<AgentView, AgentError> {
        validate_caller(&caller.user_id)?;
        let agent_id = parse_agent_id(agent_id)?;
        self.repo.get_agent(&caller.user_id, &agent_id).await
    }

    pub async fn update_agent(
        &self,
        caller: &Caller,
        agent_id: &str,
        content: AgentContent,
    ) -> Result<AgentView, AgentError> {
        validate_caller(&caller.user_id)?;
        let agent_id = parse_agent_id(agent_id)?;
        let content = self.validate_content(content)?;
        self.repo
            .update_agent(&caller.user_id, &agent_id, content)
            .await
    }

    pub async fn delete_agent(&self, caller: &Caller, agent_id: &str) -> Result<(), AgentError> {
        validate_caller(&caller.user_id)?;
        let agent_id = parse_agent_id(agent_id)?;
        self.repo.delete_agent(&caller.user_id, &agent_id).await
    }

    pub async fn list_user_agents(
        &self,
        caller: &Caller,
        page: &PageRequest,
    ) -> Result<AgentPage, AgentError> {
        validate_caller(&caller.user_id)?;
        self.repo.list_user_agents(&caller.user_id, page).await
    }

    pub async fn list_agents_with_favorites(
        &self,
        caller: &Caller,
        page: &PageRequest,
    ) -> Result<AgentPage, AgentError> {
        validate_caller(&caller.user_id)?;
        self.repo
            .list_agents_with_favorites(&caller.user_id, page)
            .await
    }

    pub async fn list_public_agents(
        &self,
        caller: &Caller,
        page: &PageRequest,
    ) -> Result<AgentPage, AgentError> {
        validate_caller(&caller.user_id)?;
        self.repo
            .list_public_agents_paginated(&caller.user_id, page)
            .await
    }

    pub async fn list_favorite_agents(
        &self,
        caller: &Caller,
        page: &PageRequest,
    ) -> Result<AgentPage, AgentError> {
        validate_caller(&caller.user_id)?;
        self.repo.list_favorite_agents(&caller.user_id, page).await
    }

    pub async fn toggle_favorite(
        &self,
        caller: &Caller,
        agent_id: &str,
    ) -> Result<FavoriteToggle, AgentError> {
        validate_caller(&caller.user_id)?;
        let agent_id = parse_agent_id(agent_id)?;
        self.repo.toggle_favorite(&caller.user_id, &agent_id).await
    }

    pub async fn clone_agent(
        &self,
        caller: &Caller,
        source_id: &str,
        name: Option<String>,
    ) -> Result<AgentView, AgentError> {
        validate_caller(&caller.user_id)?;
        let source_id = parse_agent_id(source_id)?;
        let name = name.map(|n| validate_name(&n)).transpose()?;
        self.repo.clone_agent(caller, &source_id, name).await
    }

    /// Check and normalize a create/update payload.
    ///
    /// Text fields are trimmed where surrounding whitespace carries no
    /// meaning; duplicate tags and tool servers are dropped, keeping the
    /// first occurrence.
    pub fn validate_content(&self, content: AgentContent) -> Result<AgentContent, AgentError> {
        let name = validate_name(&content.name)?;

        if content.description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(AgentError::validation(format!(
                "description must be at most {MAX_DESCRIPTION_LEN} characters"
            )));
        }
        if content.system_prompt.chars().count() > MAX_SYSTEM_PROMPT_LEN {
            return Err(AgentError::validation(format!(
                "systemPrompt must be at most {MAX_SYSTEM_PROMPT_LEN} characters"
            )));
        }

        let model_id = content.model_id.trim().to_string();
        if model_id.is_empty() {
            return Err(AgentError::validation("modelId is required"));
        }
        if model_id.chars().count() > MAX_MODEL_ID_LEN {
            return Err(AgentError::validation(format!(
                "modelId must be at most {MAX_MODEL_ID_LEN} characters"
            )));
        }

        let mut tags = Vec::new();
        for tag in dedupe(&content.tags) {
            let len = tag.chars().count();
            if len == 0 || len > MAX_TAG_LEN {
                return Err(AgentError::validation(format!(
                    "tags must be 1-{MAX_TAG_LEN} characters"
                )));
            }
            tags.push(tag);
        }
        if tags.len() > MAX_TAGS {
            return Err(AgentError::validation(format!(
                "at most {MAX_TAGS} tags are allowed"
            )));
        }

        let mcp_servers = dedupe(&content.mcp_servers);
        if mcp_servers.len() > MAX_MCP_SERVERS {
            return Err(AgentError::validation(format!(
                "at most {MAX_MCP_SERVERS} MCP servers are allowed"
            )));
        }
        for server in &mcp_servers {
            if server.is_empty() {
                return Err(AgentError::validation("MCP server names must not be empty"));
            }
            if !self.available_mcp_servers.is_empty() && !self.available_mcp_servers.contains(server) {
                return Err(AgentError::validation(format!(
                    "unknown MCP server '{server}'"
                )));
            }
        }

        Ok(AgentContent {
            name,
            description: content.description,
            system_prompt: content.system_prompt,
            model_id,
            mcp_servers,
            code_execution_enabled: content.code_execution_enabled,
            is_public: content.is_public,
            tags,
        })
    }
}

/// Reject identities that cannot safely be used as key components.
pub fn validate_caller(user_id: &UserId) -> Result<(), AgentError> {
    if user_id.is_well_formed() {
        Ok(())
    } else {
        Err(AgentError::Unauthorized("invalid caller identity".to_string()))
    }
}

/// Parse an agent id from a path or body. Anything that is not a UUID cannot
/// name an agent, so it reports as not found.
pub fn parse_agent_id(raw: &str) -> Result<AgentId, AgentError> {
    raw.trim()
        .parse::<AgentId>()
        .map_err(|_| AgentError::not_found(raw))
}

fn validate_name(raw: &str) -> Result<String, AgentError> {
    let name = raw.trim();
    let len = name.chars().count();
    if len == 0 {
        return Err(AgentError::validation("name is required"));
    }
    if len > MAX_NAME_LEN {
        return Err(AgentError::validation(format!(
            "name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

/// Trim each entry and drop repeats, keeping first-seen order.
fn dedupe(values: &[String]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(values.len());
    values
        .iter()
        .map(|v| v.trim().to_string())
        .filter(|v| seen.insert(v.clone()))
        .collect()
}
