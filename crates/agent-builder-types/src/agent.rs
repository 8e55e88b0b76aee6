//! Agent domain types.
//!
//! An [`Agent`] is the persisted configuration (prompt, model, tools,
//! visibility). [`AgentView`] is what callers receive: the agent plus the
//! read-time annotations (`isMyAgent`, `isFavorite`, `status`) that are never
//! stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use crate::user::UserId;

/// Unique identifier for an agent, wrapping a UUID v7 (time-sortable).
///
/// The hyphenated lowercase string form sorts lexicographically in creation
/// order, which is what makes "newest first" range queries work.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub Uuid);

impl AgentId {
    /// Create a new AgentId using UUID v7.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AgentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A stored agent: the attribute set shared by the owner record and its
/// public copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub agent_id: AgentId,
    /// Owner of the agent (the creating user).
    pub created_by: UserId,
    pub name: String,
    pub description: String,
    /// Instruction text sent to the model as the system prompt.
    pub system_prompt: String,
    pub model_id: String,
    /// Names of the external tool servers this agent may use.
    pub mcp_servers: Vec<String>,
    pub code_execution_enabled: bool,
    pub is_public: bool,
    pub tags: Vec<String>,
    /// Number of favorite pointers referencing this agent.
    pub star_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by_email: Option<String>,
}

impl Agent {
    /// Build a brand new agent owned by `owner` from request content.
    pub fn from_content(
        agent_id: AgentId,
        owner: UserId,
        owner_email: Option<String>,
        content: AgentContent,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            agent_id,
            created_by: owner,
            name: content.name,
            description: content.description,
            system_prompt: content.system_prompt,
            model_id: content.model_id,
            mcp_servers: content.mcp_servers,
            code_execution_enabled: content.code_execution_enabled,
            is_public: content.is_public,
            tags: content.tags,
            star_count: 0,
            created_at: now,
            updated_at: now,
            created_by_email: owner_email,
        }
    }

    /// Replace every content field, keeping identity, owner, counter and
    /// creation time.
    pub fn apply_content(&mut self, content: AgentContent, now: DateTime<Utc>) {
        self.name = content.name;
        self.description = content.description;
        self.system_prompt = content.system_prompt;
        self.model_id = content.model_id;
        self.mcp_servers = content.mcp_servers;
        self.code_execution_enabled = content.code_execution_enabled;
        self.is_public = content.is_public;
        self.tags = content.tags;
        self.updated_at = now;
    }

    /// The content fields of this agent, as a create/update payload.
    pub fn content(&self) -> AgentContent {
        AgentContent {
            name: self.name.clone(),
            description: self.description.clone(),
            system_prompt: self.system_prompt.clone(),
            model_id: self.model_id.clone(),
            mcp_servers: self.mcp_servers.clone(),
            code_execution_enabled: self.code_execution_enabled,
            is_public: self.is_public,
            tags: self.tags.clone(),
        }
    }

    /// Placeholder standing in for an agent that can no longer be shown.
    ///
    /// The id and owner are preserved; every content field is empty.
    pub fn placeholder(agent_id: AgentId, owner: UserId, at: DateTime<Utc>) -> Self {
        Self {
            agent_id,
            created_by: owner,
            name: String::new(),
            description: String::new(),
            system_prompt: String::new(),
            model_id: String::new(),
            mcp_servers: Vec::new(),
            code_execution_enabled: false,
            is_public: false,
            tags: Vec::new(),
            star_count: 0,
            created_at: at,
            updated_at: at,
            created_by_email: None,
        }
    }
}

/// The user-editable fields of an agent. Used as the body of create and
/// update (full replace) requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentContent {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub system_prompt: String,
    pub model_id: String,
    #[serde(default)]
    pub mcp_servers: Vec<String>,
    #[serde(default)]
    pub code_execution_enabled: bool,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Visibility of an agent from one caller's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    /// Readable by the caller.
    #[default]
    Active,
    /// Referenced by a favorite but no longer stored.
    Deleted,
    /// Stored, but neither owned by the caller nor public.
    Private,
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentStatus::Active => write!(f, "active"),
            AgentStatus::Deleted => write!(f, "deleted"),
            AgentStatus::Private => write!(f, "private"),
        }
    }
}

/// An agent annotated for a specific caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentView {
    #[serde(flatten)]
    pub agent: Agent,
    pub is_my_agent: bool,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub status: AgentStatus,
}

impl AgentView {
    /// Annotate an agent for `caller`.
    pub fn for_caller(agent: Agent, caller: &UserId, is_favorite: bool) -> Self {
        let is_my_agent = &agent.created_by == caller;
        Self {
            agent,
            is_my_agent,
            is_favorite,
            status: AgentStatus::Active,
        }
    }

    pub fn id(&self) -> &AgentId {
        &self.agent.agent_id
    }
}

/// Body of `POST /agents/clone`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloneAgentRequest {
    pub agent_id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Result of a favorite toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteToggle {
    pub is_favorite: bool,
}

/// A favorite pointer: the caller marked `agent_id` (owned by
/// `owner_user_id`) as a favorite at `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoritePointer {
    pub agent_id: AgentId,
    pub owner_user_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// Longest agent name accepted, in characters.
pub const MAX_NAME_LEN: usize = 100;

const CLONED_SUFFIX: &str = " (Cloned)";

/// Name given to a clone when the caller does not supply one.
///
/// The source name is shortened so the result stays within
/// [`MAX_NAME_LEN`].
pub fn cloned_name(source_name: &str) -> String {
    let room = MAX_NAME_LEN - CLONED_SUFFIX.chars().count();
    let base: String = source_name.trim().chars().take(room).collect();
    format!("{}{CLONED_SUFFIX}", base.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_content() -> AgentContent {
        AgentContent {
            name: "Helper".to_string(),
            description: String::new(),
            system_prompt: "Be concise".to_string(),
            model_id: "m1".to_string(),
            mcp_servers: vec!["time".to_string()],
            code_execution_enabled: false,
            is_public: false,
            tags: vec!["writing".to_string()],
        }
    }

    #[test]
    fn test_agent_id_display_parse() {
        let id = AgentId::new();
        let parsed: AgentId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_agent_ids_sort_by_creation() {
        let first = AgentId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = AgentId::new();
        assert!(first.to_string() < second.to_string());
    }

    #[test]
    fn test_content_defaults_on_deserialize() {
        let content: AgentContent =
            serde_json::from_str(r#"{"name":"Helper","modelId":"m1"}"#).unwrap();
        assert_eq!(content.name, "Helper");
        assert!(!content.is_public);
        assert!(content.tags.is_empty());
        assert!(content.system_prompt.is_empty());
    }

    #[test]
    fn test_apply_content_keeps_identity() {
        let now = Utc::now();
        let owner = UserId::new("alice");
        let mut agent = Agent::from_content(AgentId::new(), owner.clone(), None, sample_content(), now);
        agent.star_count = 3;
        let id = agent.agent_id.clone();

        let mut content = sample_content();
        content.name = "Renamed".to_string();
        content.is_public = true;
        agent.apply_content(content, now + chrono::Duration::seconds(5));

        assert_eq!(agent.agent_id, id);
        assert_eq!(agent.created_by, owner);
        assert_eq!(agent.star_count, 3);
        assert_eq!(agent.created_at, now);
        assert_eq!(agent.name, "Renamed");
        assert!(agent.is_public);
        assert!(agent.updated_at > agent.created_at);
    }

    #[test]
    fn test_view_serializes_flat_camel_case() {
        let agent = Agent::from_content(
            AgentId::new(),
            UserId::new("alice"),
            Some("alice@example.com".to_string()),
            sample_content(),
            Utc::now(),
        );
        let view = AgentView::for_caller(agent, &UserId::new("alice"), false);
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["name"], "Helper");
        assert_eq!(json["systemPrompt"], "Be concise");
        assert_eq!(json["isMyAgent"], true);
        assert_eq!(json["starCount"], 0);
        assert_eq!(json["status"], "active");
        assert_eq!(json["createdByEmail"], "alice@example.com");

        let back: AgentView = serde_json::from_value(json).unwrap();
        assert_eq!(back, view);
    }

    #[test]
    fn test_cloned_name() {
        assert_eq!(cloned_name("Helper"), "Helper (Cloned)");

        let long = "é".repeat(MAX_NAME_LEN);
        let name = cloned_name(&long);
        assert_eq!(name.chars().count(), MAX_NAME_LEN);
        assert!(name.ends_with(" (Cloned)"));
        assert!(name.starts_with("éé"));

        let padded = format!("{} tail", "a".repeat(90));
        assert_eq!(cloned_name(&padded), format!("{} (Cloned)", "a".repeat(90)));
    }
}
