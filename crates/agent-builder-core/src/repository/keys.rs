//! Key layout of the agent table.
//!
//! | record   | pk                   | sk               |
//! |----------|----------------------|------------------|
//! | owner    | `user#<userId>`      | `agent#<agentId>`|
//! | public   | `public`             | `agent#<agentId>`|
//! | favorite | `favorite#<userId>`  | `agent#<agentId>`|

use agent_builder_types::agent::AgentId;
use agent_builder_types::storage::ItemKey;
use agent_builder_types::user::UserId;

/// Sort key prefix shared by every agent-scoped record.
pub const AGENT_SK_PREFIX: &str = "agent#";

/// Partition holding the public copies of all public agents.
pub const PUBLIC_PK: &str = "public";

/// Attribute holding the favorite counter on owner and public records.
pub const STAR_COUNT_ATTR: &str = "starCount";

pub fn owner_pk(user: &UserId) -> String {
    format!("user#{user}")
}

pub fn favorite_pk(user: &UserId) -> String {
    format!("favorite#{user}")
}

pub fn agent_sk(agent_id: &AgentId) -> String {
    format!("{AGENT_SK_PREFIX}{agent_id}")
}

pub fn owner_key(user: &UserId, agent_id: &AgentId) -> ItemKey {
    ItemKey::new(owner_pk(user), agent_sk(agent_id))
}

pub fn public_key(agent_id: &AgentId) -> ItemKey {
    ItemKey::new(PUBLIC_PK, agent_sk(agent_id))
}

pub fn favorite_key(user: &UserId, agent_id: &AgentId) -> ItemKey {
    ItemKey::new(favorite_pk(user), agent_sk(agent_id))
}
