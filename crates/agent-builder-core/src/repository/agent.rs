//! Agent repository.
//!
//! Translates agent operations into item store reads and writes while keeping
//! the three record kinds consistent:
//!
//! - the owner record (source of truth),
//! - the public copy (present iff the agent is public),
//! - favorite pointers (one per favoriting user, may dangle after deletion).
//!
//! Every write that touches more than one item goes through
//! [`ItemStore::transact_write`], so owner + public copy and pointer +
//! counters change together or not at all.

use std::collections::{HashMap, HashSet};

use agent_builder_types::agent::{
    cloned_name, Agent, AgentContent, AgentId, AgentStatus, AgentView, FavoritePointer,
    FavoriteToggle,
};
use agent_builder_types::config::PaginationConfig;
use agent_builder_types::error::AgentError;
use agent_builder_types::page::{AgentPage, PageRequest};
use agent_builder_types::storage::{Item, ItemKey, ItemQuery, WriteCondition, WriteOp};
use agent_builder_types::user::{Caller, UserId};
use chrono::Utc;
use tracing::{debug, info, warn};

use super::cursor;
use super::keys::{
    favorite_key, favorite_pk, owner_key, owner_pk, public_key, AGENT_SK_PREFIX, PUBLIC_PK,
    STAR_COUNT_ATTR,
};
use crate::storage::item_store::ItemStore;

/// Repository for agents, their public copies, and favorite pointers.
pub struct AgentRepository<S: ItemStore> {
    store: S,
    pagination: PaginationConfig,
}

impl<S: ItemStore> AgentRepository<S> {
    pub fn new(store: S, pagination: PaginationConfig) -> Self {
        Self { store, pagination }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create an agent owned by `owner`, plus its public copy when public.
    pub async fn create_agent(
        &self,
        owner: &Caller,
        content: AgentContent,
    ) -> Result<AgentView, AgentError> {
        let agent = Agent::from_content(
            AgentId::new(),
            owner.user_id.clone(),
            owner.email.clone(),
            content,
            Utc::now(),
        );
        let data = agent_to_data(&agent)?;

        let mut ops = vec![WriteOp::Put {
            item: Item::new(owner_key(&owner.user_id, &agent.agent_id), data.clone()),
            condition: WriteCondition::NotExists,
        }];
        if agent.is_public {
            ops.push(WriteOp::put(Item::new(public_key(&agent.agent_id), data)));
        }
        self.store.transact_write(ops).await?;

        info!(
            agent_id = %agent.agent_id,
            caller = %owner.user_id,
            public = agent.is_public,
            "agent created"
        );
        Ok(AgentView::for_caller(agent, &owner.user_id, false))
    }

    /// Read an agent the caller owns or that is public.
    ///
    /// The caller's own copy wins when both exist.
    pub async fn get_agent(
        &self,
        caller: &UserId,
        agent_id: &AgentId,
    ) -> Result<AgentView, AgentError> {
        let own_key = owner_key(caller, agent_id);
        let pub_key = public_key(agent_id);
        let fav_key = favorite_key(caller, agent_id);
        let fetched = self
            .fetch(vec![own_key.clone(), pub_key.clone(), fav_key.clone()])
            .await?;

        let own = fetched.get(&own_key).map(agent_from_item).transpose()?;
        let public = fetched.get(&pub_key).map(agent_from_item).transpose()?;
        let agent = visible(own, public).ok_or_else(|| AgentError::not_found(agent_id))?;

        Ok(AgentView::for_caller(
            agent,
            caller,
            fetched.contains_key(&fav_key),
        ))
    }

    /// Replace the content of an agent the caller owns and bring the public
    /// copy in line with the new visibility.
    pub async fn update_agent(
        &self,
        caller: &UserId,
        agent_id: &AgentId,
        content: AgentContent,
    ) -> Result<AgentView, AgentError> {
        let own_key = owner_key(caller, agent_id);
        let pub_key = public_key(agent_id);
        let fav_key = favorite_key(caller, agent_id);
        let fetched = self
            .fetch(vec![own_key.clone(), pub_key.clone(), fav_key.clone()])
            .await?;
        let public_exists = fetched.contains_key(&pub_key);

        let Some(item) = fetched.get(&own_key) else {
            return Err(denied(caller, agent_id, public_exists));
        };
        let mut agent = agent_from_item(item)?;
        let was_public = agent.is_public;
        agent.apply_content(content, Utc::now());

        // Only content fields are written to existing records so concurrent
        // counter updates are not overwritten. Every branch writes the public
        // key, so the owner record and the public copy always come from the
        // same transaction. A public copy removed since the read fails the
        // merge with a conflict.
        let fields = content_fields(&agent)?;
        let mut ops = vec![WriteOp::merge(own_key, fields.clone(), WriteCondition::Exists)];
        if !agent.is_public {
            ops.push(WriteOp::delete(pub_key));
        } else if public_exists {
            ops.push(WriteOp::merge(pub_key, fields, WriteCondition::Exists));
        } else {
            ops.push(WriteOp::put(Item::new(pub_key, agent_to_data(&agent)?)));
        }
        self.store.transact_write(ops).await?;

        info!(
            agent_id = %agent_id,
            caller = %caller,
            public = agent.is_public,
            was_public,
            "agent updated"
        );
        Ok(AgentView::for_caller(
            agent,
            caller,
            fetched.contains_key(&fav_key),
        ))
    }

    /// Delete an agent the caller owns, and its public copy.
    ///
    /// Other users' favorite pointers are left in place and will list as
    /// deleted.
    pub async fn delete_agent(&self, caller: &UserId, agent_id: &AgentId) -> Result<(), AgentError> {
        let own_key = owner_key(caller, agent_id);
        let pub_key = public_key(agent_id);
        let fetched = self.fetch(vec![own_key.clone(), pub_key.clone()]).await?;
        let public_exists = fetched.contains_key(&pub_key);

        let Some(item) = fetched.get(&own_key) else {
            return Err(denied(caller, agent_id, public_exists));
        };
        let agent = agent_from_item(item)?;

        let mut ops = vec![WriteOp::Delete {
            key: own_key,
            condition: WriteCondition::Exists,
        }];
        if agent.is_public || public_exists {
            ops.push(WriteOp::delete(pub_key));
        }
        self.store.transact_write(ops).await?;

        info!(agent_id = %agent_id, caller = %caller, "agent deleted");
        Ok(())
    }

    /// The caller's own agents, newest first.
    pub async fn list_user_agents(
        &self,
        caller: &UserId,
        page: &PageRequest,
    ) -> Result<AgentPage, AgentError> {
        let (items, next_token) = self.query_page(owner_pk(caller), page).await?;
        let agents = items
            .iter()
            .map(|item| agent_from_item(item).map(|a| AgentView::for_caller(a, caller, false)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(AgentPage { agents, next_token })
    }

    /// The caller's own agents, annotated with favorite state.
    pub async fn list_agents_with_favorites(
        &self,
        caller: &UserId,
        page: &PageRequest,
    ) -> Result<AgentPage, AgentError> {
        let (items, next_token) = self.query_page(owner_pk(caller), page).await?;
        let agents = self.annotate(caller, &items).await?;
        Ok(AgentPage { agents, next_token })
    }

    /// All public agents, newest first, annotated for the caller.
    ///
    /// Only the favorite pointers for the returned ids are read, never the
    /// caller's whole favorite set.
    pub async fn list_public_agents_paginated(
        &self,
        caller: &UserId,
        page: &PageRequest,
    ) -> Result<AgentPage, AgentError> {
        let (items, next_token) = self.query_page(PUBLIC_PK.to_string(), page).await?;
        let agents = self.annotate(caller, &items).await?;
        Ok(AgentPage { agents, next_token })
    }

    /// The caller's favorites in pointer order.
    ///
    /// Pointers whose agent is gone become `deleted` placeholders; pointers
    /// to agents that still exist but are no longer visible become `private`
    /// placeholders. Nothing is dropped.
    pub async fn list_favorite_agents(
        &self,
        caller: &UserId,
        page: &PageRequest,
    ) -> Result<AgentPage, AgentError> {
        let (items, next_token) = self.query_page(favorite_pk(caller), page).await?;
        let pointers = items
            .iter()
            .map(pointer_from_item)
            .collect::<Result<Vec<_>, _>>()?;

        let mut keys = Vec::with_capacity(pointers.len() * 2);
        for p in &pointers {
            if &p.owner_user_id == caller {
                keys.push(owner_key(caller, &p.agent_id));
            } else {
                keys.push(public_key(&p.agent_id));
                keys.push(owner_key(&p.owner_user_id, &p.agent_id));
            }
        }
        let fetched = self.fetch(keys).await?;

        let mut agents = Vec::with_capacity(pointers.len());
        for p in &pointers {
            let origin = owner_key(&p.owner_user_id, &p.agent_id);
            let resolved = if &p.owner_user_id == caller {
                fetched.get(&origin)
            } else {
                fetched
                    .get(&public_key(&p.agent_id))
                    .filter(|item| item.data["isPublic"].as_bool().unwrap_or(false))
            };

            let view = match resolved.map(agent_from_item) {
                Some(Ok(agent)) => AgentView::for_caller(agent, caller, true),
                Some(Err(e)) => {
                    warn!(agent_id = %p.agent_id, error = %e, "unreadable favorite target");
                    placeholder(p, caller, AgentStatus::Deleted)
                }
                None if fetched.contains_key(&origin) => placeholder(p, caller, AgentStatus::Private),
                None => placeholder(p, caller, AgentStatus::Deleted),
            };
            agents.push(view);
        }

        Ok(AgentPage { agents, next_token })
    }

    /// Flip the caller's favorite on an agent and adjust the counters.
    pub async fn toggle_favorite(
        &self,
        caller: &UserId,
        agent_id: &AgentId,
    ) -> Result<FavoriteToggle, AgentError> {
        let fav_key = favorite_key(caller, agent_id);
        let own_key = owner_key(caller, agent_id);
        let pub_key = public_key(agent_id);
        let fetched = self
            .fetch(vec![fav_key.clone(), own_key.clone(), pub_key.clone()])
            .await?;
        let public_exists = fetched.contains_key(&pub_key);

        if let Some(item) = fetched.get(&fav_key) {
            let pointer = pointer_from_item(item)?;
            // Counter adds on missing records are skipped, so removing a
            // favorite of a deleted agent only drops the pointer.
            let mut ops = vec![
                WriteOp::Delete {
                    key: fav_key,
                    condition: WriteCondition::Exists,
                },
                WriteOp::add(
                    owner_key(&pointer.owner_user_id, agent_id),
                    STAR_COUNT_ATTR,
                    -1,
                ),
            ];
            if public_exists {
                ops.push(WriteOp::add(pub_key, STAR_COUNT_ATTR, -1));
            }
            self.store.transact_write(ops).await?;

            debug!(agent_id = %agent_id, caller = %caller, "favorite removed");
            return Ok(FavoriteToggle { is_favorite: false });
        }

        let own = fetched.get(&own_key).map(agent_from_item).transpose()?;
        let public = fetched.get(&pub_key).map(agent_from_item).transpose()?;
        let agent = visible(own, public).ok_or_else(|| AgentError::not_found(agent_id))?;

        let pointer = FavoritePointer {
            agent_id: agent_id.clone(),
            owner_user_id: agent.created_by.clone(),
            created_at: Utc::now(),
        };
        let pointer_data = serde_json::to_value(&pointer)
            .map_err(|e| AgentError::Storage(format!("failed to encode favorite: {e}")))?;

        let mut ops = vec![
            WriteOp::Put {
                item: Item::new(fav_key, pointer_data),
                condition: WriteCondition::NotExists,
            },
            WriteOp::add(
                owner_key(&agent.created_by, agent_id),
                STAR_COUNT_ATTR,
                1,
            ),
        ];
        if public_exists {
            ops.push(WriteOp::add(pub_key, STAR_COUNT_ATTR, 1));
        }
        self.store.transact_write(ops).await?;

        debug!(agent_id = %agent_id, caller = %caller, "favorite added");
        Ok(FavoriteToggle { is_favorite: true })
    }

    /// Copy an agent the caller can read into a new private agent they own.
    pub async fn clone_agent(
        &self,
        caller: &Caller,
        source_id: &AgentId,
        name_override: Option<String>,
    ) -> Result<AgentView, AgentError> {
        let source = self.get_agent(&caller.user_id, source_id).await?;

        let mut content = source.agent.content();
        content.is_public = false;
        content.name = match name_override {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => cloned_name(&source.agent.name),
        };

        let cloned = self.create_agent(caller, content).await?;
        info!(
            source_id = %source_id,
            agent_id = %cloned.agent.agent_id,
            caller = %caller.user_id,
            "agent cloned"
        );
        Ok(cloned)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Batched read keyed by item key.
    async fn fetch(&self, keys: Vec<ItemKey>) -> Result<HashMap<ItemKey, Item>, AgentError> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }
        let mut unique = Vec::with_capacity(keys.len());
        let mut seen = HashSet::with_capacity(keys.len());
        for key in keys {
            if seen.insert(key.clone()) {
                unique.push(key);
            }
        }

        let items = self.store.batch_get(&unique).await?;
        Ok(items.into_iter().map(|i| (i.key.clone(), i)).collect())
    }

    /// One newest-first page of agent-scoped records in partition `pk`.
    async fn query_page(
        &self,
        pk: String,
        page: &PageRequest,
    ) -> Result<(Vec<Item>, Option<String>), AgentError> {
        let limit = self.pagination.clamp(page.limit);
        let exclusive_start = cursor::decode_opt(page.next_token.as_deref(), &pk)?;

        let result = self
            .store
            .query(&ItemQuery {
                pk,
                sk_prefix: AGENT_SK_PREFIX.to_string(),
                limit,
                exclusive_start,
                descending: true,
            })
            .await?;

        let next_token = result.last_key.as_ref().map(cursor::encode).transpose()?;
        Ok((result.items, next_token))
    }

    /// Decode agent records and mark the ones the caller has favorited.
    async fn annotate(&self, caller: &UserId, items: &[Item]) -> Result<Vec<AgentView>, AgentError> {
        let agents = items
            .iter()
            .map(agent_from_item)
            .collect::<Result<Vec<_>, _>>()?;

        let keys: Vec<ItemKey> = agents
            .iter()
            .map(|a| favorite_key(caller, &a.agent_id))
            .collect();
        let favorites = self.fetch(keys).await?;

        Ok(agents
            .into_iter()
            .map(|a| {
                let is_favorite = favorites.contains_key(&favorite_key(caller, &a.agent_id));
                AgentView::for_caller(a, caller, is_favorite)
            })
            .collect())
    }
}

/// Own copy first, else the public copy if it is still public.
fn visible(own: Option<Agent>, public: Option<Agent>) -> Option<Agent> {
    own.or_else(|| public.filter(|a| a.is_public))
}

/// Error for a mutation on an agent the caller does not own.
fn denied(caller: &UserId, agent_id: &AgentId, visible_publicly: bool) -> AgentError {
    if visible_publicly {
        AgentError::forbidden(agent_id, caller)
    } else {
        AgentError::not_found(agent_id)
    }
}

fn placeholder(pointer: &FavoritePointer, caller: &UserId, status: AgentStatus) -> AgentView {
    AgentView {
        agent: Agent::placeholder(
            pointer.agent_id.clone(),
            pointer.owner_user_id.clone(),
            pointer.created_at,
        ),
        is_my_agent: &pointer.owner_user_id == caller,
        is_favorite: true,
        status,
    }
}

fn agent_to_data(agent: &Agent) -> Result<serde_json::Value, AgentError> {
    serde_json::to_value(agent).map_err(|e| AgentError::Storage(format!("failed to encode agent: {e}")))
}

fn agent_from_item(item: &Item) -> Result<Agent, AgentError> {
    serde_json::from_value(item.data.clone()).map_err(|e| {
        AgentError::Storage(format!(
            "invalid agent record {}/{}: {e}",
            item.key.pk, item.key.sk
        ))
    })
}

fn pointer_from_item(item: &Item) -> Result<FavoritePointer, AgentError> {
    serde_json::from_value(item.data.clone()).map_err(|e| {
        AgentError::Storage(format!(
            "invalid favorite record {}/{}: {e}",
            item.key.pk, item.key.sk
        ))
    })
}

/// Content attributes plus `updatedAt`, for in-place updates.
fn content_fields(
    agent: &Agent,
) -> Result<serde_json::Map<String, serde_json::Value>, AgentError> {
    let mut fields = match serde_json::to_value(agent.content()) {
        Ok(serde_json::Value::Object(map)) => map,
        Ok(_) => return Err(AgentError::Storage("agent content is not an object".to_string())),
        Err(e) => return Err(AgentError::Storage(format!("failed to encode agent: {e}"))),
    };
    let updated_at = serde_json::to_value(agent.updated_at)
        .map_err(|e| AgentError::Storage(format!("failed to encode timestamp: {e}")))?;
    fields.insert("updatedAt".to_string(), updated_at);
    Ok(fields)
}
