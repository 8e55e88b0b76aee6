//! Optimistic agent store.
//!
//! Every mutation rewrites the cache first, then calls the API. A confirmed
//! result that matches the guess keeps the optimistic state and schedules a
//! background refresh; a result that disagrees forces an immediate refetch of
//! all three lists. Failures also refetch and emit a [`Notice`].
//!
//! The cache mutex is never held across an `.await`. Concurrent fetches of
//! the same list are not deduplicated: the last response applied wins.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use agent_builder_types::agent::{
    cloned_name, Agent, AgentContent, AgentId, AgentView, CloneAgentRequest,
};
use agent_builder_types::user::UserId;
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::api::AgentApi;
use crate::cache::{AgentCache, ListKind, ListSnapshot};
use crate::error::ClientError;

/// Default number of agents requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// A mutation kind, for notices and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Create,
    Update,
    Delete,
    Clone,
    ToggleFavorite,
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mutation::Create => write!(f, "create agent"),
            Mutation::Update => write!(f, "update agent"),
            Mutation::Delete => write!(f, "delete agent"),
            Mutation::Clone => write!(f, "clone agent"),
            Mutation::ToggleFavorite => write!(f, "toggle favorite"),
        }
    }
}

/// User-visible message about a failed mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub mutation: Mutation,
    pub message: String,
}

/// Outcome of comparing a confirmed result with the optimistic guess.
enum Reconcile {
    Matched,
    Diverged,
}

/// Cached, optimistic access to the agent lists of one user.
pub struct AgentStore<A: AgentApi> {
    api: Arc<A>,
    cache: Arc<Mutex<AgentCache>>,
    notices: mpsc::UnboundedSender<Notice>,
    user_id: UserId,
    page_size: u32,
}

impl<A: AgentApi> Clone for AgentStore<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            cache: Arc::clone(&self.cache),
            notices: self.notices.clone(),
            user_id: self.user_id.clone(),
            page_size: self.page_size,
        }
    }
}

impl<A: AgentApi> AgentStore<A> {
    /// Create a store acting as `user_id`. The receiver yields failure notices.
    pub fn new(api: A, user_id: UserId) -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let store = Self {
            api: Arc::new(api),
            cache: Arc::new(Mutex::new(AgentCache::new())),
            notices: tx,
            user_id,
            page_size: DEFAULT_PAGE_SIZE,
        };
        (store, rx)
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    fn cache(&self) -> MutexGuard<'_, AgentCache> {
        // Recover from poisoning.
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self, kind: ListKind) -> ListSnapshot {
        self.cache().snapshot(kind)
    }

    pub fn agent(&self, agent_id: &AgentId) -> Option<AgentView> {
        self.cache().agent(agent_id).cloned()
    }

    /// Fetch the first page of a list, replacing what was loaded.
    pub async fn load(&self, kind: ListKind) -> Result<(), ClientError> {
        let request = self.cache().begin_load(kind, self.page_size);
        match self.api.list_agents(kind, &request).await {
            Ok(page) => {
                self.cache().apply_page(kind, page, true);
                Ok(())
            }
            Err(e) => {
                warn!(list = ?kind, error = %e, "failed to load agents");
                self.cache().fail_load(kind, e.to_string());
                Err(e)
            }
        }
    }

    /// Fetch the next page of a list. Returns `false` when there was nothing
    /// more to load.
    pub async fn load_more(&self, kind: ListKind) -> Result<bool, ClientError> {
        let Some(request) = self.cache().begin_load_more(kind, self.page_size) else {
            return Ok(false);
        };
        match self.api.list_agents(kind, &request).await {
            Ok(page) => {
                self.cache().apply_page(kind, page, false);
                Ok(true)
            }
            Err(e) => {
                warn!(list = ?kind, error = %e, "failed to load more agents");
                self.cache().fail_load(kind, e.to_string());
                Err(e)
            }
        }
    }

    /// Refetch the first page of every list. Failures only flag the list.
    pub async fn refresh_all(&self) {
        for kind in ListKind::ALL {
            let _ = self.load(kind).await;
        }
    }

    fn spawn_refresh(&self) {
        let store = self.clone();
        tokio::spawn(async move {
            store.refresh_all().await;
        });
    }

    async fn settle(&self, reconcile: Reconcile, mutation: Mutation) {
        match reconcile {
            Reconcile::Matched => self.spawn_refresh(),
            Reconcile::Diverged => {
                debug!(%mutation, "server result differs from optimistic state, refetching");
                self.refresh_all().await;
            }
        }
    }

    async fn fail(&self, mutation: Mutation, error: &ClientError) {
        warn!(%mutation, error = %error, "mutation failed, refetching");
        self.refresh_all().await;
        let _ = self.notices.send(Notice {
            mutation,
            message: format!("Failed to {mutation}: {error}"),
        });
    }

    /// Create an agent. It shows up at the head of the owned list at once.
    pub async fn create_agent(&self, content: AgentContent) -> Result<AgentView, ClientError> {
        let guess = AgentView::for_caller(
            Agent::from_content(
                AgentId::new(),
                self.user_id.clone(),
                None,
                content.clone(),
                Utc::now(),
            ),
            &self.user_id,
            false,
        );
        let provisional = guess.id().clone();
        self.cache().insert_created(guess);

        match self.api.create_agent(&content).await {
            Ok(created) => {
                let reconcile = if created.agent.content() == content {
                    Reconcile::Matched
                } else {
                    Reconcile::Diverged
                };
                self.cache().replace_provisional(&provisional, created.clone());
                self.settle(reconcile, Mutation::Create).await;
                Ok(created)
            }
            Err(e) => {
                self.cache().remove(&provisional);
                self.fail(Mutation::Create, &e).await;
                Err(e)
            }
        }
    }

    /// Replace the content of an agent.
    pub async fn update_agent(
        &self,
        agent_id: &AgentId,
        content: AgentContent,
    ) -> Result<AgentView, ClientError> {
        self.cache().patch_content(agent_id, content.clone());

        match self.api.update_agent(agent_id, &content).await {
            Ok(updated) => {
                let reconcile = if updated.agent.content() == content {
                    Reconcile::Matched
                } else {
                    Reconcile::Diverged
                };
                self.cache().upsert(updated.clone());
                self.settle(reconcile, Mutation::Update).await;
                Ok(updated)
            }
            Err(e) => {
                self.fail(Mutation::Update, &e).await;
                Err(e)
            }
        }
    }

    /// Delete an agent. It disappears from every list at once.
    pub async fn delete_agent(&self, agent_id: &AgentId) -> Result<(), ClientError> {
        self.cache().remove(agent_id);

        match self.api.delete_agent(agent_id).await {
            Ok(()) => {
                self.settle(Reconcile::Matched, Mutation::Delete).await;
                Ok(())
            }
            Err(e) => {
                self.fail(Mutation::Delete, &e).await;
                Err(e)
            }
        }
    }

    /// Clone a readable agent into a new private agent owned by this user.
    ///
    /// The optimistic copy needs the source in the cache; otherwise the
    /// clone only appears once the server confirms it.
    pub async fn clone_agent(
        &self,
        source_id: &AgentId,
        name: Option<String>,
    ) -> Result<AgentView, ClientError> {
        let source = self.agent(source_id);
        let guess = source.map(|source| {
            let mut content = source.agent.content();
            content.name = name.clone().unwrap_or_else(|| cloned_name(&source.agent.name));
            content.is_public = false;
            AgentView::for_caller(
                Agent::from_content(AgentId::new(), self.user_id.clone(), None, content, Utc::now()),
                &self.user_id,
                false,
            )
        });
        let provisional = guess.as_ref().map(|view| view.id().clone());
        let expected = guess.as_ref().map(|view| view.agent.content());
        if let Some(guess) = guess {
            self.cache().insert_created(guess);
        }

        let request = CloneAgentRequest {
            agent_id: source_id.to_string(),
            name,
        };
        match self.api.clone_agent(&request).await {
            Ok(cloned) => {
                let reconcile = match (&provisional, expected) {
                    (Some(provisional), Some(expected)) => {
                        self.cache().replace_provisional(provisional, cloned.clone());
                        if cloned.agent.content() == expected {
                            Reconcile::Matched
                        } else {
                            Reconcile::Diverged
                        }
                    }
                    _ => {
                        self.cache().insert_created(cloned.clone());
                        Reconcile::Matched
                    }
                };
                self.settle(reconcile, Mutation::Clone).await;
                Ok(cloned)
            }
            Err(e) => {
                if let Some(provisional) = &provisional {
                    self.cache().remove(provisional);
                }
                self.fail(Mutation::Clone, &e).await;
                Err(e)
            }
        }
    }

    /// Flip the favorite state of an agent. Returns the confirmed state.
    pub async fn toggle_favorite(&self, agent_id: &AgentId) -> Result<bool, ClientError> {
        let guess = {
            let mut cache = self.cache();
            let guess = !cache.agent(agent_id).is_some_and(|view| view.is_favorite);
            cache.set_favorite(agent_id, guess);
            guess
        };

        match self.api.toggle_favorite(agent_id).await {
            Ok(toggle) => {
                let reconcile = if toggle.is_favorite == guess {
                    Reconcile::Matched
                } else {
                    Reconcile::Diverged
                };
                self.settle(reconcile, Mutation::ToggleFavorite).await;
                Ok(toggle.is_favorite)
            }
            Err(e) => {
                self.fail(Mutation::ToggleFavorite, &e).await;
                Err(e)
            }
        }
    }
}
