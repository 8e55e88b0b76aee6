//! Normalized client-side agent cache.
//!
//! Each agent is stored once in an `id -> AgentView` map. The three views
//! (owned, favorites, public) hold only ordered pages of ids, so a mutation
//! patches the entity once and every list that references it sees the change.

use std::collections::{HashMap, HashSet};

use agent_builder_types::agent::{AgentContent, AgentId, AgentView};
use agent_builder_types::page::{AgentPage, PageRequest};
use chrono::Utc;

/// One of the independently paginated lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKind {
    /// The caller's own agents, annotated with favorite state.
    Owned,
    Favorites,
    Public,
}

impl ListKind {
    pub const ALL: [ListKind; 3] = [ListKind::Owned, ListKind::Favorites, ListKind::Public];

    /// API path serving this list.
    pub fn path(self) -> &'static str {
        match self {
            ListKind::Owned => "/agents",
            ListKind::Favorites => "/agents/favorites",
            ListKind::Public => "/agents/public",
        }
    }

    fn index(self) -> usize {
        match self {
            ListKind::Owned => 0,
            ListKind::Favorites => 1,
            ListKind::Public => 2,
        }
    }
}

/// Fetch progress of one list.
///
/// `NotLoaded -> Loading -> Loaded`, then `Loaded -> LoadingMore -> Loaded`
/// for each further page. A failed fetch returns to the previous resting
/// phase and sets the list's error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListPhase {
    #[default]
    NotLoaded,
    Loading,
    Loaded,
    LoadingMore,
}

#[derive(Debug, Clone, Default)]
struct ListState {
    phase: ListPhase,
    pages: Vec<Vec<AgentId>>,
    next_token: Option<String>,
    error: Option<String>,
}

impl ListState {
    fn resting_phase(&self) -> ListPhase {
        if self.pages.is_empty() {
            ListPhase::NotLoaded
        } else {
            ListPhase::Loaded
        }
    }

    fn ids(&self) -> impl Iterator<Item = &AgentId> {
        self.pages.iter().flatten()
    }

    fn locate(&self, agent_id: &AgentId) -> Option<(usize, usize)> {
        for (page_idx, page) in self.pages.iter().enumerate() {
            if let Some(item_idx) = page.iter().position(|id| id == agent_id) {
                return Some((page_idx, item_idx));
            }
        }
        None
    }

    fn insert_head(&mut self, agent_id: AgentId) {
        match self.pages.first_mut() {
            Some(first) => first.insert(0, agent_id),
            None => self.pages.push(vec![agent_id]),
        }
    }

    /// Remove every occurrence; returns whether anything was removed.
    fn remove(&mut self, agent_id: &AgentId) -> bool {
        let mut removed = false;
        for page in &mut self.pages {
            let before = page.len();
            page.retain(|id| id != agent_id);
            removed |= page.len() != before;
        }
        removed
    }

    fn rename(&mut self, from: &AgentId, to: &AgentId) {
        for id in self.pages.iter_mut().flatten() {
            if id == from {
                *id = to.clone();
            }
        }
    }
}

/// Read-only view of a list, resolved against the entity map.
#[derive(Debug, Clone, PartialEq)]
pub struct ListSnapshot {
    pub phase: ListPhase,
    pub agents: Vec<AgentView>,
    pub has_more: bool,
    pub error: Option<String>,
}

/// The cache itself. Not synchronized; [`crate::store::AgentStore`] wraps
/// it in a mutex.
#[derive(Debug, Default)]
pub struct AgentCache {
    entities: HashMap<AgentId, AgentView>,
    lists: [ListState; 3],
}

impl AgentCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn list(&self, kind: ListKind) -> &ListState {
        &self.lists[kind.index()]
    }

    fn list_mut(&mut self, kind: ListKind) -> &mut ListState {
        &mut self.lists[kind.index()]
    }

    pub fn phase(&self, kind: ListKind) -> ListPhase {
        self.list(kind).phase
    }

    pub fn agent(&self, agent_id: &AgentId) -> Option<&AgentView> {
        self.entities.get(agent_id)
    }

    /// Position of `agent_id` in a list as `(page, item)`. First match wins.
    pub fn locate(&self, kind: ListKind, agent_id: &AgentId) -> Option<(usize, usize)> {
        self.list(kind).locate(agent_id)
    }

    pub fn snapshot(&self, kind: ListKind) -> ListSnapshot {
        let list = self.list(kind);
        ListSnapshot {
            phase: list.phase,
            agents: list
                .ids()
                .filter_map(|id| self.entities.get(id).cloned())
                .collect(),
            has_more: list.next_token.is_some(),
            error: list.error.clone(),
        }
    }

    /// Mark a first-page fetch as started.
    pub fn begin_load(&mut self, kind: ListKind, limit: u32) -> PageRequest {
        self.list_mut(kind).phase = ListPhase::Loading;
        PageRequest::first(limit)
    }

    /// Mark a next-page fetch as started. `None` when there is nothing more
    /// to load or the list was never loaded.
    pub fn begin_load_more(&mut self, kind: ListKind, limit: u32) -> Option<PageRequest> {
        let list = self.list_mut(kind);
        if list.pages.is_empty() {
            return None;
        }
        let token = list.next_token.clone()?;
        list.phase = ListPhase::LoadingMore;
        Some(PageRequest::after(limit, token))
    }

    /// Store a fetched page. `replace` drops all previously loaded pages.
    pub fn apply_page(&mut self, kind: ListKind, page: AgentPage, replace: bool) {
        let ids: Vec<AgentId> = page.agents.iter().map(|view| view.id().clone()).collect();
        for view in page.agents {
            self.entities.insert(view.id().clone(), view);
        }

        let list = self.list_mut(kind);
        if replace {
            list.pages = vec![ids];
        } else {
            list.pages.push(ids);
        }
        list.next_token = page.next_token;
        list.phase = ListPhase::Loaded;
        list.error = None;

        if replace {
            self.collect_garbage();
        }
    }

    /// Record a failed fetch. Loaded pages are kept.
    pub fn fail_load(&mut self, kind: ListKind, error: impl Into<String>) {
        let list = self.list_mut(kind);
        list.phase = list.resting_phase();
        list.error = Some(error.into());
    }

    /// Add a new agent at the head of the lists it belongs to.
    pub fn insert_created(&mut self, view: AgentView) {
        let agent_id = view.id().clone();
        if view.agent.is_public {
            self.list_mut(ListKind::Public).insert_head(agent_id.clone());
        }
        self.list_mut(ListKind::Owned).insert_head(agent_id.clone());
        self.entities.insert(agent_id, view);
    }

    /// Swap a provisional id for the one the server assigned.
    pub fn replace_provisional(&mut self, provisional: &AgentId, view: AgentView) {
        self.entities.remove(provisional);
        for list in &mut self.lists {
            list.rename(provisional, view.id());
        }
        self.entities.insert(view.id().clone(), view);
    }

    /// Overwrite the content of a cached agent. Returns the previous view.
    ///
    /// Visibility changes move the agent in or out of a loaded public list.
    pub fn patch_content(&mut self, agent_id: &AgentId, content: AgentContent) -> Option<AgentView> {
        let view = self.entities.get_mut(agent_id)?;
        let previous = view.clone();
        let now_public = content.is_public;
        view.agent.apply_content(content, Utc::now());

        let public = self.list_mut(ListKind::Public);
        if !now_public {
            public.remove(agent_id);
        } else if !public.pages.is_empty() && public.locate(agent_id).is_none() {
            public.insert_head(agent_id.clone());
        }
        Some(previous)
    }

    pub fn upsert(&mut self, view: AgentView) {
        self.entities.insert(view.id().clone(), view);
    }

    /// Remove an agent from every list and from the entity map.
    pub fn remove(&mut self, agent_id: &AgentId) -> Option<AgentView> {
        for list in &mut self.lists {
            list.remove(agent_id);
        }
        self.entities.remove(agent_id)
    }

    /// Apply a favorite flip to the entity and the favorites list.
    pub fn set_favorite(&mut self, agent_id: &AgentId, is_favorite: bool) {
        if let Some(view) = self.entities.get_mut(agent_id) {
            if view.is_favorite != is_favorite {
                view.is_favorite = is_favorite;
                view.agent.star_count += if is_favorite { 1 } else { -1 };
                view.agent.star_count = view.agent.star_count.max(0);
            }
        }

        let favorites = self.list_mut(ListKind::Favorites);
        if is_favorite {
            if favorites.locate(agent_id).is_none() {
                favorites.insert_head(agent_id.clone());
            }
        } else {
            favorites.remove(agent_id);
        }
    }

    /// Drop entities no list references anymore.
    fn collect_garbage(&mut self) {
        let referenced: HashSet<&AgentId> = self.lists.iter().flat_map(ListState::ids).collect();
        let stale: Vec<AgentId> = self
            .entities
            .keys()
            .filter(|id| !referenced.contains(id))
            .cloned()
            .collect();
        for id in stale {
            self.entities.remove(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_builder_types::agent::{Agent, AgentStatus};
    use agent_builder_types::user::UserId;

    fn content(name: &str, is_public: bool) -> AgentContent {
        AgentContent {
            name: name.to_string(),
            description: String::new(),
            system_prompt: "Be concise".to_string(),
            model_id: "m1".to_string(),
            mcp_servers: Vec::new(),
            code_execution_enabled: false,
            is_public,
            tags: Vec::new(),
        }
    }

    fn view(name: &str, is_public: bool) -> AgentView {
        let agent = Agent::from_content(
            AgentId::new(),
            UserId::new("alice"),
            None,
            content(name, is_public),
            Utc::now(),
        );
        AgentView::for_caller(agent, &UserId::new("alice"), false)
    }

    fn page(views: &[AgentView], next_token: Option<&str>) -> AgentPage {
        AgentPage {
            agents: views.to_vec(),
            next_token: next_token.map(str::to_string),
        }
    }

    fn names(cache: &AgentCache, kind: ListKind) -> Vec<String> {
        cache
            .snapshot(kind)
            .agents
            .into_iter()
            .map(|v| v.agent.name)
            .collect()
    }

    #[test]
    fn test_load_and_load_more_phases() {
        let mut cache = AgentCache::new();
        assert_eq!(cache.phase(ListKind::Owned), ListPhase::NotLoaded);
        assert!(cache.begin_load_more(ListKind::Owned, 10).is_none());

        let request = cache.begin_load(ListKind::Owned, 2);
        assert_eq!(request, PageRequest::first(2));
        assert_eq!(cache.phase(ListKind::Owned), ListPhase::Loading);

        let (a, b, c) = (view("a", false), view("b", false), view("c", false));
        cache.apply_page(ListKind::Owned, page(&[a, b], Some("t1")), true);
        assert_eq!(cache.phase(ListKind::Owned), ListPhase::Loaded);
        assert!(cache.snapshot(ListKind::Owned).has_more);

        let request = cache.begin_load_more(ListKind::Owned, 2).unwrap();
        assert_eq!(request.next_token.as_deref(), Some("t1"));
        assert_eq!(cache.phase(ListKind::Owned), ListPhase::LoadingMore);

        cache.apply_page(ListKind::Owned, page(&[c], None), false);
        let snapshot = cache.snapshot(ListKind::Owned);
        assert_eq!(snapshot.phase, ListPhase::Loaded);
        assert!(!snapshot.has_more);
        assert_eq!(names(&cache, ListKind::Owned), vec!["a", "b", "c"]);
        assert!(cache.begin_load_more(ListKind::Owned, 2).is_none());
    }

    #[test]
    fn test_failed_fetch_keeps_pages_and_sets_error() {
        let mut cache = AgentCache::new();
        cache.begin_load(ListKind::Public, 10);
        cache.apply_page(ListKind::Public, page(&[view("a", true)], Some("t")), true);

        cache.begin_load_more(ListKind::Public, 10);
        cache.fail_load(ListKind::Public, "network down");

        let snapshot = cache.snapshot(ListKind::Public);
        assert_eq!(snapshot.phase, ListPhase::Loaded);
        assert_eq!(snapshot.agents.len(), 1);
        assert_eq!(snapshot.error.as_deref(), Some("network down"));

        // A later successful fetch clears the flag.
        cache.begin_load(ListKind::Public, 10);
        cache.apply_page(ListKind::Public, page(&[view("b", true)], None), true);
        assert!(cache.snapshot(ListKind::Public).error.is_none());
    }

    #[test]
    fn test_failed_first_load_returns_to_not_loaded() {
        let mut cache = AgentCache::new();
        cache.begin_load(ListKind::Favorites, 10);
        cache.fail_load(ListKind::Favorites, "boom");
        assert_eq!(cache.phase(ListKind::Favorites), ListPhase::NotLoaded);
        assert!(cache.snapshot(ListKind::Favorites).error.is_some());
    }

    #[test]
    fn test_patch_updates_every_list_once() {
        let mut cache = AgentCache::new();
        let shared = view("Helper", true);
        let id = shared.id().clone();
        cache.apply_page(ListKind::Owned, page(&[shared.clone()], None), true);
        cache.apply_page(ListKind::Public, page(&[shared.clone()], None), true);
        cache.apply_page(ListKind::Favorites, page(&[shared], None), true);

        cache.patch_content(&id, content("Renamed", true)).unwrap();
        for kind in ListKind::ALL {
            assert_eq!(names(&cache, kind), vec!["Renamed"], "{kind:?}");
        }
    }

    #[test]
    fn test_patch_to_private_leaves_public_list() {
        let mut cache = AgentCache::new();
        let shared = view("Helper", true);
        let id = shared.id().clone();
        cache.apply_page(ListKind::Owned, page(&[shared.clone()], None), true);
        cache.apply_page(ListKind::Public, page(&[shared], None), true);

        cache.patch_content(&id, content("Helper", false));
        assert!(cache.locate(ListKind::Public, &id).is_none());
        assert_eq!(cache.locate(ListKind::Owned, &id), Some((0, 0)));
    }

    #[test]
    fn test_patch_to_public_joins_loaded_public_list() {
        let mut cache = AgentCache::new();
        let mine = view("Helper", false);
        let id = mine.id().clone();
        cache.apply_page(ListKind::Owned, page(&[mine], None), true);
        cache.apply_page(ListKind::Public, page(&[view("other", true)], None), true);

        cache.patch_content(&id, content("Helper", true));
        assert_eq!(cache.locate(ListKind::Public, &id), Some((0, 0)));
        assert_eq!(names(&cache, ListKind::Public), vec!["Helper", "other"]);

        // Saving again while public does not duplicate the entry.
        cache.patch_content(&id, content("Helper v2", true));
        assert_eq!(names(&cache, ListKind::Public), vec!["Helper v2", "other"]);
    }

    #[test]
    fn test_patch_to_public_leaves_unloaded_public_list_alone() {
        let mut cache = AgentCache::new();
        let mine = view("Helper", false);
        let id = mine.id().clone();
        cache.apply_page(ListKind::Owned, page(&[mine], None), true);

        cache.patch_content(&id, content("Helper", true));
        assert!(cache.locate(ListKind::Public, &id).is_none());
        assert_eq!(cache.phase(ListKind::Public), ListPhase::NotLoaded);
    }

    #[test]
    fn test_remove_everywhere() {
        let mut cache = AgentCache::new();
        let shared = view("Helper", true);
        let id = shared.id().clone();
        for kind in ListKind::ALL {
            cache.apply_page(kind, page(&[shared.clone(), view("other", true)], None), true);
        }

        cache.remove(&id).unwrap();
        for kind in ListKind::ALL {
            assert!(cache.locate(kind, &id).is_none());
            assert_eq!(names(&cache, kind), vec!["other"]);
        }
        assert!(cache.agent(&id).is_none());
    }

    #[test]
    fn test_insert_created_goes_to_head() {
        let mut cache = AgentCache::new();
        cache.apply_page(ListKind::Owned, page(&[view("old", false)], None), true);

        cache.insert_created(view("new", true));
        assert_eq!(names(&cache, ListKind::Owned), vec!["new", "old"]);
        assert_eq!(names(&cache, ListKind::Public), vec!["new"]);
        assert!(names(&cache, ListKind::Favorites).is_empty());
    }

    #[test]
    fn test_replace_provisional_renames_ids() {
        let mut cache = AgentCache::new();
        let guess = view("Helper", false);
        let provisional = guess.id().clone();
        cache.insert_created(guess);

        let confirmed = view("Helper", false);
        let real_id = confirmed.id().clone();
        cache.replace_provisional(&provisional, confirmed);

        assert!(cache.agent(&provisional).is_none());
        assert_eq!(cache.locate(ListKind::Owned, &real_id), Some((0, 0)));
    }

    #[test]
    fn test_set_favorite_adjusts_entity_and_list() {
        let mut cache = AgentCache::new();
        let agent = view("Helper", true);
        let id = agent.id().clone();
        cache.apply_page(ListKind::Public, page(&[agent], None), true);

        cache.set_favorite(&id, true);
        assert!(cache.agent(&id).unwrap().is_favorite);
        assert_eq!(cache.agent(&id).unwrap().agent.star_count, 1);
        assert_eq!(cache.locate(ListKind::Favorites, &id), Some((0, 0)));

        // Repeating the same flip does not double count.
        cache.set_favorite(&id, true);
        assert_eq!(cache.agent(&id).unwrap().agent.star_count, 1);

        cache.set_favorite(&id, false);
        assert!(!cache.agent(&id).unwrap().is_favorite);
        assert_eq!(cache.agent(&id).unwrap().agent.star_count, 0);
        assert!(cache.locate(ListKind::Favorites, &id).is_none());
        assert!(cache.locate(ListKind::Public, &id).is_some());
    }

    #[test]
    fn test_locate_first_match_wins() {
        let mut cache = AgentCache::new();
        let agent = view("dup", false);
        let id = agent.id().clone();
        cache.apply_page(ListKind::Owned, page(&[view("x", false), agent.clone()], Some("t")), true);
        cache.apply_page(ListKind::Owned, page(&[agent], None), false);
        assert_eq!(cache.locate(ListKind::Owned, &id), Some((0, 1)));
    }

    #[test]
    fn test_reload_collects_unreferenced_entities() {
        let mut cache = AgentCache::new();
        let gone = view("gone", false);
        let gone_id = gone.id().clone();
        cache.apply_page(ListKind::Owned, page(&[gone], None), true);
        cache.apply_page(ListKind::Owned, page(&[view("kept", false)], None), true);
        assert!(cache.agent(&gone_id).is_none());
    }

    #[test]
    fn test_placeholders_are_listed() {
        let mut cache = AgentCache::new();
        let mut deleted = view("", false);
        deleted.status = AgentStatus::Deleted;
        cache.apply_page(ListKind::Favorites, page(&[deleted], None), true);
        let snapshot = cache.snapshot(ListKind::Favorites);
        assert_eq!(snapshot.agents[0].status, AgentStatus::Deleted);
    }
}
