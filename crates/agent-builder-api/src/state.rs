//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by both CLI and REST API.
//! Services are generic over the item store and runtime traits, but AppState
//! pins them to the concrete infra implementations.

use std::path::PathBuf;
use std::sync::Arc;

use agent_builder_core::invocation::InvocationService;
use agent_builder_core::repository::agent::AgentRepository;
use agent_builder_core::service::agent::AgentService;
use agent_builder_infra::runtime::HttpAgentRuntime;
use agent_builder_infra::sqlite::item_store::SqliteItemStore;
use agent_builder_infra::sqlite::pool::{database_url, DatabasePool};
use agent_builder_types::config::AppConfig;

/// Concrete type aliases for the service generics pinned to infra implementations.
pub type ConcreteAgentService = AgentService<SqliteItemStore>;

pub type ConcreteInvocationService = InvocationService<HttpAgentRuntime>;

/// Shared application state holding all services.
///
/// Used by both CLI commands and REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub agent_service: Arc<ConcreteAgentService>,
    pub invocation_service: Arc<ConcreteInvocationService>,
    pub config: Arc<AppConfig>,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Open the database under `data_dir` and wire services with `config`.
    pub async fn init(data_dir: PathBuf, config: AppConfig) -> anyhow::Result<Self> {
        // Ensure data directory exists
        tokio::fs::create_dir_all(&data_dir).await?;

        let db_pool = DatabasePool::new(&database_url(&data_dir)).await?;

        Self::from_parts(SqliteItemStore::new(db_pool), config, data_dir)
    }

    /// Wire services over an already opened store.
    pub fn from_parts(
        store: SqliteItemStore,
        config: AppConfig,
        data_dir: PathBuf,
    ) -> anyhow::Result<Self> {
        let repo = AgentRepository::new(store, config.pagination);
        let agent_service = AgentService::new(repo, config.available_mcp_servers());

        let runtime = HttpAgentRuntime::new(&config.runtime)?;
        if !runtime.is_configured() {
            tracing::info!("no runtime url configured, agent invocation is disabled");
        }
        let invocation_service = InvocationService::new(
            runtime,
            config.runtime.clone(),
            config.mcp_servers.clone(),
        );

        Ok(Self {
            agent_service: Arc::new(agent_service),
            invocation_service: Arc::new(invocation_service),
            config: Arc::new(config),
            data_dir,
        })
    }
}
