//! Application configuration types.
//!
//! `AppConfig` mirrors `config.toml` in the data directory. Every section and
//! field has a default, so an empty file (or no file) is a valid config.
//! Core code never reads the environment; it receives these values through
//! constructors.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::page::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};

/// Top-level configuration for Agent Builder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub pagination: PaginationConfig,

    #[serde(default)]
    pub identity: IdentityConfig,

    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// External tool servers agents may enable, keyed by name.
    #[serde(default)]
    pub mcp_servers: BTreeMap<String, McpServerConfig>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Names of the tool servers agents are allowed to reference.
    pub fn available_mcp_servers(&self) -> Vec<String> {
        self.mcp_servers.keys().cloned().collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Page size policy for list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationConfig {
    #[serde(default = "default_limit")]
    pub default_limit: u32,
    #[serde(default = "max_limit")]
    pub max_limit: u32,
}

fn default_limit() -> u32 {
    DEFAULT_PAGE_LIMIT
}

fn max_limit() -> u32 {
    MAX_PAGE_LIMIT
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: max_limit(),
        }
    }
}

impl PaginationConfig {
    /// Resolve a requested page size into `[1, max_limit]`.
    pub fn clamp(&self, requested: Option<u32>) -> u32 {
        let max = self.max_limit.max(1);
        requested
            .unwrap_or(self.default_limit)
            .clamp(1, max)
    }
}

/// Headers the upstream authorizer uses to pass the caller identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    #[serde(default = "default_user_header")]
    pub user_header: String,
    #[serde(default = "default_email_header")]
    pub email_header: String,
}

fn default_user_header() -> String {
    "x-user-id".to_string()
}

fn default_email_header() -> String {
    "x-user-email".to_string()
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            user_header: default_user_header(),
            email_header: default_email_header(),
        }
    }
}

/// Model-invocation runtime settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Endpoint accepting invocation requests. Invocation is disabled when unset.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Prompt-cache fields (`system`, `messages`, `tools`) supported per base
    /// model id.
    #[serde(default)]
    pub supported_cache_fields: HashMap<String, Vec<String>>,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_max_iterations() -> u32 {
    20
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            url: None,
            region: default_region(),
            max_iterations: default_max_iterations(),
            supported_cache_fields: HashMap::new(),
        }
    }
}

/// How to launch one external tool server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpServerConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of human-readable ones.
    #[serde(default)]
    pub json: bool,
    /// Bridge spans to OpenTelemetry (stdout exporter).
    #[serde(default)]
    pub otel: bool,
}
