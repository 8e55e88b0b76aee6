//! Model-invocation request types.
//!
//! The runtime is a black box: it receives an [`InvocationRequest`] and
//! answers with newline-delimited JSON events that are passed through to the
//! caller untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::McpServerConfig;

/// Directory the runtime uses as the agent's scratch workspace.
pub const WORKSPACE_DIR: &str = "/tmp/ws";

/// Body of `POST /agents/{id}/invoke`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeAgentRequest {
    /// Conversation identifier; a new one is generated when absent.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Prior turns, forwarded as-is.
    #[serde(default)]
    pub messages: Vec<serde_json::Value>,
    /// The new user turn: a string or a list of content blocks.
    pub prompt: serde_json::Value,
    /// Attached files (content blocks), forwarded as-is.
    #[serde(default)]
    pub files: Vec<serde_json::Value>,
}

/// Model selection forwarded to the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub model_id: String,
    pub region: String,
}

/// A tool server the runtime should start for one turn.
///
/// Servers configured under `[mcp_servers]` carry their launch command; a
/// bare name is left for the runtime to resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpServerLaunch {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl McpServerLaunch {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: None,
            args: Vec::new(),
            env: BTreeMap::new(),
        }
    }

    pub fn configured(name: impl Into<String>, config: &McpServerConfig) -> Self {
        Self {
            name: name.into(),
            command: Some(config.command.clone()),
            args: config.args.clone(),
            env: config.env.clone(),
        }
    }
}

/// Everything the runtime needs to run one agent turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationRequest {
    pub session_id: String,
    pub messages: Vec<serde_json::Value>,
    pub system_prompt: String,
    pub prompt: serde_json::Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<serde_json::Value>,
    pub model: ModelInfo,
    pub user_id: String,
    /// Tool servers the agent may use, with their launch settings.
    pub mcp_servers: Vec<McpServerLaunch>,
    pub agent_id: String,
    pub code_execution_enabled: bool,
    pub max_iterations: u32,
    /// Prompt-cache fields the model supports (`system`, `messages`, `tools`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cache_fields: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoke_request_accepts_string_prompt() {
        let req: InvokeAgentRequest = serde_json::from_str(r#"{"prompt":"hello"}"#).unwrap();
        assert_eq!(req.prompt, serde_json::json!("hello"));
        assert!(req.session_id.is_none());
        assert!(req.messages.is_empty());
    }

    #[test]
    fn test_invocation_request_camel_case() {
        let req = InvocationRequest {
            session_id: "s1".to_string(),
            messages: Vec::new(),
            system_prompt: "sys".to_string(),
            prompt: serde_json::json!("hi"),
            files: Vec::new(),
            model: ModelInfo {
                model_id: "m1".to_string(),
                region: "us-east-1".to_string(),
            },
            user_id: "alice".to_string(),
            mcp_servers: vec![
                McpServerLaunch::configured(
                    "time",
                    &McpServerConfig {
                        command: "uvx".to_string(),
                        args: vec!["mcp-server-time".to_string()],
                        env: BTreeMap::new(),
                    },
                ),
                McpServerLaunch::named("shell"),
            ],
            agent_id: "a1".to_string(),
            code_execution_enabled: true,
            max_iterations: 20,
            cache_fields: Vec::new(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["sessionId"], "s1");
        assert_eq!(json["model"]["modelId"], "m1");
        assert_eq!(json["codeExecutionEnabled"], true);
        assert!(json.get("files").is_none());
        assert!(json.get("cacheFields").is_none());
        assert_eq!(
            json["mcpServers"],
            serde_json::json!([
                {"name": "time", "command": "uvx", "args": ["mcp-server-time"]},
                {"name": "shell"}
            ])
        );
    }
}
