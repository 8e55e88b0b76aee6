//! Assembly of runtime requests from stored agents.

use std::collections::{BTreeMap, HashMap};

use agent_builder_types::config::McpServerConfig;
use agent_builder_types::invocation::{McpServerLaunch, ModelInfo, WORKSPACE_DIR};
use tracing::warn;

/// Cross-region inference prefixes a model id may carry.
const CROSS_REGION_PREFIXES: &[&str] = &["global.", "us.", "eu.", "apac.", "jp."];

/// Workspace rules appended to every agent's system prompt.
pub fn workspace_prompt() -> String {
    format!(
        "## About File Output\n\
         - Always write files under `{WORKSPACE_DIR}`.\n\
         - If you need a workspace, use `{WORKSPACE_DIR}`. Do not ask the user where to work.\n\
         - Users cannot read files under `{WORKSPACE_DIR}` directly. Upload files you want to share and include the resulting URL in your final answer.\n\
         - When the shared file is an image, link it in Markdown format.\n"
    )
}

/// The agent's own prompt followed by the workspace rules.
pub fn compose_system_prompt(agent_prompt: &str) -> String {
    if agent_prompt.is_empty() {
        workspace_prompt()
    } else {
        format!("{agent_prompt}\n{}", workspace_prompt())
    }
}

pub fn model_info(model_id: &str, region: &str) -> ModelInfo {
    ModelInfo {
        model_id: model_id.to_string(),
        region: region.to_string(),
    }
}

/// Strip a cross-region inference prefix (`us.`, `global.`, ...).
pub fn base_model_id(model_id: &str) -> &str {
    CROSS_REGION_PREFIXES
        .iter()
        .find_map(|prefix| model_id.strip_prefix(prefix))
        .unwrap_or(model_id)
}

/// Prompt-cache fields supported by `model_id`.
pub fn cache_fields(model_id: &str, supported: &HashMap<String, Vec<String>>) -> Vec<String> {
    supported
        .get(base_model_id(model_id))
        .cloned()
        .unwrap_or_default()
}

/// Resolve the tool servers an invocation may use, with launch settings.
///
/// `None` selects every configured server and an empty list selects none.
/// Named servers that are not configured are skipped with a warning. When no
/// servers are configured at all the names are forwarded bare and the
/// runtime resolves them.
pub fn resolve_mcp_servers(
    requested: Option<&[String]>,
    configured: &BTreeMap<String, McpServerConfig>,
) -> Vec<McpServerLaunch> {
    let Some(requested) = requested else {
        return configured
            .iter()
            .map(|(name, config)| McpServerLaunch::configured(name, config))
            .collect();
    };
    if configured.is_empty() {
        return requested.iter().map(McpServerLaunch::named).collect();
    }

    requested
        .iter()
        .filter_map(|name| match configured.get(name) {
            Some(config) => Some(McpServerLaunch::configured(name, config)),
            None => {
                warn!(server = %name, "skipping unknown MCP server");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_system_prompt_composition() {
        let combined = compose_system_prompt("Be concise");
        assert!(combined.starts_with("Be concise\n## About File Output"));
        assert!(combined.contains(WORKSPACE_DIR));
        assert_eq!(compose_system_prompt(""), workspace_prompt());
    }

    #[test]
    fn test_base_model_id_strips_one_prefix() {
        assert_eq!(
            base_model_id("us.anthropic.claude-3-5-sonnet-20241022-v2:0"),
            "anthropic.claude-3-5-sonnet-20241022-v2:0"
        );
        assert_eq!(base_model_id("global.amazon.nova-pro-v1:0"), "amazon.nova-pro-v1:0");
        assert_eq!(base_model_id("apac.x"), "x");
        assert_eq!(base_model_id("anthropic.claude"), "anthropic.claude");
        assert_eq!(base_model_id("usx.model"), "usx.model");
    }

    #[test]
    fn test_cache_fields_lookup() {
        let mut supported = HashMap::new();
        supported.insert("anthropic.claude".to_string(), names(&["system", "tools"]));
        assert_eq!(cache_fields("eu.anthropic.claude", &supported), names(&["system", "tools"]));
        assert!(cache_fields("other", &supported).is_empty());
    }

    fn server(command: &str, args: &[&str]) -> McpServerConfig {
        McpServerConfig {
            command: command.to_string(),
            args: names(args),
            env: BTreeMap::from([("TZ".to_string(), "UTC".to_string())]),
        }
    }

    fn launch_names(launches: &[McpServerLaunch]) -> Vec<&str> {
        launches.iter().map(|l| l.name.as_str()).collect()
    }

    #[test]
    fn test_resolve_mcp_servers() {
        let configured = BTreeMap::from([
            ("fetch".to_string(), server("uvx", &["mcp-server-fetch"])),
            ("time".to_string(), server("uvx", &["mcp-server-time"])),
        ]);
        assert_eq!(launch_names(&resolve_mcp_servers(None, &configured)), vec!["fetch", "time"]);
        assert!(resolve_mcp_servers(Some(&[]), &configured).is_empty());

        let picked = resolve_mcp_servers(Some(&names(&["time", "shell"])), &configured);
        assert_eq!(picked, vec![McpServerLaunch::configured("time", &configured["time"])]);
        assert_eq!(picked[0].command.as_deref(), Some("uvx"));
        assert_eq!(picked[0].args, names(&["mcp-server-time"]));
        assert_eq!(picked[0].env["TZ"], "UTC");

        assert_eq!(
            resolve_mcp_servers(Some(&names(&["shell"])), &BTreeMap::new()),
            vec![McpServerLaunch::named("shell")]
        );
    }
}
