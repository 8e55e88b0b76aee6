//! Agent invocation.
//!
//! Turns a stored agent plus a conversation turn into an
//! [`InvocationRequest`], hands it to an [`AgentRuntime`], and relays the
//! runtime's event lines. A runtime failure ends the stream with an
//! `internalServerException` event instead of cutting the response.

pub mod request;
pub mod runtime;

use std::collections::BTreeMap;
use std::pin::Pin;

use agent_builder_types::agent::Agent;
use agent_builder_types::config::{McpServerConfig, RuntimeConfig};
use agent_builder_types::invocation::{InvocationRequest, InvokeAgentRequest};
use agent_builder_types::user::Caller;
use futures_util::{Stream, StreamExt};
use tracing::{debug, error, info, info_span};

use self::runtime::AgentRuntime;

/// Event lines as sent to the HTTP client. Errors are already folded in.
pub type EventLines = Pin<Box<dyn Stream<Item = String> + Send + 'static>>;

/// Service that runs agents on the configured runtime.
pub struct InvocationService<R: AgentRuntime> {
    runtime: R,
    config: RuntimeConfig,
    /// Configured tool servers by name.
    mcp_servers: BTreeMap<String, McpServerConfig>,
}

impl<R: AgentRuntime> InvocationService<R> {
    pub fn new(
        runtime: R,
        config: RuntimeConfig,
        mcp_servers: BTreeMap<String, McpServerConfig>,
    ) -> Self {
        Self {
            runtime,
            config,
            mcp_servers,
        }
    }

    /// Build the runtime request for one turn of `agent` on behalf of `caller`.
    pub fn build_request(
        &self,
        agent: &Agent,
        caller: &Caller,
        turn: InvokeAgentRequest,
    ) -> InvocationRequest {
        let session_id = turn
            .session_id
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::now_v7().to_string());

        InvocationRequest {
            session_id,
            messages: turn.messages,
            system_prompt: request::compose_system_prompt(&agent.system_prompt),
            prompt: turn.prompt,
            files: turn.files,
            model: request::model_info(&agent.model_id, &self.config.region),
            user_id: caller.user_id.to_string(),
            mcp_servers: request::resolve_mcp_servers(Some(&agent.mcp_servers), &self.mcp_servers),
            agent_id: agent.agent_id.to_string(),
            code_execution_enabled: agent.code_execution_enabled,
            max_iterations: self.config.max_iterations,
            cache_fields: request::cache_fields(&agent.model_id, &self.config.supported_cache_fields),
        }
    }

    /// Run one turn and return its event lines.
    pub fn invoke(&self, agent: &Agent, caller: &Caller, turn: InvokeAgentRequest) -> EventLines {
        let request = self.build_request(agent, caller, turn);
        let span = info_span!(
            "gen_ai.invoke_agent",
            gen_ai.operation.name = "invoke_agent",
            gen_ai.request.model = %request.model.model_id,
            gen_ai.agent.id = %request.agent_id,
            gen_ai.agent.name = %agent.name,
            session_id = %request.session_id,
        );
        span.in_scope(|| {
            info!(
                caller = %request.user_id,
                mcp_servers = request.mcp_servers.len(),
                "invoking agent"
            )
        });

        let mut events = self.runtime.invoke(request);
        Box::pin(async_stream::stream! {
            let mut forwarded = 0usize;
            while let Some(event) = events.next().await {
                match event {
                    Ok(line) if line.trim().is_empty() => continue,
                    Ok(line) => {
                        forwarded += 1;
                        if line.ends_with('\n') {
                            yield line;
                        } else {
                            yield format!("{line}\n");
                        }
                    }
                    Err(e) => {
                        error!(parent: &span, error = %e, forwarded, "agent invocation failed");
                        yield error_event(&e.to_string());
                        return;
                    }
                }
            }
            debug!(parent: &span, forwarded, "agent invocation finished");
        })
    }
}

/// The terminal event line reporting a failed invocation.
pub fn error_event(message: &str) -> String {
    let event = serde_json::json!({
        "event": {
            "internalServerException": {
                "message": format!("An error occurred while processing your request: {message}"),
            }
        }
    });
    format!("{event}\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use agent_builder_types::agent::{AgentContent, AgentId};
    use agent_builder_types::error::RuntimeError;
    use agent_builder_types::invocation::McpServerLaunch;
    use agent_builder_types::user::UserId;
    use chrono::Utc;

    use self::runtime::EventStream;

    /// Runtime replaying canned results and recording requests.
    struct ScriptedRuntime {
        script: Vec<Result<String, String>>,
        seen: Mutex<Vec<InvocationRequest>>,
    }

    impl ScriptedRuntime {
        fn new(script: Vec<Result<String, String>>) -> Self {
            Self {
                script,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl AgentRuntime for ScriptedRuntime {
        fn invoke(&self, request: InvocationRequest) -> EventStream {
            self.seen.lock().unwrap().push(request);
            let items: Vec<Result<String, RuntimeError>> = self
                .script
                .iter()
                .cloned()
                .map(|r| r.map_err(RuntimeError::Stream))
                .collect();
            Box::pin(futures_util::stream::iter(items))
        }
    }

    fn agent() -> Agent {
        Agent::from_content(
            AgentId::new(),
            UserId::new("alice"),
            None,
            AgentContent {
                name: "Helper".to_string(),
                description: String::new(),
                system_prompt: "Be concise".to_string(),
                model_id: "us.anthropic.claude".to_string(),
                mcp_servers: vec!["time".to_string(), "gone".to_string()],
                code_execution_enabled: true,
                is_public: false,
                tags: Vec::new(),
            },
            Utc::now(),
        )
    }

    fn config() -> RuntimeConfig {
        let mut supported = HashMap::new();
        supported.insert(
            "anthropic.claude".to_string(),
            vec!["system".to_string(), "messages".to_string()],
        );
        RuntimeConfig {
            url: None,
            region: "eu-west-1".to_string(),
            max_iterations: 7,
            supported_cache_fields: supported,
        }
    }

    fn tool_servers(names: &[&str]) -> BTreeMap<String, McpServerConfig> {
        names
            .iter()
            .map(|name| {
                let config = McpServerConfig {
                    command: "uvx".to_string(),
                    args: vec![format!("mcp-server-{name}")],
                    env: BTreeMap::new(),
                };
                (name.to_string(), config)
            })
            .collect()
    }

    fn turn() -> InvokeAgentRequest {
        InvokeAgentRequest {
            session_id: Some("s-1".to_string()),
            messages: Vec::new(),
            prompt: serde_json::json!("hello"),
            files: Vec::new(),
        }
    }

    #[test]
    fn test_build_request_from_agent() {
        let svc = InvocationService::new(
            ScriptedRuntime::new(Vec::new()),
            config(),
            tool_servers(&["time", "fetch"]),
        );
        let agent = agent();
        let req = svc.build_request(&agent, &Caller::new("bob"), turn());

        assert_eq!(req.session_id, "s-1");
        assert_eq!(req.user_id, "bob");
        assert_eq!(req.agent_id, agent.agent_id.to_string());
        assert!(req.system_prompt.starts_with("Be concise\n"));
        assert_eq!(req.model.model_id, "us.anthropic.claude");
        assert_eq!(req.model.region, "eu-west-1");
        assert_eq!(req.mcp_servers.len(), 1);
        assert_eq!(req.mcp_servers[0].name, "time");
        assert_eq!(req.mcp_servers[0].command.as_deref(), Some("uvx"));
        assert_eq!(req.mcp_servers[0].args, vec!["mcp-server-time"]);
        assert!(req.code_execution_enabled);
        assert_eq!(req.max_iterations, 7);
        assert_eq!(req.cache_fields, vec!["system", "messages"]);
    }

    #[test]
    fn test_missing_session_id_is_generated() {
        let svc = InvocationService::new(ScriptedRuntime::new(Vec::new()), config(), BTreeMap::new());
        let mut t = turn();
        t.session_id = None;
        let req = svc.build_request(&agent(), &Caller::new("bob"), t);
        assert!(!req.session_id.is_empty());
    }

    #[tokio::test]
    async fn test_runtime_receives_launch_settings() {
        let runtime = ScriptedRuntime::new(Vec::new());
        let svc = InvocationService::new(runtime, config(), tool_servers(&["time"]));
        let _: Vec<String> = svc.invoke(&agent(), &Caller::new("bob"), turn()).collect().await;

        let seen = svc.runtime.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0].mcp_servers,
            vec![McpServerLaunch::configured("time", &tool_servers(&["time"])["time"])]
        );
    }

    #[test]
    fn test_unconfigured_servers_forwarded_by_name() {
        let svc = InvocationService::new(ScriptedRuntime::new(Vec::new()), config(), BTreeMap::new());
        let req = svc.build_request(&agent(), &Caller::new("bob"), turn());
        assert_eq!(
            req.mcp_servers,
            vec![McpServerLaunch::named("time"), McpServerLaunch::named("gone")]
        );
    }

    #[tokio::test]
    async fn test_events_pass_through_with_newlines() {
        let svc = InvocationService::new(
            ScriptedRuntime::new(vec![
                Ok(r#"{"event":{"messageStart":{}}}"#.to_string()),
                Ok("\n".to_string()),
                Ok("{\"event\":{\"messageStop\":{}}}\n".to_string()),
            ]),
            config(),
            BTreeMap::new(),
        );
        let lines: Vec<String> = svc.invoke(&agent(), &Caller::new("bob"), turn()).collect().await;
        assert_eq!(
            lines,
            vec![
                "{\"event\":{\"messageStart\":{}}}\n".to_string(),
                "{\"event\":{\"messageStop\":{}}}\n".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_runtime_failure_ends_with_error_event() {
        let svc = InvocationService::new(
            ScriptedRuntime::new(vec![
                Ok("{\"event\":{}}".to_string()),
                Err("connection reset".to_string()),
                Ok("{\"event\":{\"late\":{}}}".to_string()),
            ]),
            config(),
            BTreeMap::new(),
        );
        let lines: Vec<String> = svc.invoke(&agent(), &Caller::new("bob"), turn()).collect().await;
        assert_eq!(lines.len(), 2);

        let last: serde_json::Value = serde_json::from_str(lines[1].trim()).unwrap();
        let message = last["event"]["internalServerException"]["message"]
            .as_str()
            .unwrap();
        assert!(message.contains("connection reset"));
    }
}
