use thiserror::Error;

/// Errors from agent operations.
///
/// Every variant carries the context needed to build a response; callers
/// match on the variant, never on the message text.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The agent does not exist, or the caller may not see it.
    #[error("agent '{agent_id}' not found")]
    NotFound { agent_id: String },

    /// The caller can see the agent but may not change it.
    #[error("user '{caller}' is not allowed to modify agent '{agent_id}'")]
    Forbidden { agent_id: String, caller: String },

    /// No usable caller identity.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("invalid request: {0}")]
    Validation(String),

    /// A concurrent write invalidated this one.
    #[error("conflict: {message}")]
    Conflict {
        message: String,
        current_version: Option<i64>,
    },

    #[error("storage error: {0}")]
    Storage(String),
}

impl AgentError {
    pub fn not_found(agent_id: impl ToString) -> Self {
        AgentError::NotFound {
            agent_id: agent_id.to_string(),
        }
    }

    pub fn forbidden(agent_id: impl ToString, caller: impl ToString) -> Self {
        AgentError::Forbidden {
            agent_id: agent_id.to_string(),
            caller: caller.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        AgentError::Validation(message.into())
    }
}

/// Errors from item store operations (used by trait definitions in
/// agent-builder-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("query error: {0}")]
    Query(String),

    /// A transactional write precondition did not hold.
    #[error("condition failed: {0}")]
    ConditionFailed(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<RepositoryError> for AgentError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::ConditionFailed(message) => AgentError::Conflict {
                message,
                current_version: None,
            },
            other => AgentError::Storage(other.to_string()),
        }
    }
}

/// Errors from loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {message}")]
    Read { path: String, message: String },

    #[error("failed to parse config file {path}: {message}")]
    Parse { path: String, message: String },

    #[error("no data directory: {0}")]
    DataDir(String),
}

/// Errors from the model-invocation runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime is not configured")]
    NotConfigured,

    #[error("runtime request failed: {0}")]
    Request(String),

    #[error("runtime returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("runtime stream error: {0}")]
    Stream(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_error_display() {
        let err = AgentError::not_found("abc");
        assert_eq!(err.to_string(), "agent 'abc' not found");

        let err = AgentError::forbidden("abc", "bob");
        assert!(err.to_string().contains("bob"));
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    fn test_condition_failure_becomes_conflict() {
        let err: AgentError = RepositoryError::ConditionFailed("pointer exists".to_string()).into();
        match err {
            AgentError::Conflict {
                message,
                current_version,
            } => {
                assert_eq!(message, "pointer exists");
                assert!(current_version.is_none());
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn test_query_failure_becomes_storage() {
        let err: AgentError = RepositoryError::Query("disk full".to_string()).into();
        assert!(matches!(err, AgentError::Storage(msg) if msg.contains("disk full")));
    }

    #[test]
    fn test_runtime_error_display() {
        let err = RuntimeError::Status {
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "runtime returned status 502: bad gateway");
    }
}
