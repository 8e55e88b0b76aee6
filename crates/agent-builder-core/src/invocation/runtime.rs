//! AgentRuntime trait definition.
//!
//! The runtime is the black box that actually runs an agent turn. It answers
//! with newline-delimited JSON events which are passed through untouched.

use std::pin::Pin;

use futures_util::Stream;

use agent_builder_types::error::RuntimeError;
use agent_builder_types::invocation::InvocationRequest;

/// A stream of newline-terminated JSON event lines.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<String, RuntimeError>> + Send + 'static>>;

/// Trait for model-invocation backends.
///
/// Returns a boxed stream (not RPITIT) so the API layer can hand it straight
/// to a streaming response body. Implementations live in agent-builder-infra
/// (`HttpAgentRuntime`).
pub trait AgentRuntime: Send + Sync {
    /// Start one invocation. Connection and status failures surface as the
    /// first item of the stream.
    fn invoke(&self, request: InvocationRequest) -> EventStream;
}
