//! Error types for hive-core
//!
//! This module provides error types and user-friendly error formatting.

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed message, task or plan input
    #[error("validation error: {0}")]
    Validation(String),

    /// No handler registered for a message type
    #[error("no handler registered for message type '{0}'")]
    HandlerNotFound(String),

    /// Tool not registered on the agent
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    /// Agent not present in the directory
    #[error("agent not found: {0}")]
    AgentNotFound(String),

    /// Agent is not accepting input
    #[error("agent is inactive: {0}")]
    AgentInactive(String),

    /// Operation not allowed in the current lifecycle state
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Planner failed or produced an unusable plan
    #[error("planning failed: {0}")]
    PlanningFailed(String),

    /// Combiner failed to produce the final answer
    #[error("combine failed: {0}")]
    CombineFailed(String),

    /// Tool invocation failed
    #[error("tool error: {0}")]
    Tool(String),

    /// Task or agent record storage failed
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Model selection policy error
    #[error("llm error: {0}")]
    Llm(#[from] hive_llm::Error),

    /// Internal error (serialization, join failures, etc.)
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for user-friendly error messages
///
/// Provides human-readable error messages and suggestions for fixing.
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get a suggestion for how to fix the error
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for Error {
    fn user_message(&self) -> String {
        match self {
            Error::Validation(msg) => format!("Invalid input: {}", msg),
            Error::HandlerNotFound(kind) => {
                format!("No agent handler accepts '{}' messages.", kind)
            }
            Error::ToolNotFound(name) => format!("Tool '{}' is not registered.", name),
            Error::AgentNotFound(id) => format!("Agent '{}' is not running.", id),
            Error::AgentInactive(id) => format!("Agent '{}' is not accepting work.", id),
            Error::InvalidState(msg) => format!("Operation not allowed right now: {}", msg),
            Error::PlanningFailed(msg) => format!("Could not plan the request: {}", msg),
            Error::CombineFailed(msg) => format!("Could not assemble the answer: {}", msg),
            Error::Tool(msg) => format!("Tool failed: {}", msg),
            Error::Persistence(msg) => format!("Storage error: {}", msg),
            Error::Llm(e) => format!("Model error: {}", e),
            Error::Internal(msg) => format!("Internal error: {}", msg),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            Error::AgentNotFound(_) | Error::AgentInactive(_) => Some(
                "Check the [[agents]] entries in config/default.toml and that the agent started."
                    .to_string(),
            ),
            Error::PlanningFailed(_) => {
                Some("Try breaking down your request into smaller steps.".to_string())
            }
            Error::Persistence(_) => {
                Some("Check the [storage] path and that the directory is writable.".to_string())
            }
            Error::Llm(hive_llm::Error::NotConfigured(_)) => Some(
                "Configure a tertiary provider under [providers.tertiary] (a local Ollama works)."
                    .to_string(),
            ),
            Error::Llm(hive_llm::Error::Network(_)) | Error::Llm(hive_llm::Error::Timeout(_)) => {
                Some("Check that the provider endpoint is reachable.".to_string())
            }
            _ => None,
        }
    }
}

/// Format an error for display in the CLI
pub fn format_error_for_cli(error: &Error) -> String {
    let mut output = error.user_message();
    output.push('\n');

    if let Some(suggestion) = error.suggestion() {
        output.push('\n');
        output.push_str(&suggestion);
        output.push('\n');
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_not_found_message() {
        let error = Error::AgentNotFound("coder".to_string());

        assert!(error.user_message().contains("coder"));
        assert!(error.suggestion().unwrap().contains("[[agents]]"));
    }

    #[test]
    fn test_llm_error_conversion() {
        let error: Error = hive_llm::Error::NotConfigured("no tertiary".to_string()).into();

        assert!(matches!(error, Error::Llm(_)));
        assert!(error.suggestion().unwrap().contains("providers.tertiary"));
    }

    #[test]
    fn test_format_error_for_cli() {
        let error = Error::PlanningFailed("dependency cycle".to_string());

        let output = format_error_for_cli(&error);
        assert!(output.contains("dependency cycle"));
        assert!(output.contains("smaller steps"));
    }

    #[test]
    fn test_format_without_suggestion() {
        let error = Error::Internal("join failed".to_string());

        let output = format_error_for_cli(&error);
        assert_eq!(output, "Internal error: join failed\n");
    }
}
