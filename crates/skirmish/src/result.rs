//! Result and error types for skirmish.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Error raised by user-supplied hooks (actions, actor factories, alerters, targets).
///
/// Boxed so hook bodies can use `?` on any error type.
pub type HookError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type returned by user-supplied hooks
pub type HookResult<T> = Result<T, HookError>;

/// Errors that can occur while configuring or running the engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// Missing or contradictory engine options
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Plan name not present in the registry
    #[error("Could not import plan: {name}")]
    UnknownPlan {
        /// Plan name
        name: String,
    },

    /// Actor name or actor type not present
    #[error("Unknown actor: {name}")]
    UnknownActor {
        /// Actor name (or `name: type` for an unknown actor type)
        name: String,
    },

    /// Action name not present in the registry
    #[error("Could not import action: {name}")]
    UnknownAction {
        /// Action name
        name: String,
    },

    /// Alerter name not present in the registry
    #[error("Unrecognized alerter name: {name}")]
    UnknownAlerter {
        /// Alerter name
        name: String,
    },

    /// A precondition hook failed (as opposed to returning `false`)
    #[error("Precondition of '{action}' failed for actor '{actor}': {message}")]
    Precondition {
        /// Action name
        action: String,
        /// Actor name
        actor: String,
        /// Error message
        message: String,
    },

    /// A `before`, `operation` or `after` hook failed
    #[error("Action '{action}' failed in {phase} for actor '{actor}': {message}")]
    Action {
        /// Action name
        action: String,
        /// Actor name
        actor: String,
        /// Lifecycle phase
        phase: Phase,
        /// Error message
        message: String,
    },

    /// A hook did not finish within the configured timeout
    #[error("Action '{action}' timed out in {phase} after {ms}ms")]
    Timeout {
        /// Action name
        action: String,
        /// Lifecycle phase
        phase: Phase,
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Degenerate input to the random generator
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Error message
        message: String,
    },

    /// An actor factory failed
    #[error("Could not import actor '{name}': {message}")]
    ActorImport {
        /// Actor name
        name: String,
        /// Error message
        message: String,
    },

    /// An alerter failed to deliver
    #[error("Alerter '{alerter}' failed: {message}")]
    Alert {
        /// Alerter name
        alerter: String,
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl EngineError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid input error
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Stable classification used in reports
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Config { .. } => ErrorKind::Config,
            Self::UnknownPlan { .. } => ErrorKind::UnknownPlan,
            Self::UnknownActor { .. } | Self::ActorImport { .. } => ErrorKind::UnknownActor,
            Self::UnknownAction { .. } => ErrorKind::UnknownAction,
            Self::UnknownAlerter { .. } => ErrorKind::UnknownAlerter,
            Self::Precondition { .. } => ErrorKind::Precondition,
            Self::Action { .. } | Self::Timeout { .. } => ErrorKind::Action,
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::Alert { .. } => ErrorKind::Alert,
            Self::Io(_) | Self::Json(_) | Self::Yaml(_) => ErrorKind::Io,
        }
    }

    /// Whether this error happened while executing a slot's lifecycle hooks
    #[must_use]
    pub const fn is_action_failure(&self) -> bool {
        matches!(self, Self::Action { .. } | Self::Timeout { .. })
    }
}

/// Classification of an [`EngineError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Option validation
    Config,
    /// Plan lookup miss
    UnknownPlan,
    /// Actor lookup or import failure
    UnknownActor,
    /// Action lookup miss
    UnknownAction,
    /// Alerter lookup miss
    UnknownAlerter,
    /// Precondition hook failure
    Precondition,
    /// Lifecycle hook failure or timeout
    Action,
    /// Degenerate PRNG input
    InvalidInput,
    /// Alert delivery failure
    Alert,
    /// Serialization or filesystem failure
    Io,
}

/// Lifecycle phase of an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Candidate filtering
    Precondition,
    /// Setup hook
    Before,
    /// Main hook
    Operation,
    /// Teardown hook
    After,
}

impl Phase {
    /// Lowercase phase name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Precondition => "precondition",
            Self::Before => "before",
            Self::Operation => "operation",
            Self::After => "after",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = EngineError::UnknownPlan {
            name: "nightly".to_string(),
        };
        assert_eq!(err.to_string(), "Could not import plan: nightly");

        let err = EngineError::Action {
            action: "open".to_string(),
            actor: "alice".to_string(),
            phase: Phase::Operation,
            message: "boom".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Action 'open' failed in operation for actor 'alice': boom"
        );
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(EngineError::config("x").kind(), ErrorKind::Config);
        assert_eq!(EngineError::invalid_input("x").kind(), ErrorKind::InvalidInput);
        let timeout = EngineError::Timeout {
            action: "open".to_string(),
            phase: Phase::Before,
            ms: 10,
        };
        assert_eq!(timeout.kind(), ErrorKind::Action);
        assert!(timeout.is_action_failure());
        assert!(!EngineError::config("x").is_action_failure());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: EngineError = io.into();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_phase_serializes_snake_case() {
        let json = serde_json::to_string(&Phase::Operation).unwrap();
        assert_eq!(json, "\"operation\"");
    }
}
