//! Error types for the cycle planner client.

use std::time::Duration;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Flow error: {0}")]
    Flow(#[from] FlowError),
}

impl Error {
    /// Inline text a screen shows for this failure.
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(e) => format!("Configuration problem: {e}"),
            Self::Database(_) => "Could not access local storage.".to_string(),
            Self::Api(e) => e.user_message(),
            Self::Flow(e) => e.user_message(),
        }
    }

    /// Every failure leaves the process running; only configuration problems
    /// need a restart to fix.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Config(_))
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Local keyed store errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Remote call failures. All of them are recoverable and none is retried
/// automatically.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{operation} failed: {reason}")]
    Network { operation: String, reason: String },

    #[error("{operation} timed out after {timeout:?}")]
    Timeout { operation: String, timeout: Duration },

    #[error("Scheduling agent unavailable: {reason}")]
    AgentUnavailable { reason: String },

    #[error("{operation} rejected ({status}): {message}")]
    Rejected {
        operation: String,
        status: u16,
        message: String,
    },

    #[error("Invalid response from {operation}: {reason}")]
    InvalidResponse { operation: String, reason: String },
}

impl ApiError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Network { .. } | Self::InvalidResponse { .. } => {
                "Could not reach the server. Please try again.".to_string()
            }
            Self::Timeout { .. } => "The server took too long to answer. Please try again.".to_string(),
            Self::AgentUnavailable { .. } => {
                "The planning agent is unavailable right now. Please try again later.".to_string()
            }
            Self::Rejected { message, .. } => message.clone(),
        }
    }

    /// Whether this failure is in the network class (transport error or
    /// timeout) rather than an answer from the backend.
    pub fn is_network_failure(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Timeout { .. })
    }
}

/// Local control-flow conditions. None of these ever reaches the network.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    #[error("Step {step} is incomplete: {field} is required")]
    ValidationIncomplete { step: usize, field: String },

    #[error("No user identity in session")]
    MissingIdentity,

    #[error("Persisted session snapshot is malformed: {0}")]
    MalformedPersistedState(String),

    #[error("Screen {from} does not accept {event}")]
    InvalidTransition { from: String, event: String },

    #[error("Another suggestion is already being applied")]
    ApplyInFlight,

    #[error("Suggestion for {event_id} cannot be applied: {reason}")]
    NotApplicable { event_id: String, reason: String },

    #[error("Cannot finish from step {step} of {total}")]
    NotAtLastStep { step: usize, total: usize },

    #[error("No suggested slot to schedule")]
    NoSuggestedSlot,
}

impl FlowError {
    pub fn user_message(&self) -> String {
        match self {
            Self::ValidationIncomplete { field, .. } => {
                format!("Please fill in {field} before continuing.")
            }
            Self::MissingIdentity => "No user found. Please log in again.".to_string(),
            Self::MalformedPersistedState(_) => "Your saved session could not be restored.".to_string(),
            Self::InvalidTransition { .. } => "That action is not available here.".to_string(),
            Self::ApplyInFlight => "Please wait for the current change to finish.".to_string(),
            Self::NotApplicable { .. } => "This suggestion cannot be applied.".to_string(),
            Self::NotAtLastStep { .. } => "Please answer every step first.".to_string(),
            Self::NoSuggestedSlot => "There is no suggested time for this event.".to_string(),
        }
    }
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
