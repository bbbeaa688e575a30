//! Error types for the intake service.

use uuid::Uuid;

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Conversation error: {0}")]
    Conversation(#[from] ConversationError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("Brief error: {0}")]
    Brief(#[from] BriefError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Required fields missing from a submitted payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Missing required fields: {}", missing.join(", "))]
pub struct ValidationError {
    pub missing: Vec<String>,
}

impl ValidationError {
    /// Build from the field names that failed the non-empty check, or `None`
    /// when nothing is missing.
    pub fn from_missing(missing: Vec<&str>) -> Option<Self> {
        if missing.is_empty() {
            None
        } else {
            Some(Self {
                missing: missing.into_iter().map(String::from).collect(),
            })
        }
    }
}

/// Conversation state machine errors. None of these change machine state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversationError {
    #[error("Conversation is already complete")]
    AlreadyComplete,

    #[error("Message is empty")]
    EmptyInput,

    #[error("Topic {got} recorded out of order, expected {expected}")]
    OutOfOrder { expected: String, got: String },
}

/// Session orchestration errors.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session {id} not found")]
    NotFound { id: Uuid },

    #[error("Session {id} is on screen {screen}, cannot move to {target}")]
    InvalidTransition {
        id: Uuid,
        screen: String,
        target: String,
    },

    #[error("Only {completed} of {required} topics completed")]
    NotEnoughTopics { completed: usize, required: usize },

    #[error("Brief is not available until the conversation is finished")]
    BriefUnavailable,
}

/// External sink errors (record store and spreadsheet).
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("{sink} request failed: {reason}")]
    RequestFailed { sink: String, reason: String },

    #[error("{sink} returned {status}: {body}")]
    Status {
        sink: String,
        status: u16,
        body: String,
    },

    #[error("{sink} authentication failed: {reason}")]
    AuthFailed { sink: String, reason: String },

    #[error("Invalid response from {sink}: {reason}")]
    InvalidResponse { sink: String, reason: String },

    #[error("Required columns not found in {range}: {columns}")]
    MissingColumns { range: String, columns: String },
}

/// Brief rendering and export errors.
#[derive(Debug, thiserror::Error)]
pub enum BriefError {
    #[error("PDF rendering failed: {0}")]
    Render(String),

    #[error("Brief text has characters the built-in font cannot draw: {chars}")]
    UnsupportedText { chars: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_lists_fields() {
        let err = ValidationError::from_missing(vec!["email", "message"]).unwrap();
        assert_eq!(err.missing, vec!["email", "message"]);
        assert_eq!(err.to_string(), "Missing required fields: email, message");
    }

    #[test]
    fn validation_error_none_when_nothing_missing() {
        assert!(ValidationError::from_missing(vec![]).is_none());
    }

    #[test]
    fn top_level_wraps_sink_error() {
        let err: Error = SinkError::Status {
            sink: "airtable".into(),
            status: 503,
            body: "down".into(),
        }
        .into();
        assert_eq!(err.to_string(), "Sink error: airtable returned 503: down");
    }
}
