//! Screen flow of an intake session.
//!
//! ```text
//! Form -> Chatbot -> Review -> Completion -> Status
//!            ^---------'  ^-------------------' |
//!                                   Admin <-----'
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// The screen a session is currently on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    Form,
    Chatbot,
    Review,
    Completion,
    Status,
    Admin,
}

impl Screen {
    /// Whether moving from `self` to `target` is a valid step.
    pub fn can_transition_to(&self, target: Screen) -> bool {
        matches!(
            (self, target),
            (Self::Form, Self::Chatbot)
                | (Self::Chatbot, Self::Review)
                | (Self::Review, Self::Chatbot)
                | (Self::Review, Self::Completion)
                | (Self::Completion, Self::Status)
                | (Self::Status, Self::Review)
                | (Self::Status, Self::Admin)
                | (Self::Admin, Self::Status)
        )
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Form => "form",
            Self::Chatbot => "chatbot",
            Self::Review => "review",
            Self::Completion => "completion",
            Self::Status => "status",
            Self::Admin => "admin",
        };
        write!(f, "{s}")
    }
}
