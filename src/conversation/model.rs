//! Chat messages and the per-topic conversation record.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::ConversationTopic;
use crate::error::ConversationError;

/// Who wrote a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Bot,
}

/// One line of the chat transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(text: impl Into<String>, sender: Sender) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            sender,
            timestamp: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(text, Sender::User)
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self::new(text, Sender::Bot)
    }
}

/// Value stored for a topic: free text or a tag list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TopicValue {
    Text(String),
    List(Vec<String>),
}

impl TopicValue {
    /// Display form used by the brief: lists join with ", ".
    pub fn joined(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::List(items) => items.join(", "),
        }
    }

    pub fn as_list(&self) -> Vec<String> {
        match self {
            Self::Text(text) => vec![text.clone()],
            Self::List(items) => items.clone(),
        }
    }
}

/// Answers collected so far, keyed by topic.
///
/// Topics can only be recorded in walk order, so the recorded keys are always
/// a prefix of `ConversationTopic::ALL`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRecord {
    entries: BTreeMap<ConversationTopic, TopicValue>,
    /// Integration categories found in the platform answer.
    integrations: Vec<String>,
}

impl ConversationRecord {
    /// The topic that must be recorded next, or `None` once all are in.
    pub fn next_expected(&self) -> Option<ConversationTopic> {
        ConversationTopic::ALL.get(self.entries.len()).copied()
    }

    /// Record the answer for `topic`. Fails without mutating when `topic` is
    /// not the next one in walk order.
    pub fn record(
        &mut self,
        topic: ConversationTopic,
        value: TopicValue,
    ) -> Result<(), ConversationError> {
        match self.next_expected() {
            Some(expected) if expected == topic => {
                self.entries.insert(topic, value);
                Ok(())
            }
            Some(expected) => Err(ConversationError::OutOfOrder {
                expected: expected.to_string(),
                got: topic.to_string(),
            }),
            None => Err(ConversationError::AlreadyComplete),
        }
    }

    pub fn set_integrations(&mut self, integrations: Vec<String>) {
        self.integrations = integrations;
    }

    pub fn get(&self, topic: ConversationTopic) -> Option<&TopicValue> {
        self.entries.get(&topic)
    }

    pub fn text(&self, topic: ConversationTopic) -> Option<String> {
        self.get(topic).map(TopicValue::joined)
    }

    pub fn list(&self, topic: ConversationTopic) -> Vec<String> {
        self.get(topic).map(TopicValue::as_list).unwrap_or_default()
    }

    pub fn integrations(&self) -> &[String] {
        &self.integrations
    }

    /// Topics recorded so far, in walk order.
    pub fn topics(&self) -> Vec<ConversationTopic> {
        self.entries.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.next_expected().is_none()
    }
}
