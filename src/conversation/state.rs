//! Conversation topics and machine state.

use serde::{Deserialize, Serialize, Serializer};

/// The subjects the scripted conversation walks through.
///
/// Progresses linearly: TargetAudience → CoreFeatures → DesignPreferences →
/// PlatformRequirements → SuccessMetrics. Declaration order is the walk order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConversationTopic {
    TargetAudience,
    CoreFeatures,
    DesignPreferences,
    PlatformRequirements,
    SuccessMetrics,
}

impl ConversationTopic {
    /// Every topic, in walk order.
    pub const ALL: [ConversationTopic; 5] = [
        Self::TargetAudience,
        Self::CoreFeatures,
        Self::DesignPreferences,
        Self::PlatformRequirements,
        Self::SuccessMetrics,
    ];

    pub fn first() -> Self {
        Self::TargetAudience
    }

    /// Position in the walk order.
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// The topic after this one, or `None` after the last.
    pub fn next(&self) -> Option<ConversationTopic> {
        Self::ALL.get(self.index() + 1).copied()
    }

    /// Progress label shown next to each topic.
    pub fn label(&self) -> &'static str {
        match self {
            Self::TargetAudience => "Target Audience",
            Self::CoreFeatures => "Core Features",
            Self::DesignPreferences => "Design & UX",
            Self::PlatformRequirements => "Platform & Tech",
            Self::SuccessMetrics => "Success Goals",
        }
    }

    /// Input placeholder for the chat box while this topic is current.
    pub fn placeholder(&self) -> &'static str {
        match self {
            Self::TargetAudience => "Tell me about your target audience...",
            Self::CoreFeatures => "Tell me about the core features you need...",
            Self::DesignPreferences => "Tell me about your design preferences...",
            Self::PlatformRequirements => "Tell me about platform requirements...",
            Self::SuccessMetrics => "Tell me about how you'll measure success...",
        }
    }
}

impl std::fmt::Display for ConversationTopic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::TargetAudience => "targetAudience",
            Self::CoreFeatures => "coreFeatures",
            Self::DesignPreferences => "designPreferences",
            Self::PlatformRequirements => "platformRequirements",
            Self::SuccessMetrics => "successMetrics",
        };
        write!(f, "{s}")
    }
}

/// Where the machine is: asking about a topic, or done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    Asking(ConversationTopic),
    Complete,
}

impl ConversationState {
    /// Whether this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete)
    }

    pub fn topic(&self) -> Option<ConversationTopic> {
        match self {
            Self::Asking(topic) => Some(*topic),
            Self::Complete => None,
        }
    }

    /// The state that follows answering the current topic.
    pub fn next(&self) -> Option<ConversationState> {
        match self {
            Self::Asking(topic) => Some(topic.next().map_or(Self::Complete, Self::Asking)),
            Self::Complete => None,
        }
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::Asking(ConversationTopic::first())
    }
}

impl std::fmt::Display for ConversationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Asking(topic) => write!(f, "{topic}"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

impl Serialize for ConversationState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_next_follows_walk_order() {
        use ConversationTopic::*;
        assert_eq!(TargetAudience.next(), Some(CoreFeatures));
        assert_eq!(DesignPreferences.next(), Some(PlatformRequirements));
        assert_eq!(SuccessMetrics.next(), None);
    }

    #[test]
    fn state_next_walks_to_complete() {
        let mut state = ConversationState::default();
        let mut seen = vec![];
        while let Some(topic) = state.topic() {
            seen.push(topic);
            state = state.next().unwrap();
        }
        assert_eq!(seen, ConversationTopic::ALL);
        assert!(state.is_terminal());
        assert!(state.next().is_none());
    }

    #[test]
    fn display_matches_serde() {
        for topic in ConversationTopic::ALL {
            let json = serde_json::to_string(&topic).unwrap();
            assert_eq!(format!("\"{topic}\""), json, "mismatch for {topic:?}");
        }
        let complete = serde_json::to_string(&ConversationState::Complete).unwrap();
        assert_eq!(complete, "\"complete\"");
    }

    #[test]
    fn labels_are_distinct() {
        let labels: std::collections::HashSet<_> =
            ConversationTopic::ALL.iter().map(|t| t.label()).collect();
        assert_eq!(labels.len(), 5);
    }
}
