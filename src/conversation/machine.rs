//! Scripted conversation state machine.
//!
//! Each reply is dispatched to the handler for the current topic, which stores
//! the extracted value, picks the next bot line and advances one topic. The
//! machine never calls out to anything; sink writes happen in the session
//! layer once the machine reports completion.

use std::time::Duration;

use rand::Rng;
use serde::Serialize;
use tracing::debug;

use super::extract::{Platform, extract_features, extract_integrations, extract_platforms};
use super::model::{ConversationRecord, TopicValue};
use super::prompts;
use super::recommend::recommend;
use super::state::{ConversationState, ConversationTopic};
use crate::error::ConversationError;

/// Base "bot is typing" window before each reply.
pub const TYPING_BASE_MS: u64 = 1200;
/// Upper bound of the random jitter added to the typing window.
pub const TYPING_JITTER_MS: u64 = 800;

/// Intake form details the scripted replies depend on.
#[derive(Debug, Clone, Default)]
pub struct ConversationContext {
    pub client_name: String,
    pub project_type: String,
    pub budget: String,
}

/// Structured data produced by one turn.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicData {
    pub topic: ConversationTopic,
    pub value: TopicValue,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub integrations: Vec<String>,
    /// Platforms spotted in the design answer. Reported only; never stored as
    /// platform requirements.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub platform_hints: Vec<Platform>,
}

/// Result of feeding one user reply to the machine.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    pub prompt: String,
    pub next_state: ConversationState,
    pub data: TopicData,
    /// How long the UI should show the typing indicator. Has no effect on state.
    #[serde(serialize_with = "serialize_millis")]
    pub typing_delay: Duration,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Walks the five topics in order, one reply each.
#[derive(Debug, Clone)]
pub struct ConversationMachine {
    state: ConversationState,
    record: ConversationRecord,
    context: ConversationContext,
}

impl ConversationMachine {
    pub fn new(context: ConversationContext) -> Self {
        Self {
            state: ConversationState::default(),
            record: ConversationRecord::default(),
            context,
        }
    }

    /// The two bot lines that open the conversation.
    pub fn opening_lines(&self) -> [String; 2] {
        [
            prompts::greeting(&self.context.client_name, &self.context.project_type),
            prompts::FIRST_QUESTION.to_string(),
        ]
    }

    pub fn state(&self) -> ConversationState {
        self.state
    }

    pub fn record(&self) -> &ConversationRecord {
        &self.record
    }

    pub fn is_complete(&self) -> bool {
        self.state.is_terminal()
    }

    /// Number of topics answered so far.
    pub fn completed_topics(&self) -> usize {
        self.record.len()
    }

    /// Replace the form context, e.g. after the review screen edits the budget.
    pub fn set_context(&mut self, context: ConversationContext) {
        self.context = context;
    }

    /// Feed one user reply. Errors leave the machine untouched.
    pub fn advance(&mut self, input: &str) -> Result<Turn, ConversationError> {
        let topic = self.state.topic().ok_or(ConversationError::AlreadyComplete)?;
        if input.trim().is_empty() {
            return Err(ConversationError::EmptyInput);
        }

        let (prompt, data) = match topic {
            ConversationTopic::TargetAudience => self.on_target_audience(input),
            ConversationTopic::CoreFeatures => self.on_core_features(input),
            ConversationTopic::DesignPreferences => self.on_design_preferences(input),
            ConversationTopic::PlatformRequirements => self.on_platform_requirements(input),
            ConversationTopic::SuccessMetrics => self.on_success_metrics(input),
        };

        self.record.record(topic, data.value.clone())?;
        if topic == ConversationTopic::PlatformRequirements {
            self.record.set_integrations(data.integrations.clone());
        }

        let next_state = self
            .state
            .next()
            .ok_or(ConversationError::AlreadyComplete)?;
        self.state = next_state;
        debug!(%topic, next = %next_state, "Conversation advanced");

        Ok(Turn {
            prompt,
            next_state,
            data,
            typing_delay: typing_delay(),
        })
    }

    fn on_target_audience(&self, input: &str) -> (String, TopicData) {
        let lowered = input.to_lowercase();
        let prompt = if prompts::mentions_any(&lowered, &prompts::BUSINESS_MARKERS) {
            prompts::AUDIENCE_BUSINESS
        } else if prompts::mentions_any(&lowered, &prompts::CONSUMER_MARKERS) {
            prompts::AUDIENCE_CONSUMER
        } else {
            prompts::AUDIENCE_GENERAL
        };
        (
            prompt.to_string(),
            plain(ConversationTopic::TargetAudience, TopicValue::Text(input.to_string())),
        )
    }

    fn on_core_features(&self, input: &str) -> (String, TopicData) {
        let mut features = extract_features(input);
        if features.is_empty() {
            features = vec![input.to_string()];
        }

        let mentions_accounts = features
            .iter()
            .any(|f| prompts::mentions_any(&f.to_lowercase(), &prompts::ACCOUNT_MARKERS));
        let prompt = if mentions_accounts {
            prompts::features_with_accounts()
        } else {
            prompts::features_general()
        };
        (
            prompt,
            plain(ConversationTopic::CoreFeatures, TopicValue::List(features)),
        )
    }

    fn on_design_preferences(&self, input: &str) -> (String, TopicData) {
        let recommendation = recommend(&self.context.budget, &self.context.project_type);
        let platform_hints = extract_platforms(input);
        if !platform_hints.is_empty() {
            debug!(hints = ?platform_hints, "Platforms mentioned in design answer");
        }
        (
            prompts::design_ack(recommendation),
            TopicData {
                platform_hints,
                ..plain(
                    ConversationTopic::DesignPreferences,
                    TopicValue::Text(input.to_string()),
                )
            },
        )
    }

    fn on_platform_requirements(&self, input: &str) -> (String, TopicData) {
        let platforms: Vec<String> = extract_platforms(input)
            .iter()
            .map(|p| p.to_string())
            .collect();
        let platforms = if platforms.is_empty() {
            vec![input.to_string()]
        } else {
            platforms
        };
        let integrations: Vec<String> = extract_integrations(input)
            .iter()
            .map(|i| i.to_string())
            .collect();

        let prompt = if integrations.is_empty() {
            prompts::platforms_general()
        } else {
            prompts::platforms_with_integrations()
        };
        (
            prompt,
            TopicData {
                integrations,
                ..plain(
                    ConversationTopic::PlatformRequirements,
                    TopicValue::List(platforms),
                )
            },
        )
    }

    fn on_success_metrics(&self, input: &str) -> (String, TopicData) {
        (
            prompts::WRAP_UP.to_string(),
            plain(ConversationTopic::SuccessMetrics, TopicValue::Text(input.to_string())),
        )
    }
}

fn plain(topic: ConversationTopic, value: TopicValue) -> TopicData {
    TopicData {
        topic,
        value,
        integrations: Vec::new(),
        platform_hints: Vec::new(),
    }
}

/// Typing window for one reply: the base plus random jitter.
pub fn typing_delay() -> Duration {
    let jitter = rand::thread_rng().gen_range(0..=TYPING_JITTER_MS);
    Duration::from_millis(TYPING_BASE_MS + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::recommend::{NATIVE_MOBILE, TEMPLATE_ECOMMERCE};

    fn machine(project_type: &str, budget: &str) -> ConversationMachine {
        ConversationMachine::new(ConversationContext {
            client_name: "Dana".into(),
            project_type: project_type.into(),
            budget: budget.into(),
        })
    }

    fn at_topic(topic: ConversationTopic) -> ConversationMachine {
        let mut m = machine("Web Application", "Under $5,000");
        while m.state() != ConversationState::Asking(topic) {
            m.advance("filler answer").unwrap();
        }
        m
    }

    #[test]
    fn five_answers_walk_every_topic_once() {
        let mut m = machine("Mobile App", "Over $100,000");
        let mut visited = vec![];
        let mut completions = 0;

        for answer in [
            "Small business owners",
            "We need invoicing",
            "Minimal and clean",
            "Desktop and mobile",
            "100 paying customers",
        ] {
            visited.push(m.state().topic().unwrap());
            let turn = m.advance(answer).unwrap();
            if turn.next_state.is_terminal() {
                completions += 1;
            }
        }

        assert_eq!(visited, ConversationTopic::ALL);
        assert_eq!(completions, 1);
        assert!(m.is_complete());
        assert_eq!(m.record().topics(), ConversationTopic::ALL);
        assert_eq!(m.completed_topics(), 5);
    }

    #[test]
    fn complete_machine_rejects_input() {
        let mut m = at_topic(ConversationTopic::SuccessMetrics);
        m.advance("revenue").unwrap();
        assert_eq!(m.advance("more").unwrap_err(), ConversationError::AlreadyComplete);
        assert_eq!(m.completed_topics(), 5);
    }

    #[test]
    fn blank_input_changes_nothing() {
        let mut m = machine("Web Application", "Under $5,000");
        assert_eq!(m.advance("   ").unwrap_err(), ConversationError::EmptyInput);
        assert_eq!(m.state(), ConversationState::Asking(ConversationTopic::TargetAudience));
        assert!(m.record().is_empty());
    }

    #[test]
    fn audience_tone_matches() {
        let mut m = machine("Web Application", "Under $5,000");
        let turn = m.advance("Enterprise procurement teams").unwrap();
        assert_eq!(turn.prompt, prompts::AUDIENCE_BUSINESS);

        let mut m = machine("Web Application", "Under $5,000");
        let turn = m.advance("The general public").unwrap();
        assert_eq!(turn.prompt, prompts::AUDIENCE_CONSUMER);

        let mut m = machine("Web Application", "Under $5,000");
        let turn = m.advance("Students").unwrap();
        assert_eq!(turn.prompt, prompts::AUDIENCE_GENERAL);
        assert_eq!(
            m.record().text(ConversationTopic::TargetAudience).as_deref(),
            Some("Students")
        );
    }

    #[test]
    fn audience_stored_verbatim() {
        let mut m = machine("Web Application", "Under $5,000");
        m.advance("  Busy Parents ").unwrap();
        assert_eq!(
            m.record().text(ConversationTopic::TargetAudience).as_deref(),
            Some("  Busy Parents ")
        );
    }

    #[test]
    fn login_features_take_accounts_branch() {
        let mut m = at_topic(ConversationTopic::CoreFeatures);
        let turn = m.advance("We need user login and a dashboard").unwrap();
        assert!(turn.prompt.contains("user accounts"));
        let features = m.record().list(ConversationTopic::CoreFeatures);
        assert!(!features.is_empty());
        assert_eq!(features, vec!["user login and a dashboard"]);
    }

    #[test]
    fn features_fall_back_to_raw_input() {
        let mut m = at_topic(ConversationTopic::CoreFeatures);
        let turn = m.advance("Calendar, reminders, reports").unwrap();
        assert_eq!(turn.prompt, prompts::features_general());
        assert_eq!(
            m.record().list(ConversationTopic::CoreFeatures),
            vec!["Calendar, reminders, reports"]
        );
    }

    #[test]
    fn design_step_uses_budget_context() {
        let mut m = machine("Mobile App", "Over $100,000");
        m.advance("Doctors").unwrap();
        m.advance("Scheduling").unwrap();
        let turn = m.advance("Dark theme").unwrap();
        assert!(turn.prompt.contains(NATIVE_MOBILE));

        let mut m = machine("E-commerce Site", "Under $5,000");
        m.advance("Shoppers").unwrap();
        m.advance("Cart").unwrap();
        let turn = m.advance("Bright colors").unwrap();
        assert!(turn.prompt.contains(TEMPLATE_ECOMMERCE));
    }

    #[test]
    fn design_platform_hints_are_not_stored() {
        let mut m = at_topic(ConversationTopic::DesignPreferences);
        let turn = m.advance("Looks like a native iOS app").unwrap();
        assert_eq!(turn.data.platform_hints, vec![Platform::Mobile]);
        assert!(m.record().get(ConversationTopic::PlatformRequirements).is_none());
        assert_eq!(
            m.record().text(ConversationTopic::DesignPreferences).as_deref(),
            Some("Looks like a native iOS app")
        );
    }

    #[test]
    fn platform_step_records_integrations() {
        let mut m = at_topic(ConversationTopic::PlatformRequirements);
        let turn = m.advance("iPhone and laptop, with Stripe payments").unwrap();
        assert_eq!(turn.prompt, prompts::platforms_with_integrations());
        assert_eq!(
            m.record().list(ConversationTopic::PlatformRequirements),
            vec!["Mobile", "Desktop"]
        );
        assert_eq!(m.record().integrations(), ["Payment Processing"]);
    }

    #[test]
    fn platform_step_falls_back_to_raw_text() {
        let mut m = at_topic(ConversationTopic::PlatformRequirements);
        let turn = m.advance("Wherever our users are").unwrap();
        assert_eq!(turn.prompt, prompts::platforms_general());
        assert_eq!(
            m.record().list(ConversationTopic::PlatformRequirements),
            vec!["Wherever our users are"]
        );
        assert!(m.record().integrations().is_empty());
    }

    #[test]
    fn typing_delay_within_window() {
        for _ in 0..20 {
            let d = typing_delay();
            assert!(d >= Duration::from_millis(TYPING_BASE_MS));
            assert!(d <= Duration::from_millis(TYPING_BASE_MS + TYPING_JITTER_MS));
        }
    }

    #[test]
    fn opening_lines_greet_client() {
        let m = machine("Mobile App", "Over $100,000");
        let [greeting, question] = m.opening_lines();
        assert!(greeting.contains("Dana"));
        assert_eq!(question, prompts::FIRST_QUESTION);
    }
}
