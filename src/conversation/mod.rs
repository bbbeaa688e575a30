//! Scripted intake conversation.
//!
//! After the intake form, the client answers five fixed questions. Replies are
//! classified with keyword rules (no model involved): the machine stores what
//! it extracts per topic and picks the next bot line from a small set of
//! canned responses, tuned by the form's budget and project type.

pub mod extract;
pub mod machine;
pub mod model;
pub mod prompts;
pub mod recommend;
pub mod state;

pub use extract::{Integration, Platform, extract_features, extract_integrations, extract_platforms};
pub use machine::{ConversationContext, ConversationMachine, TopicData, Turn};
pub use model::{ChatMessage, ConversationRecord, Sender, TopicValue};
pub use recommend::recommend;
pub use state::{ConversationState, ConversationTopic};
