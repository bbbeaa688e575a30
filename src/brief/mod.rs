//! Project brief: the read-only summary handed to the development team.

pub mod pdf;

use chrono::{NaiveDate, Utc};
use serde::Serialize;

use crate::conversation::{ConversationRecord, ConversationTopic};
use crate::intake::IntakeForm;

pub use pdf::{BRIEF_FILE_NAME, BriefFont, render_pdf, save_pdf};

pub const NOT_SPECIFIED: &str = "Not specified";

/// One labeled section of the brief.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BriefSection {
    pub title: &'static str,
    pub body: String,
}

/// Intake form and conversation answers joined into five sections.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectBrief {
    pub client_name: String,
    pub company: String,
    pub project_type: String,
    pub budget: String,
    pub timeline: String,
    pub generated_on: NaiveDate,
    pub sections: Vec<BriefSection>,
}

/// Section titles paired with the topic that fills them, in display order.
const SECTIONS: [(&str, ConversationTopic); 5] = [
    ("Target Audience", ConversationTopic::TargetAudience),
    ("Core Features", ConversationTopic::CoreFeatures),
    ("Design & UX", ConversationTopic::DesignPreferences),
    ("Platform & Technology", ConversationTopic::PlatformRequirements),
    ("Success Goals", ConversationTopic::SuccessMetrics),
];

impl ProjectBrief {
    pub fn build(form: &IntakeForm, record: &ConversationRecord) -> Self {
        let sections = SECTIONS
            .iter()
            .map(|(title, topic)| BriefSection {
                title,
                body: record
                    .text(*topic)
                    .filter(|body| !body.trim().is_empty())
                    .unwrap_or_else(|| NOT_SPECIFIED.to_string()),
            })
            .collect();

        Self {
            client_name: form.name.clone(),
            company: form.company.clone(),
            project_type: form.project_type.clone(),
            budget: form.budget.clone(),
            timeline: form.timeline.clone(),
            generated_on: Utc::now().date_naive(),
            sections,
        }
    }

    pub fn section(&self, title: &str) -> Option<&str> {
        self.sections
            .iter()
            .find(|s| s.title == title)
            .map(|s| s.body.as_str())
    }

    /// Header lines printed above the sections.
    pub fn header_lines(&self) -> Vec<String> {
        vec![
            format!("Prepared for {} ({})", self.client_name, self.company),
            format!(
                "{} | Budget: {} | Timeline: {}",
                self.project_type, self.budget, self.timeline
            ),
            format!("Generated on {}", self.generated_on.format("%Y-%m-%d")),
        ]
    }
}
