//! Intake form model and the multi-step form layout.

use serde::{Deserialize, Deserializer, Serialize};

use crate::conversation::ConversationContext;
use crate::error::ValidationError;

pub const PROJECT_TYPES: [&str; 6] = [
    "Web Application",
    "Mobile App",
    "E-commerce Site",
    "Landing Page",
    "Custom Software",
    "Other",
];

pub const BUDGET_RANGES: [&str; 5] = [
    "Under $5,000",
    "$5,000 - $15,000",
    "$15,000 - $50,000",
    "$50,000 - $100,000",
    "Over $100,000",
];

pub const TIMELINES: [&str; 5] = [
    "ASAP (Rush)",
    "1-2 months",
    "3-6 months",
    "6+ months",
    "Flexible",
];

/// Reads a string field that may be JSON `null`; null counts as empty so
/// validation reports the field as missing.
pub(crate) fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// A prospective client's answers to the intake form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeForm {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub company: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub project_type: String,
    #[serde(default, alias = "budgetRange", deserialize_with = "null_as_empty")]
    pub budget: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub timeline: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
}

impl IntakeForm {
    /// Every field is required; blank values are reported together.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let fields = [
            ("name", &self.name),
            ("email", &self.email),
            ("company", &self.company),
            ("projectType", &self.project_type),
            ("budget", &self.budget),
            ("timeline", &self.timeline),
            ("description", &self.description),
        ];
        let missing = fields
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(key, _)| *key)
            .collect();
        match ValidationError::from_missing(missing) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// The subset of the form the conversation replies depend on.
    pub fn conversation_context(&self) -> ConversationContext {
        ConversationContext {
            client_name: self.name.clone(),
            project_type: self.project_type.clone(),
            budget: self.budget.clone(),
        }
    }
}

/// Widget used to render a form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Input,
    Select,
    Textarea,
}

#[derive(Debug, Clone, Serialize)]
pub struct FormField {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<&'static str>,
    #[serde(skip_serializing_if = "no_options")]
    pub options: &'static [&'static str],
}

fn no_options(options: &&'static [&'static str]) -> bool {
    options.is_empty()
}

#[derive(Debug, Clone, Serialize)]
pub struct FormStep {
    pub title: &'static str,
    pub subtitle: &'static str,
    pub fields: Vec<FormField>,
}

fn input(key: &'static str, label: &'static str, placeholder: &'static str) -> FormField {
    FormField {
        key,
        label,
        kind: FieldKind::Input,
        placeholder: Some(placeholder),
        options: &[],
    }
}

fn select(key: &'static str, label: &'static str, options: &'static [&'static str]) -> FormField {
    FormField {
        key,
        label,
        kind: FieldKind::Select,
        placeholder: None,
        options,
    }
}

/// The four steps of the intake form, in order.
pub fn form_steps() -> Vec<FormStep> {
    vec![
        FormStep {
            title: "Let's start with your details",
            subtitle: "We'll use this to personalize your experience",
            fields: vec![
                input("name", "Full Name", "John Doe"),
                input("email", "Email Address", "john@company.com"),
                input("company", "Company Name", "Acme Inc."),
            ],
        },
        FormStep {
            title: "Tell us about your project",
            subtitle: "This helps us understand your needs better",
            fields: vec![select("projectType", "Project Type", &PROJECT_TYPES)],
        },
        FormStep {
            title: "Project scope and timeline",
            subtitle: "Help us understand your constraints",
            fields: vec![
                select("budget", "Budget Range", &BUDGET_RANGES),
                select("timeline", "Timeline", &TIMELINES),
            ],
        },
        FormStep {
            title: "Project description",
            subtitle: "Share your vision with us",
            fields: vec![FormField {
                key: "description",
                label: "Project Description",
                kind: FieldKind::Textarea,
                placeholder: Some(
                    "Describe your project goals, key features, target audience, and any specific requirements...",
                ),
                options: &[],
            }],
        },
    ]
}

/// A fully filled-in form for tests.
#[cfg(test)]
pub(crate) fn sample_form() -> IntakeForm {
    IntakeForm {
        name: "Dana Reyes".into(),
        email: "dana@clinic.io".into(),
        company: "Reyes Dental".into(),
        project_type: "Mobile App".into(),
        budget: "$15,000 - $50,000".into(),
        timeline: "3-6 months".into(),
        description: "Appointment booking for patients".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_form_is_valid() {
        assert!(sample_form().validate().is_ok());
    }

    #[test]
    fn blank_fields_are_reported_together() {
        let form = IntakeForm {
            company: "  ".into(),
            timeline: String::new(),
            ..sample_form()
        };
        let err = form.validate().unwrap_err();
        assert_eq!(err.missing, vec!["company", "timeline"]);
    }

    #[test]
    fn accepts_budget_range_alias() {
        let form: IntakeForm =
            serde_json::from_str(r#"{"name":"A","budgetRange":"Over $100,000"}"#).unwrap();
        assert_eq!(form.budget, "Over $100,000");
        assert_eq!(form.validate().unwrap_err().missing.len(), 5);
    }

    #[test]
    fn null_fields_count_as_missing() {
        let form: IntakeForm = serde_json::from_str(
            r#"{"name":"A","email":null,"company":"C","projectType":"Other","budget":"Flexible","timeline":null,"description":"D"}"#,
        )
        .unwrap();
        assert_eq!(form.validate().unwrap_err().missing, vec!["email", "timeline"]);
    }

    #[test]
    fn steps_cover_every_field_once() {
        let keys: Vec<&str> = form_steps()
            .iter()
            .flat_map(|s| s.fields.iter().map(|f| f.key))
            .collect();
        assert_eq!(
            keys,
            vec!["name", "email", "company", "projectType", "budget", "timeline", "description"]
        );
    }

    #[test]
    fn context_carries_budget_and_type() {
        let ctx = sample_form().conversation_context();
        assert_eq!(ctx.client_name, "Dana Reyes");
        assert_eq!(ctx.project_type, "Mobile App");
        assert_eq!(ctx.budget, "$15,000 - $50,000");
    }
}
