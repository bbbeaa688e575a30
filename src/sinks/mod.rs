//! External record sinks.
//!
//! Two backends receive copies of intake data: a record store (Airtable) that
//! holds the portfolio projects and contact submissions, and a spreadsheet
//! (Google Sheets) that logs clients and projects as rows. Both sit behind
//! traits so the HTTP layer and tests can swap in stubs.

pub mod record_store;
pub mod sheets;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{SinkError, ValidationError};
use crate::intake::null_as_empty;

pub use record_store::AirtableClient;
pub use sheets::SheetsClient;

pub const CLIENT_RANGE: &str = "Client Data!A:J";
pub const PROJECT_RANGE: &str = "Project Data!A:S";
pub const PROJECT_SHEET: &str = "Project Data";

/// Status written to new client rows.
pub const NEW_LEAD: &str = "New Lead";

// ── Record store ────────────────────────────────────────────────────

/// A portfolio project from the record store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub title: String,
    pub category: String,
    pub description: String,
    pub url: String,
    pub image_url: String,
    pub alt: String,
    pub status: String,
    pub featured: bool,
    pub order: i64,
    pub created_date: String,
}

/// Payload of the public contact form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSubmission {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub company: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub phone: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub project_type: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub budget_range: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub message: String,
}

impl ContactSubmission {
    /// Company and phone are optional; everything else is required.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let fields = [
            ("name", &self.name),
            ("email", &self.email),
            ("projectType", &self.project_type),
            ("budgetRange", &self.budget_range),
            ("message", &self.message),
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
}

/// A contact submission read back from the record store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub company: String,
    pub project_type: String,
    pub status: String,
    pub created_date: String,
}

/// Tabular record store holding projects and contact submissions.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// All projects, sorted ascending by `order`.
    async fn list_projects(&self) -> Result<Vec<Project>, SinkError>;

    /// Create one contact submission and return the new record id.
    async fn create_contact_submission(
        &self,
        submission: &ContactSubmission,
    ) -> Result<String, SinkError>;

    /// All contact submissions, newest first.
    async fn list_contact_submissions(&self) -> Result<Vec<ContactRecord>, SinkError>;
}

// ── Spreadsheet ─────────────────────────────────────────────────────

/// Client details logged when the intake form is submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientRow {
    pub name: String,
    pub email: String,
    pub company: String,
    pub project_type: String,
    pub budget: String,
    pub timeline: String,
    pub description: String,
}

impl ClientRow {
    /// Cells for `Client Data!A:J`.
    pub fn to_cells(&self, now: DateTime<Utc>) -> Vec<String> {
        vec![
            now.to_rfc3339(),
            self.name.clone(),
            self.email.clone(),
            self.company.clone(),
            self.project_type.clone(),
            self.budget.clone(),
            self.timeline.clone(),
            self.description.clone(),
            NEW_LEAD.to_string(),
            sheet_date(now),
        ]
    }
}

/// Project details logged when the conversation ends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectRow {
    pub client_id: String,
    pub project_name: String,
    pub project_type: String,
    pub target_audience: String,
    pub core_features: Vec<String>,
    pub design_preferences: String,
    pub platform_requirements: Vec<String>,
    pub integrations: Vec<String>,
    pub success_metrics: String,
    pub technical_requirements: String,
    pub user_flow: String,
    pub competitor_info: String,
    pub budget: String,
    pub timeline: String,
    pub status: String,
    pub brief_generated: bool,
}

impl ProjectRow {
    /// Cells for `Project Data!A:S`.
    pub fn to_cells(&self, now: DateTime<Utc>) -> Vec<String> {
        vec![
            now.to_rfc3339(),
            self.client_id.clone(),
            self.project_name.clone(),
            self.project_type.clone(),
            self.target_audience.clone(),
            self.core_features.join(", "),
            self.design_preferences.clone(),
            self.platform_requirements.join(", "),
            self.integrations.join(", "),
            self.success_metrics.clone(),
            self.technical_requirements.clone(),
            self.user_flow.clone(),
            self.competitor_info.clone(),
            self.budget.clone(),
            self.timeline.clone(),
            self.status.clone(),
            yes_no(self.brief_generated).to_string(),
            sheet_date(now),
        ]
    }
}

/// Append-only spreadsheet log of clients and projects.
#[async_trait]
pub trait SpreadsheetSink: Send + Sync {
    async fn append_client(&self, row: &ClientRow) -> Result<(), SinkError>;

    async fn append_project(&self, row: &ProjectRow) -> Result<(), SinkError>;

    /// Raw rows of the client sheet, header included.
    async fn client_rows(&self) -> Result<Vec<Vec<String>>, SinkError>;

    /// Raw rows of the project sheet, header included.
    async fn project_rows(&self) -> Result<Vec<Vec<String>>, SinkError>;

    /// Rewrite Status and Brief Generated on the first project row whose
    /// Client ID matches. Returns `false` when no row matches.
    async fn update_project_status(
        &self,
        client_id: &str,
        status: &str,
        brief_generated: bool,
    ) -> Result<bool, SinkError>;
}

/// `CLIENT_<epoch ms>_<9 base-36 chars>`.
pub fn generate_client_id() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("CLIENT_{}_{suffix}", Utc::now().timestamp_millis())
}

/// Spreadsheet column letter for a zero-based index (0 → A, 26 → AA).
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// Where `update_project_status` must write, found by scanning `rows`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    /// A1 range covering the Status (and Brief Generated) cells.
    pub range: String,
    pub values: Vec<String>,
}

/// Locate the row for `client_id` using the header row. Linear in the number
/// of rows.
pub fn locate_status_update(
    rows: &[Vec<String>],
    client_id: &str,
    status: &str,
    brief_generated: bool,
) -> Result<Option<StatusUpdate>, SinkError> {
    let header = rows.first().map(Vec::as_slice).unwrap_or_default();
    let find = |name: &str| header.iter().position(|h| h == name);

    let (Some(id_col), Some(status_col)) = (find("Client ID"), find("Status")) else {
        return Err(SinkError::MissingColumns {
            range: PROJECT_RANGE.to_string(),
            columns: "Client ID, Status".to_string(),
        });
    };
    let brief_col = find("Brief Generated");

    let Some(row_index) = rows
        .iter()
        .skip(1)
        .position(|row| row.get(id_col).is_some_and(|id| id == client_id))
    else {
        return Ok(None);
    };
    // Skipped header plus one-based sheet rows.
    let sheet_row = row_index + 2;

    let update = match brief_col {
        Some(brief_col) if brief_col == status_col + 1 => StatusUpdate {
            range: format!(
                "{PROJECT_SHEET}!{}{sheet_row}:{}{sheet_row}",
                column_letter(status_col),
                column_letter(brief_col)
            ),
            values: vec![status.to_string(), yes_no(brief_generated).to_string()],
        },
        _ => StatusUpdate {
            range: format!(
                "{PROJECT_SHEET}!{col}{sheet_row}:{col}{sheet_row}",
                col = column_letter(status_col)
            ),
            values: vec![status.to_string()],
        },
    };
    Ok(Some(update))
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}

fn sheet_date(now: DateTime<Utc>) -> String {
    now.format("%-m/%-d/%Y").to_string()
}
