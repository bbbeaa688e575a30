//! Airtable REST client for the record store.

use async_trait::async_trait;
use chrono::Utc;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use super::{ContactRecord, ContactSubmission, Project, RecordStore};
use crate::config::RecordStoreConfig;
use crate::error::SinkError;

const SINK: &str = "airtable";
const PROJECTS_TABLE: &str = "Projects";
const CONTACT_TABLE: &str = "Contact Submissions";

/// Record store backed by an Airtable base.
pub struct AirtableClient {
    config: RecordStoreConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    records: Vec<AirtableRecord>,
    offset: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AirtableRecord {
    id: String,
    #[serde(default)]
    created_time: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl AirtableRecord {
    fn text(&self, field: &str) -> String {
        self.fields
            .get(field)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    fn into_project(self) -> Project {
        let created = self.text("createdDate");
        Project {
            title: self.text("title"),
            category: self.text("category"),
            description: self.text("description"),
            url: self.text("url"),
            image_url: self.text("imageUrl"),
            alt: self.text("alt"),
            status: self.text("status"),
            featured: self
                .fields
                .get("featured")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            order: self
                .fields
                .get("order")
                .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f.round() as i64)))
                .unwrap_or(0),
            created_date: if created.is_empty() {
                self.created_time.clone()
            } else {
                created
            },
            id: self.id,
        }
    }

    fn into_contact(self) -> ContactRecord {
        let created = self.text("Created Date");
        ContactRecord {
            name: self.text("Name"),
            email: self.text("Email"),
            company: self.text("Company"),
            project_type: self.text("Project Type"),
            status: self.text("Status"),
            created_date: if created.is_empty() {
                self.created_time.clone()
            } else {
                created
            },
            id: self.id,
        }
    }
}

/// Airtable field map for a new contact submission.
pub fn contact_fields(submission: &ContactSubmission) -> Value {
    json!({
        "Name": submission.name,
        "Email": submission.email,
        "Company": submission.company,
        "Phone": submission.phone,
        "Project Type": submission.project_type,
        "Budget Range": submission.budget_range,
        "Message": submission.message,
        "Status": "New",
        "Source": "Website",
        "Assigned To": "",
        "Created Date": Utc::now().to_rfc3339(),
    })
}

impl AirtableClient {
    pub fn new(config: RecordStoreConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn table_url(&self, table: &str) -> Result<reqwest::Url, SinkError> {
        let mut url = reqwest::Url::parse(&self.config.api_base).map_err(|e| {
            SinkError::RequestFailed {
                sink: SINK.into(),
                reason: e.to_string(),
            }
        })?;
        url.path_segments_mut()
            .map_err(|_| SinkError::RequestFailed {
                sink: SINK.into(),
                reason: "API base cannot carry a path".into(),
            })?
            .push(&self.config.base_id)
            .push(table);
        Ok(url)
    }

    /// Fetch every record of `table`, following pagination offsets.
    async fn list_all(
        &self,
        table: &str,
        sort_field: &str,
        direction: &str,
    ) -> Result<Vec<AirtableRecord>, SinkError> {
        let url = self.table_url(table)?;
        let mut records = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let mut query = vec![
                ("sort[0][field]", sort_field.to_string()),
                ("sort[0][direction]", direction.to_string()),
            ];
            if let Some(ref o) = offset {
                query.push(("offset", o.clone()));
            }

            let resp = self
                .client
                .get(url.clone())
                .bearer_auth(self.config.api_key.expose_secret())
                .query(&query)
                .send()
                .await
                .map_err(|e| SinkError::RequestFailed {
                    sink: SINK.into(),
                    reason: e.to_string(),
                })?;

            if !resp.status().is_success() {
                let status = resp.status().as_u16();
                let body = resp.text().await.unwrap_or_default();
                return Err(SinkError::Status {
                    sink: SINK.into(),
                    status,
                    body,
                });
            }

            let page: ListResponse =
                resp.json().await.map_err(|e| SinkError::InvalidResponse {
                    sink: SINK.into(),
                    reason: e.to_string(),
                })?;
            records.extend(page.records);

            match page.offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        debug!(table, count = records.len(), "Fetched Airtable records");
        Ok(records)
    }
}

#[async_trait]
impl RecordStore for AirtableClient {
    async fn list_projects(&self) -> Result<Vec<Project>, SinkError> {
        let records = self.list_all(PROJECTS_TABLE, "order", "asc").await?;
        Ok(records.into_iter().map(AirtableRecord::into_project).collect())
    }

    async fn create_contact_submission(
        &self,
        submission: &ContactSubmission,
    ) -> Result<String, SinkError> {
        let resp = self
            .client
            .post(self.table_url(CONTACT_TABLE)?)
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&json!({ "fields": contact_fields(submission) }))
            .send()
            .await
            .map_err(|e| SinkError::RequestFailed {
                sink: SINK.into(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(SinkError::Status {
                sink: SINK.into(),
                status,
                body,
            });
        }

        let record: AirtableRecord = resp.json().await.map_err(|e| SinkError::InvalidResponse {
            sink: SINK.into(),
            reason: e.to_string(),
        })?;
        info!(record_id = %record.id, email = %submission.email, "Contact submission created");
        Ok(record.id)
    }

    async fn list_contact_submissions(&self) -> Result<Vec<ContactRecord>, SinkError> {
        let records = self.list_all(CONTACT_TABLE, "Created Date", "desc").await?;
        Ok(records.into_iter().map(AirtableRecord::into_contact).collect())
    }
}
