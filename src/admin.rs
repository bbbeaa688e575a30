//! Lead listing for the admin dashboard.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SinkError;
use crate::sinks::{ContactRecord, RecordStore};

/// Where a lead is in the intake pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeadStatus {
    New,
    #[serde(rename = "In Chat")]
    InChat,
    Completed,
    #[serde(rename = "Brief Ready")]
    BriefReady,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "New",
            Self::InChat => "In Chat",
            Self::Completed => "Completed",
            Self::BriefReady => "Brief Ready",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        [Self::New, Self::InChat, Self::Completed, Self::BriefReady]
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(raw.trim()))
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub name: String,
    pub email: String,
    pub company: String,
    pub project_type: String,
    pub status: LeadStatus,
    pub submitted_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brief_link: Option<String>,
}

impl Lead {
    /// Case-insensitive substring match on name, email or company. Surrounding
    /// whitespace in the search box is ignored; a blank search matches all.
    pub fn matches_search(&self, search: &str) -> bool {
        let needle = search.trim().to_lowercase();
        needle.is_empty()
            || [&self.name, &self.email, &self.company]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
    }
}

impl From<ContactRecord> for Lead {
    fn from(record: ContactRecord) -> Self {
        Self {
            status: LeadStatus::parse(&record.status).unwrap_or(LeadStatus::New),
            submitted_date: record.created_date.chars().take(10).collect(),
            id: record.id,
            name: record.name,
            email: record.email,
            company: record.company,
            project_type: record.project_type,
            brief_link: None,
        }
    }
}

/// Status filter from the dashboard: `all` or one status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(LeadStatus),
}

impl StatusFilter {
    /// Unknown values fall back to `All`.
    pub fn parse(raw: Option<&str>) -> Self {
        raw.and_then(LeadStatus::parse)
            .map(Self::Only)
            .unwrap_or_default()
    }

    fn accepts(&self, status: LeadStatus) -> bool {
        match self {
            Self::All => true,
            Self::Only(s) => *s == status,
        }
    }
}

/// Per-status totals over every lead, ignoring filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub total: usize,
    pub new: usize,
    pub in_chat: usize,
    pub completed: usize,
    pub brief_ready: usize,
}

impl StatusCounts {
    pub fn tally(leads: &[Lead]) -> Self {
        let mut counts = Self {
            total: leads.len(),
            ..Default::default()
        };
        for lead in leads {
            match lead.status {
                LeadStatus::New => counts.new += 1,
                LeadStatus::InChat => counts.in_chat += 1,
                LeadStatus::Completed => counts.completed += 1,
                LeadStatus::BriefReady => counts.brief_ready += 1,
            }
        }
        counts
    }
}

/// Filtered leads plus the unfiltered counts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadListing {
    pub leads: Vec<Lead>,
    pub counts: StatusCounts,
}

pub fn filter_leads(leads: Vec<Lead>, search: &str, status: StatusFilter) -> LeadListing {
    let counts = StatusCounts::tally(&leads);
    let leads = leads
        .into_iter()
        .filter(|lead| lead.matches_search(search) && status.accepts(lead.status))
        .collect();
    LeadListing { leads, counts }
}

/// Anything that can list leads for the dashboard.
#[async_trait]
pub trait LeadSource: Send + Sync {
    async fn leads(&self) -> Result<Vec<Lead>, SinkError>;
}

/// Fixed sample leads, used when no record store is configured.
pub struct SampleLeads;

#[async_trait]
impl LeadSource for SampleLeads {
    async fn leads(&self) -> Result<Vec<Lead>, SinkError> {
        Ok(sample_leads())
    }
}

/// Leads backed by the record store's contact submissions.
pub struct RecordStoreLeads {
    store: Arc<dyn RecordStore>,
}

impl RecordStoreLeads {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl LeadSource for RecordStoreLeads {
    async fn leads(&self) -> Result<Vec<Lead>, SinkError> {
        let records = self.store.list_contact_submissions().await?;
        Ok(records.into_iter().map(Lead::from).collect())
    }
}

#[allow(clippy::too_many_arguments)]
fn lead(
    id: &str,
    name: &str,
    email: &str,
    company: &str,
    project_type: &str,
    status: LeadStatus,
    submitted_date: &str,
    brief_link: Option<&str>,
) -> Lead {
    Lead {
        id: id.into(),
        name: name.into(),
        email: email.into(),
        company: company.into(),
        project_type: project_type.into(),
        status,
        submitted_date: submitted_date.into(),
        brief_link: brief_link.map(String::from),
    }
}

pub fn sample_leads() -> Vec<Lead> {
    vec![
        lead(
            "1",
            "John Doe",
            "john@acme.com",
            "Acme Inc.",
            "Web Application",
            LeadStatus::BriefReady,
            "2025-01-15",
            Some("/briefs/john-doe-acme.pdf"),
        ),
        lead(
            "2",
            "Sarah Wilson",
            "sarah@techstart.io",
            "TechStart",
            "Mobile App",
            LeadStatus::InChat,
            "2025-01-14",
            None,
        ),
        lead(
            "3",
            "Mike Chen",
            "mike@designco.com",
            "DesignCo",
            "E-commerce Site",
            LeadStatus::Completed,
            "2025-01-13",
            None,
        ),
        lead(
            "4",
            "Emily Rodriguez",
            "emily@startup.com",
            "InnovateLab",
            "Landing Page",
            LeadStatus::New,
            "2025-01-16",
            None,
        ),
        lead(
            "5",
            "David Park",
            "david@enterprise.com",
            "Enterprise Solutions",
            "Custom Software",
            LeadStatus::BriefReady,
            "2025-01-12",
            Some("/briefs/david-park-enterprise.pdf"),
        ),
    ]
}
