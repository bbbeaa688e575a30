//! Google Sheets v4 client for the spreadsheet sink.
//!
//! Authenticates as a service account: an RS256 assertion is exchanged for a
//! bearer token, which is cached until shortly before it expires.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::{
    CLIENT_RANGE, ClientRow, PROJECT_RANGE, ProjectRow, SpreadsheetSink, locate_status_update,
};
use crate::config::SheetsConfig;
use crate::error::SinkError;

const SINK: &str = "google-sheets";
const SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for each assertion.
const ASSERTION_TTL_SECS: i64 = 3600;
/// Refresh this long before the cached token expires.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Spreadsheet sink backed by the Google Sheets API.
pub struct SheetsClient {
    config: SheetsConfig,
    client: reqwest::Client,
    token: RwLock<Option<CachedToken>>,
}

impl SheetsClient {
    pub fn new(config: SheetsConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            token: RwLock::new(None),
        }
    }

    /// Signed service-account assertion.
    fn assertion(&self) -> Result<String, SinkError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            iss: &self.config.client_email,
            scope: SCOPE,
            aud: &self.config.token_url,
            iat: now,
            exp: now + ASSERTION_TTL_SECS,
        };
        let key = EncodingKey::from_rsa_pem(self.config.private_key.expose_secret().as_bytes())
            .map_err(|e| SinkError::AuthFailed {
                sink: SINK.into(),
                reason: format!("invalid private key: {e}"),
            })?;
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key).map_err(|e| {
            SinkError::AuthFailed {
                sink: SINK.into(),
                reason: e.to_string(),
            }
        })
    }

    async fn access_token(&self) -> Result<String, SinkError> {
        {
            let cached = self.token.read().await;
            if let Some(ref t) = *cached {
                if t.expires_at > Instant::now() + TOKEN_REFRESH_MARGIN {
                    return Ok(t.token.clone());
                }
            }
        }

        let assertion = self.assertion()?;
        let resp = self
            .client
            .post(&self.config.token_url)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| SinkError::AuthFailed {
                sink: SINK.into(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(SinkError::AuthFailed {
                sink: SINK.into(),
                reason: format!("token endpoint returned {status}: {body}"),
            });
        }

        let token: TokenResponse = resp.json().await.map_err(|e| SinkError::InvalidResponse {
            sink: SINK.into(),
            reason: e.to_string(),
        })?;

        let cached = CachedToken {
            token: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        };
        let value = cached.token.clone();
        *self.token.write().await = Some(cached);
        debug!(expires_in = token.expires_in, "Refreshed Sheets access token");
        Ok(value)
    }

    /// `{api_base}/{spreadsheet_id}/values/{range}{suffix}`
    fn values_url(&self, range: &str, suffix: &str) -> Result<reqwest::Url, SinkError> {
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
            .push(&self.config.spreadsheet_id)
            .push("values")
            .push(&format!("{range}{suffix}"));
        Ok(url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, SinkError> {
        let token = self.access_token().await?;
        let resp = request
            .bearer_auth(token)
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
        Ok(resp)
    }

    async fn append(&self, range: &str, cells: Vec<String>) -> Result<(), SinkError> {
        let url = self.values_url(range, ":append")?;
        let request = self
            .client
            .post(url)
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({ "values": [cells] }));
        self.send(request).await?;
        Ok(())
    }

    async fn read(&self, range: &str) -> Result<Vec<Vec<String>>, SinkError> {
        let url = self.values_url(range, "")?;
        let resp = self.send(self.client.get(url)).await?;
        let body: ValueRange = resp.json().await.map_err(|e| SinkError::InvalidResponse {
            sink: SINK.into(),
            reason: e.to_string(),
        })?;
        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
impl SpreadsheetSink for SheetsClient {
    async fn append_client(&self, row: &ClientRow) -> Result<(), SinkError> {
        self.append(CLIENT_RANGE, row.to_cells(Utc::now())).await?;
        info!(email = %row.email, "Client row appended");
        Ok(())
    }

    async fn append_project(&self, row: &ProjectRow) -> Result<(), SinkError> {
        self.append(PROJECT_RANGE, row.to_cells(Utc::now())).await?;
        info!(client_id = %row.client_id, "Project row appended");
        Ok(())
    }

    async fn client_rows(&self) -> Result<Vec<Vec<String>>, SinkError> {
        self.read(CLIENT_RANGE).await
    }

    async fn project_rows(&self) -> Result<Vec<Vec<String>>, SinkError> {
        self.read(PROJECT_RANGE).await
    }

    async fn update_project_status(
        &self,
        client_id: &str,
        status: &str,
        brief_generated: bool,
    ) -> Result<bool, SinkError> {
        let rows = self.read(PROJECT_RANGE).await?;
        let Some(update) = locate_status_update(&rows, client_id, status, brief_generated)? else {
            warn!(client_id, "Client ID not found in project sheet");
            return Ok(false);
        };

        let url = self.values_url(&update.range, "")?;
        let request = self
            .client
            .put(url)
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({ "values": [update.values] }));
        self.send(request).await?;

        info!(client_id, status, range = %update.range, "Project status updated");
        Ok(true)
    }
}
