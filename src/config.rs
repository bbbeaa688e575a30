//! Configuration types.
//!
//! Built once at process start and handed to the sink clients. Nothing in the
//! library reads the environment after `AppConfig::from_env` returns.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

pub const ENV_BIND: &str = "INTAKE_BIND";
pub const ENV_PORT: &str = "INTAKE_PORT";
pub const ENV_BRIEF_DIR: &str = "INTAKE_BRIEF_DIR";
pub const ENV_BRIEF_FONT: &str = "INTAKE_BRIEF_FONT";
pub const ENV_SESSION_TTL_SECS: &str = "INTAKE_SESSION_TTL_SECS";
pub const ENV_AIRTABLE_API_KEY: &str = "AIRTABLE_API_KEY";
pub const ENV_AIRTABLE_BASE_ID: &str = "AIRTABLE_BASE_ID";
pub const ENV_SHEETS_SPREADSHEET_ID: &str = "GOOGLE_SHEETS_SPREADSHEET_ID";
pub const ENV_SHEETS_CLIENT_EMAIL: &str = "GOOGLE_SERVICE_ACCOUNT_EMAIL";
pub const ENV_SHEETS_PRIVATE_KEY: &str = "GOOGLE_PRIVATE_KEY";

/// Variables the spreadsheet sink needs, in reporting order.
pub const SHEETS_ENV_VARS: [&str; 3] = [
    ENV_SHEETS_SPREADSHEET_ID,
    ENV_SHEETS_CLIENT_EMAIL,
    ENV_SHEETS_PRIVATE_KEY,
];

/// Service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Interface to bind the HTTP listener on.
    pub bind: String,
    pub port: u16,
    /// Directory exported PDF briefs are written to.
    pub brief_dir: PathBuf,
    /// TrueType font for brief PDFs. Without it the built-in Helvetica is
    /// used, which only covers Latin-1 text.
    pub brief_font: Option<PathBuf>,
    /// Sessions older than this are dropped.
    pub session_ttl: Duration,
    /// Record store (Airtable). `None` means unconfigured.
    pub record_store: Option<RecordStoreConfig>,
    /// Spreadsheet (Google Sheets). `None` means unconfigured.
    pub sheets: Option<SheetsConfig>,
    /// Names of missing spreadsheet variables, for the diagnostic endpoint.
    pub sheets_missing: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 3000,
            brief_dir: PathBuf::from("./data/briefs"),
            brief_font: None,
            session_ttl: Duration::from_secs(24 * 60 * 60),
            record_store: None,
            sheets: None,
            sheets_missing: SHEETS_ENV_VARS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl AppConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = match get(ENV_PORT) {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_PORT.to_string(),
                message: format!("'{raw}' is not a valid port"),
            })?,
            None => defaults.port,
        };

        let session_ttl = match get(ENV_SESSION_TTL_SECS) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: ENV_SESSION_TTL_SECS.to_string(),
                    message: format!("'{raw}' is not a positive number of seconds"),
                })?,
            None => defaults.session_ttl,
        };

        let sheets_missing = SHEETS_ENV_VARS
            .iter()
            .filter(|key| non_empty(get(key)).is_none())
            .map(|key| key.to_string())
            .collect();

        Ok(Self {
            bind: get(ENV_BIND).unwrap_or(defaults.bind),
            port,
            brief_dir: get(ENV_BRIEF_DIR)
                .map(PathBuf::from)
                .unwrap_or(defaults.brief_dir),
            brief_font: non_empty(get(ENV_BRIEF_FONT)).map(PathBuf::from),
            session_ttl,
            record_store: RecordStoreConfig::from_lookup(&get),
            sheets: SheetsConfig::from_lookup(&get),
            sheets_missing,
        })
    }
}

/// Airtable credentials.
#[derive(Debug, Clone)]
pub struct RecordStoreConfig {
    pub api_key: SecretString,
    pub base_id: String,
    /// Override for tests; defaults to the public Airtable API.
    pub api_base: String,
}

impl RecordStoreConfig {
    pub const DEFAULT_API_BASE: &'static str = "https://api.airtable.com/v0";

    /// Both secrets must be present, otherwise the store is unconfigured.
    pub fn from_lookup<F>(get: &F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = non_empty(get(ENV_AIRTABLE_API_KEY))?;
        let base_id = non_empty(get(ENV_AIRTABLE_BASE_ID))?;
        Some(Self {
            api_key: SecretString::from(api_key),
            base_id,
            api_base: Self::DEFAULT_API_BASE.to_string(),
        })
    }
}

/// Google service-account credentials for the Sheets API.
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub client_email: String,
    /// PEM-encoded RSA key. Escaped `\n` sequences are unescaped on load.
    pub private_key: SecretString,
    pub api_base: String,
    pub token_url: String,
}

impl SheetsConfig {
    pub const DEFAULT_API_BASE: &'static str = "https://sheets.googleapis.com/v4/spreadsheets";
    pub const DEFAULT_TOKEN_URL: &'static str = "https://oauth2.googleapis.com/token";

    pub fn from_lookup<F>(get: &F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let spreadsheet_id = non_empty(get(ENV_SHEETS_SPREADSHEET_ID))?;
        let client_email = non_empty(get(ENV_SHEETS_CLIENT_EMAIL))?;
        let private_key = non_empty(get(ENV_SHEETS_PRIVATE_KEY))?.replace("\\n", "\n");
        Some(Self {
            spreadsheet_id,
            client_email,
            private_key: SecretString::from(private_key),
            api_base: Self::DEFAULT_API_BASE.to_string(),
            token_url: Self::DEFAULT_TOKEN_URL.to_string(),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 3000);
        assert!(config.record_store.is_none());
        assert!(config.sheets.is_none());
        assert_eq!(config.sheets_missing.len(), 3);
    }

    #[test]
    fn record_store_needs_both_secrets() {
        let config = AppConfig::from_lookup(lookup(&[(ENV_AIRTABLE_API_KEY, "key")])).unwrap();
        assert!(config.record_store.is_none());

        let config = AppConfig::from_lookup(lookup(&[
            (ENV_AIRTABLE_API_KEY, "key"),
            (ENV_AIRTABLE_BASE_ID, "app123"),
        ]))
        .unwrap();
        let store = config.record_store.unwrap();
        assert_eq!(store.base_id, "app123");
        assert_eq!(store.api_key.expose_secret(), "key");
    }

    #[test]
    fn blank_values_count_as_missing() {
        let config = AppConfig::from_lookup(lookup(&[
            (ENV_AIRTABLE_API_KEY, "  "),
            (ENV_AIRTABLE_BASE_ID, "app123"),
        ]))
        .unwrap();
        assert!(config.record_store.is_none());
    }

    #[test]
    fn sheets_private_key_is_unescaped() {
        let config = AppConfig::from_lookup(lookup(&[
            (ENV_SHEETS_SPREADSHEET_ID, "sheet"),
            (ENV_SHEETS_CLIENT_EMAIL, "svc@example.iam.gserviceaccount.com"),
            (ENV_SHEETS_PRIVATE_KEY, "-----BEGIN-----\\nabc\\n-----END-----"),
        ]))
        .unwrap();
        let sheets = config.sheets.unwrap();
        assert_eq!(
            sheets.private_key.expose_secret(),
            "-----BEGIN-----\nabc\n-----END-----"
        );
        assert!(config.sheets_missing.is_empty());
    }

    #[test]
    fn reports_missing_sheets_vars() {
        let config =
            AppConfig::from_lookup(lookup(&[(ENV_SHEETS_SPREADSHEET_ID, "sheet")])).unwrap();
        assert!(config.sheets.is_none());
        assert_eq!(
            config.sheets_missing,
            vec![ENV_SHEETS_CLIENT_EMAIL, ENV_SHEETS_PRIVATE_KEY]
        );
    }

    #[test]
    fn invalid_port_is_an_error() {
        let err = AppConfig::from_lookup(lookup(&[(ENV_PORT, "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn session_ttl_and_font_from_env() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.session_ttl, Duration::from_secs(86_400));
        assert!(config.brief_font.is_none());

        let config = AppConfig::from_lookup(lookup(&[
            (ENV_SESSION_TTL_SECS, "600"),
            (ENV_BRIEF_FONT, "/fonts/DejaVuSans.ttf"),
        ]))
        .unwrap();
        assert_eq!(config.session_ttl, Duration::from_secs(600));
        assert_eq!(
            config.brief_font,
            Some(PathBuf::from("/fonts/DejaVuSans.ttf"))
        );
    }

    #[test]
    fn zero_session_ttl_is_an_error() {
        let err = AppConfig::from_lookup(lookup(&[(ENV_SESSION_TTL_SECS, "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == ENV_SESSION_TTL_SECS));
    }
}
