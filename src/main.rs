use std::sync::Arc;

use gator_intake::admin::{LeadSource, RecordStoreLeads, SampleLeads};
use gator_intake::brief::BriefFont;
use gator_intake::config::AppConfig;
use gator_intake::server::{AppState, app_routes};
use gator_intake::session::{SESSION_SWEEP_INTERVAL, SessionStore};
use gator_intake::sinks::{AirtableClient, RecordStore, SheetsClient, SpreadsheetSink};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env()?;

    eprintln!("🐊 Gator Intake v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: http://{}:{}/api", config.bind, config.port);
    eprintln!("   Briefs: {}", config.brief_dir.display());
    let brief_font = match config.brief_font.clone() {
        Some(path) => {
            eprintln!("   Brief font: {}", path.display());
            BriefFont::External(path)
        }
        None => {
            eprintln!("   Brief font: built-in Helvetica (set INTAKE_BRIEF_FONT for Unicode)");
            BriefFont::Builtin
        }
    };

    // ── Sinks ───────────────────────────────────────────────────────────
    let record_store: Option<Arc<dyn RecordStore>> = match config.record_store.clone() {
        Some(store_config) => {
            eprintln!("   Airtable: enabled (base {})", store_config.base_id);
            Some(Arc::new(AirtableClient::new(store_config)))
        }
        None => {
            eprintln!("   Airtable: disabled (AIRTABLE_API_KEY / AIRTABLE_BASE_ID not set)");
            None
        }
    };

    let sheets: Option<Arc<dyn SpreadsheetSink>> = match config.sheets.clone() {
        Some(sheets_config) => {
            eprintln!("   Google Sheets: enabled ({})", sheets_config.client_email);
            Some(Arc::new(SheetsClient::new(sheets_config)))
        }
        None => {
            eprintln!(
                "   Google Sheets: disabled (missing {})",
                config.sheets_missing.join(", ")
            );
            None
        }
    };

    let leads: Arc<dyn LeadSource> = match record_store.clone() {
        Some(store) => Arc::new(RecordStoreLeads::new(store)),
        None => Arc::new(SampleLeads),
    };

    // ── Sessions ────────────────────────────────────────────────────────
    let sessions = SessionStore::new(sheets.clone());
    sessions.spawn_sweeper(config.session_ttl, SESSION_SWEEP_INTERVAL);
    eprintln!("   Session TTL: {}s", config.session_ttl.as_secs());

    // ── HTTP ────────────────────────────────────────────────────────────
    let state = AppState {
        sessions,
        record_store,
        sheets,
        leads,
        sheets_missing: config.sheets_missing.clone(),
        brief_dir: config.brief_dir.clone(),
        brief_font,
    };
    let app = app_routes(state);

    let addr = format!("{}:{}", config.bind, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Intake server started");
    axum::serve(listener, app).await?;

    Ok(())
}
