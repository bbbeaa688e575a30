//! HTTP API: axum router, shared state and error mapping.

mod records;
mod sessions;

use std::path::PathBuf;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};
use uuid::Uuid;

use crate::admin::LeadSource;
use crate::brief::BriefFont;
use crate::error::{ConversationError, Error, SessionError};
use crate::session::SessionStore;
use crate::sinks::{RecordStore, SpreadsheetSink};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    /// Record store (None if Airtable is not configured).
    pub record_store: Option<Arc<dyn RecordStore>>,
    /// Spreadsheet sink (None if Google Sheets is not configured).
    pub sheets: Option<Arc<dyn SpreadsheetSink>>,
    pub leads: Arc<dyn LeadSource>,
    /// Missing spreadsheet variables, reported by the diagnostic endpoint.
    pub sheets_missing: Vec<String>,
    /// Where exported PDF briefs are written.
    pub brief_dir: PathBuf,
    pub brief_font: BriefFont,
}

/// Build the full router.
pub fn app_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(sessions::session_routes(state.clone()))
        .merge(records::record_routes(state))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

// ── Error mapping ───────────────────────────────────────────────────────

fn parse_id(raw: &str) -> Result<Uuid, Response> {
    Uuid::parse_str(raw).map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "Invalid session ID"})),
        )
            .into_response()
    })
}

fn error_response(err: Error) -> Response {
    let status = match &err {
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::Conversation(ConversationError::EmptyInput) => StatusCode::BAD_REQUEST,
        Error::Conversation(_) => StatusCode::CONFLICT,
        Error::Session(SessionError::NotFound { .. }) => StatusCode::NOT_FOUND,
        Error::Session(_) => StatusCode::CONFLICT,
        Error::Sink(_) | Error::Brief(_) | Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let body = match &err {
        Error::Validation(v) => serde_json::json!({
            "error": v.to_string(),
            "missing": v.missing,
        }),
        Error::Brief(e) => {
            error!(error = %e, "Brief export failed");
            serde_json::json!({"error": "Failed to generate PDF. Please try again."})
        }
        other => {
            if status.is_server_error() {
                error!(error = %other, "Request failed");
            } else {
                warn!(error = %other, "Request rejected");
            }
            serde_json::json!({"error": other.to_string()})
        }
    };
    (status, Json(body)).into_response()
}
