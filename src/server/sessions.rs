//! Intake flow endpoints: form layout, sessions, brief export and leads.

use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::info;

use super::{AppState, error_response, parse_id};
use crate::admin::{StatusFilter, filter_leads};
use crate::brief::{BRIEF_FILE_NAME, render_pdf, save_pdf};
use crate::error::Error;
use crate::intake::{BUDGET_RANGES, IntakeForm, PROJECT_TYPES, TIMELINES, form_steps};

pub(super) fn session_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/intake/form", get(intake_form))
        .route("/api/sessions", post(start_session))
        .route("/api/sessions/{id}", get(get_session))
        .route("/api/sessions/{id}/messages", post(send_message))
        .route("/api/sessions/{id}/finish", post(finish_chat))
        .route("/api/sessions/{id}/form", put(save_review))
        .route("/api/sessions/{id}/back", post(back_to_chat))
        .route("/api/sessions/{id}/complete", post(complete))
        .route("/api/sessions/{id}/revisions", post(request_revisions))
        .route("/api/sessions/{id}/admin", post(open_admin))
        .route("/api/sessions/{id}/status", post(close_admin))
        .route("/api/sessions/{id}/brief", get(get_brief))
        .route("/api/sessions/{id}/brief.pdf", get(download_brief))
        .route("/api/admin/leads", get(list_leads))
        .with_state(state)
}

/// Run a session operation and render its result as JSON.
fn respond<T: serde::Serialize>(result: Result<T, Error>, ok: StatusCode) -> Response {
    match result {
        Ok(value) => (ok, Json(value)).into_response(),
        Err(e) => error_response(e),
    }
}

macro_rules! session_id {
    ($raw:expr) => {
        match parse_id(&$raw) {
            Ok(id) => id,
            Err(resp) => return resp,
        }
    };
}

// ── Form ────────────────────────────────────────────────────────────────

async fn intake_form() -> impl IntoResponse {
    Json(serde_json::json!({
        "steps": form_steps(),
        "projectTypes": PROJECT_TYPES,
        "budgetRanges": BUDGET_RANGES,
        "timelines": TIMELINES,
    }))
}

// ── Sessions ────────────────────────────────────────────────────────────

async fn start_session(State(state): State<AppState>, Json(form): Json<IntakeForm>) -> Response {
    respond(state.sessions.start(form).await, StatusCode::CREATED)
}

async fn get_session(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = session_id!(id);
    respond(state.sessions.snapshot(id).await, StatusCode::OK)
}

#[derive(Deserialize)]
struct MessageRequest {
    text: String,
}

async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<MessageRequest>,
) -> Response {
    let id = session_id!(id);
    respond(
        state.sessions.send_message(id, &body.text).await,
        StatusCode::OK,
    )
}

async fn finish_chat(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = session_id!(id);
    respond(state.sessions.finish_chat(id).await, StatusCode::OK)
}

async fn save_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(form): Json<IntakeForm>,
) -> Response {
    let id = session_id!(id);
    respond(state.sessions.save_review(id, form).await, StatusCode::OK)
}

async fn back_to_chat(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = session_id!(id);
    respond(state.sessions.back_to_chat(id).await, StatusCode::OK)
}

async fn complete(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = session_id!(id);
    respond(state.sessions.complete(id).await, StatusCode::OK)
}

async fn request_revisions(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = session_id!(id);
    respond(state.sessions.request_revisions(id).await, StatusCode::OK)
}

async fn open_admin(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = session_id!(id);
    respond(state.sessions.open_admin(id).await, StatusCode::OK)
}

async fn close_admin(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = session_id!(id);
    respond(state.sessions.close_admin(id).await, StatusCode::OK)
}

// ── Brief ───────────────────────────────────────────────────────────────

async fn get_brief(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = session_id!(id);
    respond(state.sessions.brief(id).await, StatusCode::OK)
}

/// Render the brief, keep a copy under the brief directory and send it as an
/// attachment.
async fn download_brief(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = session_id!(id);
    let brief = match state.sessions.brief(id).await {
        Ok(brief) => brief,
        Err(e) => return error_response(e),
    };

    let bytes = match render_pdf(&brief, &state.brief_font) {
        Ok(bytes) => bytes,
        Err(e) => return error_response(e.into()),
    };
    let dir = state.brief_dir.join(id.to_string());
    if let Err(e) = save_pdf(&bytes, &dir).await {
        return error_response(e.into());
    }
    if let Err(e) = state.sessions.brief_exported(id).await {
        return error_response(e);
    }

    info!(session_id = %id, size = bytes.len(), "Brief PDF downloaded");
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{BRIEF_FILE_NAME}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}

// ── Admin ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct LeadQuery {
    #[serde(default)]
    search: String,
    status: Option<String>,
}

async fn list_leads(State(state): State<AppState>, Query(query): Query<LeadQuery>) -> Response {
    match state.leads.leads().await {
        Ok(leads) => {
            let listing = filter_leads(
                leads,
                &query.search,
                StatusFilter::parse(query.status.as_deref()),
            );
            Json(listing).into_response()
        }
        Err(e) => error_response(e.into()),
    }
}
