//! Record-store and spreadsheet endpoints.
//!
//! These mirror the public website API: the contact form and portfolio list
//! go to the record store, the `/api/sheets/*` routes to the spreadsheet.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use futures::future::join;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use super::AppState;
use crate::sinks::{ClientRow, ContactSubmission, ProjectRow};

pub(super) fn record_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/contact", post(submit_contact))
        .route("/api/projects", get(list_projects))
        .route("/api/sheets/log-client", post(log_client))
        .route("/api/sheets/log-project", post(log_project))
        .route("/api/sheets/get-data", get(get_sheet_data))
        .route("/api/sheets/check", get(check_sheets))
        .with_state(state)
}

// ── Record store ────────────────────────────────────────────────────────

async fn submit_contact(
    State(state): State<AppState>,
    Json(body): Json<ContactSubmission>,
) -> impl IntoResponse {
    if let Err(e) = body.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": e.to_string(), "missing": e.missing})),
        );
    }

    let Some(store) = state.record_store.as_ref() else {
        warn!("Airtable not configured, contact submission not saved");
        return (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "Contact submission received (Airtable not configured)",
                "id": "mock-id",
            })),
        );
    };

    match store.create_contact_submission(&body).await {
        Ok(id) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "Contact submission created successfully",
                "id": id,
                "timestamp": Utc::now().to_rfc3339(),
            })),
        ),
        Err(e) => {
            error!(error = %e, "Failed to create contact submission");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Failed to create contact submission"})),
            )
        }
    }
}

async fn list_projects(State(state): State<AppState>) -> impl IntoResponse {
    let Some(store) = state.record_store.as_ref() else {
        warn!("Airtable not configured, returning empty projects array");
        return (
            StatusCode::OK,
            Json(json!({
                "projects": [],
                "message": "Airtable not configured - returning empty projects array",
            })),
        );
    };

    match store.list_projects().await {
        Ok(projects) => (
            StatusCode::OK,
            Json(json!({
                "count": projects.len(),
                "projects": projects,
                "success": true,
            })),
        ),
        Err(e) => {
            error!(error = %e, "Failed to fetch projects");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Failed to fetch projects",
                    "message": "Unable to retrieve projects from Airtable. Please try again later.",
                    "projects": [],
                })),
            )
        }
    }
}

// ── Spreadsheet ─────────────────────────────────────────────────────────

fn sheets_unavailable(what: &str) -> (StatusCode, Json<serde_json::Value>) {
    warn!(what, "Google Sheets not configured");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "success": false,
            "error": format!("Failed to log {what} to Google Sheets"),
        })),
    )
}

async fn log_client(State(state): State<AppState>, Json(row): Json<ClientRow>) -> impl IntoResponse {
    let Some(sheets) = state.sheets.clone() else {
        return sheets_unavailable("client data");
    };

    match sheets.append_client(&row).await {
        Ok(()) => {
            info!(email = %row.email, "Client data logged");
            (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "message": "Client data logged successfully to Google Sheets",
                    "data": row,
                })),
            )
        }
        Err(e) => {
            error!(error = %e, "Failed to log client data");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "error": "Failed to log client data to Google Sheets",
                })),
            )
        }
    }
}

async fn log_project(
    State(state): State<AppState>,
    Json(row): Json<ProjectRow>,
) -> impl IntoResponse {
    let Some(sheets) = state.sheets.clone() else {
        return sheets_unavailable("project data");
    };

    match sheets.append_project(&row).await {
        Ok(()) => {
            info!(client_id = %row.client_id, "Project data logged");
            (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "message": "Project data logged successfully to Google Sheets",
                    "data": row,
                })),
            )
        }
        Err(e) => {
            error!(error = %e, "Failed to log project data");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "error": "Failed to log project data to Google Sheets",
                })),
            )
        }
    }
}

#[derive(Deserialize)]
struct DataQuery {
    #[serde(rename = "type", default = "default_data_type")]
    kind: String,
}

fn default_data_type() -> String {
    "all".to_string()
}

async fn get_sheet_data(
    State(state): State<AppState>,
    Query(query): Query<DataQuery>,
) -> impl IntoResponse {
    let failed = || {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "success": false,
                "error": "Failed to fetch data from Google Sheets",
            })),
        )
    };
    let Some(sheets) = state.sheets.clone() else {
        warn!("Google Sheets not configured");
        return failed();
    };

    let want_clients = matches!(query.kind.as_str(), "all" | "clients");
    let want_projects = matches!(query.kind.as_str(), "all" | "projects");

    let (clients, projects) = join(
        async {
            if want_clients {
                sheets.client_rows().await
            } else {
                Ok(Vec::new())
            }
        },
        async {
            if want_projects {
                sheets.project_rows().await
            } else {
                Ok(Vec::new())
            }
        },
    )
    .await;

    match (clients, projects) {
        (Ok(clients), Ok(projects)) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "clients": clients,
                    "projects": projects,
                    "timestamp": Utc::now().to_rfc3339(),
                },
            })),
        ),
        (Err(e), _) | (_, Err(e)) => {
            error!(error = %e, "Failed to fetch data from Google Sheets");
            failed()
        }
    }
}

/// Configuration check: reports missing variables, otherwise reads both
/// sheets and returns their row counts.
async fn check_sheets(State(state): State<AppState>) -> impl IntoResponse {
    let sheets = match state.sheets.clone() {
        Some(sheets) if state.sheets_missing.is_empty() => sheets,
        _ => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "error": "Missing environment variables",
                    "missing": state.sheets_missing,
                    "message": "Set the Google Sheets credentials in the environment or .env",
                })),
            );
        }
    };

    let (clients, projects) = join(sheets.client_rows(), sheets.project_rows()).await;
    match (clients, projects) {
        (Ok(clients), Ok(projects)) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "Google Sheets integration check completed",
                "results": {
                    "clientDataRows": clients.len(),
                    "projectDataRows": projects.len(),
                },
            })),
        ),
        (Err(e), _) | (_, Err(e)) => {
            error!(error = %e, "Google Sheets check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "error": e.to_string(),
                    "message": "Google Sheets integration check failed",
                })),
            )
        }
    }
}
