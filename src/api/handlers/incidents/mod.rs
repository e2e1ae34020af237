//! Incident endpoints.
//!
//! An incident gets its case reference at creation: the next sequence number
//! of the current UTC year, the club and handler codes, and a sub-number when
//! it is filed under a parent incident. The reference never changes afterwards
//! because it also names the incident's document folder.
//!
//! Flow for `POST /v1/incidents`:
//! 1) Validate codes and optional text fields.
//! 2) Allocate the reference and insert the row in one transaction.
//! 3) Provision `<root>/<year>/<folder name>` when document storage is
//!    enabled. A failure here is logged; the incident is still returned.

pub mod folders;
pub mod search;
mod storage;
pub mod types;

use self::{
    storage::NewIncident,
    types::{CreateIncidentRequest, IncidentResponse, UpdateIncidentRequest},
};
use super::{ApiError, DocumentsState, reference::normalize_code};
use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{Datelike, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

fn trimmed(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn required_code(code: &str, what: &str) -> Result<String, ApiError> {
    normalize_code(code)
        .ok_or_else(|| ApiError::bad_request(format!("Invalid {what} code: {}", code.trim())))
}

#[utoipa::path(
    post,
    path = "/v1/incidents",
    request_body = CreateIncidentRequest,
    responses(
        (status = 201, description = "Incident created; `folder` is set when provisioning succeeded.", body = IncidentResponse),
        (status = 400, description = "Invalid or unknown club/handler code."),
        (status = 404, description = "Parent incident not found."),
        (status = 409, description = "Case reference collision; retry."),
    ),
    tag = "incidents"
)]
pub async fn create_incident(
    pool: Extension<PgPool>,
    documents: Extension<Arc<DocumentsState>>,
    Json(payload): Json<CreateIncidentRequest>,
) -> impl IntoResponse {
    let (club_code, handler_code) = match (
        required_code(&payload.club_code, "club"),
        required_code(&payload.handler_code, "handler"),
    ) {
        (Ok(club), Ok(handler)) => (club, handler),
        (Err(err), _) | (_, Err(err)) => return err.into_response(),
    };

    let new_incident = NewIncident {
        club_code: &club_code,
        handler_code: &handler_code,
        vessel_name: trimmed(payload.vessel_name.as_ref()),
        port: trimmed(payload.port.as_ref()),
        description: trimmed(payload.description.as_ref()),
        incident_date: payload.incident_date,
        parent_id: payload.parent_id,
        year: Utc::now().year(),
    };

    let incident = match storage::insert_incident(&pool, &new_incident).await {
        Ok(incident) => incident,
        Err(err) => return err.into_response(),
    };
    info!(reference = %incident.reference, "incident created");

    let incident = match documents.store() {
        Some(store) => {
            match folders::attach_folder(&pool, store, documents.root_folder(), &incident).await {
                Ok(linked) => linked,
                Err(err) => {
                    warn!(
                        reference = %incident.reference,
                        "incident folder not provisioned: {err:?}"
                    );
                    incident
                }
            }
        }
        None => {
            info!(reference = %incident.reference, "document storage disabled, no folder created");
            incident
        }
    };

    (StatusCode::CREATED, Json(incident)).into_response()
}

#[utoipa::path(
    get,
    path = "/v1/incidents/{id}",
    params(("id" = Uuid, Path, description = "Incident id")),
    responses(
        (status = 200, description = "Incident.", body = IncidentResponse),
        (status = 404, description = "Incident not found."),
    ),
    tag = "incidents"
)]
pub async fn get_incident(Path(id): Path<Uuid>, pool: Extension<PgPool>) -> impl IntoResponse {
    match storage::fetch_incident(&pool, id).await {
        Ok(Some(incident)) => Json(incident).into_response(),
        Ok(None) => ApiError::NotFound("Incident not found.").into_response(),
        Err(err) => err.into_response(),
    }
}

/// Updates descriptive fields, status or handler. The reference is kept.
#[utoipa::path(
    patch,
    path = "/v1/incidents/{id}",
    request_body = UpdateIncidentRequest,
    params(("id" = Uuid, Path, description = "Incident id")),
    responses(
        (status = 200, description = "Updated incident.", body = IncidentResponse),
        (status = 400, description = "Empty update or unknown handler code."),
        (status = 404, description = "Incident not found."),
    ),
    tag = "incidents"
)]
pub async fn update_incident(
    Path(id): Path<Uuid>,
    pool: Extension<PgPool>,
    Json(payload): Json<UpdateIncidentRequest>,
) -> impl IntoResponse {
    if payload.is_empty() {
        return ApiError::bad_request("Nothing to update.").into_response();
    }

    match storage::update_incident(&pool, id, &payload).await {
        Ok(Some(incident)) => Json(incident).into_response(),
        Ok(None) => ApiError::NotFound("Incident not found.").into_response(),
        Err(err) => err.into_response(),
    }
}

/// Deletes the incident row. Its document folder is left in place.
#[utoipa::path(
    delete,
    path = "/v1/incidents/{id}",
    params(("id" = Uuid, Path, description = "Incident id")),
    responses(
        (status = 204, description = "Incident deleted."),
        (status = 404, description = "Incident not found."),
        (status = 409, description = "Incident still has sub-incidents."),
    ),
    tag = "incidents"
)]
pub async fn delete_incident(Path(id): Path<Uuid>, pool: Extension<PgPool>) -> impl IntoResponse {
    match storage::delete_incident(&pool, id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => ApiError::NotFound("Incident not found.").into_response(),
        Err(err) => err.into_response(),
    }
}
