use super::{storage, types::IncidentResponse};
use crate::{
    api::handlers::{ApiError, DocumentsState},
    graph::{DocumentStore, provision_incident_folder},
    naming::incident_folder_name,
};
use axum::{
    Json,
    extract::{Extension, Path},
    response::IntoResponse,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Creates the incident's folder under `<root>/<year>` and records it.
///
/// Storage failures come back as [`ApiError::Storage`]; the incident row is
/// left untouched in that case.
pub(super) async fn attach_folder(
    pool: &PgPool,
    store: &dyn DocumentStore,
    root_folder: &str,
    incident: &IncidentResponse,
) -> Result<IncidentResponse, ApiError> {
    let folder_name = incident_folder_name(&incident.reference, incident.vessel_name.as_deref());
    let folder = provision_incident_folder(store, root_folder, incident.year, &folder_name)
        .await
        .map_err(ApiError::Storage)?;

    let id = Uuid::parse_str(&incident.id)
        .map_err(|_| ApiError::NotFound("Incident not found."))?;
    storage::store_folder(pool, id, &folder)
        .await?
        .ok_or(ApiError::NotFound("Incident not found."))
}

/// Provisions the document folder for an existing incident.
///
/// Used when provisioning failed at creation time or the folder was removed.
/// A repeated call creates a renamed sibling folder and relinks the incident.
#[utoipa::path(
    post,
    path = "/v1/incidents/{id}/folder",
    params(("id" = Uuid, Path, description = "Incident id")),
    responses(
        (status = 200, description = "Folder provisioned and linked.", body = IncidentResponse),
        (status = 404, description = "Incident not found."),
        (status = 502, description = "Document storage request failed."),
        (status = 503, description = "Document storage is not configured."),
    ),
    tag = "documents"
)]
pub async fn provision_folder(
    Path(id): Path<Uuid>,
    pool: Extension<PgPool>,
    documents: Extension<Arc<DocumentsState>>,
) -> impl IntoResponse {
    let Some(store) = documents.store() else {
        return ApiError::Unavailable("Document storage is not configured.").into_response();
    };

    let incident = match storage::fetch_incident(&pool, id).await {
        Ok(Some(incident)) => incident,
        Ok(None) => return ApiError::NotFound("Incident not found.").into_response(),
        Err(err) => return err.into_response(),
    };

    match attach_folder(&pool, store, documents.root_folder(), &incident).await {
        Ok(incident) => {
            info!(reference = %incident.reference, "incident folder linked");
            Json(incident).into_response()
        }
        Err(err) => err.into_response(),
    }
}
