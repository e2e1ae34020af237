use crate::naming::incident_folder_name;
use axum::{Json, response::IntoResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct FolderNameRequest {
    /// Case reference, e.g. `0664/25/GD/IAL`.
    pub reference: String,
    pub vessel_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FolderNameResponse {
    pub folder_name: String,
}

/// Previews the folder name an incident with this reference and vessel would get.
///
/// Any reference is accepted; one without `/` segments is used as written.
#[utoipa::path(
    post,
    path = "/v1/documents/folder-name",
    request_body = FolderNameRequest,
    responses(
        (status = 200, description = "Folder name for the reference and vessel.", body = FolderNameResponse),
    ),
    tag = "documents"
)]
pub async fn folder_name(Json(payload): Json<FolderNameRequest>) -> impl IntoResponse {
    let reference = payload.reference.trim();
    Json(FolderNameResponse {
        folder_name: incident_folder_name(reference, payload.vessel_name.as_deref()),
    })
}
