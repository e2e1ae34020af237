//! Claim handlers: the staff codes that close a case reference.

use super::{CreateReferenceRequest, ReferenceEntity, ReferenceKind, create, storage};
use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;

#[utoipa::path(
    get,
    path = "/v1/handlers",
    responses(
        (status = 200, description = "All claim handlers ordered by code.", body = [ReferenceEntity]),
    ),
    tag = "reference"
)]
pub async fn list_handlers(pool: Extension<PgPool>) -> impl IntoResponse {
    match storage::list(&pool, ReferenceKind::Handler).await {
        Ok(handlers) => Json(handlers).into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/v1/handlers",
    request_body = CreateReferenceRequest,
    responses(
        (status = 201, description = "Handler created.", body = ReferenceEntity),
        (status = 400, description = "Invalid code or missing name."),
        (status = 409, description = "Handler code already exists."),
    ),
    tag = "reference"
)]
pub async fn create_handler(
    pool: Extension<PgPool>,
    Json(payload): Json<CreateReferenceRequest>,
) -> impl IntoResponse {
    match create(&pool, ReferenceKind::Handler, &payload).await {
        Ok(handler) => (StatusCode::CREATED, Json(handler)).into_response(),
        Err(err) => err.into_response(),
    }
}
