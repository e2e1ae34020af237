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
    path = "/v1/clubs",
    responses(
        (status = 200, description = "All clubs ordered by code.", body = [ReferenceEntity]),
    ),
    tag = "reference"
)]
pub async fn list_clubs(pool: Extension<PgPool>) -> impl IntoResponse {
    match storage::list(&pool, ReferenceKind::Club).await {
        Ok(clubs) => Json(clubs).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Creates a club. The code is uppercased before it is stored.
#[utoipa::path(
    post,
    path = "/v1/clubs",
    request_body = CreateReferenceRequest,
    responses(
        (status = 201, description = "Club created.", body = ReferenceEntity),
        (status = 400, description = "Invalid code or missing name."),
        (status = 409, description = "Club code already exists."),
    ),
    tag = "reference"
)]
pub async fn create_club(
    pool: Extension<PgPool>,
    Json(payload): Json<CreateReferenceRequest>,
) -> impl IntoResponse {
    match create(&pool, ReferenceKind::Club, &payload).await {
        Ok(club) => (StatusCode::CREATED, Json(club)).into_response(),
        Err(err) => err.into_response(),
    }
}
