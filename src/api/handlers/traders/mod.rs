//! Trader endpoints.
//!
//! Trader names are free text typed by operators, so the same company tends to
//! show up with different spacing, case or a typo. Creation and rename run the
//! name through [`crate::naming::check_similarity`] and refuse exact and near
//! duplicates; `POST /v1/traders/check` lets the UI ask first.

mod storage;
pub mod types;

use self::types::{TraderNameRequest, TraderResponse};
use super::ApiError;
use crate::naming::SimilarityOutcome;
use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use uuid::Uuid;

fn required_name(payload: &TraderNameRequest) -> Result<&str, ApiError> {
    let name = payload.name.trim();
    if name.is_empty() {
        Err(ApiError::bad_request("Trader name is required."))
    } else {
        Ok(name)
    }
}

#[utoipa::path(
    get,
    path = "/v1/traders",
    responses(
        (status = 200, description = "All traders ordered by name.", body = [TraderResponse]),
    ),
    tag = "traders"
)]
pub async fn list_traders(pool: Extension<PgPool>) -> impl IntoResponse {
    match storage::list_traders(&pool).await {
        Ok(traders) => Json(traders).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Reports whether `name` would be accepted, without creating anything.
#[utoipa::path(
    post,
    path = "/v1/traders/check",
    request_body = TraderNameRequest,
    responses(
        (status = 200, description = "Similarity outcome against existing traders.", body = SimilarityOutcome),
        (status = 400, description = "Name is empty."),
    ),
    tag = "traders"
)]
pub async fn check_trader(
    pool: Extension<PgPool>,
    Json(payload): Json<TraderNameRequest>,
) -> impl IntoResponse {
    let name = match required_name(&payload) {
        Ok(name) => name,
        Err(err) => return err.into_response(),
    };

    match storage::check_name(&pool, name).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/v1/traders",
    request_body = TraderNameRequest,
    responses(
        (status = 201, description = "Trader created.", body = TraderResponse),
        (status = 400, description = "Name is empty."),
        (status = 409, description = "An identical or near-identical trader exists."),
    ),
    tag = "traders"
)]
pub async fn create_trader(
    pool: Extension<PgPool>,
    Json(payload): Json<TraderNameRequest>,
) -> impl IntoResponse {
    let name = match required_name(&payload) {
        Ok(name) => name,
        Err(err) => return err.into_response(),
    };

    match storage::insert_trader(&pool, name).await {
        Ok(trader) => (StatusCode::CREATED, Json(trader)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/v1/traders/{id}",
    params(("id" = Uuid, Path, description = "Trader id")),
    responses(
        (status = 200, description = "Trader.", body = TraderResponse),
        (status = 404, description = "Trader not found."),
    ),
    tag = "traders"
)]
pub async fn get_trader(Path(id): Path<Uuid>, pool: Extension<PgPool>) -> impl IntoResponse {
    match storage::fetch_trader(&pool, id).await {
        Ok(Some(trader)) => Json(trader).into_response(),
        Ok(None) => ApiError::NotFound("Trader not found.").into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    patch,
    path = "/v1/traders/{id}",
    request_body = TraderNameRequest,
    params(("id" = Uuid, Path, description = "Trader id")),
    responses(
        (status = 200, description = "Trader renamed.", body = TraderResponse),
        (status = 400, description = "Name is empty."),
        (status = 404, description = "Trader not found."),
        (status = 409, description = "Another identical or near-identical trader exists."),
    ),
    tag = "traders"
)]
pub async fn update_trader(
    Path(id): Path<Uuid>,
    pool: Extension<PgPool>,
    Json(payload): Json<TraderNameRequest>,
) -> impl IntoResponse {
    let name = match required_name(&payload) {
        Ok(name) => name,
        Err(err) => return err.into_response(),
    };

    match storage::rename_trader(&pool, id, name).await {
        Ok(Some(trader)) => Json(trader).into_response(),
        Ok(None) => ApiError::NotFound("Trader not found.").into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    delete,
    path = "/v1/traders/{id}",
    params(("id" = Uuid, Path, description = "Trader id")),
    responses(
        (status = 204, description = "Trader deleted."),
        (status = 404, description = "Trader not found."),
    ),
    tag = "traders"
)]
pub async fn delete_trader(Path(id): Path<Uuid>, pool: Extension<PgPool>) -> impl IntoResponse {
    match storage::delete_trader(&pool, id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => ApiError::NotFound("Trader not found.").into_response(),
        Err(err) => err.into_response(),
    }
}
