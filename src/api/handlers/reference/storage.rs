use super::{ReferenceEntity, ReferenceKind};
use crate::api::handlers::{ApiError, is_unique_violation};
use sqlx::{PgExecutor, PgPool, Row, postgres::PgRow};
use uuid::Uuid;

fn entity_from_row(row: &PgRow) -> ReferenceEntity {
    let id: Uuid = row.get("id");
    ReferenceEntity {
        id: id.to_string(),
        code: row.get("code"),
        name: row.get("name"),
        created_at: row.get("created_at"),
    }
}

/// Lists every club or handler ordered by code.
pub(crate) async fn list(pool: &PgPool, kind: ReferenceKind) -> Result<Vec<ReferenceEntity>, ApiError> {
    // Table names come from `ReferenceKind`, never from input.
    let query = format!(
        r#"
        SELECT id, code, name,
            to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at
        FROM {}
        ORDER BY code
        "#,
        kind.table()
    );
    let rows = sqlx::query(&query).fetch_all(pool).await?;
    Ok(rows.iter().map(entity_from_row).collect())
}

/// Inserts a club or handler; a taken code is `409`.
pub(crate) async fn insert(
    pool: &PgPool,
    kind: ReferenceKind,
    code: &str,
    name: &str,
) -> Result<ReferenceEntity, ApiError> {
    let query = format!(
        r#"
        INSERT INTO {} (code, name)
        VALUES ($1, $2)
        RETURNING id, code, name,
            to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at
        "#,
        kind.table()
    );
    match sqlx::query(&query)
        .bind(code)
        .bind(name)
        .fetch_one(pool)
        .await
    {
        Ok(row) => Ok(entity_from_row(&row)),
        Err(err) if is_unique_violation(&err) => Err(ApiError::conflict(format!(
            "{} code already exists: {code}",
            kind.label()
        ))),
        Err(err) => Err(ApiError::Database(err)),
    }
}

/// Resolves a code to its row id.
pub(crate) async fn find_id_by_code<'e>(
    executor: impl PgExecutor<'e>,
    kind: ReferenceKind,
    code: &str,
) -> Result<Option<Uuid>, sqlx::Error> {
    let query = format!("SELECT id FROM {} WHERE code = $1", kind.table());
    let row = sqlx::query(&query)
        .bind(code)
        .fetch_optional(executor)
        .await?;
    Ok(row.map(|row| row.get("id")))
}
