//! SQL for traders.
//!
//! Writes take `SHARE ROW EXCLUSIVE` on the table before reading the existing
//! names, so two requests can never both pass the duplicate check with
//! near-identical names. Reads are unlocked.

use super::types::TraderResponse;
use crate::{
    api::handlers::ApiError,
    naming::{SimilarityOutcome, check_similarity},
};
use sqlx::{PgExecutor, PgPool, Postgres, Row, Transaction, postgres::PgRow};
use tracing::{Instrument, info_span};
use uuid::Uuid;

const TRADER_COLUMNS: &str = r#"
    id, name,
    to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at,
    to_char(updated_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS updated_at
"#;

fn trader_from_row(row: &PgRow) -> TraderResponse {
    let id: Uuid = row.get("id");
    TraderResponse {
        id: id.to_string(),
        name: row.get("name"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Turns a duplicate outcome into the `409` shown to the operator.
fn duplicate_error(outcome: &SimilarityOutcome) -> Option<ApiError> {
    match outcome {
        SimilarityOutcome::Exact { name } => {
            Some(ApiError::conflict(format!("Trader already exists: {name}")))
        }
        SimilarityOutcome::Similar { .. } => outcome.closest().map(|closest| {
            ApiError::conflict(format!(
                "Trader name is too similar to an existing trader: {closest}"
            ))
        }),
        SimilarityOutcome::NoMatch => None,
    }
}

async fn trader_names<'e>(
    executor: impl PgExecutor<'e>,
    exclude: Option<Uuid>,
) -> Result<Vec<String>, sqlx::Error> {
    let rows = sqlx::query("SELECT name FROM traders WHERE $1::uuid IS NULL OR id <> $1 ORDER BY name")
        .bind(exclude)
        .fetch_all(executor)
        .instrument(info_span!("db.query", db.system = "postgresql", db.operation = "SELECT"))
        .await?;
    Ok(rows.iter().map(|row| row.get("name")).collect())
}

async fn lock_traders(tx: &mut Transaction<'_, Postgres>) -> Result<(), sqlx::Error> {
    sqlx::query("LOCK TABLE traders IN SHARE ROW EXCLUSIVE MODE")
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub(super) async fn list_traders(pool: &PgPool) -> Result<Vec<TraderResponse>, ApiError> {
    let query = format!("SELECT {TRADER_COLUMNS} FROM traders ORDER BY name");
    let rows = sqlx::query(&query).fetch_all(pool).await?;
    Ok(rows.iter().map(trader_from_row).collect())
}

pub(super) async fn fetch_trader(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<TraderResponse>, ApiError> {
    let query = format!("SELECT {TRADER_COLUMNS} FROM traders WHERE id = $1");
    let row = sqlx::query(&query).bind(id).fetch_optional(pool).await?;
    Ok(row.as_ref().map(trader_from_row))
}

/// Compares `name` with every stored trader without writing anything.
pub(super) async fn check_name(pool: &PgPool, name: &str) -> Result<SimilarityOutcome, ApiError> {
    let names = trader_names(pool, None).await?;
    Ok(check_similarity(name, &names))
}

/// Inserts a trader unless the name is an exact or near duplicate (`409`).
pub(super) async fn insert_trader(pool: &PgPool, name: &str) -> Result<TraderResponse, ApiError> {
    let mut tx = pool.begin().await?;
    lock_traders(&mut tx).await?;

    let names = trader_names(&mut *tx, None).await?;
    if let Some(err) = duplicate_error(&check_similarity(name, &names)) {
        tx.rollback().await?;
        return Err(err);
    }

    let query = format!("INSERT INTO traders (name) VALUES ($1) RETURNING {TRADER_COLUMNS}");
    let row = sqlx::query(&query).bind(name).fetch_one(&mut *tx).await?;
    tx.commit().await?;

    Ok(trader_from_row(&row))
}

/// Renames a trader. The trader's current name is left out of the duplicate
/// check so whitespace or case fixes are allowed.
pub(super) async fn rename_trader(
    pool: &PgPool,
    id: Uuid,
    name: &str,
) -> Result<Option<TraderResponse>, ApiError> {
    let mut tx = pool.begin().await?;
    lock_traders(&mut tx).await?;

    let exists = sqlx::query("SELECT 1 FROM traders WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .is_some();
    if !exists {
        tx.rollback().await?;
        return Ok(None);
    }

    let names = trader_names(&mut *tx, Some(id)).await?;
    if let Some(err) = duplicate_error(&check_similarity(name, &names)) {
        tx.rollback().await?;
        return Err(err);
    }

    let query = format!(
        "UPDATE traders SET name = $2, updated_at = NOW() WHERE id = $1 RETURNING {TRADER_COLUMNS}"
    );
    let row = sqlx::query(&query)
        .bind(id)
        .bind(name)
        .fetch_one(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(Some(trader_from_row(&row)))
}

pub(super) async fn delete_trader(pool: &PgPool, id: Uuid) -> Result<bool, ApiError> {
    let result = sqlx::query("DELETE FROM traders WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
