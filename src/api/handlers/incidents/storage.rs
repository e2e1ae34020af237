//! SQL for incidents.
//!
//! Sequence numbers come from `incident_sequences`, one row per year, bumped
//! with an upsert inside the creating transaction. Sub-incidents reuse the
//! parent's sequence and year and take the next free sub-number while the
//! parent row is locked.

use super::types::{IncidentFolder, IncidentResponse, UpdateIncidentRequest};
use crate::{
    api::handlers::{
        ApiError, is_foreign_key_violation, is_unique_violation,
        reference::{ReferenceKind, storage::find_id_by_code},
    },
    graph::DriveItem,
    naming::CaseReference,
};
use chrono::NaiveDate;
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder, Row, Transaction, postgres::PgRow};
use tracing::{Instrument, debug, info_span};
use uuid::Uuid;

/// Base `SELECT` for incident rows; callers append `WHERE`/`ORDER BY`.
pub(super) const INCIDENT_SELECT: &str = r#"
    SELECT i.id, i.reference, i.sequence, i.year, i.sub_number, i.parent_id,
        c.code AS club_code, h.code AS handler_code,
        i.vessel_name, i.port, i.description,
        to_char(i.incident_date, 'YYYY-MM-DD') AS incident_date,
        i.status, i.folder_id, i.folder_name, i.folder_url,
        to_char(i.created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at,
        to_char(i.updated_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS updated_at
    FROM incidents i
    JOIN clubs c ON c.id = i.club_id
    JOIN handlers h ON h.id = i.handler_id
"#;

pub(super) fn incident_from_row(row: &PgRow) -> IncidentResponse {
    let id: Uuid = row.get("id");
    let parent_id: Option<Uuid> = row.get("parent_id");
    let folder_id: Option<String> = row.get("folder_id");
    let folder_name: Option<String> = row.get("folder_name");

    IncidentResponse {
        id: id.to_string(),
        reference: row.get("reference"),
        sequence: row.get("sequence"),
        year: row.get("year"),
        sub_number: row.get("sub_number"),
        parent_id: parent_id.map(|id| id.to_string()),
        club_code: row.get("club_code"),
        handler_code: row.get("handler_code"),
        vessel_name: row.get("vessel_name"),
        port: row.get("port"),
        description: row.get("description"),
        incident_date: row.get("incident_date"),
        status: row.get("status"),
        folder: folder_id.zip(folder_name).map(|(id, name)| IncidentFolder {
            id,
            name,
            web_url: row.get("folder_url"),
        }),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Validated input for a new incident.
#[derive(Debug)]
pub(super) struct NewIncident<'a> {
    pub club_code: &'a str,
    pub handler_code: &'a str,
    pub vessel_name: Option<&'a str>,
    pub port: Option<&'a str>,
    pub description: Option<&'a str>,
    pub incident_date: Option<NaiveDate>,
    pub parent_id: Option<Uuid>,
    /// Calendar year used for a new sequence; ignored for sub-incidents.
    pub year: i32,
}

/// Hands out the next sequence number for `year`, starting at 1.
async fn next_sequence(tx: &mut Transaction<'_, Postgres>, year: i32) -> Result<i32, sqlx::Error> {
    let row = sqlx::query(
        r"
        INSERT INTO incident_sequences (year, last_value)
        VALUES ($1, 1)
        ON CONFLICT (year) DO UPDATE SET last_value = incident_sequences.last_value + 1
        RETURNING last_value
        ",
    )
    .bind(year)
    .fetch_one(&mut **tx)
    .instrument(info_span!("db.query", db.system = "postgresql", db.operation = "UPSERT"))
    .await?;
    Ok(row.get("last_value"))
}

/// Locks the parent and returns `(sequence, year, next sub-number)`.
async fn next_sub_number(
    tx: &mut Transaction<'_, Postgres>,
    parent_id: Uuid,
) -> Result<Option<(i32, i32, i32)>, sqlx::Error> {
    let Some(parent) = sqlx::query("SELECT sequence, year FROM incidents WHERE id = $1 FOR UPDATE")
        .bind(parent_id)
        .fetch_optional(&mut **tx)
        .await?
    else {
        return Ok(None);
    };
    let sequence: i32 = parent.get("sequence");
    let year: i32 = parent.get("year");

    let row = sqlx::query(
        r"
        SELECT COALESCE(MAX(sub_number), 0) + 1 AS next
        FROM incidents
        WHERE year = $1 AND sequence = $2
        ",
    )
    .bind(year)
    .bind(sequence)
    .fetch_one(&mut **tx)
    .await?;

    Ok(Some((sequence, year, row.get("next"))))
}

async fn resolve_code<'e>(
    executor: impl PgExecutor<'e>,
    kind: ReferenceKind,
    code: &str,
) -> Result<Uuid, ApiError> {
    find_id_by_code(executor, kind, code).await?.ok_or_else(|| {
        ApiError::bad_request(format!(
            "Unknown {} code: {code}",
            kind.label().to_lowercase()
        ))
    })
}

/// Allocates the case reference and stores the incident in one transaction.
pub(super) async fn insert_incident(
    pool: &PgPool,
    incident: &NewIncident<'_>,
) -> Result<IncidentResponse, ApiError> {
    let mut tx = pool.begin().await?;

    let club_id = resolve_code(&mut *tx, ReferenceKind::Club, incident.club_code).await?;
    let handler_id = resolve_code(&mut *tx, ReferenceKind::Handler, incident.handler_code).await?;

    let (sequence, year, sub_number) = match incident.parent_id {
        Some(parent_id) => match next_sub_number(&mut tx, parent_id).await? {
            Some(numbers) => numbers,
            None => {
                tx.rollback().await?;
                return Err(ApiError::NotFound("Parent incident not found."));
            }
        },
        None => (next_sequence(&mut tx, incident.year).await?, incident.year, 0),
    };

    let reference = CaseReference::new(
        sequence.unsigned_abs(),
        year,
        incident.club_code,
        incident.handler_code,
    )
    .with_sub_number(sub_number.unsigned_abs())
    .to_string();
    debug!(%reference, "allocated case reference");

    let insert = sqlx::query(
        r"
        INSERT INTO incidents (
            reference, sequence, year, sub_number, parent_id, club_id, handler_id,
            vessel_name, port, description, incident_date
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING id
        ",
    )
    .bind(&reference)
    .bind(sequence)
    .bind(year)
    .bind(sub_number)
    .bind(incident.parent_id)
    .bind(club_id)
    .bind(handler_id)
    .bind(incident.vessel_name)
    .bind(incident.port)
    .bind(incident.description)
    .bind(incident.incident_date)
    .fetch_one(&mut *tx)
    .await;

    let id: Uuid = match insert {
        Ok(row) => row.get("id"),
        Err(err) if is_unique_violation(&err) => {
            tx.rollback().await?;
            return Err(ApiError::conflict(format!(
                "Case reference {reference} is already taken, retry the request."
            )));
        }
        Err(err) => return Err(ApiError::Database(err)),
    };

    let incident = fetch_incident_with(&mut *tx, id)
        .await?
        .ok_or(ApiError::NotFound("Incident not found."))?;
    tx.commit().await?;

    Ok(incident)
}

async fn fetch_incident_with<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
) -> Result<Option<IncidentResponse>, sqlx::Error> {
    let query = format!("{INCIDENT_SELECT} WHERE i.id = $1");
    let row = sqlx::query(&query).bind(id).fetch_optional(executor).await?;
    Ok(row.as_ref().map(incident_from_row))
}

pub(super) async fn fetch_incident(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<IncidentResponse>, ApiError> {
    Ok(fetch_incident_with(pool, id).await?)
}

/// Empty strings become `NULL`.
fn optional_text(value: &str) -> Option<&str> {
    Some(value.trim()).filter(|v| !v.is_empty())
}

/// Applies the fields present in `update`. The reference is never rewritten.
pub(super) async fn update_incident(
    pool: &PgPool,
    id: Uuid,
    update: &UpdateIncidentRequest,
) -> Result<Option<IncidentResponse>, ApiError> {
    let mut tx = pool.begin().await?;

    let handler_id = match update.handler_code.as_deref() {
        Some(code) => {
            let code = code.trim().to_ascii_uppercase();
            Some(resolve_code(&mut *tx, ReferenceKind::Handler, &code).await?)
        }
        None => None,
    };

    let mut qb = QueryBuilder::<Postgres>::new("UPDATE incidents SET updated_at = NOW()");
    push_update_columns(&mut qb, update, handler_id);
    qb.push(" WHERE id = ").push_bind(id).push(" RETURNING id");

    let updated = qb.build().fetch_optional(&mut *tx).await?;
    if updated.is_none() {
        tx.rollback().await?;
        return Ok(None);
    }

    let incident = fetch_incident_with(&mut *tx, id).await?;
    tx.commit().await?;
    Ok(incident)
}

fn push_update_columns<'a>(
    qb: &mut QueryBuilder<'a, Postgres>,
    update: &'a UpdateIncidentRequest,
    handler_id: Option<Uuid>,
) {
    for (column, value) in [
        ("vessel_name", &update.vessel_name),
        ("port", &update.port),
        ("description", &update.description),
    ] {
        if let Some(value) = value {
            qb.push(format!(", {column} = ")).push_bind(optional_text(value));
        }
    }
    if let Some(date) = update.incident_date {
        qb.push(", incident_date = ").push_bind(date);
    }
    if let Some(status) = update.status {
        qb.push(", status = ").push_bind(status.as_str());
    }
    if let Some(handler_id) = handler_id {
        qb.push(", handler_id = ").push_bind(handler_id);
    }
}

/// Deletes an incident; one that still has sub-incidents is `409`.
pub(super) async fn delete_incident(pool: &PgPool, id: Uuid) -> Result<bool, ApiError> {
    match sqlx::query("DELETE FROM incidents WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
    {
        Ok(result) => Ok(result.rows_affected() > 0),
        Err(err) if is_foreign_key_violation(&err) => Err(ApiError::conflict(
            "Incident has sub-incidents; delete them first.",
        )),
        Err(err) => Err(ApiError::Database(err)),
    }
}

/// Records the provisioned folder on the incident.
pub(super) async fn store_folder(
    pool: &PgPool,
    id: Uuid,
    folder: &DriveItem,
) -> Result<Option<IncidentResponse>, ApiError> {
    let updated = sqlx::query(
        r"
        UPDATE incidents
        SET folder_id = $2, folder_name = $3, folder_url = $4, updated_at = NOW()
        WHERE id = $1
        ",
    )
    .bind(id)
    .bind(&folder.id)
    .bind(&folder.name)
    .bind(folder.web_url.as_deref())
    .execute(pool)
    .await?;

    if updated.rows_affected() == 0 {
        return Ok(None);
    }
    fetch_incident(pool, id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::incidents::types::IncidentStatus;

    #[test]
    fn update_sets_only_present_columns() {
        let update = UpdateIncidentRequest {
            port: Some("Santos".to_string()),
            status: Some(IncidentStatus::Closed),
            ..UpdateIncidentRequest::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE incidents SET updated_at = NOW()");
        push_update_columns(&mut qb, &update, None);

        assert_eq!(
            qb.sql(),
            "UPDATE incidents SET updated_at = NOW(), port = $1, status = $2"
        );
    }

    #[test]
    fn update_includes_handler_when_resolved() {
        let update = UpdateIncidentRequest {
            handler_code: Some("ial".to_string()),
            ..UpdateIncidentRequest::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE incidents SET updated_at = NOW()");
        push_update_columns(&mut qb, &update, Some(Uuid::nil()));

        assert!(qb.sql().ends_with(", handler_id = $1"));
    }

    #[test]
    fn optional_text_blanks_to_null() {
        assert_eq!(optional_text("  "), None);
        assert_eq!(optional_text(" LONG BEACH "), Some("LONG BEACH"));
    }
}
