//! Incident search.
//!
//! Filters are appended to a `QueryBuilder`; every user value goes through
//! `push_bind`. Only the `ORDER BY` clause is literal SQL, picked from
//! [`SortOrder`].

use super::{
    storage::{INCIDENT_SELECT, incident_from_row},
    types::{IncidentPage, IncidentStatus, SearchQuery},
};
use crate::api::handlers::ApiError;
use axum::{
    Json,
    extract::{Extension, Query},
    response::IntoResponse,
};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::{Instrument, info_span};

const DEFAULT_PER_PAGE: u32 = 25;
const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum SortOrder {
    #[default]
    CreatedDesc,
    CreatedAsc,
    Reference,
}

impl SortOrder {
    fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "created_desc" => Some(Self::CreatedDesc),
            "created_asc" => Some(Self::CreatedAsc),
            "reference" => Some(Self::Reference),
            _ => None,
        }
    }

    fn order_by(self) -> &'static str {
        match self {
            Self::CreatedDesc => "i.created_at DESC, i.year DESC, i.sequence DESC, i.sub_number DESC",
            Self::CreatedAsc => "i.created_at, i.year, i.sequence, i.sub_number",
            Self::Reference => "i.year, i.sequence, i.sub_number",
        }
    }
}

/// Validated search input.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct SearchFilters {
    text: Option<String>,
    status: Option<IncidentStatus>,
    club: Option<String>,
    handler: Option<String>,
    year: Option<i32>,
    vessel: Option<String>,
    sort: SortOrder,
    page: u32,
    per_page: u32,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl SearchFilters {
    /// Clamps paging and rejects unknown `status`/`sort` values.
    pub(crate) fn from_query(query: &SearchQuery) -> Result<Self, ApiError> {
        let status = match non_empty(query.status.as_deref()) {
            Some(value) => Some(IncidentStatus::parse(value).ok_or_else(|| {
                ApiError::bad_request(format!("Unknown status: {value}"))
            })?),
            None => None,
        };
        let sort = match non_empty(query.sort.as_deref()) {
            Some(value) => SortOrder::parse(value)
                .ok_or_else(|| ApiError::bad_request(format!("Unknown sort: {value}")))?,
            None => SortOrder::default(),
        };

        Ok(Self {
            text: non_empty(query.q.as_deref()).map(str::to_string),
            status,
            club: non_empty(query.club.as_deref()).map(str::to_ascii_uppercase),
            handler: non_empty(query.handler.as_deref()).map(str::to_ascii_uppercase),
            year: query.year,
            vessel: non_empty(query.vessel.as_deref()).map(str::to_string),
            sort,
            page: query.page.unwrap_or(1).max(1),
            per_page: query
                .per_page
                .unwrap_or(DEFAULT_PER_PAGE)
                .clamp(1, MAX_PER_PAGE),
        })
    }

    fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.per_page)
    }
}

/// Escapes `LIKE` wildcards so user text only matches literally.
pub(crate) fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn contains_pattern(value: &str) -> String {
    format!("%{}%", escape_like(value))
}

/// Appends ` AND ...` for each active filter. The builder must already end in
/// a `WHERE` clause.
pub(crate) fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filters: &SearchFilters) {
    if let Some(text) = &filters.text {
        let pattern = contains_pattern(text);
        qb.push(" AND (");
        for (index, column) in ["i.reference", "i.vessel_name", "i.port", "i.description"]
            .into_iter()
            .enumerate()
        {
            if index > 0 {
                qb.push(" OR ");
            }
            qb.push(column)
                .push(" ILIKE ")
                .push_bind(pattern.clone())
                .push(r" ESCAPE '\'");
        }
        qb.push(")");
    }
    if let Some(status) = filters.status {
        qb.push(" AND i.status = ").push_bind(status.as_str());
    }
    if let Some(club) = &filters.club {
        qb.push(" AND c.code = ").push_bind(club.clone());
    }
    if let Some(handler) = &filters.handler {
        qb.push(" AND h.code = ").push_bind(handler.clone());
    }
    if let Some(year) = filters.year {
        qb.push(" AND i.year = ").push_bind(year);
    }
    if let Some(vessel) = &filters.vessel {
        qb.push(" AND i.vessel_name ILIKE ")
            .push_bind(contains_pattern(vessel))
            .push(r" ESCAPE '\'");
    }
}

pub(crate) async fn search(pool: &PgPool, filters: &SearchFilters) -> Result<IncidentPage, ApiError> {
    let mut count = QueryBuilder::<Postgres>::new(
        r"
        SELECT COUNT(*) AS total
        FROM incidents i
        JOIN clubs c ON c.id = i.club_id
        JOIN handlers h ON h.id = i.handler_id
        WHERE TRUE",
    );
    push_filters(&mut count, filters);
    let total: i64 = count
        .build()
        .fetch_one(pool)
        .instrument(info_span!("db.query", db.system = "postgresql", db.operation = "COUNT"))
        .await?
        .get("total");

    let mut items = QueryBuilder::<Postgres>::new(INCIDENT_SELECT);
    items.push(" WHERE TRUE");
    push_filters(&mut items, filters);
    items
        .push(" ORDER BY ")
        .push(filters.sort.order_by())
        .push(" LIMIT ")
        .push_bind(i64::from(filters.per_page))
        .push(" OFFSET ")
        .push_bind(filters.offset());

    let rows = items
        .build()
        .fetch_all(pool)
        .instrument(info_span!("db.query", db.system = "postgresql", db.operation = "SELECT"))
        .await?;

    Ok(IncidentPage {
        items: rows.iter().map(incident_from_row).collect(),
        total,
        page: filters.page,
        per_page: filters.per_page,
    })
}

/// Filtered, paginated incident list; newest first unless `sort` says otherwise.
#[utoipa::path(
    get,
    path = "/v1/incidents",
    params(SearchQuery),
    responses(
        (status = 200, description = "One page of matching incidents.", body = IncidentPage),
        (status = 400, description = "Unknown status or sort value."),
    ),
    tag = "incidents"
)]
pub async fn search_incidents(
    Query(query): Query<SearchQuery>,
    pool: Extension<PgPool>,
) -> impl IntoResponse {
    let filters = match SearchFilters::from_query(&query) {
        Ok(filters) => filters,
        Err(err) => return err.into_response(),
    };

    match search(&pool, &filters).await {
        Ok(page) => Json(page).into_response(),
        Err(err) => err.into_response(),
    }
}
