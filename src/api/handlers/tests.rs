//! Handler tests against a real Postgres.
//!
//! Each test starts a throwaway container, applies `sql/schema.sql` and drives
//! the production router with `oneshot`. Without a container runtime the tests
//! return early.

use super::DocumentsState;
use crate::graph::{DocumentStore, DriveItem, FolderParent};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use axum::{
    Extension, Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header::CONTENT_TYPE},
};
use chrono::{Datelike, Utc};
use serde_json::{Value, json};
use sqlx::{Connection, PgConnection, PgPool, postgres::PgPoolOptions};
use std::sync::{Arc, Mutex};
use test_support::{TestNetwork, postgres::PostgresContainer, runtime};
use tower::ServiceExt;

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

struct TestDb {
    _postgres: PostgresContainer,
    pool: PgPool,
}

impl TestDb {
    /// Starts Postgres and applies the schema, or errors so the caller can skip.
    async fn new() -> Result<Self> {
        if let Err(err) = runtime::ensure_container_runtime() {
            eprintln!("Skipping integration test: {err}");
            return Err(err);
        }

        let network = TestNetwork::new("claimsdesk-api");
        let postgres = PostgresContainer::start(network.name()).await?;
        postgres.wait_until_ready().await?;
        apply_schema(&postgres.dsn()).await?;

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&postgres.dsn())
            .await
            .context("failed to connect test pool")?;

        Ok(Self {
            _postgres: postgres,
            pool,
        })
    }
}

async fn apply_schema(dsn: &str) -> Result<()> {
    let mut connection = PgConnection::connect(dsn)
        .await
        .context("failed to connect for schema setup")?;

    for (index, statement) in split_sql_statements(SCHEMA_SQL).iter().enumerate() {
        sqlx::query(statement)
            .execute(&mut connection)
            .await
            .with_context(|| format!("failed to execute schema statement {}", index + 1))?;
    }

    Ok(())
}

/// Splits on lines ending in `;`, dropping `--` comment lines.
fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();

    for line in sql.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("--") {
            continue;
        }
        current.push_str(line);
        current.push('\n');

        if trimmed.ends_with(';') {
            let statement = current.trim();
            if !statement.is_empty() {
                statements.push(statement.to_string());
            }
            current.clear();
        }
    }

    let leftover = current.trim();
    if !leftover.is_empty() {
        statements.push(leftover.to_string());
    }

    statements
}

/// Drive stand-in: every created folder is recorded; `fail` makes every call error.
#[derive(Default)]
struct FakeDrive {
    folders: Mutex<Vec<(FolderParent, DriveItem)>>,
    fail: bool,
}

impl FakeDrive {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn names(&self) -> Vec<String> {
        self.folders
            .lock()
            .map(|folders| folders.iter().map(|(_, item)| item.name.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentStore for FakeDrive {
    async fn find_folder(&self, path: &[&str]) -> Result<Option<DriveItem>> {
        if self.fail {
            return Err(anyhow!("drive unavailable"));
        }
        let folders = self.folders.lock().map_err(|_| anyhow!("poisoned"))?;
        let mut parent = FolderParent::Root;
        let mut found = None;
        for name in path {
            let Some((_, item)) = folders
                .iter()
                .find(|(p, item)| *p == parent && item.name == *name)
            else {
                return Ok(None);
            };
            parent = FolderParent::Item(item.id.clone());
            found = Some(item.clone());
        }
        Ok(found)
    }

    async fn create_folder(&self, parent: &FolderParent, name: &str) -> Result<DriveItem> {
        if self.fail {
            return Err(anyhow!("drive unavailable"));
        }
        let mut folders = self.folders.lock().map_err(|_| anyhow!("poisoned"))?;
        let item = DriveItem {
            id: format!("item-{}", folders.len() + 1),
            name: name.to_string(),
            web_url: Some(format!("https://drive.example/{name}")),
        };
        folders.push((parent.clone(), item.clone()));
        Ok(item)
    }
}

fn app(pool: PgPool, documents: DocumentsState) -> Router {
    let (router, _) = crate::api::router().split_for_parts();
    router
        .layer(Extension(Arc::new(documents)))
        .layer(Extension(pool))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Result<(StatusCode, Value)> {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))?,
        None => request.body(Body::empty())?,
    };

    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    Ok((status, value))
}

async fn seed_reference_data(app: &Router) -> Result<()> {
    let (status, _) = send(app, Method::POST, "/v1/clubs", Some(json!({"code": "GD", "name": "Gard"}))).await?;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = send(
        app,
        Method::POST,
        "/v1/handlers",
        Some(json!({"code": "IAL", "name": "Ian Allen"})),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    Ok(())
}

fn year_suffix() -> String {
    format!("{:02}", Utc::now().year().rem_euclid(100))
}

fn text(value: &Value, key: &str) -> String {
    value[key].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn health_reports_database_and_storage() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };
    let app = app(db.pool.clone(), DocumentsState::disabled());

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let x_app = response
        .headers()
        .get("X-App")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(x_app.starts_with(concat!(env!("CARGO_PKG_NAME"), ":")));

    let (_, body) = send(&app, Method::GET, "/health", None).await?;
    assert_eq!(body["database"], "ok");
    assert_eq!(body["documents"], "disabled");
    Ok(())
}

#[tokio::test]
async fn club_codes_are_normalized_and_unique() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };
    let app = app(db.pool.clone(), DocumentsState::disabled());

    let (status, club) = send(&app, Method::POST, "/v1/clubs", Some(json!({"code": " gd ", "name": "Gard"}))).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(club["code"], "GD");

    let (status, _) = send(&app, Method::POST, "/v1/clubs", Some(json!({"code": "GD", "name": "Gard P&I"}))).await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, Method::POST, "/v1/clubs", Some(json!({"code": "G/D", "name": "Bad"}))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::POST, "/v1/handlers", Some(json!({"code": "IAL", "name": "  "}))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, clubs) = send(&app, Method::GET, "/v1/clubs", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(clubs.as_array().map(Vec::len), Some(1));
    Ok(())
}

#[tokio::test]
async fn trader_duplicates_are_rejected() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };
    let app = app(db.pool.clone(), DocumentsState::disabled());

    let (status, created) = send(&app, Method::POST, "/v1/traders", Some(json!({"name": "Cargill Agricola"}))).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["name"], "Cargill Agricola");

    let (status, body) = send(&app, Method::POST, "/v1/traders", Some(json!({"name": "  cargill   AGRICOLA "}))).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(text(&body, "error").contains("Cargill Agricola"));

    let (status, _) = send(&app, Method::POST, "/v1/traders", Some(json!({"name": "Cargill Agricole"}))).await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, outcome) = send(&app, Method::POST, "/v1/traders/check", Some(json!({"name": "Cargil Agricola"}))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["outcome"], "similar");
    assert_eq!(outcome["matches"][0]["distance"], 1);

    let (status, outcome) = send(&app, Method::POST, "/v1/traders/check", Some(json!({"name": "Bunge"}))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["outcome"], "no_match");

    let (status, _) = send(&app, Method::POST, "/v1/traders", Some(json!({"name": "   "}))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, traders) = send(&app, Method::GET, "/v1/traders", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(traders.as_array().map(Vec::len), Some(1));
    Ok(())
}

#[tokio::test]
async fn trader_rename_ignores_its_own_name() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };
    let app = app(db.pool.clone(), DocumentsState::disabled());

    let (_, acme) = send(&app, Method::POST, "/v1/traders", Some(json!({"name": "ACME SHIPPING"}))).await?;
    let (_, other) = send(&app, Method::POST, "/v1/traders", Some(json!({"name": "Oceanic Grain"}))).await?;
    let acme_uri = format!("/v1/traders/{}", text(&acme, "id"));
    let other_uri = format!("/v1/traders/{}", text(&other, "id"));

    let (status, renamed) = send(&app, Method::PATCH, &acme_uri, Some(json!({"name": "Acme Shipping"}))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["name"], "Acme Shipping");

    let (status, _) = send(&app, Method::PATCH, &other_uri, Some(json!({"name": "acme shipping"}))).await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, Method::DELETE, &other_uri, None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::GET, &other_uri, None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn incident_references_follow_sequence_and_parent() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };
    let app = app(db.pool.clone(), DocumentsState::disabled());
    seed_reference_data(&app).await?;
    let yy = year_suffix();

    let (status, first) = send(
        &app,
        Method::POST,
        "/v1/incidents",
        Some(json!({"club_code": "gd", "handler_code": "IAL", "vessel_name": "LONG BEACH"})),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["reference"], format!("0001/{yy}/GD/IAL"));
    assert_eq!(first["status"], "open");
    assert!(first["folder"].is_null());

    let (_, second) = send(
        &app,
        Method::POST,
        "/v1/incidents",
        Some(json!({"club_code": "GD", "handler_code": "IAL"})),
    )
    .await?;
    assert_eq!(second["reference"], format!("0002/{yy}/GD/IAL"));

    let (status, sub) = send(
        &app,
        Method::POST,
        "/v1/incidents",
        Some(json!({"club_code": "GD", "handler_code": "IAL", "parent_id": text(&first, "id")})),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sub["reference"], format!("0001/{yy}/GD/IAL-1"));
    assert_eq!(sub["parent_id"], first["id"]);

    let (status, _) = send(
        &app,
        Method::POST,
        "/v1/incidents",
        Some(json!({"club_code": "XX", "handler_code": "IAL"})),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        "/v1/incidents",
        Some(json!({"club_code": "GD", "handler_code": "IAL", "parent_id": uuid::Uuid::new_v4()})),
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let first_uri = format!("/v1/incidents/{}", text(&first, "id"));
    let (status, _) = send(&app, Method::DELETE, &first_uri, None).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn concurrent_creates_get_distinct_sequences() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };
    let app = app(db.pool.clone(), DocumentsState::disabled());
    seed_reference_data(&app).await?;

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let app = app.clone();
        tasks.push(tokio::spawn(async move {
            send(
                &app,
                Method::POST,
                "/v1/incidents",
                Some(json!({"club_code": "GD", "handler_code": "IAL"})),
            )
            .await
        }));
    }

    let mut sequences = Vec::new();
    for task in tasks {
        let (status, body) = task.await??;
        assert_eq!(status, StatusCode::CREATED);
        sequences.push(body["sequence"].as_i64().unwrap_or_default());
    }
    sequences.sort_unstable();
    assert_eq!(sequences, (1..=8).collect::<Vec<i64>>());
    Ok(())
}

#[tokio::test]
async fn reference_collision_is_conflict_and_rolled_back() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };
    let app = app(db.pool.clone(), DocumentsState::disabled());
    seed_reference_data(&app).await?;

    let create = json!({"club_code": "GD", "handler_code": "IAL"});
    let (status, _) = send(&app, Method::POST, "/v1/incidents", Some(create.clone())).await?;
    assert_eq!(status, StatusCode::CREATED);

    // Losing the counter makes the next allocation reuse sequence 1.
    sqlx::query("DELETE FROM incident_sequences")
        .execute(&db.pool)
        .await?;
    let (status, body) = send(&app, Method::POST, "/v1/incidents", Some(create.clone())).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(text(&body, "error").contains("already taken"));

    let counters: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM incident_sequences")
        .fetch_one(&db.pool)
        .await?;
    assert_eq!(counters, 0);

    sqlx::query("INSERT INTO incident_sequences (year, last_value) VALUES ($1, 1)")
        .bind(Utc::now().year())
        .execute(&db.pool)
        .await?;
    let (status, body) = send(&app, Method::POST, "/v1/incidents", Some(create)).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["sequence"], 2);
    Ok(())
}

#[tokio::test]
async fn incident_search_filters_and_pages() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };
    let app = app(db.pool.clone(), DocumentsState::disabled());
    seed_reference_data(&app).await?;

    for (vessel, port) in [
        ("LONG BEACH", "Santos"),
        ("NORDIC BEACH", "Paranagua"),
        ("STAR OF 100% LUCK", "Rotterdam"),
    ] {
        let (status, _) = send(
            &app,
            Method::POST,
            "/v1/incidents",
            Some(json!({"club_code": "GD", "handler_code": "IAL", "vessel_name": vessel, "port": port})),
        )
        .await?;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, page) = send(&app, Method::GET, "/v1/incidents?q=beach&per_page=1", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 2);
    assert_eq!(page["per_page"], 1);
    assert_eq!(page["items"].as_array().map(Vec::len), Some(1));
    // Newest first by default.
    assert_eq!(page["items"][0]["vessel_name"], "NORDIC BEACH");

    let (_, page) = send(&app, Method::GET, "/v1/incidents?q=100%25", None).await?;
    assert_eq!(page["total"], 1);
    let (_, page) = send(&app, Method::GET, "/v1/incidents?q=%25", None).await?;
    assert_eq!(page["total"], 1);

    let (_, page) = send(&app, Method::GET, "/v1/incidents?sort=reference", None).await?;
    assert_eq!(page["items"][0]["vessel_name"], "LONG BEACH");
    assert_eq!(page["page"], 1);

    let long_beach_id = page["items"][0]["id"].as_str().unwrap_or_default().to_string();
    let (status, closed) = send(
        &app,
        Method::PATCH,
        &format!("/v1/incidents/{long_beach_id}"),
        Some(json!({"status": "closed", "port": ""})),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(closed["status"], "closed");
    assert!(closed["port"].is_null());

    let (_, page) = send(&app, Method::GET, "/v1/incidents?status=closed&club=gd", None).await?;
    assert_eq!(page["total"], 1);
    let (_, page) = send(&app, Method::GET, "/v1/incidents?vessel=nordic", None).await?;
    assert_eq!(page["total"], 1);
    let (_, page) = send(&app, Method::GET, "/v1/incidents?year=1999", None).await?;
    assert_eq!(page["total"], 0);

    let (status, _) = send(&app, Method::GET, "/v1/incidents?sort=vessel", None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn incident_folder_is_provisioned_when_storage_enabled() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };
    let drive = Arc::new(FakeDrive::default());
    let app = app(
        db.pool.clone(),
        DocumentsState::enabled(drive.clone(), "Incidents"),
    );
    seed_reference_data(&app).await?;
    let yy = year_suffix();

    let (status, incident) = send(
        &app,
        Method::POST,
        "/v1/incidents",
        Some(json!({"club_code": "GD", "handler_code": "IAL", "vessel_name": "LONG/BEACH?"})),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    let expected = format!("0001{yy}GD - LONGBEACH");
    assert_eq!(incident["folder"]["name"], expected.as_str());

    let year = Utc::now().year().to_string();
    assert_eq!(drive.names(), vec!["Incidents".to_string(), year, expected]);
    Ok(())
}

#[tokio::test]
async fn failed_provisioning_still_creates_incident() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };
    let app = app(
        db.pool.clone(),
        DocumentsState::enabled(Arc::new(FakeDrive::failing()), "Incidents"),
    );
    seed_reference_data(&app).await?;

    let (status, incident) = send(
        &app,
        Method::POST,
        "/v1/incidents",
        Some(json!({"club_code": "GD", "handler_code": "IAL"})),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert!(incident["folder"].is_null());

    let uri = format!("/v1/incidents/{}/folder", text(&incident, "id"));
    let (status, body) = send(&app, Method::POST, &uri, None).await?;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(!text(&body, "error").contains("drive unavailable"));
    Ok(())
}

#[tokio::test]
async fn folder_endpoint_requires_storage() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };
    let app = app(db.pool.clone(), DocumentsState::disabled());
    seed_reference_data(&app).await?;

    let (_, incident) = send(
        &app,
        Method::POST,
        "/v1/incidents",
        Some(json!({"club_code": "GD", "handler_code": "IAL"})),
    )
    .await?;
    let uri = format!("/v1/incidents/{}/folder", text(&incident, "id"));
    let (status, _) = send(&app, Method::POST, &uri, None).await?;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/documents/folder-name",
        Some(json!({"reference": "0664/25/GD/IAL", "vessel_name": "LONG BEACH"})),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["folder_name"], "066425GD - LONG BEACH");
    Ok(())
}

#[test]
fn split_sql_statements_skips_comments() {
    let statements = split_sql_statements("-- header\nCREATE TABLE a (id INT);\n\nCREATE INDEX b ON a (id);\n");
    assert_eq!(
        statements,
        vec!["CREATE TABLE a (id INT);", "CREATE INDEX b ON a (id);"]
    );
}
