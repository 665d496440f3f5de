//! End-to-end tests through the HTTP router.
//!
//! Each test gets its own data directory and its own `AppState`; requests go
//! through `tower::ServiceExt::oneshot`, no socket involved. Dumps are real
//! `sh -c` processes running a stand-in command.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use cronvault_core::Config;
use cronvault_server::{build_router, AppState};

const TOKEN: &str = "test-token";
const SLOW_DUMP: &str = r#"sleep 1; echo data > "$BACKUP_FILE""#;

fn test_config(dir: &Path, secret: Option<&str>, dump_command: &str) -> Config {
    let mut config = Config::for_profile("").with_data_dir(dir);
    config.server.api_token = Some(TOKEN.to_string());
    config.server.port = 3999;
    config.vault.secret = secret.map(str::to_string);
    config.jobs.dump_command = dump_command.to_string();
    config.jobs.job_binary = "/usr/local/bin/cronvault".into();
    config.jobs.install_crontab = false;
    config
}

fn app(config: Config) -> Router {
    build_router(Arc::new(AppState::new(config)))
}

async fn send_as(
    app: &Router,
    token: Option<&str>,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(v) => {
            builder = builder.header(CONTENT_TYPE, "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    send_as(app, Some(TOKEN), method, uri, body).await
}

fn prod_plan() -> Value {
    json!({
        "databases": [{"name": "prod", "host": "db.internal", "user": "backup"}],
        "schedules": [{"database": "prod", "cron": "30 2 * * *"}]
    })
}

// ── Auth ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_health_is_public_and_api_requires_token() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app(test_config(tmp.path(), Some("s"), SLOW_DUMP));

    let (status, body) = send_as(&app, None, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, _) = send_as(&app, None, "GET", "/api/status", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, body) = send_as(&app, Some("wrong"), "GET", "/api/status", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_missing_api_token_fails_closed() {
    let tmp = tempfile::tempdir().unwrap();
    let mut config = test_config(tmp.path(), Some("s"), SLOW_DUMP);
    config.server.api_token = None;
    let app = app(config);

    let (status, _) = send_as(&app, Some(""), "GET", "/api/status", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ── End-to-end backup ───────────────────────────────────────────

#[tokio::test]
async fn test_trigger_twice_then_backup_listed_under_database() {
    let tmp = tempfile::tempdir().unwrap();
    let config = test_config(tmp.path(), Some("operator-secret"), SLOW_DUMP);
    let crontab = config.storage.crontab_file();
    let app = app(config);

    let (status, _) = send(&app, "PUT", "/api/config", Some(prod_plan())).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "PUT", "/api/passwords/prod", Some(json!({"password": "s3cr3t"}))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let table = std::fs::read_to_string(&crontab).unwrap();
    assert!(table.lines().any(|l| l.starts_with("30 2 * * * ") && l.contains("run 'prod'")));
    assert!(!table.contains("s3cr3t"));

    let (status, job) = send(&app, "POST", "/api/trigger/prod", None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(job["database"], "prod");
    assert!(job["pid"].as_u64().unwrap() > 0);

    let (status, body) = send(&app, "POST", "/api/trigger/prod", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("already running"));

    let (_, running) = send(&app, "GET", "/api/status", None).await;
    assert_eq!(running[0]["database"], "prod");
    assert_eq!(running[0]["pid"], job["pid"]);

    // Wait for the dump to finish and the lease to be released.
    let mut backups = Value::Null;
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let (_, running) = send(&app, "GET", "/api/status", None).await;
        let (_, listed) = send(&app, "GET", "/api/backups", None).await;
        if running.as_array().is_some_and(|r| r.is_empty()) && listed.get("prod").is_some() {
            backups = listed;
            break;
        }
    }

    let prod = backups["prod"].as_array().expect("backup never appeared");
    assert_eq!(prod.len(), 1);
    assert_eq!(prod[0]["id"], 1);
    assert!(prod[0]["filename"].as_str().unwrap().ends_with("_prod.sql.gz"));
    assert_eq!(prod[0]["size"], 5);

    // Idle again: a new trigger is accepted.
    let (status, _) = send(&app, "POST", "/api/trigger/prod", None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_trigger_errors() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app(test_config(tmp.path(), Some("k"), SLOW_DUMP));
    send(&app, "PUT", "/api/config", Some(prod_plan())).await;

    let (status, _) = send(&app, "POST", "/api/trigger/ghost", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, "POST", "/api/trigger/prod", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("prod"));

    // The failed attempt did not leave the database locked.
    let (_, running) = send(&app, "GET", "/api/status", None).await;
    assert_eq!(running, json!([]));
}

// ── Backups by ID ───────────────────────────────────────────────

#[tokio::test]
async fn test_delete_backup_never_reuses_id() {
    let tmp = tempfile::tempdir().unwrap();
    let config = test_config(tmp.path(), Some("k"), SLOW_DUMP);
    let backup_dir = config.storage.backup_dir.clone();
    let app = app(config);

    std::fs::create_dir_all(&backup_dir).unwrap();
    std::fs::write(backup_dir.join("20260101T000000Z_prod.sql.gz"), b"one").unwrap();
    std::fs::write(backup_dir.join("20260102T000000Z_prod.sql.gz"), b"two").unwrap();
    std::fs::write(backup_dir.join("20260103T000000Z_prod.sql.gz.partial"), b"wip").unwrap();

    let (_, listed) = send(&app, "GET", "/api/backups", None).await;
    let prod = listed["prod"].as_array().unwrap();
    assert_eq!(prod.len(), 2);
    // newest first
    assert_eq!(prod[0]["id"], 2);
    assert_eq!(prod[1]["id"], 1);

    let (status, _) = send(&app, "DELETE", "/api/backups/2", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(!backup_dir.join("20260102T000000Z_prod.sql.gz").exists());
    let (status, _) = send(&app, "DELETE", "/api/backups/2", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    std::fs::write(backup_dir.join("20260104T000000Z_prod.sql.gz"), b"four").unwrap();
    let (_, listed) = send(&app, "GET", "/api/backups", None).await;
    let ids: Vec<u64> = listed["prod"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![3, 1]);
}

// ── Config and schedules ────────────────────────────────────────

#[tokio::test]
async fn test_invalid_plan_is_rejected_before_persisting() {
    let tmp = tempfile::tempdir().unwrap();
    let config = test_config(tmp.path(), Some("k"), SLOW_DUMP);
    let plan_file = config.storage.plan_file();
    let app = app(config);

    let bad_cron = json!({
        "databases": [{"name": "prod"}],
        "schedules": [{"database": "prod", "cron": "60 * * * *"}]
    });
    let (status, body) = send(&app, "PUT", "/api/config", Some(bad_cron)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("minute"));
    assert!(!plan_file.exists());

    let unknown_db = json!({
        "databases": [],
        "schedules": [{"database": "prod", "cron": "* * * * *"}]
    });
    let (status, _) = send(&app, "PUT", "/api/config", Some(unknown_db)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!plan_file.exists());

    let (status, plan) = send(&app, "GET", "/api/config", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(plan, json!({"databases": [], "schedules": []}));
}

#[tokio::test]
async fn test_schedule_preview() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app(test_config(tmp.path(), Some("k"), SLOW_DUMP));

    let (_, ok) = send(&app, "POST", "/api/schedules/validate", Some(json!({"cron": "30 2 * * 1-5"}))).await;
    assert_eq!(ok["valid"], true);
    assert!(ok["description"].is_string());
    assert!(ok.get("error").is_none());

    let (_, bad) = send(&app, "POST", "/api/schedules/validate", Some(json!({"cron": "0 0 1 1 8-9"}))).await;
    assert_eq!(bad["valid"], false);
    assert!(bad["error"].as_str().unwrap().contains("day-of-week"));

    let (_, split) = send(&app, "POST", "/api/schedules/validate", Some(json!({"cron": "0\n3 * * *"}))).await;
    assert_eq!(split["valid"], false);
    assert!(split["error"].as_str().unwrap().contains("control character"));
}

// ── Vault states ────────────────────────────────────────────────

#[tokio::test]
async fn test_disabled_vault() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app(test_config(tmp.path(), None, SLOW_DUMP));

    let (status, _) = send(&app, "PUT", "/api/passwords/prod", Some(json!({"password": "x"}))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let (status, list) = send(&app, "GET", "/api/passwords", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list, json!({"enabled": false, "decryptionFailing": false, "names": []}));
}

#[tokio::test]
async fn test_wrong_secret_then_reset() {
    let tmp = tempfile::tempdir().unwrap();
    let first = app(test_config(tmp.path(), Some("right"), SLOW_DUMP));
    send(&first, "PUT", "/api/passwords/prod", Some(json!({"password": "s3cr3t"}))).await;

    let app = app(test_config(tmp.path(), Some("wrong"), SLOW_DUMP));
    let (_, list) = send(&app, "GET", "/api/passwords", None).await;
    assert_eq!(list["decryptionFailing"], true);
    assert_eq!(list["names"], json!([]));

    let (status, _) = send(&app, "GET", "/api/passwords/prod", None).await;
    assert_eq!(status, StatusCode::LOCKED);
    let (status, _) = send(&app, "PUT", "/api/passwords/dev", Some(json!({"password": "x"}))).await;
    assert_eq!(status, StatusCode::LOCKED);

    let (status, _) = send(&app, "POST", "/api/passwords/reset", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, "POST", "/api/passwords/reset", Some(json!({"confirm": true}))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, list) = send(&app, "GET", "/api/passwords", None).await;
    assert_eq!(list, json!({"enabled": true, "decryptionFailing": false, "names": []}));
    let (status, _) = send(&app, "PUT", "/api/passwords/dev", Some(json!({"password": "x"}))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_password_roundtrip_and_delete() {
    let tmp = tempfile::tempdir().unwrap();
    let app = app(test_config(tmp.path(), Some("k"), SLOW_DUMP));

    send(&app, "PUT", "/api/passwords/prod", Some(json!({"password": "s3cr3t"}))).await;
    let (status, body) = send(&app, "GET", "/api/passwords/prod", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"name": "prod", "password": "s3cr3t"}));

    let (status, _) = send(&app, "PUT", "/api/passwords/bad%20name", Some(json!({"password": "x"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "DELETE", "/api/passwords/prod", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "GET", "/api/passwords/prod", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
