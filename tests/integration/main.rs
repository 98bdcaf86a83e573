//! Integration tests for the bridge monitor HTTP API.
//!
//! Most tests run against the in-memory ledger. Tests marked `#[ignore]`
//! need a reachable MySQL database configured through the usual MYSQL_*
//! environment variables.
//! Run with: cargo test --test integration -- --ignored

use std::path::Path;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Duration, Local};
use pretty_assertions::assert_eq;
use tower::ServiceExt;

use bridge_monitor::api::{create_router, AppState};
use bridge_monitor::config::{Config, LedgerBackend};
use bridge_monitor::congestion::CongestionLevel;
use bridge_monitor::ledger::{MemoryLedger, MySqlLedger, TrafficLedger, TrafficObservation};

fn test_config(dir: &Path) -> Config {
    Config {
        ledger_backend: LedgerBackend::Memory,
        predictions_file_path: dir.join("results").join("predictions.json"),
        static_dir: dir.to_path_buf(),
        ..Config::default()
    }
}

fn app(config: &Config, ledger: Arc<dyn TrafficLedger>) -> Router {
    create_router(AppState::new(config, ledger), &config.static_dir)
}

fn write_snapshot(config: &Config, contents: &str) {
    let path = &config.predictions_file_path;
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let (status, bytes) = get(app, uri).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn observation_minutes_ago(minutes: i64, count: u32) -> TrafficObservation {
    TrafficObservation {
        timestamp: Local::now().naive_local() - Duration::minutes(minutes),
        current_count_on_bridge: count,
        congestion_level: CongestionLevel::Low,
        entrance_count: 0,
        exit_count: 0,
    }
}

#[tokio::test]
async fn status_derives_occupancy_from_seed() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    write_snapshot(
        &config,
        r#"[{"video_type": "entrance", "count": 5}, {"video_type": "exit", "count": 2}]"#,
    );
    let ledger = MemoryLedger::with_rows(vec![observation_minutes_ago(1, 10)]);

    let (status, body) = get_json(app(&config, Arc::new(ledger.clone())), "/api/status").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current_count_on_bridge"], 13);
    assert_eq!(body["congestion_level"], "medium");
    assert_eq!(body["congestion_level_text"], "中度拥挤");
    assert_eq!(body["entrance_count"], 5);
    assert_eq!(body["exit_count"], 2);
    assert_eq!(
        body["latest_entrance_image_path"],
        "/static/results/latest_entrance.jpg"
    );
    assert_eq!(body["latest_exit_image_path"], "/static/results/latest_exit.jpg");
    assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
    assert_eq!(ledger.len(), 2);
}

#[tokio::test]
async fn status_totals_are_zero_not_null_on_fresh_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    write_snapshot(&config, r#"[{"video_type": "side", "count": 3}]"#);

    let (status, body) = get_json(app(&config, Arc::new(MemoryLedger::new())), "/api/status").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current_count_on_bridge"], 0);
    assert_eq!(body["total_in_today"], 0);
    assert_eq!(body["total_out_today"], 0);
}

#[tokio::test]
async fn status_without_snapshot_is_404_and_ledger_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let ledger = MemoryLedger::with_rows(vec![observation_minutes_ago(1, 4)]);

    let (status, body) = get_json(app(&config, Arc::new(ledger.clone())), "/api/status").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, serde_json::json!({ "error": "Predictions data not available" }));
    assert_eq!(ledger.len(), 1);
}

#[tokio::test]
async fn status_with_corrupt_snapshot_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    write_snapshot(&config, "not json");
    let ledger = MemoryLedger::new();

    let (status, _) = get_json(app(&config, Arc::new(ledger.clone())), "/api/status").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(ledger.is_empty());
}

#[tokio::test]
async fn status_write_failure_is_500_with_description() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    write_snapshot(&config, r#"[{"video_type": "entrance", "count": 1}]"#);
    let ledger = MemoryLedger::new();
    ledger.set_fail_appends(true);

    let (status, body) = get_json(app(&config, Arc::new(ledger.clone())), "/api/status").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("An internal error occurred: "));
    assert_eq!(ledger.open_sessions(), 0);
}

#[tokio::test]
async fn history_returns_last_hour_ascending() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let ninety = observation_minutes_ago(90, 2);
    let thirty = observation_minutes_ago(30, 6);
    let expected_time = thirty.timestamp.format("%H:%M").to_string();
    let ledger = MemoryLedger::with_rows(vec![thirty, ninety]);

    let (status, body) = get_json(app(&config, Arc::new(ledger)), "/api/history").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        serde_json::json!({ "data_points": [{ "time": expected_time, "count": 6 }] })
    );
}

#[tokio::test]
async fn status_then_history_shows_new_observation() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    write_snapshot(&config, r#"[{"video_type": "entrance", "count": 30}]"#);
    let ledger: Arc<dyn TrafficLedger> = Arc::new(MemoryLedger::new());
    let router = app(&config, ledger);

    let (_, status_body) = get_json(router.clone(), "/api/status").await;
    assert_eq!(status_body["congestion_level"], "high");
    assert_eq!(status_body["congestion_level_text"], "严重拥挤");

    let (_, history_body) = get_json(router, "/api/history").await;
    let points = history_body["data_points"].as_array().unwrap();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0]["count"], 30);
}

#[tokio::test]
async fn static_images_are_served() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    std::fs::create_dir_all(dir.path().join("results")).unwrap();
    std::fs::write(dir.path().join("results").join("latest_entrance.jpg"), b"jpeg").unwrap();

    let (status, bytes) = get(
        app(&config, Arc::new(MemoryLedger::new())),
        "/static/results/latest_entrance.jpg",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, b"jpeg".to_vec());
}

/// Config for a live MySQL database, or `None` when none is configured.
fn mysql_config() -> Option<Config> {
    dotenvy::dotenv().ok();
    std::env::var("MYSQL_HOST").ok()?;

    let mut config = Config::load().ok()?;
    config.ledger_backend = LedgerBackend::Mysql;
    Some(config)
}

#[tokio::test]
#[ignore = "requires MYSQL_HOST"]
async fn mysql_append_round_trips_last_observation() {
    let config = match mysql_config() {
        Some(c) => c,
        None => {
            println!("Skipping: MYSQL_HOST not set");
            return;
        }
    };

    let ledger = MySqlLedger::from_config(&config);
    ledger.ensure_schema().await.unwrap();

    let observation = TrafficObservation {
        timestamp: Local::now().naive_local() + Duration::seconds(1),
        current_count_on_bridge: 17,
        congestion_level: CongestionLevel::Medium,
        entrance_count: 3,
        exit_count: 1,
    };

    let mut session = ledger.connect().await.unwrap();
    session.append(&observation).await.unwrap();
    let last = session.last_observation().await.unwrap().unwrap();
    assert_eq!(last.current_count_on_bridge, 17);
    assert_eq!(last.timestamp, observation.timestamp);

    let totals = session
        .daily_totals(observation.timestamp.date())
        .await
        .unwrap();
    assert!(totals.total_in >= 3);
    assert!(totals.total_out >= 1);
}

#[tokio::test]
#[ignore = "requires MYSQL_HOST"]
async fn mysql_history_excludes_old_rows() {
    let config = match mysql_config() {
        Some(c) => c,
        None => {
            println!("Skipping: MYSQL_HOST not set");
            return;
        }
    };

    let ledger = MySqlLedger::from_config(&config);
    ledger.ensure_schema().await.unwrap();

    let cutoff = Local::now().naive_local() - Duration::hours(1);
    let mut session = ledger.connect().await.unwrap();
    let points = session.history_since(cutoff).await.unwrap();

    assert!(points.iter().all(|p| p.timestamp > cutoff));
    assert!(points.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
}
