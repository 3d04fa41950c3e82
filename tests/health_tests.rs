mod common;

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use helpdesk_mailer::outbox::Outbox;
use helpdesk_mailer::worker::DeliveryWorker;

use common::{StubMode, StubTransport};

async fn get(app: axum::Router, path: &str) -> (StatusCode, Vec<u8>) {
    let resp = app
        .oneshot(Request::get(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, bytes.to_vec())
}

#[tokio::test]
async fn health_returns_ok() {
    let test_db = common::spawn_db().await;
    let app = helpdesk_mailer::build_app(test_db.pool.clone(), common::test_config(&test_db.url));

    let (status, body) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");

    common::cleanup(test_db).await;
}

#[tokio::test]
async fn ready_reports_database_state() {
    let test_db = common::spawn_db().await;
    let app = helpdesk_mailer::build_app(test_db.pool.clone(), common::test_config(&test_db.url));

    let (status, body) = get(app.clone(), "/ready").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ready");
    assert_eq!(json["database"], "connected");

    test_db.pool.close().await;

    let (status, body) = get(app, "/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "not_ready");
    assert!(json["error"].is_string());

    common::cleanup(test_db).await;
}

#[tokio::test]
async fn outbox_stats_counts_pending_rows() {
    let test_db = common::spawn_db().await;
    let outbox = Outbox::new(test_db.pool.clone(), "http://localhost:5173");
    outbox
        .queue_password_reset("user@example.com", "token123")
        .await
        .unwrap();
    outbox
        .queue_status_changed("user@example.com", "VPN down", "OPEN", "IN_PROGRESS")
        .await
        .unwrap();

    let app = helpdesk_mailer::build_app(test_db.pool.clone(), common::test_config(&test_db.url));
    let (status, body) = get(app, "/outbox/stats").await;
    assert_eq!(status, StatusCode::OK);

    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["pending"], 2);
    assert_eq!(json["sent"], 0);
    assert_eq!(json["exhausted"], 0);

    common::cleanup(test_db).await;
}

#[tokio::test]
async fn shutdown_stops_worker_after_serving() {
    let test_db = common::spawn_db().await;
    let transport = StubTransport::new(StubMode::Succeed);

    let worker = DeliveryWorker::new(test_db.pool.clone(), transport.clone(), common::test_settings());
    let wake = worker.wake_signal();
    let handle = worker.start();

    let listener = tokio::net::TcpListener::bind("localhost:0").await.unwrap();
    let app = helpdesk_mailer::build_app(test_db.pool.clone(), common::test_config(&test_db.url));
    let shutdown = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
    };

    helpdesk_mailer::run_until_shutdown(Some(listener), app, handle, shutdown)
        .await
        .unwrap();

    // The worker is gone: a woken enqueue is not delivered.
    Outbox::new(test_db.pool.clone(), "http://localhost:5173")
        .with_wake_signal(wake)
        .enqueue("user@example.com", "Hi", "Body")
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(transport.call_count(), 0);

    common::cleanup(test_db).await;
}
