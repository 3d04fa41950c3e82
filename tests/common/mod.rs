use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use helpdesk_mailer::config::{Config, SmtpConfig, TlsMode, WorkerSettings};
use helpdesk_mailer::email::{MailTransport, OutgoingEmail};
use helpdesk_mailer::error::SendError;

/// A dedicated throwaway database with migrations applied.
pub struct TestDb {
    pub pool: PgPool,
    pub db_name: String,
    pub url: String,
}

fn admin_url(base_url: &str) -> String {
    base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.to_string())
}

/// Create a fresh temporary database.
pub async fn spawn_db() -> TestDb {
    let _ = dotenvy::dotenv();

    let base_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");

    let db_name = format!("mailer_test_{}", Uuid::now_v7().to_string().replace('-', ""));

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url(&base_url))
        .await
        .expect("Failed to connect to postgres for test DB creation");

    sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");

    admin_pool.close().await;

    let test_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/{db_name}"))
        .unwrap_or_else(|| base_url.clone());

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&test_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations on test database");

    TestDb {
        pool,
        db_name,
        url: test_url,
    }
}

/// Drop the test database after tests complete.
pub async fn cleanup(db: TestDb) {
    db.pool.close().await;

    let base_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for tests");

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url(&base_url))
        .await
        .expect("Failed to connect for cleanup");

    let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS \"{}\" WITH (FORCE)", db.db_name))
        .execute(&admin_pool)
        .await;

    admin_pool.close().await;
}

#[allow(dead_code)]
pub fn test_config(database_url: &str) -> Config {
    Config {
        database_url: database_url.to_string(),
        smtp: SmtpConfig {
            host: "localhost".to_string(),
            port: 1025,
            credentials: None,
            from: "noreply@helpdesk.local".to_string(),
            tls: TlsMode::None,
        },
        worker: test_settings(),
        frontend_base_url: "http://localhost:5173".to_string(),
        staff_notify_email: None,
        health_addr: None,
        log_level: "warn".to_string(),
    }
}

#[allow(dead_code)]
pub fn test_settings() -> WorkerSettings {
    WorkerSettings {
        poll_interval: Duration::from_secs(60),
        batch_size: 10,
        max_attempts: 5,
        send_timeout: Duration::from_secs(5),
        max_error_len: 1000,
    }
}

#[allow(dead_code)]
#[derive(Debug, Clone, Copy)]
pub enum StubMode {
    Succeed,
    Fail,
    Hang,
}

/// Transport double that records every send it is asked to perform.
#[allow(dead_code)]
pub struct StubTransport {
    mode: StubMode,
    error: String,
    calls: Mutex<Vec<OutgoingEmail>>,
}

#[allow(dead_code)]
impl StubTransport {
    pub fn new(mode: StubMode) -> Arc<Self> {
        Self::failing_with(mode, "connection refused")
    }

    pub fn failing_with(mode: StubMode, error: &str) -> Arc<Self> {
        Arc::new(Self {
            mode,
            error: error.to_string(),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<OutgoingEmail> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl MailTransport for StubTransport {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), SendError> {
        self.calls.lock().unwrap().push(email.clone());
        match self.mode {
            StubMode::Succeed => Ok(()),
            StubMode::Fail => Err(SendError::from(self.error.clone())),
            StubMode::Hang => std::future::pending().await,
        }
    }
}
