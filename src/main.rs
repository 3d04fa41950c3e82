use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use helpdesk_mailer::config::Config;
use helpdesk_mailer::email::SmtpMailer;
use helpdesk_mailer::worker::DeliveryWorker;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let config = Config::from_env().expect("Failed to load configuration");

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(&config.log_level)
        }))
        .init();

    tracing::info!("Starting helpdesk mailer");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    tracing::info!("Migrations applied");

    let mailer = SmtpMailer::new(&config.smtp).expect("Failed to configure SMTP transport");
    tracing::info!(
        "SMTP configured: {}:{} (tls: {}, auth: {})",
        config.smtp.host,
        config.smtp.port,
        config.smtp.tls,
        config.smtp.credentials.is_some()
    );

    // Bind before the worker starts so a bad address cannot strand a pass.
    let listener = match &config.health_addr {
        Some(addr) => {
            let listener = tokio::net::TcpListener::bind(addr.as_str()).await?;
            tracing::info!("Health endpoints listening on {}", listener.local_addr()?);
            Some(listener)
        }
        None => None,
    };

    let worker = DeliveryWorker::new(pool.clone(), Arc::new(mailer), config.worker.clone()).start();

    let app = helpdesk_mailer::build_app(pool.clone(), config);
    let served = helpdesk_mailer::run_until_shutdown(listener, app, worker, shutdown_signal()).await;
    pool.close().await;
    served?;

    tracing::info!("Mailer stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, stopping mailer");
}
