pub mod config;
pub mod error;
pub mod state;
pub mod db;
pub mod models;
pub mod routes;
pub mod email;
pub mod outbox;
pub mod worker;

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::state::{AppState, SharedState};
use crate::worker::WorkerHandle;

/// Operator-facing health surface. Only served when `MAILER_HEALTH_ADDR` is set.
pub fn build_app(pool: PgPool, config: Config) -> Router {
    let state: SharedState = Arc::new(AppState { pool, config });

    routes::health_routes()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the health surface (if a listener is given) until `shutdown`
/// resolves, then stop the worker. The worker is stopped on every exit path,
/// including a server error.
pub async fn run_until_shutdown<F>(
    listener: Option<TcpListener>,
    app: Router,
    worker: WorkerHandle,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let served = match listener {
        Some(listener) => axum::serve(listener, app).with_graceful_shutdown(shutdown).await,
        None => {
            shutdown.await;
            Ok(())
        }
    };

    worker.stop().await;

    if let Err(e) = &served {
        tracing::error!("Health server failed: {e}");
    }
    served
}
