//! HTTP server exposing the restricted container API.
//!
//! | Method & path | Operation |
//! |---|---|
//! | `GET /` | service name, version and instance id |
//! | `GET /health` | runtime reachability |
//! | `GET /containers?all=` | list managed containers |
//! | `POST /containers/create` | validate and create |
//! | `GET /containers/:id` | inspect |
//! | `DELETE /containers/:id?force=&v=` | remove |
//! | `POST /containers/:id/start` | start |
//! | `POST /containers/:id/stop?timeout=` | stop |
//! | `POST /containers/:id/restart?timeout=` | restart |
//! | `GET /containers/:id/logs?stdout=&stderr=&tail=&since=&until=` | logs |
//! | `GET /containers/:id/stats` | one stats sample |
//!
//! Errors are answered as `{"error": <code>, "detail": <message>}`. Every
//! route sits behind the CORS layer built by [`cors_layer`].

mod cors;
mod error;
mod handler;

pub use cors::{ANY_ORIGIN, cors_layer};
pub use error::{ApiError, ErrorBody};
pub use handler::{API_NAME, ApiInfo, AppState, HealthStatus, MessageResponse};

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::error::ServerError;
use crate::manager::ContainerManager;

/// Builds the application router.
pub fn router(manager: Arc<ContainerManager>, cors: CorsLayer) -> Router {
    Router::new()
        .route("/", get(handler::root))
        .route("/health", get(handler::health))
        .route("/containers", get(handler::list_containers))
        .route("/containers/create", post(handler::create_container))
        .route(
            "/containers/:id",
            get(handler::inspect_container).delete(handler::remove_container),
        )
        .route("/containers/:id/start", post(handler::start_container))
        .route("/containers/:id/stop", post(handler::stop_container))
        .route("/containers/:id/restart", post(handler::restart_container))
        .route("/containers/:id/logs", get(handler::container_logs))
        .route("/containers/:id/stats", get(handler::container_stats))
        .with_state(AppState { manager })
        .layer(cors)
}

/// Serves the API on `bind` until Ctrl-C or SIGTERM.
///
/// # Errors
///
/// Returns error if the socket cannot be bound or serving fails.
pub async fn run(
    bind: SocketAddr,
    manager: Arc<ContainerManager>,
    cors: CorsLayer,
) -> crate::error::Result<()> {
    info!(instance_id = %manager.instance_id(), "Starting Guarded Docker API server");

    let listener = TcpListener::bind(bind)
        .await
        .map_err(|source| ServerError::Bind {
            address: bind.to_string(),
            source,
        })?;
    info!(address = %bind, "Listening");

    axum::serve(listener, router(manager, cors))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Serve)?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("Shutdown signal received");
}
