//! Admin status API.
//!
//! # Responsibilities
//! - Expose the snapshot store to presentation collaborators
//! - Guard every route with the configured bearer key
//!
//! # Routes
//! ```text
//! GET /admin/status               version and health counts
//! GET /admin/environments         every tracked snapshot
//! GET /admin/environments/{id}    one snapshot, 404 when untracked
//! ```

pub mod auth;
pub mod handlers;

use arc_swap::ArcSwap;
use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::config::MonitorConfig;
use crate::health::EnvironmentHealthState;
use self::auth::admin_auth_middleware;
use self::handlers::*;

/// Shared state injected into admin handlers.
#[derive(Clone)]
pub struct AppState {
    pub health: Arc<EnvironmentHealthState>,
    pub config: Arc<ArcSwap<MonitorConfig>>,
}

pub fn setup_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/environments", get(list_environments))
        .route("/admin/environments/{*id}", get(get_environment))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the admin API until the shutdown signal fires.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    mut shutdown: broadcast::Receiver<()>,
) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "Admin API listening");

    axum::serve(listener, setup_admin_router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await?;

    tracing::info!("Admin API stopped");
    Ok(())
}
