//! College placement management backend.
//!
//! Students register, complete a profile and apply to companies; companies
//! shortlist applicants, schedule interviews and send offers; placement staff
//! read scoped statistics over all of it.
//!
//! - `auth` bearer tokens, password hashing and role guards
//! - `eligibility` which companies a student may see and apply to
//! - `reports` statistics scope and department breakdown shapes
//! - `db` every SQL statement, one connection per request
//! - `routes` the axum HTTP surface

pub mod auth;
pub mod config;
pub mod db;
pub mod eligibility;
pub mod error;
pub mod models;
pub mod reports;
pub mod routes;
pub mod state;
pub mod uploads;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};
use tracing::{info, warn};

use config::Config;
use db::Database;
use state::AppState;

/// Prepare storage and run the HTTP API until Ctrl+C or SIGTERM.
pub async fn serve(config: Config) -> Result<()> {
    let db = Database::open_at(&config.database_path)?;
    db.init()?;
    drop(db);

    std::fs::create_dir_all(&config.upload_dir).with_context(|| {
        format!("Failed to create upload dir {}", config.upload_dir.display())
    })?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(
        db = %config.database_path.display(),
        uploads = %config.upload_dir.display(),
        dept_match = ?config.dept_match,
        "starting placement API"
    );

    let app = routes::router(AppState::new(config)?);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                warn!(error = %e, "failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
