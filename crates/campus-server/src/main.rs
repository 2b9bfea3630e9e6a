//! # campus-server
//!
//! HTTP front end of the campus Q&A forum.
//!
//! This binary provides:
//! - a JSON API (axum) over every forum operation: posting, replies,
//!   edits, deletes, votes, hearts and moderation
//! - an identity sync endpoint under `/admin` for the portal's user service
//!
//! The caller's identity arrives in the `X-User-Id` header, set by the
//! session layer in front of this service.

mod api;
mod config;
mod error;

use std::sync::{Arc, Mutex};

use campus_forum::Forum;
use campus_store::Database;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,campus_server=debug")),
        )
        .init();

    info!("Starting campus forum server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(
        instance = %config.instance_name,
        http_addr = %config.http_addr,
        admin_enabled = config.admin_token.is_some(),
        "Loaded configuration"
    );

    // -----------------------------------------------------------------------
    // 3. Open the database and apply startup overrides
    // -----------------------------------------------------------------------
    let db = match &config.database_path {
        Some(path) => Database::open_at(path)?,
        None => Database::new()?,
    };
    info!(path = ?db.path(), "Database ready");

    let forum = Forum::new(db);
    if let Some(chat_locked) = config.chat_locked {
        let mut settings = forum.settings()?;
        settings.chat_locked = chat_locked;
        forum.apply_settings(&settings)?;
    }

    let app_state = AppState {
        forum: Arc::new(Mutex::new(forum)),
        config: Arc::new(config.clone()),
    };

    // -----------------------------------------------------------------------
    // 4. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, config.http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
