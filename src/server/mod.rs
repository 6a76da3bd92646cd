//! HTTP server module for pfxsync
//!
//! Hosts both reconciliation triggers:
//!
//! - `handlers` - the on-demand trigger, `GET /update?asn=ASxxxxx`, plus
//!   `/health` and the not-found fallback
//! - `scheduler` - the scheduled trigger, reconciling the configured dataset
//!   on a fixed interval
//!
//! Both go through the same [`SyncRunner`], so they share its run locks: a
//! request for a dataset the scheduler is currently reconciling gets a 409.
//!
//! # Usage
//!
//! ```rust,ignore
//! use pfxsync::server::{start_server, ServerConfig};
//! use pfxsync::{PfxsyncConfig, SyncRunner};
//!
//! let config = PfxsyncConfig::new(&None)?;
//! let server_config = ServerConfig::from_config(&config);
//! start_server(SyncRunner::new(config), server_config).await?;
//! ```

pub mod handlers;
pub mod scheduler;

pub use scheduler::Scheduler;

use crate::config::PfxsyncConfig;
use crate::reconcile::SyncRunner;
use axum::{routing::any, routing::get, Router as AxumRouter};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

// =============================================================================
// Server Configuration
// =============================================================================

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub address: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 8787,
        }
    }
}

impl ServerConfig {
    /// Create a new server configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Take address and port from the application configuration
    pub fn from_config(config: &PfxsyncConfig) -> Self {
        Self {
            address: config.listen_address.clone(),
            port: config.listen_port,
        }
    }

    /// Set the address
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    /// Set the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Get the full bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

// =============================================================================
// Server State
// =============================================================================

/// Shared server state
#[derive(Clone, Debug)]
pub struct ServerState {
    /// Runner shared by the request handler and the scheduler
    pub runner: SyncRunner,
}

impl ServerState {
    pub fn new(runner: SyncRunner) -> Self {
        Self { runner }
    }
}

// =============================================================================
// Axum Router Creation
// =============================================================================

/// Create the Axum router for the HTTP trigger
pub fn create_axum_router(state: ServerState) -> AxumRouter {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    AxumRouter::new()
        .route("/update", any(handlers::update_handler))
        .route("/health", get(handlers::health_handler))
        .fallback(handlers::not_found_handler)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Server Startup
// =============================================================================

/// Start the HTTP server, and the scheduler when an interval is configured
pub async fn start_server(runner: SyncRunner, config: ServerConfig) -> anyhow::Result<()> {
    match runner.config().schedule_interval() {
        Some(interval) => {
            let scheduler = Scheduler::new(runner.clone(), runner.config().asn.clone(), interval);
            tokio::spawn(scheduler.start());
        }
        None => info!("[CRON] Scheduled updates are disabled"),
    }

    let app = create_axum_router(ServerState::new(runner));

    let bind_address = config.bind_address();
    info!("Starting HTTP server on {}", bind_address);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
