//! Certificate intake backend
//!
//! - Multi-step certificate intake form: field schema, step navigation, course list,
//!   quota-dependent document link, submit-time validation
//! - Axum HTTP + WebSocket API driving one wizard per form session
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT               : u16 (default 3000)
//!   INTAKE_CONFIG_PATH : path to TOML config (schema revision, wizard options, submission)
//!   SUBMISSION_URL     : upload endpoint for accepted payloads (overrides TOML)
//!   LOG_LEVEL          : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT         : "pretty" (default) or "json"

mod telemetry;
mod util;
mod error;
mod schema;
mod record;
mod validation;
mod courses;
mod payload;
mod wizard;
mod config;
mod submission;
mod state;
mod protocol;
mod logic;
mod routes;

use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Shared application state (schema, wizard options, submission sink, sessions).
  let state = Arc::new(AppState::new());
  spawn_session_reaper(state.clone());

  // Build the HTTP router with routes, CORS and tracing layers.
  let app = build_router(state.clone());

  // Read port from env or default to 3000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "cert_intake_backend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  Ok(())
}

/// Sweep idle form sessions once a minute so abandoned ones do not wait for the next open.
fn spawn_session_reaper(state: Arc<AppState>) {
  tokio::spawn(async move {
    let mut tick = tokio::time::interval(Duration::from_secs(60));
    loop {
      tick.tick().await;
      let pruned = state.prune_idle().await;
      if pruned > 0 {
        debug!(target: "intake", pruned, "Idle form sessions dropped");
      }
    }
  });
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "cert_intake_backend", error = %e, "Failed to listen for ctrl-c");
    return;
  }
  info!(target: "cert_intake_backend", "Shutdown requested; open form sessions are dropped");
}
