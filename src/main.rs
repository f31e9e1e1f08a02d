//! This file defines the skillscope binary entry point.

use skillscope::app;
use skillscope::app_state::AppState;
use skillscope::cli;
use skillscope::metrics;
use skillscope::server;
use skillscope::tracing;

use std::sync::Arc;

/// Application entry point
#[tokio::main]
async fn main() {
    let args = cli::parse();
    tracing::init_tracing(&args);
    metrics::register_metrics();
    app::init(&args);
    let state = Arc::new(AppState::new(&args).await);
    app::load_dataset(&state).await;
    let service = app::service(state);
    server::serve(&args, service).await;
    tracing::shutdown_tracing();
}
