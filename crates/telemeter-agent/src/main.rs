//! telemeter agent
//!
//! - Loads `telemeter.yaml` (or `$TELEMETER_CONFIG`)
//! - Starts tracing (Jaeger reporter over UDP) when enabled
//! - Serves `/metrics` when metrics are enabled
//! - Drains buffered spans on Ctrl-C

use std::time::Duration;

use tracing_subscriber::{fmt, EnvFilter};

use telemeter_agent::{app_state::AgentState, config, router};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let path = config::config_path();
    let cfg = match config::load_from_file(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("error: {e}");
            std::process::exit(1);
        }
    };

    let mut state = AgentState::new(cfg);
    if let Err(e) = state.init_tracing().await {
        // Tracing stays off; metrics keep working.
        tracing::error!("error: {e}");
    }

    if state.metrics().is_some() {
        let bind = state.cfg().metrics.bind_address();
        let listener = match router::bind_listener(&bind).await {
            Ok(l) => l,
            Err(e) => {
                tracing::error!("error: {e}");
                state.shutdown(SHUTDOWN_TIMEOUT).await;
                std::process::exit(1);
            }
        };

        let app = router::build_router(state.clone());
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await
        {
            tracing::error!("error: metrics server failed: {e}");
        }
    } else {
        let _ = tokio::signal::ctrl_c().await;
    }

    state.shutdown(SHUTDOWN_TIMEOUT).await;
}
