mod error;
mod handlers;
mod pages;
mod state;

use anyhow::{Context, Result};
use tracing::info;

use triage_core::{logging, Config};

use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Refuse to start on incomplete configuration rather than faulting on
    // the first request that needs the missing variable.
    let config = Config::from_env().context("invalid configuration")?;

    let _guard = logging::init_logging()?;

    let state = AppState::from_config(&config);
    let router = handlers::build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "listening");

    axum::serve(listener, router).await?;
    Ok(())
}
