//! `layover-fuel` server binary
//!
//! Reads configuration from the environment (see [`Config::from_env`]) and
//! serves the assistant API. Log verbosity follows `RUST_LOG`, default `info`.

use anyhow::Context;
use layover_fuel::{Config, Orchestrator, server};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env().context("failed to load configuration")?;
    log::debug!("Loaded {:?}", config);

    let orchestrator =
        Orchestrator::from_config(&config).context("failed to build provider clients")?;

    server::serve(config.port, Arc::new(orchestrator))
        .await
        .context("server stopped")?;
    Ok(())
}
