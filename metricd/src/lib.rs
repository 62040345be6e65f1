/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

pub mod config;
pub mod logging;
pub mod opts;

mod agent;
mod collect;
mod export;
mod retry;
mod signal;
mod store;
mod types;

use anyhow::Context;
use log::info;
use tokio_util::sync::CancellationToken;

use agent::Agent;
use config::AppConfig;

/// Run the agent until a quit signal arrives, then shut down cooperatively
/// and close the store.
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let store = store::build(&config.store)
        .await
        .context("failed to open store")?;
    let exporter = export::build(&config.exporter);
    let collectors =
        collect::build_all(&config.agent.collectors).context("failed to build collectors")?;

    let agent = Agent::new(config.agent, store.clone(), collectors, exporter);
    agent.init_collectors().await?;

    let cancel = CancellationToken::new();
    signal::register(cancel.clone()).context("failed to setup signal handler")?;
    let handles = agent.spawn(&cancel);
    info!("agent started");

    handles.wait().await;
    store.close().await.context("failed to close store")?;
    info!("agent stopped");
    Ok(())
}
