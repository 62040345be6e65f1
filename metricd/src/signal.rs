/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use anyhow::Context;
use log::info;
use tokio_util::sync::CancellationToken;

pub(crate) fn register(cancel: CancellationToken) -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut quit =
            signal(SignalKind::terminate()).context("failed to register SIGTERM handler")?;
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("received SIGINT, start shutdown"),
                _ = quit.recv() => info!("received SIGTERM, start shutdown"),
            }
            cancel.cancel();
        });
    }
    #[cfg(not(unix))]
    {
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("received ctrl-c, start shutdown");
            cancel.cancel();
        });
    }
    Ok(())
}
