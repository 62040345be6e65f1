/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use anyhow::Context;
use log::{debug, error, info};

use metricd::config::AppConfig;

fn main() -> anyhow::Result<()> {
    let proc_args =
        metricd::opts::parse_clap().context("failed to parse command line options")?;

    // set up process logger early, only proc args is used inside
    metricd::logging::setup(proc_args.verbose_level).context("failed to setup logger")?;

    let config = metricd::config::load(&proc_args.config_file).context(format!(
        "failed to load config file {}",
        proc_args.config_file.display()
    ))?;
    debug!("loaded config from {}", proc_args.config_file.display());

    if proc_args.test_config {
        info!("the format of the config file is ok");
        return Ok(());
    }

    match tokio_run(config) {
        Ok(_) => Ok(()),
        Err(e) => {
            error!("{e:?}");
            Err(e)
        }
    }
}

fn tokio_run(config: AppConfig) -> anyhow::Result<()> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;
    rt.block_on(metricd::run(config))
}
