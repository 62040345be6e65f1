/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use anyhow::anyhow;
use chrono::Local;
use log::{LevelFilter, Log, Metadata, Record};

struct StdLogger {}

impl Log for StdLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        eprintln!(
            "{} {} {}",
            Local::now().format("%Y-%m-%dT%H:%M:%S%.6f"),
            record.level(),
            record.args()
        );
    }

    fn flush(&self) {}
}

pub fn setup(verbose_level: u8) -> anyhow::Result<()> {
    let max_level = match verbose_level {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    log::set_boxed_logger(Box::new(StdLogger {}))
        .map_err(|e| anyhow!("failed to set process logger: {e}"))?;
    log::set_max_level(max_level);
    Ok(())
}
