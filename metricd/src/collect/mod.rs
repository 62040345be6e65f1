/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::agent::CollectorKind;
use crate::types::{CounterEntry, GaugeEntry};

mod poll;
pub(crate) use poll::PollCollector;

mod proc;
pub(crate) use proc::ProcCollector;

mod pool;
pub(crate) use pool::CollectorPool;

/// One collection round's worth of measurements from a single source.
/// Counter entries carry deltas to accumulate, gauge entries carry samples
/// to store as-is.
#[derive(Debug, Default)]
pub(crate) struct PartialSnapshot {
    pub(crate) counters: Vec<CounterEntry>,
    pub(crate) gauges: Vec<GaugeEntry>,
}

#[async_trait]
pub(crate) trait Collector {
    fn name(&self) -> &'static str;

    /// Called once before the first collection round. A failure here is
    /// fatal to startup.
    async fn init(&self) -> anyhow::Result<()>;

    /// Invoked on every poll round, possibly concurrently with other
    /// collectors but never concurrently with itself.
    async fn collect(&self) -> anyhow::Result<PartialSnapshot>;
}

pub(crate) type ArcCollector = Arc<dyn Collector + Send + Sync>;

pub(crate) fn build_all(kinds: &[CollectorKind]) -> anyhow::Result<Vec<ArcCollector>> {
    let mut collectors = Vec::with_capacity(kinds.len());
    for kind in kinds {
        let collector = match kind {
            CollectorKind::Proc => ProcCollector::prepare()?,
            CollectorKind::Poll => PollCollector::prepare()?,
        };
        collectors.push(collector);
    }
    Ok(collectors)
}
