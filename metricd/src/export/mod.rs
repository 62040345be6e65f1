/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::exporter::ExporterConfig;
use crate::types::{MetricName, Snapshot};

mod console;
pub(crate) use console::ConsoleExporter;

mod discard;
pub(crate) use discard::DiscardExporter;

mod memory;
pub(crate) use memory::MemoryExporter;

/// Delivery contract for pushing metric entries to a sink.
#[async_trait]
pub(crate) trait Exporter {
    fn name(&self) -> &'static str;

    async fn push_counter(&self, name: &MetricName, value: i64) -> anyhow::Result<()>;

    async fn push_gauge(&self, name: &MetricName, value: f64) -> anyhow::Result<()>;

    /// Bulk push. Stops at the first failure, callers that want per-entry
    /// isolation push entries one by one instead.
    async fn push_snapshot(&self, snapshot: &Snapshot) -> anyhow::Result<()> {
        for entry in &snapshot.counters {
            self.push_counter(&entry.name, entry.value).await?;
        }
        for entry in &snapshot.gauges {
            self.push_gauge(&entry.name, entry.value).await?;
        }
        Ok(())
    }
}

pub(crate) type ArcExporter = Arc<dyn Exporter + Send + Sync>;

pub(crate) fn build(config: &ExporterConfig) -> ArcExporter {
    match config {
        ExporterConfig::Console => Arc::new(ConsoleExporter::default()),
        ExporterConfig::Discard => Arc::new(DiscardExporter::default()),
        ExporterConfig::Memory { store_count } => Arc::new(MemoryExporter::new(*store_count)),
    }
}
