/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::time::Duration;

use anyhow::Context;
use log::{debug, warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::collect::{ArcCollector, CollectorPool, PartialSnapshot};
use crate::config::agent::AgentConfig;
use crate::export::ArcExporter;
use crate::store::ArcStore;

/// Drives both directions of the pipeline: the collection loop polls the
/// registered collectors through a worker pool and merges their output into
/// the store, the report loop snapshots the store and pushes every entry to
/// the exporter. The two loops run on independent schedules and stop on the
/// shared cancellation token.
pub(crate) struct Agent {
    config: AgentConfig,
    store: ArcStore,
    collectors: Vec<ArcCollector>,
    exporter: ArcExporter,
}

pub(crate) struct AgentHandles {
    report: JoinHandle<()>,
    collect: JoinHandle<()>,
}

impl AgentHandles {
    pub(crate) async fn wait(self) {
        let _ = self.report.await;
        let _ = self.collect.await;
    }
}

impl Agent {
    pub(crate) fn new(
        config: AgentConfig,
        store: ArcStore,
        collectors: Vec<ArcCollector>,
        exporter: ArcExporter,
    ) -> Self {
        Agent {
            config,
            store,
            collectors,
            exporter,
        }
    }

    pub(crate) async fn init_collectors(&self) -> anyhow::Result<()> {
        for collector in &self.collectors {
            collector.init().await.context(format!(
                "failed to init collector {}",
                collector.name()
            ))?;
        }
        Ok(())
    }

    pub(crate) fn spawn(self, cancel: &CancellationToken) -> AgentHandles {
        let report = ReportLoop {
            store: self.store.clone(),
            exporter: self.exporter,
            interval: self.config.report_interval,
        };

        let pool = CollectorPool::spawn_new(self.config.workers);
        let collect = CollectLoop {
            store: self.store,
            collectors: self.collectors,
            pool,
            interval: self.config.poll_interval,
        };

        AgentHandles {
            report: tokio::spawn(report.into_running(cancel.clone())),
            collect: tokio::spawn(collect.into_running(cancel.clone())),
        }
    }
}

struct ReportLoop {
    store: ArcStore,
    exporter: ArcExporter,
    interval: Duration,
}

impl ReportLoop {
    async fn into_running(self, cancel: CancellationToken) {
        let start = tokio::time::Instant::now() + self.interval;
        let mut interval = tokio::time::interval_at(start, self.interval);
        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,
                _ = interval.tick() => self.report_round().await,
            }
        }
        debug!("report loop stopped");
    }

    /// Push the current snapshot entry by entry. A failed push only costs
    /// this round's delivery of that entry, the entry stays in the store
    /// and goes out with the next round.
    async fn report_round(&self) {
        let snapshot = match self.store.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("failed to take snapshot: {e:?}");
                return;
            }
        };
        if snapshot.is_empty() {
            return;
        }

        for entry in &snapshot.counters {
            if let Err(e) = self.exporter.push_counter(&entry.name, entry.value).await {
                warn!(
                    "exporter {}: failed to push counter {}: {e:?}",
                    self.exporter.name(),
                    entry.name
                );
            }
        }
        for entry in &snapshot.gauges {
            if let Err(e) = self.exporter.push_gauge(&entry.name, entry.value).await {
                warn!(
                    "exporter {}: failed to push gauge {}: {e:?}",
                    self.exporter.name(),
                    entry.name
                );
            }
        }
    }
}

struct CollectLoop {
    store: ArcStore,
    collectors: Vec<ArcCollector>,
    pool: CollectorPool,
    interval: Duration,
}

impl CollectLoop {
    async fn into_running(mut self, cancel: CancellationToken) {
        let start = tokio::time::Instant::now() + self.interval;
        let mut interval = tokio::time::interval_at(start, self.interval);
        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,
                _ = interval.tick() => self.poll_round(&cancel).await,
            }
        }
        self.pool.shutdown().await;
        debug!("collect loop stopped");
    }

    async fn poll_round(&mut self, cancel: &CancellationToken) {
        let mut pending = 0usize;
        for collector in &self.collectors {
            if self.pool.submit(collector.clone()).await {
                pending += 1;
            } else {
                warn!("collect job queue closed");
                break;
            }
        }

        while pending > 0 {
            let result = tokio::select! {
                biased;

                _ = cancel.cancelled() => break,
                r = self.pool.next_result() => r,
            };
            let Some((name, result)) = result else {
                break;
            };
            pending -= 1;
            match result {
                Ok(partial) => self.merge(name, partial).await,
                Err(e) => warn!("collector {name} failed: {e:?}"),
            }
        }
    }

    /// Merging stays single-threaded, the store's own locking is all the
    /// synchronization the pipeline needs.
    async fn merge(&self, collector: &str, partial: PartialSnapshot) {
        for entry in partial.counters {
            if let Err(e) = self.store.update_counter(&entry.name, entry.value).await {
                warn!(
                    "collector {collector}: failed to update counter {}: {e:?}",
                    entry.name
                );
            }
        }
        for entry in partial.gauges {
            if let Err(e) = self.store.update_gauge(&entry.name, entry.value).await {
                warn!(
                    "collector {collector}: failed to update gauge {}: {e:?}",
                    entry.name
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::sync::Arc;

    use anyhow::anyhow;
    use async_trait::async_trait;

    use super::*;
    use crate::collect::Collector;
    use crate::config::agent::CollectorKind;
    use crate::export::MemoryExporter;
    use crate::store::MemoryStore;
    use crate::types::MetricName;

    struct FailingCollector {}

    #[async_trait]
    impl Collector for FailingCollector {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn init(&self) -> anyhow::Result<()> {
            Ok(())
        }

        async fn collect(&self) -> anyhow::Result<PartialSnapshot> {
            Err(anyhow!("always fails"))
        }
    }

    fn test_config() -> AgentConfig {
        AgentConfig {
            poll_interval: Duration::from_millis(30),
            report_interval: Duration::from_millis(50),
            workers: 2,
            collectors: vec![CollectorKind::Poll],
        }
    }

    #[tokio::test]
    async fn collects_and_reports() {
        let store: ArcStore = Arc::new(MemoryStore::default());
        let exporter = Arc::new(MemoryExporter::new(64));
        let collectors = crate::collect::build_all(&[CollectorKind::Poll]).unwrap();

        let agent = Agent::new(
            test_config(),
            store.clone(),
            collectors,
            exporter.clone(),
        );
        agent.init_collectors().await.unwrap();

        let cancel = CancellationToken::new();
        let handles = agent.spawn(&cancel);

        tokio::time::sleep(Duration::from_millis(200)).await;
        cancel.cancel();
        handles.wait().await;

        let poll_count = MetricName::from_str("agent.poll_count").unwrap();
        let count = store.get_counter(&poll_count).await.unwrap().unwrap();
        assert!(count >= 1);

        let pushed = exporter.counters();
        assert!(
            pushed
                .iter()
                .any(|v| v.name.as_str() == "agent.poll_count" && v.value >= 1)
        );
    }

    #[tokio::test]
    async fn collector_failure_is_isolated() {
        let store: ArcStore = Arc::new(MemoryStore::default());
        let exporter = Arc::new(MemoryExporter::new(64));
        let mut collectors = crate::collect::build_all(&[CollectorKind::Poll]).unwrap();
        collectors.push(Arc::new(FailingCollector {}));

        let agent = Agent::new(test_config(), store.clone(), collectors, exporter);
        let cancel = CancellationToken::new();
        let handles = agent.spawn(&cancel);

        tokio::time::sleep(Duration::from_millis(120)).await;
        cancel.cancel();
        handles.wait().await;

        // the failing collector never stopped the healthy one
        let poll_count = MetricName::from_str("agent.poll_count").unwrap();
        assert!(store.get_counter(&poll_count).await.unwrap().unwrap() >= 1);
    }

    #[tokio::test]
    async fn stale_entries_reported_again() {
        let store: ArcStore = Arc::new(MemoryStore::default());
        store
            .update_counter(&MetricName::from_str("requests").unwrap(), 8)
            .await
            .unwrap();
        let exporter = Arc::new(MemoryExporter::new(64));

        let agent = Agent::new(test_config(), store, Vec::new(), exporter.clone());
        let cancel = CancellationToken::new();
        let handles = agent.spawn(&cancel);

        tokio::time::sleep(Duration::from_millis(180)).await;
        cancel.cancel();
        handles.wait().await;

        // at least two report rounds shipped the same counter entry
        let pushed: Vec<_> = exporter
            .counters()
            .into_iter()
            .filter(|v| v.name.as_str() == "requests")
            .collect();
        assert!(pushed.len() >= 2);
        assert!(pushed.iter().all(|v| v.value == 8));
    }
}
