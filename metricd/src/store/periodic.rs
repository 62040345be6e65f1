/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use log::{debug, warn};
use tokio::fs::File;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use super::{MemoryStore, StatsStore, file};
use crate::config::store::FileStoreConfig;
use crate::types::{MetricName, Snapshot};

struct FlushShared {
    inner: MemoryStore,
    file: Mutex<Option<File>>,
}

impl FlushShared {
    async fn flush(&self) -> anyhow::Result<()> {
        let mut guard = self.file.lock().await;
        let Some(handle) = guard.as_mut() else {
            // closed under us, nothing left to persist
            return Ok(());
        };
        let snapshot = self.inner.make_snapshot();
        file::rewrite(handle, &snapshot).await
    }
}

struct FlushTimer {
    shared: Arc<FlushShared>,
    period: Duration,
    cancel: CancellationToken,
}

impl FlushTimer {
    async fn into_running(self) {
        let start = tokio::time::Instant::now() + self.period;
        let mut interval = tokio::time::interval_at(start, self.period);
        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => break,
                _ = interval.tick() => {
                    if let Err(e) = self.shared.flush().await {
                        warn!("periodic snapshot flush failed: {e:?}");
                    }
                }
            }
        }
        debug!("flush worker stopped");
    }
}

/// File backend with bounded staleness.
///
/// Updates only touch the in-memory maps, a background worker rewrites the
/// snapshot file once per flush interval. `close()` stops the worker at its
/// next wake-up and does NOT force a final flush, losing at most one
/// interval of updates on shutdown is this backend's contract.
pub(crate) struct PeriodicFileStore {
    shared: Arc<FlushShared>,
    cancel: CancellationToken,
}

impl PeriodicFileStore {
    pub(crate) async fn open(config: &FileStoreConfig) -> anyhow::Result<Self> {
        let period = config
            .flush_interval
            .ok_or_else(|| anyhow!("no flush interval set"))?;
        if period.is_zero() {
            return Err(anyhow!(
                "zero flush interval is not allowed, use a write-through store instead"
            ));
        }

        let mut handle = file::open_backing_file(config).await?;
        let inner = MemoryStore::default();
        if config.restore {
            file::restore_into(&mut handle, &inner)
                .await
                .context(format!(
                    "failed to restore from {}",
                    config.path.display()
                ))?;
        }

        let shared = Arc::new(FlushShared {
            inner,
            file: Mutex::new(Some(handle)),
        });
        let cancel = CancellationToken::new();

        let timer = FlushTimer {
            shared: shared.clone(),
            period,
            cancel: cancel.clone(),
        };
        tokio::spawn(timer.into_running());

        Ok(PeriodicFileStore { shared, cancel })
    }

    fn check_open(&self) -> anyhow::Result<()> {
        if self.cancel.is_cancelled() {
            Err(anyhow!("store is closed"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl StatsStore for PeriodicFileStore {
    async fn get_counter(&self, name: &MetricName) -> anyhow::Result<Option<i64>> {
        Ok(self.shared.inner.counter_value(name))
    }

    async fn get_gauge(&self, name: &MetricName) -> anyhow::Result<Option<f64>> {
        Ok(self.shared.inner.gauge_value(name))
    }

    async fn update_counter(&self, name: &MetricName, delta: i64) -> anyhow::Result<()> {
        self.check_open()?;
        self.shared.inner.add_counter(name, delta);
        Ok(())
    }

    async fn update_gauge(&self, name: &MetricName, value: f64) -> anyhow::Result<()> {
        self.check_open()?;
        self.shared.inner.set_gauge(name, value);
        Ok(())
    }

    async fn snapshot(&self) -> anyhow::Result<Snapshot> {
        Ok(self.shared.inner.make_snapshot())
    }

    async fn close(&self) -> anyhow::Result<()> {
        self.cancel.cancel();
        let mut guard = self.shared.file.lock().await;
        if let Some(handle) = guard.take() {
            handle
                .sync_all()
                .await
                .context("failed to sync snapshot file")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::str::FromStr;

    use super::*;

    fn name(s: &str) -> MetricName {
        MetricName::from_str(s).unwrap()
    }

    fn file_config(path: PathBuf, flush_interval: Duration) -> FileStoreConfig {
        FileStoreConfig {
            path,
            flush_interval: Some(flush_interval),
            restore: false,
        }
    }

    fn read_snapshot(path: &Path) -> Option<Snapshot> {
        let data = std::fs::read_to_string(path).ok()?;
        serde_json::from_str(&data).ok()
    }

    async fn wait_for_counter(path: &Path, name_str: &str, value: i64) -> bool {
        for _ in 0..100 {
            if let Some(snapshot) = read_snapshot(path) {
                if snapshot
                    .counters
                    .iter()
                    .any(|e| e.name.as_str() == name_str && e.value == value)
                {
                    return true;
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }

    #[tokio::test]
    async fn flushes_on_interval() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metricd.json");

        let store = PeriodicFileStore::open(&file_config(path.clone(), Duration::from_millis(50)))
            .await
            .unwrap();
        store.update_counter(&name("requests"), 8).await.unwrap();

        assert!(wait_for_counter(&path, "requests", 8).await);
        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn close_without_final_flush() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metricd.json");

        let store = PeriodicFileStore::open(&file_config(path.clone(), Duration::from_millis(300)))
            .await
            .unwrap();
        store.update_counter(&name("requests"), 8).await.unwrap();
        store.close().await.unwrap();

        tokio::time::sleep(Duration::from_millis(700)).await;
        assert!(std::fs::read_to_string(&path).unwrap().is_empty());
    }

    #[tokio::test]
    async fn no_flush_after_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metricd.json");

        let store = PeriodicFileStore::open(&file_config(path.clone(), Duration::from_millis(100)))
            .await
            .unwrap();
        store.update_counter(&name("requests"), 8).await.unwrap();
        assert!(wait_for_counter(&path, "requests", 8).await);

        store.close().await.unwrap();
        assert!(store.update_counter(&name("requests"), 1).await.is_err());

        tokio::time::sleep(Duration::from_millis(300)).await;
        let snapshot = read_snapshot(&path).unwrap();
        assert_eq!(snapshot.counters[0].value, 8);
    }

    #[tokio::test]
    async fn zero_interval_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metricd.json");

        assert!(
            PeriodicFileStore::open(&file_config(path, Duration::ZERO))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn restore_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metricd.json");

        let store = PeriodicFileStore::open(&file_config(path.clone(), Duration::from_millis(50)))
            .await
            .unwrap();
        store.update_counter(&name("requests"), 8).await.unwrap();
        store.update_gauge(&name("temp"), 9.1).await.unwrap();
        assert!(wait_for_counter(&path, "requests", 8).await);
        store.close().await.unwrap();

        let mut config = file_config(path, Duration::from_millis(50));
        config.restore = true;
        let store = PeriodicFileStore::open(&config).await.unwrap();
        assert_eq!(store.get_counter(&name("requests")).await.unwrap(), Some(8));
        assert_eq!(store.get_gauge(&name("temp")).await.unwrap(), Some(9.1));
        store.close().await.unwrap();
    }
}
