/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io::SeekFrom;

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;

use super::{MemoryStore, StatsStore};
use crate::config::store::FileStoreConfig;
use crate::types::{MetricName, Snapshot};

pub(super) async fn open_backing_file(config: &FileStoreConfig) -> anyhow::Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.path)
        .await
        .context(format!(
            "failed to open snapshot file {}",
            config.path.display()
        ))
}

/// Read the persisted snapshot record back and clear-then-load it into the
/// in-memory maps. An empty file is a fresh start, an unparsable one is
/// fatal.
pub(super) async fn restore_into(file: &mut File, inner: &MemoryStore) -> anyhow::Result<()> {
    file.seek(SeekFrom::Start(0))
        .await
        .context("failed to seek snapshot file")?;
    let mut buf = String::new();
    file.read_to_string(&mut buf)
        .await
        .context("failed to read snapshot file")?;
    if buf.is_empty() {
        return Ok(());
    }
    let snapshot: Snapshot =
        serde_json::from_str(&buf).context("malformed persisted snapshot")?;
    inner.load_snapshot(&snapshot);
    Ok(())
}

/// Replace the file content with the serialized snapshot: seek to start,
/// truncate, write, flush to disk.
pub(super) async fn rewrite(file: &mut File, snapshot: &Snapshot) -> anyhow::Result<()> {
    let data = serde_json::to_vec(snapshot).context("failed to serialize snapshot")?;
    file.seek(SeekFrom::Start(0))
        .await
        .context("failed to seek snapshot file")?;
    file.set_len(0)
        .await
        .context("failed to truncate snapshot file")?;
    file.write_all(&data)
        .await
        .context("failed to write snapshot file")?;
    file.sync_data()
        .await
        .context("failed to sync snapshot file")?;
    Ok(())
}

/// Write-through file backend.
///
/// Every update rewrites the whole snapshot file before returning to the
/// caller, the write lock serializes concurrent flushes. The snapshot is
/// taken under that lock so the file always reflects the most recently
/// completed update.
pub(crate) struct FileStore {
    inner: MemoryStore,
    file: Mutex<Option<File>>,
}

impl FileStore {
    pub(crate) async fn open(config: &FileStoreConfig) -> anyhow::Result<Self> {
        let mut file = open_backing_file(config).await?;
        let inner = MemoryStore::default();
        if config.restore {
            restore_into(&mut file, &inner).await.context(format!(
                "failed to restore from {}",
                config.path.display()
            ))?;
        }
        Ok(FileStore {
            inner,
            file: Mutex::new(Some(file)),
        })
    }

    async fn flush(&self) -> anyhow::Result<()> {
        let mut guard = self.file.lock().await;
        let Some(file) = guard.as_mut() else {
            return Err(anyhow!("store is closed"));
        };
        let snapshot = self.inner.make_snapshot();
        rewrite(file, &snapshot).await
    }
}

#[async_trait]
impl StatsStore for FileStore {
    async fn get_counter(&self, name: &MetricName) -> anyhow::Result<Option<i64>> {
        Ok(self.inner.counter_value(name))
    }

    async fn get_gauge(&self, name: &MetricName) -> anyhow::Result<Option<f64>> {
        Ok(self.inner.gauge_value(name))
    }

    async fn update_counter(&self, name: &MetricName, delta: i64) -> anyhow::Result<()> {
        self.inner.add_counter(name, delta);
        self.flush().await
    }

    async fn update_gauge(&self, name: &MetricName, value: f64) -> anyhow::Result<()> {
        self.inner.set_gauge(name, value);
        self.flush().await
    }

    async fn snapshot(&self) -> anyhow::Result<Snapshot> {
        Ok(self.inner.make_snapshot())
    }

    async fn close(&self) -> anyhow::Result<()> {
        let mut guard = self.file.lock().await;
        if let Some(file) = guard.take() {
            file.sync_all()
                .await
                .context("failed to sync snapshot file")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::str::FromStr;

    use super::*;

    fn name(s: &str) -> MetricName {
        MetricName::from_str(s).unwrap()
    }

    fn file_config(path: PathBuf, restore: bool) -> FileStoreConfig {
        FileStoreConfig {
            path,
            flush_interval: None,
            restore,
        }
    }

    #[tokio::test]
    async fn write_through_durability() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metricd.json");

        let store = FileStore::open(&file_config(path.clone(), false))
            .await
            .unwrap();
        store.update_counter(&name("requests"), 5).await.unwrap();

        let on_disk: Snapshot =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk.counters.len(), 1);
        assert_eq!(on_disk.counters[0].value, 5);

        store.update_counter(&name("requests"), 3).await.unwrap();
        let on_disk: Snapshot =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk.counters[0].value, 8);
    }

    #[tokio::test]
    async fn restore_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metricd.json");

        let store = FileStore::open(&file_config(path.clone(), false))
            .await
            .unwrap();
        store.update_counter(&name("requests"), 8).await.unwrap();
        store.update_gauge(&name("temp"), 9.1).await.unwrap();
        store.close().await.unwrap();

        let store = FileStore::open(&file_config(path, true)).await.unwrap();
        assert_eq!(store.get_counter(&name("requests")).await.unwrap(), Some(8));
        assert_eq!(store.get_gauge(&name("temp")).await.unwrap(), Some(9.1));
    }

    #[tokio::test]
    async fn restore_literal_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metricd.json");
        std::fs::write(&path, r#"{"Counters":[{"name":"requests","value":8}]}"#).unwrap();

        let store = FileStore::open(&file_config(path, true)).await.unwrap();
        assert_eq!(store.get_counter(&name("requests")).await.unwrap(), Some(8));
        let snapshot = store.snapshot().await.unwrap();
        assert!(snapshot.gauges.is_empty());
    }

    #[tokio::test]
    async fn restore_malformed_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metricd.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(FileStore::open(&file_config(path, true)).await.is_err());
    }

    #[tokio::test]
    async fn update_after_close_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metricd.json");

        let store = FileStore::open(&file_config(path, false)).await.unwrap();
        store.close().await.unwrap();
        assert!(store.update_counter(&name("requests"), 1).await.is_err());
    }
}
