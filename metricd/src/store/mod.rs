/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::store::StoreConfig;
use crate::types::{MetricName, Snapshot};

mod memory;
pub(crate) use memory::MemoryStore;

mod file;
pub(crate) use file::FileStore;

mod periodic;
pub(crate) use periodic::PeriodicFileStore;

mod redis;
pub(crate) use redis::RedisStore;

/// The storage engine contract shared by all backends.
///
/// A lookup miss is `Ok(None)`, errors are reserved for I/O. Updates are
/// atomic per identity, `snapshot()` is consistent per kind while updates
/// on other identities are in flight.
#[async_trait]
pub(crate) trait StatsStore {
    async fn get_counter(&self, name: &MetricName) -> anyhow::Result<Option<i64>>;
    async fn get_gauge(&self, name: &MetricName) -> anyhow::Result<Option<f64>>;

    /// Add `delta` to the stored counter value, creating the entry on first
    /// update.
    async fn update_counter(&self, name: &MetricName, delta: i64) -> anyhow::Result<()>;

    /// Replace the stored gauge value, creating the entry on first update.
    async fn update_gauge(&self, name: &MetricName, value: f64) -> anyhow::Result<()>;

    async fn snapshot(&self) -> anyhow::Result<Snapshot>;

    async fn close(&self) -> anyhow::Result<()>;
}

pub(crate) type ArcStore = Arc<dyn StatsStore + Send + Sync>;

/// Open the backend selected by the config. Construction failures here are
/// fatal to startup.
pub(crate) async fn build(config: &StoreConfig) -> anyhow::Result<ArcStore> {
    match config {
        StoreConfig::Memory => Ok(Arc::new(MemoryStore::default())),
        StoreConfig::File(config) => {
            if config.flush_interval.is_some() {
                let store = PeriodicFileStore::open(config).await?;
                Ok(Arc::new(store))
            } else {
                let store = FileStore::open(config).await?;
                Ok(Arc::new(store))
            }
        }
        StoreConfig::Redis(config) => {
            let store = RedisStore::open(config).await?;
            Ok(Arc::new(store))
        }
    }
}
