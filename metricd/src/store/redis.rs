/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, RedisError};

use super::StatsStore;
use crate::config::store::RedisStoreConfig;
use crate::retry::Retry;
use crate::types::{CounterEntry, GaugeEntry, MetricName, Snapshot};

const BACKOFF: &[Duration] = &[
    Duration::from_secs(1),
    Duration::from_secs(3),
    Duration::from_secs(5),
];

fn is_transient(e: &RedisError) -> bool {
    e.is_io_error() || e.is_timeout() || e.is_connection_dropped() || e.is_connection_refusal()
}

fn hash_keys(prefix: &str) -> (String, String) {
    (format!("{prefix}:counter"), format!("{prefix}:gauge"))
}

/// Externally-durable backend on a redis server.
///
/// There is no local cache layer, every update and read goes to the server.
/// Counters live in one hash and gauges in another, so the two namespaces
/// stay independent. `HINCRBY` keeps counter accumulation atomic on the
/// server side. Connection opening and each operation run under the bounded
/// backoff policy with a transient-error predicate.
pub(crate) struct RedisStore {
    conn: Mutex<Option<MultiplexedConnection>>,
    counter_key: String,
    gauge_key: String,
}

impl RedisStore {
    pub(crate) async fn open(config: &RedisStoreConfig) -> anyhow::Result<Self> {
        let client = redis::Client::open(config.url.as_str())
            .context(format!("invalid redis url {}", config.url))?;

        let mut retry = Retry::new(BACKOFF, is_transient);
        let mut last_err: Option<RedisError> = None;
        let mut conn = None;
        while retry.next(last_err.as_ref()).await {
            match client.get_multiplexed_async_connection().await {
                Ok(c) => {
                    conn = Some(c);
                    last_err = None;
                }
                Err(e) => last_err = Some(e),
            }
        }
        let conn = match last_err {
            None => conn.ok_or_else(|| anyhow!("redis connect did not run"))?,
            Some(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("failed to connect to {}", config.url)));
            }
        };

        let (counter_key, gauge_key) = hash_keys(&config.key_prefix);
        Ok(RedisStore {
            conn: Mutex::new(Some(conn)),
            counter_key,
            gauge_key,
        })
    }

    fn connection(&self) -> anyhow::Result<MultiplexedConnection> {
        self.conn
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| anyhow!("store is closed"))
    }

    async fn with_retry<T, F, Fut>(&self, mut attempt: F) -> anyhow::Result<T>
    where
        F: FnMut(MultiplexedConnection) -> Fut,
        Fut: Future<Output = Result<T, RedisError>>,
    {
        let mut retry = Retry::new(BACKOFF, is_transient);
        let mut last_err: Option<RedisError> = None;
        let mut value = None;
        while retry.next(last_err.as_ref()).await {
            let conn = self.connection()?;
            match attempt(conn).await {
                Ok(v) => {
                    value = Some(v);
                    last_err = None;
                }
                Err(e) => last_err = Some(e),
            }
        }
        match last_err {
            None => value.ok_or_else(|| anyhow!("redis operation did not run")),
            Some(e) => Err(anyhow::Error::new(e).context("redis operation failed")),
        }
    }
}

#[async_trait]
impl StatsStore for RedisStore {
    async fn get_counter(&self, name: &MetricName) -> anyhow::Result<Option<i64>> {
        self.with_retry(|mut conn| {
            let key = self.counter_key.clone();
            let field = name.as_str().to_string();
            async move { conn.hget::<_, _, Option<i64>>(key, field).await }
        })
        .await
        .context(format!("failed to get counter {name}"))
    }

    async fn get_gauge(&self, name: &MetricName) -> anyhow::Result<Option<f64>> {
        self.with_retry(|mut conn| {
            let key = self.gauge_key.clone();
            let field = name.as_str().to_string();
            async move { conn.hget::<_, _, Option<f64>>(key, field).await }
        })
        .await
        .context(format!("failed to get gauge {name}"))
    }

    async fn update_counter(&self, name: &MetricName, delta: i64) -> anyhow::Result<()> {
        self.with_retry(|mut conn| {
            let key = self.counter_key.clone();
            let field = name.as_str().to_string();
            async move {
                let _: i64 = conn.hincr(key, field, delta).await?;
                Ok(())
            }
        })
        .await
        .context(format!("failed to update counter {name}"))
    }

    async fn update_gauge(&self, name: &MetricName, value: f64) -> anyhow::Result<()> {
        self.with_retry(|mut conn| {
            let key = self.gauge_key.clone();
            let field = name.as_str().to_string();
            async move {
                let _: () = conn.hset(key, field, value).await?;
                Ok(())
            }
        })
        .await
        .context(format!("failed to update gauge {name}"))
    }

    async fn snapshot(&self) -> anyhow::Result<Snapshot> {
        let counters: Vec<(String, i64)> = self
            .with_retry(|mut conn| {
                let key = self.counter_key.clone();
                async move { conn.hgetall(key).await }
            })
            .await
            .context("failed to fetch counter hash")?;
        let gauges: Vec<(String, f64)> = self
            .with_retry(|mut conn| {
                let key = self.gauge_key.clone();
                async move { conn.hgetall(key).await }
            })
            .await
            .context("failed to fetch gauge hash")?;

        let mut snapshot = Snapshot::default();
        for (name, value) in counters {
            let name = MetricName::try_from(name).context("invalid counter name in store")?;
            snapshot.counters.push(CounterEntry { name, value });
        }
        for (name, value) in gauges {
            let name = MetricName::try_from(name).context("invalid gauge name in store")?;
            snapshot.gauges.push(GaugeEntry { name, value });
        }
        Ok(snapshot)
    }

    async fn close(&self) -> anyhow::Result<()> {
        let _ = self.conn.lock().unwrap().take();
        Ok(())
    }
}
