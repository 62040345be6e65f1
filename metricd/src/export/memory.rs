/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::Exporter;
use crate::types::MetricName;

#[derive(Clone, Debug)]
pub(crate) struct PushedValue<T> {
    #[allow(unused)]
    pub(crate) time: DateTime<Utc>,
    pub(crate) name: MetricName,
    pub(crate) value: T,
}

struct InnerRing<T> {
    inner: VecDeque<PushedValue<T>>,
}

impl<T> InnerRing<T> {
    fn with_capacity(capacity: usize) -> Self {
        InnerRing {
            inner: VecDeque::with_capacity(capacity),
        }
    }

    fn add(&mut self, store_count: usize, name: &MetricName, value: T) {
        self.inner.push_front(PushedValue {
            time: Utc::now(),
            name: name.clone(),
            value,
        });
        self.inner.truncate(store_count);
    }
}

/// Sink that keeps the most recent pushes in memory, newest first, one ring
/// per metric kind, truncated to a configured store count.
pub(crate) struct MemoryExporter {
    store_count: usize,
    counter: Mutex<InnerRing<i64>>,
    gauge: Mutex<InnerRing<f64>>,
}

impl MemoryExporter {
    pub(crate) fn new(store_count: usize) -> Self {
        MemoryExporter {
            store_count,
            counter: Mutex::new(InnerRing::with_capacity(store_count)),
            gauge: Mutex::new(InnerRing::with_capacity(store_count)),
        }
    }

    pub(crate) fn counters(&self) -> Vec<PushedValue<i64>> {
        let ring = self.counter.lock().unwrap();
        ring.inner.iter().cloned().collect()
    }

    pub(crate) fn gauges(&self) -> Vec<PushedValue<f64>> {
        let ring = self.gauge.lock().unwrap();
        ring.inner.iter().cloned().collect()
    }
}

#[async_trait]
impl Exporter for MemoryExporter {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn push_counter(&self, name: &MetricName, value: i64) -> anyhow::Result<()> {
        let mut ring = self.counter.lock().unwrap();
        ring.add(self.store_count, name, value);
        Ok(())
    }

    async fn push_gauge(&self, name: &MetricName, value: f64) -> anyhow::Result<()> {
        let mut ring = self.gauge.lock().unwrap();
        ring.add(self.store_count, name, value);
        Ok(())
    }
}
