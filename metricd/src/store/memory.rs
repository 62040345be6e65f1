/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Mutex;

use ahash::AHashMap;
use async_trait::async_trait;

use super::StatsStore;
use crate::types::{Counter, CounterEntry, Gauge, GaugeEntry, MetricName, Snapshot};

/// Lock-per-kind in-memory backend.
///
/// Counter and gauge traffic never contend with each other. A snapshot
/// locks and copies each map in turn, so it is atomic per kind but not
/// across kinds.
pub(crate) struct MemoryStore {
    counter: Mutex<AHashMap<MetricName, Counter>>,
    gauge: Mutex<AHashMap<MetricName, Gauge>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore {
            counter: Mutex::new(AHashMap::default()),
            gauge: Mutex::new(AHashMap::default()),
        }
    }
}

impl MemoryStore {
    pub(super) fn add_counter(&self, name: &MetricName, delta: i64) {
        let mut map = self.counter.lock().unwrap();
        map.entry(name.clone()).or_default().update(delta);
    }

    pub(super) fn set_gauge(&self, name: &MetricName, value: f64) {
        let mut map = self.gauge.lock().unwrap();
        map.entry(name.clone()).or_default().update(value);
    }

    pub(super) fn counter_value(&self, name: &MetricName) -> Option<i64> {
        let map = self.counter.lock().unwrap();
        map.get(name).map(|c| c.read())
    }

    pub(super) fn gauge_value(&self, name: &MetricName) -> Option<f64> {
        let map = self.gauge.lock().unwrap();
        map.get(name).map(|g| g.read())
    }

    pub(super) fn make_snapshot(&self) -> Snapshot {
        let counters = {
            let map = self.counter.lock().unwrap();
            map.iter()
                .map(|(name, counter)| CounterEntry {
                    name: name.clone(),
                    value: counter.read(),
                })
                .collect()
        };
        let gauges = {
            let map = self.gauge.lock().unwrap();
            map.iter()
                .map(|(name, gauge)| GaugeEntry {
                    name: name.clone(),
                    value: gauge.read(),
                })
                .collect()
        };
        Snapshot { counters, gauges }
    }

    /// Clear-then-load both kinds from a persisted snapshot. The current
    /// entries are fully replaced, never merged.
    pub(super) fn load_snapshot(&self, snapshot: &Snapshot) {
        let mut map = self.counter.lock().unwrap();
        map.clear();
        for entry in &snapshot.counters {
            map.insert(entry.name.clone(), Counter::new(entry.value));
        }
        drop(map);

        let mut map = self.gauge.lock().unwrap();
        map.clear();
        for entry in &snapshot.gauges {
            map.insert(entry.name.clone(), Gauge::new(entry.value));
        }
    }
}

#[async_trait]
impl StatsStore for MemoryStore {
    async fn get_counter(&self, name: &MetricName) -> anyhow::Result<Option<i64>> {
        Ok(self.counter_value(name))
    }

    async fn get_gauge(&self, name: &MetricName) -> anyhow::Result<Option<f64>> {
        Ok(self.gauge_value(name))
    }

    async fn update_counter(&self, name: &MetricName, delta: i64) -> anyhow::Result<()> {
        self.add_counter(name, delta);
        Ok(())
    }

    async fn update_gauge(&self, name: &MetricName, value: f64) -> anyhow::Result<()> {
        self.set_gauge(name, value);
        Ok(())
    }

    async fn snapshot(&self) -> anyhow::Result<Snapshot> {
        Ok(self.make_snapshot())
    }

    async fn close(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::sync::Arc;

    use super::*;

    fn name(s: &str) -> MetricName {
        MetricName::from_str(s).unwrap()
    }

    #[test]
    fn counter_accumulates() {
        let store = MemoryStore::default();
        let requests = name("requests");

        store.add_counter(&requests, 5);
        store.add_counter(&requests, 3);
        assert_eq!(store.counter_value(&requests), Some(8));

        store.add_counter(&requests, -2);
        assert_eq!(store.counter_value(&requests), Some(6));
    }

    #[test]
    fn gauge_last_write_wins() {
        let store = MemoryStore::default();
        let temp = name("temp");

        store.set_gauge(&temp, 10.5);
        store.set_gauge(&temp, 9.1);
        assert_eq!(store.gauge_value(&temp), Some(9.1));
    }

    #[test]
    fn kind_namespaces_independent() {
        let store = MemoryStore::default();
        let x = name("x");

        store.add_counter(&x, 5);
        store.set_gauge(&x, 2.5);
        assert_eq!(store.counter_value(&x), Some(5));
        assert_eq!(store.gauge_value(&x), Some(2.5));

        assert_eq!(store.counter_value(&name("y")), None);
        assert_eq!(store.gauge_value(&name("y")), None);
    }

    #[test]
    fn concurrent_counter_updates() {
        let store = Arc::new(MemoryStore::default());
        let requests = name("requests");

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            let requests = requests.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..1000 {
                    store.add_counter(&requests, 1);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.counter_value(&requests), Some(8000));
    }

    #[test]
    fn snapshot_is_detached() {
        let store = MemoryStore::default();
        let requests = name("requests");

        store.add_counter(&requests, 8);
        let snapshot = store.make_snapshot();

        store.add_counter(&requests, 100);
        assert_eq!(snapshot.counters.len(), 1);
        assert_eq!(snapshot.counters[0].value, 8);
    }

    #[test]
    fn load_snapshot_replaces() {
        let store = MemoryStore::default();
        store.add_counter(&name("old"), 1);
        store.set_gauge(&name("stale"), 1.0);

        let snapshot = Snapshot {
            counters: vec![CounterEntry {
                name: name("requests"),
                value: 8,
            }],
            gauges: Vec::new(),
        };
        store.load_snapshot(&snapshot);

        assert_eq!(store.counter_value(&name("requests")), Some(8));
        assert_eq!(store.counter_value(&name("old")), None);
        assert_eq!(store.gauge_value(&name("stale")), None);
    }
}
