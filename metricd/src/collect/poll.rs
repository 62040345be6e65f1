/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::str::FromStr;

use async_trait::async_trait;

use super::{ArcCollector, Collector, PartialSnapshot};
use crate::types::{CounterEntry, GaugeEntry, MetricName};

/// Liveness markers for the delivery path: a poll counter that grows by one
/// per round and a random gauge that changes on every sample.
pub(crate) struct PollCollector {
    poll_count: MetricName,
    random_value: MetricName,
}

impl PollCollector {
    pub(crate) fn prepare() -> anyhow::Result<ArcCollector> {
        let collector = PollCollector {
            poll_count: MetricName::from_str("agent.poll_count")?,
            random_value: MetricName::from_str("agent.random_value")?,
        };
        Ok(std::sync::Arc::new(collector))
    }
}

#[async_trait]
impl Collector for PollCollector {
    fn name(&self) -> &'static str {
        "poll"
    }

    async fn init(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn collect(&self) -> anyhow::Result<PartialSnapshot> {
        Ok(PartialSnapshot {
            counters: vec![CounterEntry {
                name: self.poll_count.clone(),
                value: 1,
            }],
            gauges: vec![GaugeEntry {
                name: self.random_value.clone(),
                value: fastrand::f64(),
            }],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emits_poll_count_delta() {
        let collector = PollCollector::prepare().unwrap();
        let partial = collector.collect().await.unwrap();

        assert_eq!(partial.counters.len(), 1);
        assert_eq!(partial.counters[0].name.as_str(), "agent.poll_count");
        assert_eq!(partial.counters[0].value, 1);

        assert_eq!(partial.gauges.len(), 1);
        let v = partial.gauges[0].value;
        assert!((0.0..1.0).contains(&v));
    }
}
