/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::str::FromStr;
use std::time::Instant;

use anyhow::Context;
use async_trait::async_trait;

use super::{ArcCollector, Collector, PartialSnapshot};
use crate::types::{GaugeEntry, MetricName};

const PROC_STATUS: &str = "/proc/self/status";
const PROC_FD_DIR: &str = "/proc/self/fd";

/// Process gauges sampled from procfs: resident and virtual memory, open
/// file descriptors and process uptime.
pub(crate) struct ProcCollector {
    start: Instant,
    vm_rss: MetricName,
    vm_size: MetricName,
    open_fds: MetricName,
    uptime: MetricName,
}

impl ProcCollector {
    pub(crate) fn prepare() -> anyhow::Result<ArcCollector> {
        let collector = ProcCollector {
            start: Instant::now(),
            vm_rss: MetricName::from_str("proc.vm_rss_bytes")?,
            vm_size: MetricName::from_str("proc.vm_size_bytes")?,
            open_fds: MetricName::from_str("proc.open_fds")?,
            uptime: MetricName::from_str("proc.uptime_seconds")?,
        };
        Ok(std::sync::Arc::new(collector))
    }
}

/// Parse the `  1234 kB` remainder of a /proc/self/status line into bytes.
fn parse_status_kb(rest: &str) -> Option<f64> {
    let mut fields = rest.split_whitespace();
    let kb: u64 = fields.next()?.parse().ok()?;
    Some((kb * 1024) as f64)
}

#[async_trait]
impl Collector for ProcCollector {
    fn name(&self) -> &'static str {
        "proc"
    }

    async fn init(&self) -> anyhow::Result<()> {
        tokio::fs::metadata(PROC_STATUS)
            .await
            .context(format!("{PROC_STATUS} is not readable"))?;
        Ok(())
    }

    async fn collect(&self) -> anyhow::Result<PartialSnapshot> {
        let status = tokio::fs::read_to_string(PROC_STATUS)
            .await
            .context(format!("failed to read {PROC_STATUS}"))?;

        let mut partial = PartialSnapshot::default();
        for line in status.lines() {
            if let Some(rest) = line.strip_prefix("VmRSS:") {
                if let Some(bytes) = parse_status_kb(rest) {
                    partial.gauges.push(GaugeEntry {
                        name: self.vm_rss.clone(),
                        value: bytes,
                    });
                }
            } else if let Some(rest) = line.strip_prefix("VmSize:") {
                if let Some(bytes) = parse_status_kb(rest) {
                    partial.gauges.push(GaugeEntry {
                        name: self.vm_size.clone(),
                        value: bytes,
                    });
                }
            }
        }

        let mut fd_count = 0usize;
        let mut dir = tokio::fs::read_dir(PROC_FD_DIR)
            .await
            .context(format!("failed to read {PROC_FD_DIR}"))?;
        while dir.next_entry().await?.is_some() {
            fd_count += 1;
        }
        partial.gauges.push(GaugeEntry {
            name: self.open_fds.clone(),
            value: fd_count as f64,
        });

        partial.gauges.push(GaugeEntry {
            name: self.uptime.clone(),
            value: self.start.elapsed().as_secs_f64(),
        });
        Ok(partial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_line_to_bytes() {
        assert_eq!(parse_status_kb("      4 kB"), Some(4096.0));
        assert_eq!(parse_status_kb("garbage"), None);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn collects_process_gauges() {
        let collector = ProcCollector::prepare().unwrap();
        collector.init().await.unwrap();

        let partial = collector.collect().await.unwrap();
        assert!(partial.counters.is_empty());
        assert!(
            partial
                .gauges
                .iter()
                .any(|g| g.name.as_str() == "proc.vm_rss_bytes" && g.value > 0.0)
        );
        assert!(
            partial
                .gauges
                .iter()
                .any(|g| g.name.as_str() == "proc.open_fds" && g.value > 0.0)
        );
    }
}
