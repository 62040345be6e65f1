/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::time::Duration;

use anyhow::{Context, anyhow};
use yaml_rust::Yaml;

use super::value;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(10);
const DEFAULT_WORKERS: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CollectorKind {
    Proc,
    Poll,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct AgentConfig {
    pub(crate) poll_interval: Duration,
    pub(crate) report_interval: Duration,
    pub(crate) workers: usize,
    pub(crate) collectors: Vec<CollectorKind>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            poll_interval: DEFAULT_POLL_INTERVAL,
            report_interval: DEFAULT_REPORT_INTERVAL,
            workers: DEFAULT_WORKERS,
            collectors: vec![CollectorKind::Proc, CollectorKind::Poll],
        }
    }
}

impl AgentConfig {
    fn set(&mut self, k: &str, v: &Yaml) -> anyhow::Result<()> {
        match value::normalize(k).as_str() {
            "poll_interval" => {
                self.poll_interval = value::as_duration(v)
                    .context(format!("invalid humanize duration value for key {k}"))?;
                Ok(())
            }
            "report_interval" => {
                self.report_interval = value::as_duration(v)
                    .context(format!("invalid humanize duration value for key {k}"))?;
                Ok(())
            }
            "workers" => {
                self.workers = value::as_usize(v)?;
                Ok(())
            }
            "collectors" => {
                let Yaml::Array(seq) = v else {
                    return Err(anyhow!("yaml value type for key {k} should be array"));
                };
                let mut collectors = Vec::with_capacity(seq.len());
                for v in seq {
                    collectors.push(as_collector_kind(v)?);
                }
                self.collectors = collectors;
                Ok(())
            }
            _ => Err(anyhow!("invalid key {k}")),
        }
    }

    fn check(&self) -> anyhow::Result<()> {
        if self.poll_interval.is_zero() {
            return Err(anyhow!("poll interval may not be zero"));
        }
        if self.report_interval.is_zero() {
            return Err(anyhow!("report interval may not be zero"));
        }
        if self.workers == 0 {
            return Err(anyhow!("at least one worker is needed"));
        }
        Ok(())
    }
}

fn as_collector_kind(v: &Yaml) -> anyhow::Result<CollectorKind> {
    let s = value::as_string(v)?;
    match value::normalize(&s).as_str() {
        "proc" => Ok(CollectorKind::Proc),
        "poll" => Ok(CollectorKind::Poll),
        _ => Err(anyhow!("unsupported collector type {s}")),
    }
}

pub(super) fn parse(v: &Yaml) -> anyhow::Result<AgentConfig> {
    let Yaml::Hash(map) = v else {
        return Err(anyhow!("yaml value type for agent config should be hash"));
    };

    let mut config = AgentConfig::default();
    value::foreach_kv(map, |k, v| config.set(k, v))?;
    config.check()?;
    Ok(config)
}
