/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::path::Path;

use anyhow::{Context, anyhow};
use yaml_rust::{Yaml, YamlLoader};

pub(crate) mod agent;
pub(crate) mod exporter;
pub(crate) mod store;

mod value;

use agent::AgentConfig;
use exporter::ExporterConfig;
use store::StoreConfig;

pub struct AppConfig {
    pub(crate) store: StoreConfig,
    pub(crate) agent: AgentConfig,
    pub(crate) exporter: ExporterConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            store: StoreConfig::Memory,
            agent: AgentConfig::default(),
            exporter: ExporterConfig::Discard,
        }
    }
}

pub fn load(path: &Path) -> anyhow::Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .context(format!("failed to read config file {}", path.display()))?;
    load_str(&content)
}

fn load_str(content: &str) -> anyhow::Result<AppConfig> {
    let docs = YamlLoader::load_from_str(content).context("invalid yaml")?;
    if docs.is_empty() {
        return Err(anyhow!("empty config file"));
    }

    let mut config = AppConfig::default();
    // allow multiple docs, and treat them as the same
    for doc in &docs {
        let Yaml::Hash(map) = doc else {
            return Err(anyhow!("yaml doc root should be hash"));
        };
        value::foreach_kv(map, |k, v| match value::normalize(k).as_str() {
            "store" => {
                config.store = store::parse(v).context("invalid store config")?;
                Ok(())
            }
            "agent" => {
                config.agent = agent::parse(v).context("invalid agent config")?;
                Ok(())
            }
            "exporter" => {
                config.exporter = exporter::parse(v).context("invalid exporter config")?;
                Ok(())
            }
            _ => Err(anyhow!("invalid key {k} in main conf")),
        })?;
    }
    Ok(config)
}
