/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, anyhow};
use yaml_rust::Yaml;

use super::value;

const CONFIG_KEY_STORE_TYPE: &str = "type";

const DEFAULT_KEY_PREFIX: &str = "metricd";

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum StoreConfig {
    Memory,
    File(FileStoreConfig),
    Redis(RedisStoreConfig),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct FileStoreConfig {
    pub(crate) path: PathBuf,
    /// None selects the write-through backend, Some the periodic one.
    pub(crate) flush_interval: Option<Duration>,
    pub(crate) restore: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct RedisStoreConfig {
    pub(crate) url: String,
    pub(crate) key_prefix: String,
}

impl FileStoreConfig {
    fn new() -> Self {
        FileStoreConfig {
            path: PathBuf::new(),
            flush_interval: None,
            restore: false,
        }
    }

    fn parse(map: &yaml_rust::yaml::Hash) -> anyhow::Result<Self> {
        let mut config = FileStoreConfig::new();
        value::foreach_kv(map, |k, v| config.set(k, v))?;
        config.check()?;
        Ok(config)
    }

    fn set(&mut self, k: &str, v: &Yaml) -> anyhow::Result<()> {
        match value::normalize(k).as_str() {
            CONFIG_KEY_STORE_TYPE => Ok(()),
            "path" => {
                self.path = PathBuf::from(value::as_string(v)?);
                Ok(())
            }
            "flush_interval" => {
                let interval = value::as_duration(v)
                    .context(format!("invalid humanize duration value for key {k}"))?;
                self.flush_interval = Some(interval);
                Ok(())
            }
            "restore" => {
                self.restore = value::as_bool(v)?;
                Ok(())
            }
            _ => Err(anyhow!("invalid key {k}")),
        }
    }

    fn check(&mut self) -> anyhow::Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(anyhow!("path is not set"));
        }
        // a zero interval means flush on every update, which is exactly the
        // write-through backend
        if self.flush_interval == Some(Duration::ZERO) {
            self.flush_interval = None;
        }
        Ok(())
    }
}

impl RedisStoreConfig {
    fn new() -> Self {
        RedisStoreConfig {
            url: String::new(),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }

    fn parse(map: &yaml_rust::yaml::Hash) -> anyhow::Result<Self> {
        let mut config = RedisStoreConfig::new();
        value::foreach_kv(map, |k, v| config.set(k, v))?;
        config.check()?;
        Ok(config)
    }

    fn set(&mut self, k: &str, v: &Yaml) -> anyhow::Result<()> {
        match value::normalize(k).as_str() {
            CONFIG_KEY_STORE_TYPE => Ok(()),
            "url" => {
                self.url = value::as_string(v)?;
                Ok(())
            }
            "key_prefix" => {
                self.key_prefix = value::as_string(v)?;
                Ok(())
            }
            _ => Err(anyhow!("invalid key {k}")),
        }
    }

    fn check(&self) -> anyhow::Result<()> {
        if self.url.is_empty() {
            return Err(anyhow!("url is not set"));
        }
        if self.key_prefix.is_empty() {
            return Err(anyhow!("key prefix may not be empty"));
        }
        Ok(())
    }
}

pub(super) fn parse(v: &Yaml) -> anyhow::Result<StoreConfig> {
    let Yaml::Hash(map) = v else {
        return Err(anyhow!("yaml value type for store config should be hash"));
    };

    let store_type = value::hash_get_required_str(map, CONFIG_KEY_STORE_TYPE)?;
    match value::normalize(store_type).as_str() {
        "memory" => {
            value::foreach_kv(map, |k, _v| match value::normalize(k).as_str() {
                CONFIG_KEY_STORE_TYPE => Ok(()),
                _ => Err(anyhow!("invalid key {k}")),
            })?;
            Ok(StoreConfig::Memory)
        }
        "file" => {
            let config =
                FileStoreConfig::parse(map).context("failed to load this File store")?;
            Ok(StoreConfig::File(config))
        }
        "redis" => {
            let config =
                RedisStoreConfig::parse(map).context("failed to load this Redis store")?;
            Ok(StoreConfig::Redis(config))
        }
        _ => Err(anyhow!("unsupported store type {store_type}")),
    }
}
