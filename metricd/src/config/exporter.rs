/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use anyhow::anyhow;
use yaml_rust::Yaml;

use super::value;

const CONFIG_KEY_EXPORTER_TYPE: &str = "type";

const DEFAULT_STORE_COUNT: usize = 128;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ExporterConfig {
    Console,
    Discard,
    Memory { store_count: usize },
}

pub(super) fn parse(v: &Yaml) -> anyhow::Result<ExporterConfig> {
    let Yaml::Hash(map) = v else {
        return Err(anyhow!("yaml value type for exporter config should be hash"));
    };

    let exporter_type = value::hash_get_required_str(map, CONFIG_KEY_EXPORTER_TYPE)?;
    match value::normalize(exporter_type).as_str() {
        "console" => {
            reject_extra_keys(map)?;
            Ok(ExporterConfig::Console)
        }
        "discard" => {
            reject_extra_keys(map)?;
            Ok(ExporterConfig::Discard)
        }
        "memory" => {
            let mut store_count = DEFAULT_STORE_COUNT;
            value::foreach_kv(map, |k, v| match value::normalize(k).as_str() {
                CONFIG_KEY_EXPORTER_TYPE => Ok(()),
                "store_count" => {
                    store_count = value::as_usize(v)?;
                    Ok(())
                }
                _ => Err(anyhow!("invalid key {k}")),
            })?;
            if store_count == 0 {
                return Err(anyhow!("store count may not be zero"));
            }
            Ok(ExporterConfig::Memory { store_count })
        }
        _ => Err(anyhow!("unsupported exporter type {exporter_type}")),
    }
}

fn reject_extra_keys(map: &yaml_rust::yaml::Hash) -> anyhow::Result<()> {
    value::foreach_kv(map, |k, _v| match value::normalize(k).as_str() {
        CONFIG_KEY_EXPORTER_TYPE => Ok(()),
        _ => Err(anyhow!("invalid key {k}")),
    })
}
