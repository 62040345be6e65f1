/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::str::FromStr;
use std::time::Duration;

use anyhow::anyhow;
use yaml_rust::{Yaml, yaml};

pub(super) fn normalize(k: &str) -> String {
    k.to_lowercase().replace('-', "_")
}

pub(super) fn foreach_kv<F>(map: &yaml::Hash, mut f: F) -> anyhow::Result<()>
where
    F: FnMut(&str, &Yaml) -> anyhow::Result<()>,
{
    for (k, v) in map.iter() {
        match k {
            Yaml::String(key) => f(key, v)?,
            _ => return Err(anyhow!("hash key type should be string")),
        }
    }
    Ok(())
}

pub(super) fn as_string(v: &Yaml) -> anyhow::Result<String> {
    match v {
        Yaml::String(s) => Ok(s.to_string()),
        Yaml::Integer(i) => Ok(i.to_string()),
        _ => Err(anyhow!(
            "yaml value type for string should be 'string' or 'integer'"
        )),
    }
}

pub(super) fn as_usize(v: &Yaml) -> anyhow::Result<usize> {
    match v {
        Yaml::String(s) => Ok(usize::from_str(s)?),
        Yaml::Integer(i) => Ok(usize::try_from(*i)?),
        _ => Err(anyhow!(
            "yaml value type for 'usize' should be 'string' or 'integer'"
        )),
    }
}

pub(super) fn as_bool(v: &Yaml) -> anyhow::Result<bool> {
    match v {
        Yaml::Boolean(b) => Ok(*b),
        Yaml::String(s) => match s.as_str() {
            "on" | "true" | "1" => Ok(true),
            "off" | "false" | "0" => Ok(false),
            _ => Err(anyhow!("invalid yaml string value for 'bool': {s}")),
        },
        Yaml::Integer(i) => Ok(*i != 0),
        _ => Err(anyhow!(
            "yaml value type for 'bool' should be 'boolean' / 'string' / 'integer'"
        )),
    }
}

pub(super) fn as_duration(v: &Yaml) -> anyhow::Result<Duration> {
    match v {
        Yaml::String(value) => match humanize_rs::duration::parse(value) {
            Ok(v) => Ok(v),
            Err(humanize_rs::ParseError::MissingUnit) => {
                if let Ok(u) = u64::from_str(value) {
                    Ok(Duration::from_secs(u))
                } else if let Ok(f) = f64::from_str(value) {
                    Duration::try_from_secs_f64(f).map_err(anyhow::Error::new)
                } else {
                    Err(anyhow!("invalid duration string"))
                }
            }
            Err(e) => Err(anyhow!("invalid humanize duration string: {e}")),
        },
        Yaml::Integer(value) => {
            if let Ok(u) = u64::try_from(*value) {
                Ok(Duration::from_secs(u))
            } else {
                Err(anyhow!("out of range duration value"))
            }
        }
        Yaml::Real(s) => {
            let f = f64::from_str(s).map_err(|e| anyhow!("invalid f64 value: {e}"))?;
            Duration::try_from_secs_f64(f).map_err(anyhow::Error::new)
        }
        _ => Err(anyhow!(
            "yaml value type for humanize duration should be 'string' or 'integer' or 'real'"
        )),
    }
}

pub(super) fn hash_get_required_str<'a>(
    map: &'a yaml::Hash,
    key: &str,
) -> anyhow::Result<&'a str> {
    let v = map
        .get(&Yaml::String(key.to_string()))
        .ok_or_else(|| anyhow!("no key {key} found in hash"))?;
    match v {
        Yaml::String(s) => Ok(s),
        _ => Err(anyhow!("the value of key {key} should be string")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_duration() {
        let v = Yaml::String("1h2m".to_string());
        assert_eq!(as_duration(&v).unwrap(), Duration::from_secs(3600 + 120));

        let v = Yaml::String("1000".to_string());
        assert_eq!(as_duration(&v).unwrap(), Duration::from_secs(1000));

        let v = Yaml::Integer(30);
        assert_eq!(as_duration(&v).unwrap(), Duration::from_secs(30));

        let v = Yaml::Integer(-1);
        assert!(as_duration(&v).is_err());

        let v = Yaml::String("1000Ah".to_string());
        assert!(as_duration(&v).is_err());
    }

    #[test]
    fn t_bool() {
        assert!(as_bool(&Yaml::Boolean(true)).unwrap());
        assert!(as_bool(&Yaml::String("on".to_string())).unwrap());
        assert!(!as_bool(&Yaml::Integer(0)).unwrap());
        assert!(as_bool(&Yaml::Real("1.0".to_string())).is_err());
    }

    #[test]
    fn t_normalize() {
        assert_eq!(normalize("Flush-Interval"), "flush_interval");
    }
}
