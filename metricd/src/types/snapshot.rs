/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use serde::{Deserialize, Serialize};

use super::MetricName;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct CounterEntry {
    pub(crate) name: MetricName,
    pub(crate) value: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct GaugeEntry {
    pub(crate) name: MetricName,
    pub(crate) value: f64,
}

/// A detached copy of all current metric entries, one sequence per kind.
///
/// Entries alias nothing in live storage, so a snapshot can be serialized
/// or shipped while updates keep running. The two sequences are also the
/// persisted file format of the file backends.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct Snapshot {
    #[serde(rename = "Counters", default)]
    pub(crate) counters: Vec<CounterEntry>,
    #[serde(rename = "Gauges", default)]
    pub(crate) gauges: Vec<GaugeEntry>,
}

impl Snapshot {
    pub(crate) fn is_empty(&self) -> bool {
        self.counters.is_empty() && self.gauges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn json_field_names() {
        let snapshot = Snapshot {
            counters: vec![CounterEntry {
                name: MetricName::from_str("requests").unwrap(),
                value: 8,
            }],
            gauges: Vec::new(),
        };
        let data = serde_json::to_string(&snapshot).unwrap();
        assert_eq!(data, r#"{"Counters":[{"name":"requests","value":8}],"Gauges":[]}"#);
    }

    #[test]
    fn json_round_trip() {
        let snapshot = Snapshot {
            counters: vec![CounterEntry {
                name: MetricName::from_str("requests").unwrap(),
                value: -3,
            }],
            gauges: vec![GaugeEntry {
                name: MetricName::from_str("temp").unwrap(),
                value: 9.1,
            }],
        };
        let data = serde_json::to_vec(&snapshot).unwrap();
        let parsed: Snapshot = serde_json::from_slice(&data).unwrap();
        assert_eq!(parsed, snapshot);
    }

    #[test]
    fn json_unknown_fields_tolerated() {
        let data = r#"{"Counters":[{"name":"requests","value":8,"unit":"calls"}],"Extra":1}"#;
        let parsed: Snapshot = serde_json::from_str(data).unwrap();
        assert_eq!(parsed.counters.len(), 1);
        assert_eq!(parsed.counters[0].value, 8);
        assert!(parsed.gauges.is_empty());
    }

    #[test]
    fn json_invalid_name_rejected() {
        let data = r#"{"Counters":[{"name":"","value":8}],"Gauges":[]}"#;
        assert!(serde_json::from_str::<Snapshot>(data).is_err());
    }
}
