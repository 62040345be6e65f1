/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod metric;
pub(crate) use metric::{Counter, Gauge};

mod name;
pub(crate) use name::MetricName;

mod snapshot;
pub(crate) use snapshot::{CounterEntry, GaugeEntry, Snapshot};
