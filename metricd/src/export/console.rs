/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};

use super::Exporter;
use crate::types::MetricName;

#[derive(Default)]
pub(crate) struct ConsoleExporter {}

#[async_trait]
impl Exporter for ConsoleExporter {
    fn name(&self) -> &'static str {
        "console"
    }

    async fn push_counter(&self, name: &MetricName, value: i64) -> anyhow::Result<()> {
        println!(
            "{} counter {name} {}",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            itoa::Buffer::new().format(value)
        );
        Ok(())
    }

    async fn push_gauge(&self, name: &MetricName, value: f64) -> anyhow::Result<()> {
        println!(
            "{} gauge {name} {}",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            ryu::Buffer::new().format(value)
        );
        Ok(())
    }
}
