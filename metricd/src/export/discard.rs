/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use async_trait::async_trait;

use super::Exporter;
use crate::types::MetricName;

/// The default sink, accepts and drops everything.
#[derive(Default)]
pub(crate) struct DiscardExporter {}

#[async_trait]
impl Exporter for DiscardExporter {
    fn name(&self) -> &'static str {
        "discard"
    }

    async fn push_counter(&self, _name: &MetricName, _value: i64) -> anyhow::Result<()> {
        Ok(())
    }

    async fn push_gauge(&self, _name: &MetricName, _value: f64) -> anyhow::Result<()> {
        Ok(())
    }
}
