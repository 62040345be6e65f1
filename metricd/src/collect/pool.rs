/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use log::trace;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{ArcCollector, PartialSnapshot};

const JOB_QUEUE_SIZE: usize = 16;

pub(crate) type CollectResult = (&'static str, anyhow::Result<PartialSnapshot>);

/// Fixed-size pool of collection workers behind a shared job queue.
///
/// Every submitted collector produces exactly one entry on the result
/// channel, either its partial snapshot or its error. Dropping the job
/// sender closes the queue, workers drain what is left and exit.
pub(crate) struct CollectorPool {
    job_sender: kanal::AsyncSender<ArcCollector>,
    result_receiver: mpsc::UnboundedReceiver<CollectResult>,
    workers: Vec<JoinHandle<()>>,
}

impl CollectorPool {
    pub(crate) fn spawn_new(workers: usize) -> Self {
        let (job_sender, job_receiver) = kanal::bounded_async(JOB_QUEUE_SIZE);
        let (result_sender, result_receiver) = mpsc::unbounded_channel();

        let mut handles = Vec::with_capacity(workers.max(1));
        for id in 0..workers.max(1) {
            let worker = PoolWorker {
                id,
                receiver: job_receiver.clone(),
                sender: result_sender.clone(),
            };
            handles.push(tokio::spawn(worker.into_running()));
        }

        CollectorPool {
            job_sender,
            result_receiver,
            workers: handles,
        }
    }

    pub(crate) async fn submit(&self, collector: ArcCollector) -> bool {
        self.job_sender.send(collector).await.is_ok()
    }

    pub(crate) async fn next_result(&mut self) -> Option<CollectResult> {
        self.result_receiver.recv().await
    }

    /// Close the job queue and wait for every worker to drain and exit.
    pub(crate) async fn shutdown(self) {
        drop(self.job_sender);
        drop(self.result_receiver);
        for handle in self.workers {
            let _ = handle.await;
        }
    }
}

struct PoolWorker {
    id: usize,
    receiver: kanal::AsyncReceiver<ArcCollector>,
    sender: mpsc::UnboundedSender<CollectResult>,
}

impl PoolWorker {
    async fn into_running(self) {
        while let Ok(collector) = self.receiver.recv().await {
            let result = collector.collect().await;
            if self.sender.send((collector.name(), result)).is_err() {
                break;
            }
        }
        trace!("collect worker {} stopped", self.id);
    }
}
