// Copyright 2015-2020 Aerospike, Inc.
//
// Portions may be licensed to Aerospike, Inc. under one or more contributor
// license agreements.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License. You may obtain a copy of
// the License at http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied. See the
// License for the specific language governing permissions and limitations under
// the License.

//! The batch/flush processor: Section 4.4, the largest single component.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use tokio::sync::{Mutex, Notify, Semaphore};

use crate::action::Action;
use crate::config::SinkConfig;
use crate::dcp::{DcpClient, ListenerContext};
use crate::error::{Result, SinkError};
use crate::handler::{HandlerContext, ResponseHandler};
use crate::metrics::MetricsCollector;
use crate::processor::batch::Batch;
use crate::target::{KvAgent, TargetKvClient};

/// Called once, from a dedicated task, when an action fails with a
/// non-benign error and no `ResponseHandler` is installed. Defaults to
/// `std::process::abort`, matching "without a user handler, correctness-
/// critical failures must not be silently dropped" (Section 4.3). Tests
/// inject a recording hook instead of actually tearing down the process.
pub type FatalHook = Arc<dyn Fn(&SinkError) + Send + Sync>;

fn default_fatal_hook() -> FatalHook {
    Arc::new(|err: &SinkError| {
        log::error!("fatal: action failed with no response handler installed: {}", err);
        std::process::abort();
    })
}

/// Collects actions, owns the flush scheduler, runs bounded-concurrency
/// bulk dispatch, classifies outcomes, and drives checkpoint commit.
pub struct Processor<A: KvAgent + 'static, D: DcpClient + 'static> {
    batch: Mutex<Batch>,
    config: SinkConfig,
    inflight: Arc<Semaphore>,
    target_client: TargetKvClient<A>,
    handler: Option<Arc<dyn ResponseHandler<A>>>,
    dcp_client: Arc<D>,
    metrics: Arc<MetricsCollector>,
    fatal_hook: FatalHook,
    shutdown: Notify,
    closed: AtomicBool,
}

impl<A: KvAgent + 'static, D: DcpClient + 'static> Processor<A, D> {
    /// Build a processor. `handler` is optional: when absent, any
    /// non-benign action error is fatal (Section 4.3).
    pub fn new(
        config: SinkConfig,
        target_client: TargetKvClient<A>,
        handler: Option<Arc<dyn ResponseHandler<A>>>,
        dcp_client: Arc<D>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        let inflight = Arc::new(Semaphore::new(config.max_inflight_requests));
        Processor {
            batch: Mutex::new(Batch::default()),
            config,
            inflight,
            target_client,
            handler,
            dcp_client,
            metrics,
            fatal_hook: default_fatal_hook(),
            shutdown: Notify::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Override the fatal-path hook. Intended for tests; production callers
    /// should leave the default `std::process::abort` behavior in place.
    pub fn with_fatal_hook(mut self, hook: FatalHook) -> Self {
        self.fatal_hook = hook;
        self
    }

    /// Current gauge snapshot.
    pub fn metrics(&self) -> MetricsSnapshotHandle<'_, A, D> {
        MetricsSnapshotHandle { processor: self }
    }

    /// Append `actions` to the batch under the flush mutex. Acks the event
    /// exactly once, on the chunk carrying `is_last_chunk = true`. Triggers
    /// a flush (outside the lock) when either threshold is crossed.
    pub async fn add_actions(
        &self,
        listener_ctx: &ListenerContext,
        event_time: SystemTime,
        actions: Vec<Action>,
        is_last_chunk: bool,
    ) {
        let (size, byte_size) = {
            let mut guard = self.batch.lock().await;
            guard.append(actions);
            if is_last_chunk {
                listener_ctx.ack();
                if let Ok(elapsed) = SystemTime::now().duration_since(event_time) {
                    self.metrics.record_process_latency(elapsed);
                }
            }
            (guard.len(), guard.byte_size())
        };

        if size >= self.config.batch_size_limit
            || byte_size >= self.config.batch_byte_size_limit.bytes() as usize
        {
            self.flush_messages().await;
        }
    }

    /// Drive the periodic flush timer until `close()` is called.
    pub async fn start_processor(&self) {
        let mut interval = tokio::time::interval(self.config.batch_ticker_duration);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        interval.tick().await; // first tick fires immediately; consume it
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.flush_messages().await;
                }
                () = self.shutdown.notified() => {
                    break;
                }
            }
        }
    }

    /// Stop the ticker, run a final flush, and close the target client.
    /// Idempotent.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shutdown.notify_waiters();
        self.flush_messages().await;
        self.target_client.close().await;
    }

    /// Enter rebalance: discard the buffered batch and suppress flushes
    /// until `prepare_end_rebalancing` clears the flag.
    pub async fn prepare_start_rebalancing(&self) {
        let mut guard = self.batch.lock().await;
        guard.start_rebalancing();
    }

    /// Leave rebalance: resume normal flush behavior.
    pub async fn prepare_end_rebalancing(&self) {
        let mut guard = self.batch.lock().await;
        guard.end_rebalancing();
    }

    /// `true` while paused for rebalance (test/observability helper).
    pub async fn is_rebalancing(&self) -> bool {
        self.batch.lock().await.is_rebalancing()
    }

    /// Serialized on the flush mutex: a single flush (including its bulk
    /// dispatch) always runs to completion before the next one starts.
    async fn flush_messages(&self) {
        let mut guard = self.batch.lock().await;
        if guard.is_rebalancing() {
            return;
        }
        if guard.is_empty() {
            drop(guard);
            self.commit_checkpoint().await;
            return;
        }
        let actions = guard.take();
        let size = actions.len();
        let byte_size: usize = actions.iter().map(Action::size).sum();
        self.bulk_request(actions, size, byte_size).await;
        drop(guard);
        self.commit_checkpoint().await;
    }

    /// Dispatch every action concurrently, bounded by `inflight`, and wait
    /// for every callback to be classified before returning.
    async fn bulk_request(&self, actions: Vec<Action>, size: usize, byte_size: usize) {
        let start = Instant::now();
        let deadline = start + self.config.request_timeout;

        let jobs = actions.into_iter().map(|action| {
            let target_client = self.target_client.clone();
            let handler = self.handler.clone();
            let inflight = Arc::clone(&self.inflight);
            let fatal_hook = Arc::clone(&self.fatal_hook);

            async move {
                let permit = match Arc::clone(&inflight).acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return, // semaphore closed during shutdown race
                };
                let outcome = execute_with_deadline(&target_client, action.clone(), deadline).await;
                drop(permit);
                classify(action, outcome, handler, target_client, inflight, fatal_hook).await;
            }
        });
        futures::future::join_all(jobs).await;

        self.metrics.record_bulk_request(start.elapsed(), size, byte_size);
    }

    async fn commit_checkpoint(&self) {
        if let Err(err) = self.dcp_client.commit().await {
            log::error!("dcp checkpoint commit failed: {}", err);
        }
    }
}

async fn execute_with_deadline<A: KvAgent>(
    target_client: &TargetKvClient<A>,
    action: Action,
    deadline: Instant,
) -> Result<()> {
    let (tx, rx) = tokio::sync::oneshot::channel();
    target_client
        .execute(
            action,
            Box::new(move |result| {
                let _ = tx.send(result);
            }),
        )
        .await;

    match tokio::time::timeout_at(deadline.into(), rx).await {
        Ok(Ok(result)) => result,
        Ok(Err(_)) => Err(SinkError::Network("callback sender dropped".into())),
        Err(_) => Err(SinkError::Timeout),
    }
}

/// `Ok(())` and benign KV statuses route to `on_success`; everything else
/// routes to `on_error`, or is fatal when no handler is installed.
async fn classify<A: KvAgent + 'static>(
    action: Action,
    outcome: Result<()>,
    handler: Option<Arc<dyn ResponseHandler<A>>>,
    target_client: TargetKvClient<A>,
    inflight: Arc<Semaphore>,
    fatal_hook: FatalHook,
) {
    match outcome {
        Ok(()) => {
            if let Some(handler) = handler {
                let ctx = HandlerContext::new(action, None, target_client, inflight);
                handler.on_success(ctx).await;
            }
        }
        Err(err) if err.is_benign() => {
            if let Some(handler) = handler {
                let ctx = HandlerContext::new(action, None, target_client, inflight);
                handler.on_success(ctx).await;
            }
        }
        Err(err) => match handler {
            Some(handler) => {
                let ctx = HandlerContext::new(action, Some(err), target_client, inflight);
                handler.on_error(ctx).await;
            }
            None => fatal_hook(&err),
        },
    }
}

/// Thin wrapper so `Processor::metrics()` reads naturally at call sites
/// without exposing the `Arc<MetricsCollector>` internals directly.
pub struct MetricsSnapshotHandle<'a, A: KvAgent + 'static, D: DcpClient + 'static> {
    processor: &'a Processor<A, D>,
}

impl<'a, A: KvAgent + 'static, D: DcpClient + 'static> MetricsSnapshotHandle<'a, A, D> {
    /// Read every gauge as of now.
    pub fn snapshot(&self) -> crate::metrics::MetricsSnapshot {
        self.processor.metrics.snapshot()
    }
}
