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

//! The user-extensible per-action response handler.

use std::sync::Arc;

use tokio::sync::{oneshot, Semaphore};

use crate::action::Action;
use crate::error::{Result, SinkError};
use crate::target::{KvAgent, TargetKvClient};

/// Passed to `ResponseHandler::on_success` / `on_error` once per action,
/// after classification. Lifetime is the single handler invocation; the
/// bound `retry` re-enters the same `inflight` semaphore the bulk dispatch
/// used, so a retry storm cannot exceed `max_inflight_requests` either.
pub struct HandlerContext<A: KvAgent> {
    action: Action,
    error: Option<SinkError>,
    target_client: TargetKvClient<A>,
    inflight: Arc<Semaphore>,
}

impl<A: KvAgent> HandlerContext<A> {
    pub(crate) fn new(
        action: Action,
        error: Option<SinkError>,
        target_client: TargetKvClient<A>,
        inflight: Arc<Semaphore>,
    ) -> Self {
        HandlerContext {
            action,
            error,
            target_client,
            inflight,
        }
    }

    /// The action this invocation is about.
    pub fn action(&self) -> &Action {
        &self.action
    }

    /// `Some` for `on_error`, always `None` for `on_success`.
    pub fn error(&self) -> Option<&SinkError> {
        self.error.as_ref()
    }

    /// Read-only access to the target, e.g. to inspect current state before
    /// deciding whether to retry.
    pub fn target_client(&self) -> &TargetKvClient<A> {
        &self.target_client
    }

    /// Resubmit the same action. Acquires an `inflight` permit (blocking
    /// until one is free, same as the original bulk dispatch) and returns
    /// the terminal outcome once the target responds.
    pub async fn retry(&self) -> Result<()> {
        let permit = Arc::clone(&self.inflight).acquire_owned().await;
        let permit = permit.map_err(|_| SinkError::Network("inflight semaphore closed".into()))?;
        let (tx, rx) = oneshot::channel();
        self.target_client
            .execute(
                self.action.clone(),
                Box::new(move |result| {
                    drop(permit);
                    let _ = tx.send(result);
                }),
            )
            .await;
        rx.await
            .map_err(|_| SinkError::Network("retry callback dropped".into()))?
    }
}

/// User-supplied outcome handler. Both methods default to no-ops so a
/// handler can implement only the one it cares about; when no handler is
/// installed at all, `crate::processor::Processor` aborts on any non-benign
/// error instead of calling this trait (see Section 4.4 classification).
#[async_trait::async_trait]
pub trait ResponseHandler<A: KvAgent + 'static>: Send + Sync {
    /// Called when an action succeeded, or failed with a benign KV status.
    async fn on_success(&self, _ctx: HandlerContext<A>) {}

    /// Called when an action failed with a non-benign status. `ctx.retry()`
    /// resubmits the same action.
    async fn on_error(&self, _ctx: HandlerContext<A>) {}
}
