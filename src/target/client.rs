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

use std::sync::Arc;
use std::time::Duration;

use crate::action::Action;
use crate::error::{Result, SinkError};
use crate::target::agent::{KvAgent, KvCallback};

/// Uniform async entry point over every `Action` variant. Wraps an opaque
/// `KvAgent`; the contract this type guarantees on top of the agent is
/// "exactly one callback per `execute`, on every path" — including when the
/// action fails the `id` non-empty invariant before ever reaching the agent.
pub struct TargetKvClient<A: KvAgent> {
    agent: Arc<A>,
}

impl<A: KvAgent> TargetKvClient<A> {
    /// Wrap an already-constructed agent.
    pub fn new(agent: Arc<A>) -> Self {
        TargetKvClient { agent }
    }

    /// Dispatch one action. `cb` is invoked exactly once.
    pub async fn execute(&self, action: Action, cb: KvCallback) {
        if action.id().is_empty() {
            cb(Err(SinkError::UnexpectedActionType));
            return;
        }
        self.agent.dispatch(action, cb).await;
    }

    /// Read-only fetch, for use by user code inside a response handler.
    pub async fn get(&self, id: &[u8]) -> Result<(Vec<u8>, u64)> {
        self.agent.get(id).await
    }

    /// Blocking connect bounded by `timeout`.
    pub async fn connect(&self, timeout: Duration) -> Result<()> {
        self.agent.connect(timeout).await
    }

    /// Idempotent shutdown of the underlying agent.
    pub async fn close(&self) {
        self.agent.close().await;
    }
}

impl<A: KvAgent> Clone for TargetKvClient<A> {
    fn clone(&self) -> Self {
        TargetKvClient {
            agent: Arc::clone(&self.agent),
        }
    }
}
