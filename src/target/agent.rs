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

use std::time::Duration;

use crate::action::Action;
use crate::error::Result;

/// One-shot completion callback. The agent (or `TargetKvClient` on a
/// synchronous pre-dispatch failure) must invoke this exactly once per
/// `execute` call, on every code path.
pub type KvCallback = Box<dyn FnOnce(Result<()>) + Send + 'static>;

/// The out-of-scope collaborator: bit-level framing of the target KV wire
/// protocol. A real implementation wraps a KV client library's connection
/// pool (see `write_pool_size_per_node`, `connection_buffer_size` in
/// `crate::config::SinkConfig`); this trait is the seam `TargetKvClient`
/// dispatches through.
///
/// Implementations must invoke `cb` exactly once, including when the op is
/// rejected before being sent (e.g. the agent's send queue is full).
#[async_trait::async_trait]
pub trait KvAgent: Send + Sync {
    /// Dispatch one action. Never blocks the caller beyond enqueueing the
    /// request; the outcome arrives via `cb` on whatever task the agent
    /// schedules completions on.
    async fn dispatch(&self, action: Action, cb: KvCallback);

    /// Read-only fetch, used by user code from within a response handler.
    async fn get(&self, id: &[u8]) -> Result<(Vec<u8>, u64)>;

    /// Blocking connect, bounded by the caller's timeout.
    async fn connect(&self, timeout: Duration) -> Result<()>;

    /// Idempotent shutdown.
    async fn close(&self);
}
