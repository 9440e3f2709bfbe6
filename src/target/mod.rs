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

//! The target-side KV client: a uniform async dispatcher over the action
//! model, wrapping an opaque `KvAgent` (the out-of-scope wire-protocol
//! library).

mod agent;
mod client;

pub use agent::{KvAgent, KvCallback};
pub use client::TargetKvClient;

/// KV-protocol status codes the agent can report back through a callback.
/// Mirrors the Couchbase memcached binary protocol status space closely
/// enough for classification purposes; see `crate::error::SinkError::is_benign`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KvStatus {
    /// Document does not exist.
    KeyNotFound,
    /// Subdoc path does not exist.
    SubDocPathNotFound,
    /// Multi-path subdoc op where at least one sub-op failed.
    SubDocBadMulti,
    /// Multi-path subdoc op failed because the document itself was deleted.
    SubDocMultiPathFailureDeleted,
    /// CAS precondition failed.
    CasMismatch,
    /// Server is over quota / busy; retryable.
    TemporaryFailure,
    /// Catch-all for other target-reported statuses.
    Other,
}
