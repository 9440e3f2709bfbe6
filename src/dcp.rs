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

//! The out-of-scope upstream collaborator: a DCP source client. Modeled as
//! a trait so the engine (Listener, Processor, RebalanceCoordinator) can be
//! exercised against a test double without a real cluster.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::event::Event;

/// Opaque handle from the upstream client carrying one event and its Ack.
/// `ack()` is safe to call more than once; only the first call has effect,
/// matching the "idempotent, exactly-once-observed" contract in Section 3.
pub struct ListenerContext {
    event: Event,
    acked: Arc<AtomicBool>,
    ack_fn: Arc<dyn Fn() + Send + Sync>,
}

impl ListenerContext {
    /// Wrap an event with the upstream-supplied Ack callback.
    pub fn new(event: Event, ack_fn: Arc<dyn Fn() + Send + Sync>) -> Self {
        ListenerContext {
            event,
            acked: Arc::new(AtomicBool::new(false)),
            ack_fn,
        }
    }

    /// The wrapped event.
    pub fn event(&self) -> &Event {
        &self.event
    }

    /// Acknowledge the event to the upstream DCP client. Idempotent.
    pub fn ack(&self) {
        if !self.acked.swap(true, Ordering::SeqCst) {
            (self.ack_fn)();
        }
    }

    /// Whether `ack()` has already fired, for tests asserting "exactly once".
    pub fn is_acked(&self) -> bool {
        self.acked.load(Ordering::SeqCst)
    }
}

/// Lifecycle hooks the upstream client invokes around rebalances. Wired to
/// `crate::rebalance::RebalanceCoordinator` by the builder.
pub trait DcpEventHandler: Send + Sync {
    /// Fired before a new partition stream starts (after a rebalance settles).
    fn before_stream_start(&self);
    /// Fired before an existing partition stream stops, unless the stream is
    /// finite (e.g. a bounded backfill that is expected to end on its own).
    fn before_stream_stop(&self, stream_is_finite: bool);
}

/// The upstream DCP client surface this crate consumes. Out of scope per
/// Section 1; a real implementation wraps a DCP protocol library. Checkpoint
/// type is forced to `manual` — `commit()` is only ever called by
/// `crate::processor::Processor::flush_messages`.
#[async_trait::async_trait]
pub trait DcpClient: Send + Sync {
    /// Block until the client has a cluster map and can start streaming.
    async fn wait_until_ready(&self) -> crate::error::Result<()>;

    /// Begin streaming events to the registered listener.
    async fn start(&self) -> crate::error::Result<()>;

    /// Stop streaming and release upstream resources. Idempotent.
    async fn close(&self) -> crate::error::Result<()>;

    /// Manually commit the checkpoint up to the highest Ack'd position.
    async fn commit(&self) -> crate::error::Result<()>;

    /// Register the lifecycle hooks used for rebalance coordination.
    fn set_event_handler(&self, handler: Arc<dyn DcpEventHandler>);
}
