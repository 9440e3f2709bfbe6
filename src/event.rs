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

//! The immutable source-side record the Listener builds from one upstream
//! DCP delivery, and the `Mapper` trait that turns it into target actions.

use std::time::SystemTime;

use crate::action::Action;
use crate::target::{KvAgent, TargetKvClient};

/// Which DCP mutation kind produced this event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A document was created or updated.
    Mutated,
    /// A document was explicitly deleted.
    Deleted,
    /// A document expired via its TTL.
    Expired,
}

/// An immutable record of one DCP change. Constructed by the Listener from
/// the upstream event; dropped after the corresponding Ack.
#[derive(Debug, Clone)]
pub struct Event {
    /// Source document key.
    pub key: Vec<u8>,
    /// Source document value; empty for `Deleted` / `Expired`.
    pub value: Vec<u8>,
    /// Source collection name the event originated from.
    pub collection_name: String,
    /// Wall-clock time the event was produced upstream.
    pub event_time: SystemTime,
    /// 64-bit version tag from the source document.
    pub cas: u64,
    /// Source partition (vBucket) id.
    pub vb_id: u16,
    /// Monotonically increasing per-partition sequence number.
    pub seq_no: u64,
    /// Revision number of the source document.
    pub rev_no: u64,
    /// The mutation kind.
    pub kind: EventKind,
}

/// Carries one `Event` plus read access to the target, handed to `Mapper`.
pub struct EventContext<'a, A: KvAgent> {
    /// The DCP event being mapped.
    pub event: &'a Event,
    /// Read-only access to the target client, e.g. to look up an existing
    /// document before deciding how to transform this event.
    pub target_client: &'a TargetKvClient<A>,
}

/// User-supplied transform from one DCP event to zero or more target
/// actions. Invoked synchronously on the upstream-delivery task, so it must
/// be non-blocking and side-effect-free beyond producing actions — the
/// synchronous signature enforces that it cannot `.await` the target client
/// from the hot path.
pub trait Mapper<A: KvAgent>: Send + Sync {
    /// Produce the actions this event should become. An empty vector means
    /// the event is filtered: the Listener still Acks it immediately.
    fn map(&self, ctx: &EventContext<A>) -> Vec<Action>;
}

/// The default mapper named in Section 8, scenario S1: pass the event
/// through as a `Set` (or a plain `Delete` for deletions/expirations) using
/// the source key and value verbatim.
pub struct DefaultMapper;

impl<A: KvAgent> Mapper<A> for DefaultMapper {
    fn map(&self, ctx: &EventContext<A>) -> Vec<Action> {
        match ctx.event.kind {
            EventKind::Mutated => vec![Action::new_set(
                ctx.event.key.clone(),
                ctx.event.value.clone(),
            )],
            EventKind::Deleted | EventKind::Expired => {
                vec![Action::new_delete(ctx.event.key.clone())]
            }
        }
    }
}
