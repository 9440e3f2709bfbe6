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

//! A change-data-capture sink connector.
//!
//! Consumes an ordered, per-partition stream of mutation/deletion/
//! expiration events from a source bucket's database change protocol
//! (DCP) and reflects them, possibly transformed by a user-supplied
//! [`Mapper`](event::Mapper), into a target bucket speaking the same
//! binary KV protocol.
//!
//! The moving parts:
//!
//! - [`action`] — the tagged command sent to the target per event.
//! - [`target`] — the uniform async KV dispatcher and its `KvAgent` seam.
//! - [`handler`] — the user-extensible per-action success/error callback.
//! - [`event`] / [`listener`] — the DCP-event-to-action bridge.
//! - [`processor`] — the batching/flush scheduler and bulk dispatcher.
//! - [`rebalance`] — pauses/resumes the processor around upstream rebalances.
//! - [`dcp`] — the out-of-scope upstream collaborator, modeled as a trait.
//! - [`config`] — the options table the engine consumes.
//! - [`builder`] — thin integrator wiring: `SinkBuilder` → `Sink`.

pub mod action;
pub mod builder;
pub mod config;
pub mod dcp;
pub mod error;
pub mod event;
pub mod handler;
pub mod listener;
pub mod metrics;
pub mod processor;
pub mod rebalance;
pub mod target;

pub use action::{Action, DocumentFlags, PathValue, WriteOptions};
pub use builder::{Sink, SinkBuilder};
pub use config::{ByteSize, SinkConfig};
pub use dcp::{DcpClient, DcpEventHandler, ListenerContext};
pub use error::{Result, SinkError};
pub use event::{DefaultMapper, Event, EventContext, EventKind, Mapper};
pub use handler::{HandlerContext, ResponseHandler};
pub use listener::Listener;
pub use metrics::{MetricsCollector, MetricsSnapshot};
pub use processor::Processor;
pub use rebalance::RebalanceCoordinator;
pub use target::{KvAgent, KvCallback, KvStatus, TargetKvClient};
