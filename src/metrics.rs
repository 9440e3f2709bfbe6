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

//! Last-observation gauges the Processor and Listener update on every
//! relevant event. Wiring these into a live Prometheus endpoint is the
//! out-of-scope "exposition surface" (Section 1); `snapshot()` is the seam
//! an exporter polls.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// A point-in-time read of every gauge. All fields are last-observation
/// snapshots, not cumulative counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Event arrival to batch-enqueue latency, in milliseconds.
    pub process_latency_ms: u64,
    /// `Mapper::map` invocation latency, in milliseconds.
    pub mapper_process_latency_ms: u64,
    /// Most recent `bulk_request` wall-clock duration, in milliseconds.
    pub bulk_request_process_latency_ms: u64,
    /// Action count in the most recent bulk dispatch.
    pub bulk_request_size: u64,
    /// Byte size of the most recent bulk dispatch.
    pub bulk_request_byte_size: u64,
}

/// Shared, lock-free gauge storage. Cheap to clone (it's a handle).
#[derive(Default)]
pub struct MetricsCollector {
    process_latency_ms: AtomicU64,
    mapper_process_latency_ms: AtomicU64,
    bulk_request_process_latency_ms: AtomicU64,
    bulk_request_size: AtomicU64,
    bulk_request_byte_size: AtomicU64,
}

impl MetricsCollector {
    /// A fresh collector with every gauge at zero.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_process_latency(&self, latency: Duration) {
        self.process_latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_mapper_latency(&self, latency: Duration) {
        self.mapper_process_latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_bulk_request(&self, latency: Duration, size: usize, byte_size: usize) {
        self.bulk_request_process_latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
        self.bulk_request_size.store(size as u64, Ordering::Relaxed);
        self.bulk_request_byte_size
            .store(byte_size as u64, Ordering::Relaxed);
    }

    /// Read every gauge as of now.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            process_latency_ms: self.process_latency_ms.load(Ordering::Relaxed),
            mapper_process_latency_ms: self.mapper_process_latency_ms.load(Ordering::Relaxed),
            bulk_request_process_latency_ms: self
                .bulk_request_process_latency_ms
                .load(Ordering::Relaxed),
            bulk_request_size: self.bulk_request_size.load(Ordering::Relaxed),
            bulk_request_byte_size: self.bulk_request_byte_size.load(Ordering::Relaxed),
        }
    }
}
