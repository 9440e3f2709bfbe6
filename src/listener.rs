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

//! Section 4.5: adapts one upstream DCP delivery into zero or more
//! `add_actions` calls, guaranteeing Ack fires exactly once per event.

use std::sync::Arc;
use std::time::Instant;

use crate::dcp::{DcpClient, ListenerContext};
use crate::event::{EventContext, Mapper};
use crate::metrics::MetricsCollector;
use crate::processor::Processor;
use crate::target::{KvAgent, TargetKvClient};

/// Bridges the upstream DCP stream to the batch processor.
pub struct Listener<A: KvAgent + 'static, D: DcpClient + 'static> {
    processor: Arc<Processor<A, D>>,
    mapper: Arc<dyn Mapper<A>>,
    target_client: TargetKvClient<A>,
    metrics: Arc<MetricsCollector>,
    batch_size_limit: usize,
}

impl<A: KvAgent + 'static, D: DcpClient + 'static> Listener<A, D> {
    pub fn new(
        processor: Arc<Processor<A, D>>,
        mapper: Arc<dyn Mapper<A>>,
        target_client: TargetKvClient<A>,
        metrics: Arc<MetricsCollector>,
        batch_size_limit: usize,
    ) -> Self {
        Listener {
            processor,
            mapper,
            target_client,
            metrics,
            batch_size_limit,
        }
    }

    /// Invoked once per upstream event.
    pub async fn on_event(&self, listener_ctx: ListenerContext) {
        let event = listener_ctx.event().clone();
        let event_time = event.event_time;

        let ctx = EventContext {
            event: &event,
            target_client: &self.target_client,
        };
        let mapper_start = Instant::now();
        let actions = self.mapper.map(&ctx);
        self.metrics.record_mapper_latency(mapper_start.elapsed());

        if actions.is_empty() {
            listener_ctx.ack();
            return;
        }

        if actions.len() <= self.batch_size_limit {
            self.processor
                .add_actions(&listener_ctx, event_time, actions, true)
                .await;
            return;
        }

        let limit = self.batch_size_limit;
        let chunks: Vec<Vec<_>> = actions.chunks(limit).map(<[_]>::to_vec).collect();
        let last_index = chunks.len() - 1;
        for (index, chunk) in chunks.into_iter().enumerate() {
            let is_last_chunk = index == last_index;
            self.processor
                .add_actions(&listener_ctx, event_time, chunk, is_last_chunk)
                .await;
        }
    }
}
