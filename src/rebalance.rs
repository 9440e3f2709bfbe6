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

//! Section 4.6: hooks the upstream DCP client's rebalance lifecycle into
//! the processor's pause/resume state machine.

use std::sync::Arc;

use crate::dcp::{DcpClient, DcpEventHandler};
use crate::processor::Processor;
use crate::target::KvAgent;

/// Pauses and resumes the `Processor` around upstream rebalances. The
/// upstream client calls these hooks synchronously; each one spawns the
/// matching async `Processor` call rather than blocking the caller.
pub struct RebalanceCoordinator<A: KvAgent + 'static, D: DcpClient + 'static> {
    processor: Arc<Processor<A, D>>,
}

impl<A: KvAgent + 'static, D: DcpClient + 'static> RebalanceCoordinator<A, D> {
    pub fn new(processor: Arc<Processor<A, D>>) -> Self {
        RebalanceCoordinator { processor }
    }
}

impl<A: KvAgent + 'static, D: DcpClient + 'static> DcpEventHandler for RebalanceCoordinator<A, D> {
    fn before_stream_start(&self) {
        let processor = Arc::clone(&self.processor);
        tokio::spawn(async move {
            processor.prepare_end_rebalancing().await;
        });
    }

    fn before_stream_stop(&self, stream_is_finite: bool) {
        if stream_is_finite {
            return;
        }
        let processor = Arc::clone(&self.processor);
        tokio::spawn(async move {
            processor.prepare_start_rebalancing().await;
        });
    }
}
