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

//! The thin integrator-facing wiring named out of scope in Section 1: a
//! builder plus the assembled `Sink` handle.

use std::sync::Arc;

use crate::config::SinkConfig;
use crate::dcp::{DcpClient, DcpEventHandler};
use crate::error::{Result, SinkError};
use crate::event::{DefaultMapper, Mapper};
use crate::handler::ResponseHandler;
use crate::listener::Listener;
use crate::metrics::MetricsCollector;
use crate::processor::Processor;
use crate::rebalance::RebalanceCoordinator;
use crate::target::{KvAgent, TargetKvClient};

/// The fully assembled sink: a `Processor`, the `Listener` that feeds it,
/// and the rebalance hooks wired into the upstream `DcpClient`.
pub struct Sink<A: KvAgent + 'static, D: DcpClient + 'static> {
    processor: Arc<Processor<A, D>>,
    listener: Arc<Listener<A, D>>,
    dcp_client: Arc<D>,
    rebalance: Arc<RebalanceCoordinator<A, D>>,
}

impl<A: KvAgent + 'static, D: DcpClient + 'static> Sink<A, D> {
    /// The event→action bridge; integrators call `listener().on_event(..)`
    /// from their DCP delivery loop.
    pub fn listener(&self) -> Arc<Listener<A, D>> {
        Arc::clone(&self.listener)
    }

    /// Direct access to the processor, e.g. to read `metrics()` snapshots.
    pub fn processor(&self) -> Arc<Processor<A, D>> {
        Arc::clone(&self.processor)
    }

    /// Register rebalance hooks, spawn the flush ticker, and start the
    /// upstream stream.
    pub async fn run(&self) -> Result<()> {
        self.dcp_client.wait_until_ready().await?;
        self.dcp_client
            .set_event_handler(Arc::clone(&self.rebalance) as Arc<dyn DcpEventHandler>);

        let processor = Arc::clone(&self.processor);
        tokio::spawn(async move {
            processor.start_processor().await;
        });

        self.dcp_client.start().await
    }

    /// Stop the processor (final flush included) and the upstream client.
    pub async fn close(&self) -> Result<()> {
        self.processor.close().await;
        self.dcp_client.close().await
    }
}

/// Builds a `Sink`. Mirrors the teacher's `Client::new(policy, hosts)`
/// constructor shape, but split into a builder because this crate has more
/// independently-optional collaborators (mapper, handler, logger).
pub struct SinkBuilder<A: KvAgent + 'static, D: DcpClient + 'static> {
    config: SinkConfig,
    agent: Option<Arc<A>>,
    dcp_client: Option<Arc<D>>,
    mapper: Option<Arc<dyn Mapper<A>>>,
    handler: Option<Arc<dyn ResponseHandler<A>>>,
}

impl<A: KvAgent + 'static, D: DcpClient + 'static> SinkBuilder<A, D> {
    /// Start a builder from a resolved configuration.
    pub fn new(config: SinkConfig) -> Self {
        SinkBuilder {
            config,
            agent: None,
            dcp_client: None,
            mapper: None,
            handler: None,
        }
    }

    /// Provide the target KV agent (the out-of-scope wire-protocol library).
    pub fn set_agent(mut self, agent: Arc<A>) -> Self {
        self.agent = Some(agent);
        self
    }

    /// Provide the upstream DCP client.
    pub fn set_dcp_client(mut self, dcp_client: Arc<D>) -> Self {
        self.dcp_client = Some(dcp_client);
        self
    }

    /// Install the event→action transform. Defaults to `DefaultMapper`
    /// (pass the source document through verbatim) if never called.
    pub fn set_mapper(mut self, mapper: Arc<dyn Mapper<A>>) -> Self {
        self.mapper = Some(mapper);
        self
    }

    /// Install the per-action success/error handler. When never called, any
    /// non-benign action error is fatal (Section 4.3).
    pub fn set_response_handler(mut self, handler: Arc<dyn ResponseHandler<A>>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Install the process-wide logger pointer, mirroring the "global
    /// mutable logger, injected dependency" design note (Section 9).
    pub fn set_logger(self, logger: Box<dyn log::Log>) -> Self {
        if log::set_boxed_logger(logger).is_ok() {
            log::set_max_level(log::LevelFilter::Info);
        }
        self
    }

    /// Connect to the target cluster and assemble the sink. Fatal at
    /// startup on a missing collaborator or a failed target connect.
    pub async fn build(self) -> Result<Sink<A, D>> {
        let agent = self
            .agent
            .ok_or_else(|| SinkError::Configuration("target agent not set".into()))?;
        let dcp_client = self
            .dcp_client
            .ok_or_else(|| SinkError::Configuration("dcp client not set".into()))?;
        let mapper: Arc<dyn Mapper<A>> = self.mapper.unwrap_or_else(|| Arc::new(DefaultMapper));

        agent
            .connect(self.config.connection_timeout)
            .await
            .map_err(|e| SinkError::TargetConnect(e.to_string()))?;

        let target_client = TargetKvClient::new(agent);
        let metrics = Arc::new(MetricsCollector::new());

        let processor = Arc::new(Processor::new(
            self.config.clone(),
            target_client.clone(),
            self.handler,
            Arc::clone(&dcp_client),
            Arc::clone(&metrics),
        ));
        let listener = Arc::new(Listener::new(
            Arc::clone(&processor),
            mapper,
            target_client,
            Arc::clone(&metrics),
            self.config.batch_size_limit,
        ));
        let rebalance = Arc::new(RebalanceCoordinator::new(Arc::clone(&processor)));

        Ok(Sink {
            processor,
            listener,
            dcp_client,
            rebalance,
        })
    }
}
