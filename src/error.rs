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

//! Error and Result types for the sink connector.

use crate::target::KvStatus;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SinkError>;

/// Errors surfaced by the sink connector.
///
/// Configuration and connect errors are fatal at startup. Target errors are
/// classified by `crate::processor::classify` into benign (treated as
/// success) and actionable (routed to the response handler, or fatal when no
/// handler is installed).
#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    /// Invalid YAML, or a config value outside its accepted range/union.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The target cluster could not be reached within `connection_timeout`.
    #[error("failed to connect to target cluster: {0}")]
    TargetConnect(String),

    /// A response from the target KV protocol carrying a status code.
    #[error("target returned {status:?} for key {key:?}")]
    TargetStatus {
        /// The KV status code reported by the target.
        status: KvStatus,
        /// The action id (document key) the status applies to.
        key: Vec<u8>,
    },

    /// `KvAgent::execute` does not implement the action's variant.
    #[error("unexpected action type")]
    UnexpectedActionType,

    /// The per-bulk `request_timeout` elapsed before the target responded.
    #[error("request timed out")]
    Timeout,

    /// Transport-level failure talking to the target (connection reset, DNS, etc).
    #[error("network error: {0}")]
    Network(String),
}

impl SinkError {
    /// True for KV statuses that mean "the target already reflects the
    /// desired end state" — deleting something already gone, or clearing a
    /// subdoc path that is already absent. These are classified as success.
    pub fn is_benign(&self) -> bool {
        matches!(
            self,
            SinkError::TargetStatus {
                status:
                    KvStatus::KeyNotFound
                        | KvStatus::SubDocPathNotFound
                        | KvStatus::SubDocBadMulti
                        | KvStatus::SubDocMultiPathFailureDeleted,
                ..
            }
        )
    }
}
