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

//! Configuration types the core consumes (Section 3). Loading a YAML file
//! into these types is deliberately thin — full config-file plumbing
//! (env discovery, secret backends, ...) is the out-of-scope integrator
//! wiring named in Section 1; resolving the byte-size union and `${VAR}`
//! expansion, however, is ambient behavior these types own themselves.

use std::fmt;
use std::time::Duration;

use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;

use crate::error::{Result, SinkError};

/// `batch_byte_size_limit` / `connection_buffer_size` accept either a plain
/// integer byte count or a human string like `"10mb"`. Resolved to bytes at
/// deserialization time (Section 9, Open Question).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteSize(pub u64);

impl ByteSize {
    /// The resolved byte count.
    pub fn bytes(self) -> u64 {
        self.0
    }

    fn parse_human(s: &str) -> std::result::Result<u64, String> {
        let s = s.trim();
        let lower = s.to_ascii_lowercase();
        let (digits, multiplier) = if let Some(n) = lower.strip_suffix("kb") {
            (n, 1024)
        } else if let Some(n) = lower.strip_suffix("mb") {
            (n, 1024 * 1024)
        } else if let Some(n) = lower.strip_suffix("gb") {
            (n, 1024 * 1024 * 1024)
        } else if let Some(n) = lower.strip_suffix('b') {
            (n, 1)
        } else {
            (lower.as_str(), 1)
        };
        digits
            .trim()
            .parse::<u64>()
            .map(|n| n * multiplier)
            .map_err(|_| format!("invalid byte size: {:?}", s))
    }
}

impl<'de> Deserialize<'de> for ByteSize {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ByteSizeVisitor;

        impl<'de> Visitor<'de> for ByteSizeVisitor {
            type Value = ByteSize;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an integer byte count or a human string like \"10mb\"")
            }

            fn visit_u64<E>(self, v: u64) -> std::result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(ByteSize(v))
            }

            fn visit_i64<E>(self, v: i64) -> std::result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(ByteSize(v as u64))
            }

            fn visit_str<E>(self, v: &str) -> std::result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                ByteSize::parse_human(v).map(ByteSize).map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_any(ByteSizeVisitor)
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_duration(&raw).map_err(de::Error::custom)
}

fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    let split_at = s
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| format!("invalid duration: {:?}", s))?;
    let (digits, unit) = s.split_at(split_at);
    let n: u64 = digits
        .parse()
        .map_err(|_| format!("invalid duration: {:?}", s))?;
    match unit {
        "ns" => Ok(Duration::from_nanos(n)),
        "us" => Ok(Duration::from_micros(n)),
        "ms" => Ok(Duration::from_millis(n)),
        "s" => Ok(Duration::from_secs(n)),
        "m" => Ok(Duration::from_secs(n * 60)),
        "h" => Ok(Duration::from_secs(n * 3600)),
        other => Err(format!("unknown duration unit {:?} in {:?}", other, s)),
    }
}

/// Target bucket access and sink-engine tuning knobs (Section 3).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Max actions per batch before a size-triggered flush.
    pub batch_size_limit: usize,
    /// Max bytes per batch before a byte-triggered flush.
    pub batch_byte_size_limit: ByteSize,
    /// Flush timer period.
    #[serde(deserialize_with = "deserialize_duration")]
    pub batch_ticker_duration: Duration,
    /// Per-bulk-dispatch deadline.
    #[serde(deserialize_with = "deserialize_duration")]
    pub request_timeout: Duration,
    /// Concurrency ceiling for outstanding target requests.
    pub max_inflight_requests: usize,
    /// Target-side connection pool size per node.
    pub write_pool_size_per_node: usize,
    /// Target connect deadline.
    #[serde(deserialize_with = "deserialize_duration")]
    pub connection_timeout: Duration,
    /// Per-connection KV buffer size.
    pub connection_buffer_size: ByteSize,
    /// Default target scope.
    pub scope_name: String,
    /// Default target collection.
    pub collection_name: String,
    /// Whether to use TLS against the target cluster.
    pub secure_connection: bool,
    /// TLS CA path; may contain `${VAR}` expansions (Section 6).
    pub root_ca_path: Option<String>,
    /// Target bucket auth username.
    pub username: Option<String>,
    /// Target bucket auth password.
    pub password: Option<String>,
    /// Target bucket name.
    pub bucket_name: String,
    /// Target cluster seed hosts.
    pub hosts: Vec<String>,
}

impl Default for SinkConfig {
    fn default() -> Self {
        SinkConfig {
            batch_size_limit: 2048,
            batch_byte_size_limit: ByteSize(10 * 1024 * 1024),
            batch_ticker_duration: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            max_inflight_requests: 2048,
            write_pool_size_per_node: 1,
            connection_timeout: Duration::from_secs(60),
            connection_buffer_size: ByteSize(20 * 1024 * 1024),
            scope_name: "_default".to_string(),
            collection_name: "_default".to_string(),
            secure_connection: false,
            root_ca_path: None,
            username: None,
            password: None,
            bucket_name: String::new(),
            hosts: Vec::new(),
        }
    }
}

impl SinkConfig {
    /// Parse a `couchbase:`-rooted YAML document into a `SinkConfig`.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct Wrapper {
            couchbase: SinkConfig,
        }
        let wrapper: Wrapper =
            serde_yaml::from_str(yaml).map_err(|e| SinkError::Configuration(e.to_string()))?;
        wrapper.couchbase.resolve_env()
    }

    /// Expand `${VAR}` references in `root_ca_path` against the process
    /// environment and validate the rest of the struct.
    fn resolve_env(mut self) -> Result<Self> {
        if let Some(path) = self.root_ca_path.take() {
            self.root_ca_path = Some(expand_env(&path)?);
        }
        if self.bucket_name.is_empty() {
            return Err(SinkError::Configuration("bucket_name is required".into()));
        }
        if self.hosts.is_empty() {
            return Err(SinkError::Configuration("hosts must not be empty".into()));
        }
        Ok(self)
    }
}

/// Expand `${VAR}` references against the process environment. Unset
/// variables are an error rather than silently expanding to empty string.
fn expand_env(input: &str) -> Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .ok_or_else(|| SinkError::Configuration(format!("unterminated ${{ in {:?}", input)))?;
        let var_name = &after[..end];
        let value = std::env::var(var_name)
            .map_err(|_| SinkError::Configuration(format!("undefined env var {:?}", var_name)))?;
        out.push_str(&value);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}
