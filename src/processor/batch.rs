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

use crate::action::Action;

/// The mutable buffer a `Processor` accumulates actions into between
/// flushes, plus the rebalancing flag. Both live behind the same mutex
/// (Section 5: "written under flush mutex; read under flush mutex").
#[derive(Default)]
pub(crate) struct Batch {
    actions: Vec<Action>,
    byte_size: usize,
    rebalancing: bool,
}

impl Batch {
    pub(crate) fn append(&mut self, actions: Vec<Action>) {
        for action in &actions {
            self.byte_size += action.size();
        }
        self.actions.extend(actions);
    }

    pub(crate) fn len(&self) -> usize {
        self.actions.len()
    }

    pub(crate) fn byte_size(&self) -> usize {
        self.byte_size
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub(crate) fn is_rebalancing(&self) -> bool {
        self.rebalancing
    }

    pub(crate) fn start_rebalancing(&mut self) {
        self.rebalancing = true;
        self.clear();
    }

    pub(crate) fn end_rebalancing(&mut self) {
        self.rebalancing = false;
    }

    /// Take the buffered actions, resetting size accounting to zero.
    pub(crate) fn take(&mut self) -> Vec<Action> {
        self.byte_size = 0;
        std::mem::take(&mut self.actions)
    }

    fn clear(&mut self) {
        self.actions.clear();
        self.byte_size = 0;
    }
}
