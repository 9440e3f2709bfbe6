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

//! The target-side command produced by a `Mapper` for one DCP event.

/// Couchbase common-flags: the high byte of the 4-byte document flags field
/// selects the datatype; the low bytes carry compression hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFlags {
    /// Infer the datatype from the stored bytes (flags = 0).
    Infer,
    /// JSON document (0x0200_0000).
    Json,
    /// Opaque binary blob (0x0300_0000).
    Binary,
    /// UTF-8 string (0x0400_0000).
    String,
}

impl DocumentFlags {
    /// Resolve to the raw 4-byte common-flags value written on the wire.
    pub fn as_u32(self) -> u32 {
        match self {
            DocumentFlags::Infer => 0x0000_0000,
            DocumentFlags::Json => 0x0200_0000,
            DocumentFlags::Binary => 0x0300_0000,
            DocumentFlags::String => 0x0400_0000,
        }
    }
}

impl Default for DocumentFlags {
    fn default() -> Self {
        DocumentFlags::Infer
    }
}

/// Shared envelope carried by every mutating action.
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// CAS-conditional write when set; unconditional otherwise.
    pub cas: Option<u64>,
    /// Expiry in seconds; 0 means "no change" / "never" depending on action.
    pub expiry: u32,
    /// Carry the document's existing expiry forward instead of `expiry`.
    pub preserve_expiry: bool,
    /// When true, subdoc operations do not create missing parent documents.
    pub disable_auto_create: bool,
    /// Full-document datatype hint; unused for pure subdoc ops.
    pub document_flags: DocumentFlags,
}

/// One `{path, value}` pair inside a `MultiMutateIn` action.
#[derive(Debug, Clone)]
pub struct PathValue {
    /// Subdoc path the value is written at.
    pub path: Vec<u8>,
    /// Raw value bytes to dict-set at `path`.
    pub value: Vec<u8>,
}

impl PathValue {
    fn size(&self) -> usize {
        self.path.len() + self.value.len()
    }
}

/// A tagged command to apply to the target bucket.
///
/// Each variant carries only the fields it needs; `size()` returns the
/// byte-budget contribution used by the batch's `batch_byte_size` counter.
#[derive(Debug, Clone)]
pub enum Action {
    /// Full-document store.
    Set {
        id: Vec<u8>,
        source: Vec<u8>,
        options: WriteOptions,
    },
    /// Full-document delete.
    Delete { id: Vec<u8>, options: WriteOptions },
    /// Subdoc dict-set at a single path.
    MutateIn {
        id: Vec<u8>,
        path: Vec<u8>,
        source: Vec<u8>,
        options: WriteOptions,
    },
    /// Subdoc dict-set at several paths in one request.
    MultiMutateIn {
        id: Vec<u8>,
        path_values: Vec<PathValue>,
        options: WriteOptions,
    },
    /// Subdoc delete at a single path.
    DeletePath {
        id: Vec<u8>,
        path: Vec<u8>,
        options: WriteOptions,
    },
    /// Subdoc array-push-last at a single path.
    ArrayAppend {
        id: Vec<u8>,
        path: Vec<u8>,
        source: Vec<u8>,
        options: WriteOptions,
    },
    /// Counter increment.
    Increment {
        id: Vec<u8>,
        initial: i64,
        delta: i64,
        options: WriteOptions,
    },
}

impl Action {
    /// The target document key. Invariant: never empty.
    pub fn id(&self) -> &[u8] {
        match self {
            Action::Set { id, .. }
            | Action::Delete { id, .. }
            | Action::MutateIn { id, .. }
            | Action::MultiMutateIn { id, .. }
            | Action::DeletePath { id, .. }
            | Action::ArrayAppend { id, .. }
            | Action::Increment { id, .. } => id,
        }
    }

    /// `len(id) + len(path) + sum(path_values) + len(source)`, used for the
    /// batch's byte-budget accounting. Never allocates.
    pub fn size(&self) -> usize {
        match self {
            Action::Set { id, source, .. } => id.len() + source.len(),
            Action::Delete { id, .. } => id.len(),
            Action::MutateIn {
                id, path, source, ..
            } => id.len() + path.len() + source.len(),
            Action::MultiMutateIn {
                id, path_values, ..
            } => id.len() + path_values.iter().map(PathValue::size).sum::<usize>(),
            Action::DeletePath { id, path, .. } => id.len() + path.len(),
            Action::ArrayAppend {
                id, path, source, ..
            } => id.len() + path.len() + source.len(),
            Action::Increment { id, .. } => id.len(),
        }
    }

    /// Mutable access to the shared write envelope, for the CAS/expiry/etc
    /// setters below. `None` is never returned; every variant carries one.
    fn options_mut(&mut self) -> &mut WriteOptions {
        match self {
            Action::Set { options, .. }
            | Action::Delete { options, .. }
            | Action::MutateIn { options, .. }
            | Action::MultiMutateIn { options, .. }
            | Action::DeletePath { options, .. }
            | Action::ArrayAppend { options, .. }
            | Action::Increment { options, .. } => options,
        }
    }

    /// Make the request CAS-conditional.
    pub fn set_cas(&mut self, cas: u64) -> &mut Self {
        self.options_mut().cas = Some(cas);
        self
    }

    /// Set the document expiry in seconds.
    pub fn set_expiry(&mut self, expiry: u32) -> &mut Self {
        self.options_mut().expiry = expiry;
        self
    }

    /// Preserve the document's current expiry instead of overwriting it.
    pub fn set_preserve_expiry(&mut self, preserve: bool) -> &mut Self {
        self.options_mut().preserve_expiry = preserve;
        self
    }

    /// Disable implicit parent-document creation on subdoc ops.
    pub fn set_disable_auto_create(&mut self, disable: bool) -> &mut Self {
        self.options_mut().disable_auto_create = disable;
        self
    }

    /// Set the full-document datatype hint.
    pub fn set_document_flags(&mut self, flags: DocumentFlags) -> &mut Self {
        self.options_mut().document_flags = flags;
        self
    }

    /// Build a `Set` action. `id` must not be empty.
    pub fn new_set(id: impl Into<Vec<u8>>, source: impl Into<Vec<u8>>) -> Self {
        Action::Set {
            id: id.into(),
            source: source.into(),
            options: WriteOptions::default(),
        }
    }

    /// Build a `Delete` action. `id` must not be empty.
    pub fn new_delete(id: impl Into<Vec<u8>>) -> Self {
        Action::Delete {
            id: id.into(),
            options: WriteOptions::default(),
        }
    }

    /// Build a `MutateIn` action.
    pub fn new_mutate_in(
        id: impl Into<Vec<u8>>,
        path: impl Into<Vec<u8>>,
        source: impl Into<Vec<u8>>,
    ) -> Self {
        Action::MutateIn {
            id: id.into(),
            path: path.into(),
            source: source.into(),
            options: WriteOptions::default(),
        }
    }

    /// Build a `MultiMutateIn` action from several `{path, value}` pairs.
    pub fn new_multi_mutate_in(id: impl Into<Vec<u8>>, path_values: Vec<PathValue>) -> Self {
        Action::MultiMutateIn {
            id: id.into(),
            path_values,
            options: WriteOptions::default(),
        }
    }

    /// Build a `DeletePath` action.
    pub fn new_delete_path(id: impl Into<Vec<u8>>, path: impl Into<Vec<u8>>) -> Self {
        Action::DeletePath {
            id: id.into(),
            path: path.into(),
            options: WriteOptions::default(),
        }
    }

    /// Build an `ArrayAppend` action.
    pub fn new_array_append(
        id: impl Into<Vec<u8>>,
        path: impl Into<Vec<u8>>,
        source: impl Into<Vec<u8>>,
    ) -> Self {
        Action::ArrayAppend {
            id: id.into(),
            path: path.into(),
            source: source.into(),
            options: WriteOptions::default(),
        }
    }

    /// Build an `Increment` action.
    pub fn new_increment(id: impl Into<Vec<u8>>, initial: i64, delta: i64) -> Self {
        Action::Increment {
            id: id.into(),
            initial,
            delta,
            options: WriteOptions::default(),
        }
    }
}
