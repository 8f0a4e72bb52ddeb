//! Atomic write batches.
//!
//! Operations are collected in memory and applied by
//! [`DocumentStore::commit`](crate::DocumentStore::commit) inside one
//! transaction: either every write lands or none does.

use crate::document::Fields;
use crate::path::DocPath;

/// One queued write.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Create or overwrite. With `merge`, fields are written over the stored
    /// document instead of replacing it.
    Set {
        path: DocPath,
        fields: Fields,
        merge: bool,
    },
    /// Write fields over an existing document. Fails if it is absent.
    Update { path: DocPath, fields: Fields },
    Delete { path: DocPath },
}

impl WriteOp {
    pub fn path(&self) -> &DocPath {
        match self {
            WriteOp::Set { path, .. } | WriteOp::Update { path, .. } | WriteOp::Delete { path } => {
                path
            }
        }
    }
}

/// A set of writes committed together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        WriteBatch::default()
    }

    pub fn set(&mut self, path: DocPath, fields: Fields) -> &mut Self {
        self.ops.push(WriteOp::Set {
            path,
            fields,
            merge: false,
        });
        self
    }

    pub fn set_merge(&mut self, path: DocPath, fields: Fields) -> &mut Self {
        self.ops.push(WriteOp::Set {
            path,
            fields,
            merge: true,
        });
        self
    }

    pub fn update(&mut self, path: DocPath, fields: Fields) -> &mut Self {
        self.ops.push(WriteOp::Update { path, fields });
        self
    }

    pub fn delete(&mut self, path: DocPath) -> &mut Self {
        self.ops.push(WriteOp::Delete { path });
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub(crate) fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

impl From<WriteOp> for WriteBatch {
    fn from(op: WriteOp) -> Self {
        WriteBatch { ops: vec![op] }
    }
}
