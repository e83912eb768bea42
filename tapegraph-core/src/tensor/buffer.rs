use crate::types::DType;
use std::sync::Arc;

/// Typed CPU storage behind a [`Tensor`](super::Tensor).
///
/// The `Vec` sits behind an `Arc` so views (reshape) and clones share it.
#[derive(Debug, Clone, PartialEq)]
pub enum Buffer {
    F32(Arc<Vec<f32>>),
    F64(Arc<Vec<f64>>),
}

impl Buffer {
    pub fn dtype(&self) -> DType {
        match self {
            Buffer::F32(_) => DType::F32,
            Buffer::F64(_) => DType::F64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Buffer::F32(data) => data.len(),
            Buffer::F64(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads the element at a flat offset as `f64`. Panics if out of range,
    /// callers check bounds first.
    pub(crate) fn get_f64(&self, offset: usize) -> f64 {
        match self {
            Buffer::F32(data) => data[offset] as f64,
            Buffer::F64(data) => data[offset],
        }
    }

    /// True when both buffers are the same allocation.
    pub fn shares_storage_with(&self, other: &Buffer) -> bool {
        match (self, other) {
            (Buffer::F32(a), Buffer::F32(b)) => Arc::ptr_eq(a, b),
            (Buffer::F64(a), Buffer::F64(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<Vec<f32>> for Buffer {
    fn from(data: Vec<f32>) -> Self {
        Buffer::F32(Arc::new(data))
    }
}

impl From<Vec<f64>> for Buffer {
    fn from(data: Vec<f64>) -> Self {
        Buffer::F64(Arc::new(data))
    }
}
