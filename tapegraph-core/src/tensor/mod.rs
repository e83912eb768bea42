// src/tensor/mod.rs

use crate::error::TapeGraphError;
use crate::types::DType;

mod broadcast_utils;
pub mod buffer;
pub mod create;
mod debug;
mod kernels;
pub mod utils;
mod view_methods;

pub use buffer::Buffer;
pub use create::{full, ones, ones_like, randn, randn_seeded, zeros, zeros_like};

/// An immutable, dense, row-major tensor value.
///
/// The element buffer is reference counted, so cloning a `Tensor` or
/// reshaping it never copies data. Every kernel returns a fresh tensor;
/// nothing mutates a buffer once it has been wrapped.
#[derive(Clone, PartialEq)]
pub struct Tensor {
    pub(crate) buffer: Buffer,
    pub(crate) shape: Vec<usize>,
}

impl Tensor {
    /// Creates a new F32 tensor from row-major data.
    ///
    /// # Errors
    /// Returns `TapeGraphError::TensorCreation` if `data_vec.len()` does not
    /// match the number of elements described by `shape`.
    pub fn new(data_vec: Vec<f32>, shape: Vec<usize>) -> Result<Self, TapeGraphError> {
        Self::from_buffer(Buffer::from(data_vec), shape)
    }

    /// Creates a new F64 tensor from row-major data.
    pub fn new_f64(data_vec: Vec<f64>, shape: Vec<usize>) -> Result<Self, TapeGraphError> {
        Self::from_buffer(Buffer::from(data_vec), shape)
    }

    /// Creates a rank-0 tensor holding `value` converted to `dtype`.
    pub fn scalar(value: f64, dtype: DType) -> Self {
        let buffer = match dtype {
            DType::F32 => Buffer::from(vec![value as f32]),
            DType::F64 => Buffer::from(vec![value]),
        };
        Tensor {
            buffer,
            shape: vec![],
        }
    }

    pub(crate) fn from_buffer(buffer: Buffer, shape: Vec<usize>) -> Result<Self, TapeGraphError> {
        let numel: usize = shape.iter().product();
        if buffer.len() != numel {
            return Err(TapeGraphError::TensorCreation {
                data_len: buffer.len(),
                shape,
            });
        }
        Ok(Tensor { buffer, shape })
    }

    /// Returns the data type of the tensor elements.
    pub fn dtype(&self) -> DType {
        self.buffer.dtype()
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn numel(&self) -> usize {
        self.buffer.len()
    }

    /// True for rank-0 tensors and any tensor holding exactly one element.
    pub fn is_scalar_like(&self) -> bool {
        self.numel() == 1
    }

    /// Reads one element, converted to `f64`.
    pub fn get(&self, index: &[usize]) -> Result<f64, TapeGraphError> {
        let out_of_bounds = || TapeGraphError::IndexOutOfBounds {
            index: index.to_vec(),
            shape: self.shape.clone(),
        };
        if index.len() != self.rank() {
            return Err(out_of_bounds());
        }
        let strides = utils::calculate_strides(&self.shape);
        let mut offset = 0;
        for ((&i, &dim), &stride) in index.iter().zip(&self.shape).zip(&strides) {
            if i >= dim {
                return Err(out_of_bounds());
            }
            offset += i * stride;
        }
        Ok(self.buffer.get_f64(offset))
    }

    /// Returns the single value of a scalar-like tensor.
    pub fn item(&self) -> Result<f64, TapeGraphError> {
        if !self.is_scalar_like() {
            return Err(TapeGraphError::shape("item", &[&self.shape]));
        }
        Ok(self.buffer.get_f64(0))
    }

    /// Copies the elements out as `f64`, whatever the storage type.
    pub fn to_vec_f64(&self) -> Vec<f64> {
        match &self.buffer {
            Buffer::F32(data) => data.iter().map(|&v| v as f64).collect(),
            Buffer::F64(data) => data.as_ref().clone(),
        }
    }

    /// Copies the elements out as `f32`, whatever the storage type.
    pub fn to_vec_f32(&self) -> Vec<f32> {
        match &self.buffer {
            Buffer::F32(data) => data.as_ref().clone(),
            Buffer::F64(data) => data.iter().map(|&v| v as f32).collect(),
        }
    }

    pub fn has_nan(&self) -> bool {
        match &self.buffer {
            Buffer::F32(data) => data.iter().any(|v| v.is_nan()),
            Buffer::F64(data) => data.iter().any(|v| v.is_nan()),
        }
    }

    pub fn has_inf(&self) -> bool {
        match &self.buffer {
            Buffer::F32(data) => data.iter().any(|v| v.is_infinite()),
            Buffer::F64(data) => data.iter().any(|v| v.is_infinite()),
        }
    }

    /// Returns the underlying buffer.
    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }
}
