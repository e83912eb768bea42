//! Elementwise and reduction kernels.
//!
//! Kernels are written once, generic over `num_traits::Float`, and
//! dispatched on the runtime `DType` of the operands. All of them are pure:
//! they read the input buffers and allocate a new output buffer.

use crate::error::TapeGraphError;
use crate::tensor::utils::{broadcast_shapes, broadcast_source_index, calculate_strides, index_to_coord};
use crate::tensor::{Buffer, Tensor};
use num_traits::Float;

/// Binary elementwise kernels supported by [`Tensor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryKernel {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryKernel {
    fn apply<T: Float>(self, a: T, b: T) -> T {
        match self {
            BinaryKernel::Add => a + b,
            BinaryKernel::Sub => a - b,
            BinaryKernel::Mul => a * b,
            BinaryKernel::Div => a / b,
        }
    }

    fn name(self) -> &'static str {
        match self {
            BinaryKernel::Add => "add",
            BinaryKernel::Sub => "sub",
            BinaryKernel::Mul => "mul",
            BinaryKernel::Div => "div",
        }
    }
}

/// Unary elementwise kernels supported by [`Tensor`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum UnaryKernel {
    Neg,
    Square,
    Scale(f64),
}

impl UnaryKernel {
    fn apply<T: Float>(self, x: T) -> T {
        match self {
            UnaryKernel::Neg => -x,
            UnaryKernel::Square => x * x,
            UnaryKernel::Scale(k) => x * T::from(k).unwrap_or_else(T::nan),
        }
    }
}

fn binary_broadcast<T: Float>(
    a: &[T],
    a_shape: &[usize],
    b: &[T],
    b_shape: &[usize],
    out_shape: &[usize],
    kernel: BinaryKernel,
) -> Vec<T> {
    // Fast path: identical shapes need no index mapping.
    if a_shape == b_shape {
        return a.iter().zip(b).map(|(&x, &y)| kernel.apply(x, y)).collect();
    }
    let out_strides = calculate_strides(out_shape);
    let a_strides = calculate_strides(a_shape);
    let b_strides = calculate_strides(b_shape);
    let numel: usize = out_shape.iter().product();
    (0..numel)
        .map(|i| {
            let coord = index_to_coord(i, &out_strides, out_shape);
            let x = a[broadcast_source_index(&coord, a_shape, &a_strides)];
            let y = b[broadcast_source_index(&coord, b_shape, &b_strides)];
            kernel.apply(x, y)
        })
        .collect()
}

/// Sums `src` (of `src_shape`) down to `target_shape`, which must broadcast
/// to `src_shape`. Every source element lands on the target element it was
/// broadcast from.
fn sum_to_shape<T: Float>(src: &[T], src_shape: &[usize], target_shape: &[usize]) -> Vec<T> {
    let target_numel: usize = target_shape.iter().product();
    let mut out = vec![T::zero(); target_numel];
    let src_strides = calculate_strides(src_shape);
    let target_strides = calculate_strides(target_shape);
    for (i, &v) in src.iter().enumerate() {
        let coord = index_to_coord(i, &src_strides, src_shape);
        let j = broadcast_source_index(&coord, target_shape, &target_strides);
        out[j] = out[j] + v;
    }
    out
}

/// Repeats `src` (of `src_shape`) to fill `target_shape`.
fn expand_to_shape<T: Copy>(src: &[T], src_shape: &[usize], target_shape: &[usize]) -> Vec<T> {
    let target_numel: usize = target_shape.iter().product();
    let src_strides = calculate_strides(src_shape);
    let target_strides = calculate_strides(target_shape);
    (0..target_numel)
        .map(|i| {
            let coord = index_to_coord(i, &target_strides, target_shape);
            src[broadcast_source_index(&coord, src_shape, &src_strides)]
        })
        .collect()
}

fn sum_slice<T: Float>(data: &[T]) -> T {
    data.iter().fold(T::zero(), |acc, &v| acc + v)
}

impl Tensor {
    pub(crate) fn binary_op(&self, other: &Tensor, kernel: BinaryKernel) -> Result<Tensor, TapeGraphError> {
        let out_shape = broadcast_shapes(&self.shape, &other.shape).map_err(|_| {
            TapeGraphError::shape(kernel.name(), &[&self.shape, &other.shape])
        })?;
        let buffer = match (&self.buffer, &other.buffer) {
            (Buffer::F32(a), Buffer::F32(b)) => {
                Buffer::from(binary_broadcast(a.as_slice(), &self.shape, b.as_slice(), &other.shape, &out_shape, kernel))
            }
            (Buffer::F64(a), Buffer::F64(b)) => {
                Buffer::from(binary_broadcast(a.as_slice(), &self.shape, b.as_slice(), &other.shape, &out_shape, kernel))
            }
            (a, b) => {
                return Err(TapeGraphError::DTypeMismatch {
                    operation: kernel.name().to_string(),
                    expected: a.dtype(),
                    actual: b.dtype(),
                })
            }
        };
        Tensor::from_buffer(buffer, out_shape)
    }

    pub(crate) fn unary_op(&self, kernel: UnaryKernel) -> Tensor {
        let buffer = match &self.buffer {
            Buffer::F32(a) => Buffer::from(a.iter().map(|&x| kernel.apply(x)).collect::<Vec<f32>>()),
            Buffer::F64(a) => Buffer::from(a.iter().map(|&x| kernel.apply(x)).collect::<Vec<f64>>()),
        };
        Tensor {
            buffer,
            shape: self.shape.clone(),
        }
    }

    /// Elementwise `self + other` with broadcasting.
    pub fn add(&self, other: &Tensor) -> Result<Tensor, TapeGraphError> {
        self.binary_op(other, BinaryKernel::Add)
    }

    /// Elementwise `self - other` with broadcasting.
    pub fn sub(&self, other: &Tensor) -> Result<Tensor, TapeGraphError> {
        self.binary_op(other, BinaryKernel::Sub)
    }

    /// Elementwise `self * other` with broadcasting.
    pub fn mul(&self, other: &Tensor) -> Result<Tensor, TapeGraphError> {
        self.binary_op(other, BinaryKernel::Mul)
    }

    /// Elementwise `self / other` with broadcasting.
    pub fn div(&self, other: &Tensor) -> Result<Tensor, TapeGraphError> {
        self.binary_op(other, BinaryKernel::Div)
    }

    pub fn neg(&self) -> Tensor {
        self.unary_op(UnaryKernel::Neg)
    }

    pub fn square(&self) -> Tensor {
        self.unary_op(UnaryKernel::Square)
    }

    /// Multiplies every element by `factor`.
    pub fn scale(&self, factor: f64) -> Tensor {
        self.unary_op(UnaryKernel::Scale(factor))
    }

    /// Sum of all elements as a rank-0 tensor.
    pub fn sum_all(&self) -> Tensor {
        let buffer = match &self.buffer {
            Buffer::F32(a) => Buffer::from(vec![sum_slice(a.as_slice())]),
            Buffer::F64(a) => Buffer::from(vec![sum_slice(a.as_slice())]),
        };
        Tensor { buffer, shape: vec![] }
    }

    /// Mean of all elements as a rank-0 tensor. The mean of an empty tensor is NaN.
    pub fn mean_all(&self) -> Tensor {
        let n = self.numel();
        let buffer = match &self.buffer {
            Buffer::F32(a) => Buffer::from(vec![sum_slice(a.as_slice()) / n as f32]),
            Buffer::F64(a) => Buffer::from(vec![sum_slice(a.as_slice()) / n as f64]),
        };
        Tensor { buffer, shape: vec![] }
    }

    pub(crate) fn sum_to_shape_unchecked(&self, target_shape: &[usize]) -> Tensor {
        let buffer = match &self.buffer {
            Buffer::F32(a) => Buffer::from(sum_to_shape(a.as_slice(), &self.shape, target_shape)),
            Buffer::F64(a) => Buffer::from(sum_to_shape(a.as_slice(), &self.shape, target_shape)),
        };
        Tensor {
            buffer,
            shape: target_shape.to_vec(),
        }
    }

    pub(crate) fn expand_to_shape_unchecked(&self, target_shape: &[usize]) -> Tensor {
        let buffer = match &self.buffer {
            Buffer::F32(a) => Buffer::from(expand_to_shape(a.as_slice(), &self.shape, target_shape)),
            Buffer::F64(a) => Buffer::from(expand_to_shape(a.as_slice(), &self.shape, target_shape)),
        };
        Tensor {
            buffer,
            shape: target_shape.to_vec(),
        }
    }
}
