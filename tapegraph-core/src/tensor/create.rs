// src/tensor/create.rs

use crate::tensor::{Buffer, Tensor};
use crate::types::DType;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};

/// Creates a new tensor filled with `value` with the specified shape and dtype.
pub fn full(shape: &[usize], value: f64, dtype: DType) -> Tensor {
    let numel: usize = shape.iter().product();
    let buffer = match dtype {
        DType::F32 => Buffer::from(vec![value as f32; numel]),
        DType::F64 => Buffer::from(vec![value; numel]),
    };
    Tensor {
        buffer,
        shape: shape.to_vec(),
    }
}

/// Creates a new tensor filled with zeros with the specified shape.
pub fn zeros(shape: &[usize], dtype: DType) -> Tensor {
    full(shape, 0.0, dtype)
}

/// Creates a new tensor filled with ones with the specified shape.
pub fn ones(shape: &[usize], dtype: DType) -> Tensor {
    full(shape, 1.0, dtype)
}

pub fn zeros_like(other: &Tensor) -> Tensor {
    zeros(other.shape(), other.dtype())
}

pub fn ones_like(other: &Tensor) -> Tensor {
    ones(other.shape(), other.dtype())
}

fn sample_normal<R: Rng>(rng: &mut R, shape: &[usize], dtype: DType) -> Tensor {
    let numel: usize = shape.iter().product();
    let buffer = match dtype {
        DType::F32 => {
            let data: Vec<f32> = (0..numel).map(|_| StandardNormal.sample(&mut *rng)).collect();
            Buffer::from(data)
        }
        DType::F64 => {
            let data: Vec<f64> = (0..numel).map(|_| StandardNormal.sample(&mut *rng)).collect();
            Buffer::from(data)
        }
    };
    Tensor {
        buffer,
        shape: shape.to_vec(),
    }
}

/// Samples a tensor from the standard normal distribution.
pub fn randn(shape: &[usize], dtype: DType) -> Tensor {
    let mut rng = rand::thread_rng();
    sample_normal(&mut rng, shape, dtype)
}

/// Like [`randn`], but reproducible for a given seed.
pub fn randn_seeded(shape: &[usize], dtype: DType, seed: u64) -> Tensor {
    let mut rng = StdRng::seed_from_u64(seed);
    sample_normal(&mut rng, shape, dtype)
}
