// src/ops/reduction.rs

use super::{OpKind, OpRules};
use crate::error::TapeGraphError;
use crate::tensor::Tensor;

pub(super) const SUM: OpRules = OpRules {
    name: "sum",
    arity: 1,
    infer_shape: scalar_shape,
    forward: sum_forward,
    backward: sum_backward,
};

pub(super) const MEAN: OpRules = OpRules {
    name: "mean",
    arity: 1,
    infer_shape: scalar_shape,
    forward: mean_forward,
    backward: mean_backward,
};

fn scalar_shape(_: &OpKind, _: &[&[usize]]) -> Result<Vec<usize>, TapeGraphError> {
    Ok(vec![])
}

fn sum_forward(_: &OpKind, inputs: &[&Tensor]) -> Result<Tensor, TapeGraphError> {
    Ok(inputs[0].sum_all())
}

// Every element contributes once: the scalar gradient is copied to each.
fn sum_backward(_: &OpKind, inputs: &[&Tensor], _: &Tensor, grad: &Tensor) -> Result<Vec<Tensor>, TapeGraphError> {
    Ok(vec![grad.expand_to(inputs[0].shape())?])
}

fn mean_forward(_: &OpKind, inputs: &[&Tensor]) -> Result<Tensor, TapeGraphError> {
    Ok(inputs[0].mean_all())
}

// Every element contributes 1/N.
fn mean_backward(_: &OpKind, inputs: &[&Tensor], _: &Tensor, grad: &Tensor) -> Result<Vec<Tensor>, TapeGraphError> {
    let n = inputs[0].numel() as f64;
    Ok(vec![grad.scale(1.0 / n).expand_to(inputs[0].shape())?])
}
