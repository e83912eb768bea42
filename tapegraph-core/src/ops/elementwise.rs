// src/ops/elementwise.rs

use super::{OpKind, OpRules};
use crate::error::TapeGraphError;
use crate::tensor::Tensor;

pub(super) const NEG: OpRules = OpRules {
    name: "neg",
    arity: 1,
    infer_shape: same_shape,
    forward: neg_forward,
    backward: neg_backward,
};

pub(super) const SQUARE: OpRules = OpRules {
    name: "square",
    arity: 1,
    infer_shape: same_shape,
    forward: square_forward,
    backward: square_backward,
};

fn same_shape(_: &OpKind, shapes: &[&[usize]]) -> Result<Vec<usize>, TapeGraphError> {
    Ok(shapes[0].to_vec())
}

fn neg_forward(_: &OpKind, inputs: &[&Tensor]) -> Result<Tensor, TapeGraphError> {
    Ok(inputs[0].neg())
}

fn neg_backward(_: &OpKind, _: &[&Tensor], _: &Tensor, grad: &Tensor) -> Result<Vec<Tensor>, TapeGraphError> {
    Ok(vec![grad.neg()])
}

fn square_forward(_: &OpKind, inputs: &[&Tensor]) -> Result<Tensor, TapeGraphError> {
    Ok(inputs[0].square())
}

// d(x^2)/dx = 2x
fn square_backward(_: &OpKind, inputs: &[&Tensor], _: &Tensor, grad: &Tensor) -> Result<Vec<Tensor>, TapeGraphError> {
    Ok(vec![grad.mul(&inputs[0].scale(2.0))?])
}
