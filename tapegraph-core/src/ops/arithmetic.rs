// src/ops/arithmetic.rs
//
// Broadcasting binary ops. Every backward rule ends with `reduce_to_shape`
// so the gradient of a broadcast operand collapses back to its own shape.

use super::{OpKind, OpRules};
use crate::error::TapeGraphError;
use crate::tensor::utils::broadcast_shapes;
use crate::tensor::Tensor;

pub(super) const ADD: OpRules = OpRules {
    name: "add",
    arity: 2,
    infer_shape: broadcast_shape,
    forward: add_forward,
    backward: add_backward,
};

pub(super) const SUB: OpRules = OpRules {
    name: "sub",
    arity: 2,
    infer_shape: broadcast_shape,
    forward: sub_forward,
    backward: sub_backward,
};

pub(super) const MUL: OpRules = OpRules {
    name: "mul",
    arity: 2,
    infer_shape: broadcast_shape,
    forward: mul_forward,
    backward: mul_backward,
};

pub(super) const DIV: OpRules = OpRules {
    name: "div",
    arity: 2,
    infer_shape: broadcast_shape,
    forward: div_forward,
    backward: div_backward,
};

fn broadcast_shape(kind: &OpKind, shapes: &[&[usize]]) -> Result<Vec<usize>, TapeGraphError> {
    broadcast_shapes(shapes[0], shapes[1]).map_err(|_| TapeGraphError::shape(kind.name(), shapes))
}

fn add_forward(_: &OpKind, inputs: &[&Tensor]) -> Result<Tensor, TapeGraphError> {
    inputs[0].add(inputs[1])
}

fn add_backward(_: &OpKind, inputs: &[&Tensor], _: &Tensor, grad: &Tensor) -> Result<Vec<Tensor>, TapeGraphError> {
    Ok(vec![
        grad.reduce_to_shape(inputs[0].shape())?,
        grad.reduce_to_shape(inputs[1].shape())?,
    ])
}

fn sub_forward(_: &OpKind, inputs: &[&Tensor]) -> Result<Tensor, TapeGraphError> {
    inputs[0].sub(inputs[1])
}

fn sub_backward(_: &OpKind, inputs: &[&Tensor], _: &Tensor, grad: &Tensor) -> Result<Vec<Tensor>, TapeGraphError> {
    Ok(vec![
        grad.reduce_to_shape(inputs[0].shape())?,
        grad.neg().reduce_to_shape(inputs[1].shape())?,
    ])
}

fn mul_forward(_: &OpKind, inputs: &[&Tensor]) -> Result<Tensor, TapeGraphError> {
    inputs[0].mul(inputs[1])
}

// d(a*b)/da = b, d(a*b)/db = a
fn mul_backward(_: &OpKind, inputs: &[&Tensor], _: &Tensor, grad: &Tensor) -> Result<Vec<Tensor>, TapeGraphError> {
    let (a, b) = (inputs[0], inputs[1]);
    Ok(vec![
        grad.mul(b)?.reduce_to_shape(a.shape())?,
        grad.mul(a)?.reduce_to_shape(b.shape())?,
    ])
}

fn div_forward(_: &OpKind, inputs: &[&Tensor]) -> Result<Tensor, TapeGraphError> {
    inputs[0].div(inputs[1])
}

// d(a/b)/da = 1/b, d(a/b)/db = -a/b^2
fn div_backward(_: &OpKind, inputs: &[&Tensor], _: &Tensor, grad: &Tensor) -> Result<Vec<Tensor>, TapeGraphError> {
    let (a, b) = (inputs[0], inputs[1]);
    let grad_a = grad.div(b)?;
    let grad_b = grad.mul(a)?.div(&b.square())?.neg();
    Ok(vec![
        grad_a.reduce_to_shape(a.shape())?,
        grad_b.reduce_to_shape(b.shape())?,
    ])
}

#[cfg(test)]
#[path = "arithmetic_test.rs"]
mod tests;
