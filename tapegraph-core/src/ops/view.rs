// src/ops/view.rs

use super::{OpKind, OpRules};
use crate::error::TapeGraphError;
use crate::tensor::Tensor;

pub(super) const RESHAPE: OpRules = OpRules {
    name: "reshape",
    arity: 1,
    infer_shape: reshape_shape,
    forward: reshape_forward,
    backward: reshape_backward,
};

fn target_shape(kind: &OpKind) -> Result<&[usize], TapeGraphError> {
    match kind {
        OpKind::Reshape(shape) => Ok(shape.as_slice()),
        other => Err(TapeGraphError::Internal(format!(
            "reshape rules dispatched for {}",
            other.name()
        ))),
    }
}

fn reshape_shape(kind: &OpKind, shapes: &[&[usize]]) -> Result<Vec<usize>, TapeGraphError> {
    let target = target_shape(kind)?;
    let input_numel: usize = shapes[0].iter().product();
    let target_numel: usize = target.iter().product();
    if input_numel != target_numel {
        return Err(TapeGraphError::shape("reshape", &[shapes[0], target]));
    }
    Ok(target.to_vec())
}

fn reshape_forward(kind: &OpKind, inputs: &[&Tensor]) -> Result<Tensor, TapeGraphError> {
    inputs[0].reshape(target_shape(kind)?)
}

fn reshape_backward(_: &OpKind, inputs: &[&Tensor], _: &Tensor, grad: &Tensor) -> Result<Vec<Tensor>, TapeGraphError> {
    Ok(vec![grad.reshape(inputs[0].shape())?])
}
