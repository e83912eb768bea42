//! # Op registry (`ops`)
//!
//! The closed set of operation kinds a graph node can apply. Each kind is a
//! pairing of rules, looked up through [`OpKind::rules`]:
//!
//! - **shape rule**: derives the output shape from the input shapes at
//!   graph construction time, rejecting incompatible shapes early.
//! - **forward rule**: computes the output value from the input values.
//! - **backward rule**: the vector-Jacobian product. Given the forward
//!   inputs, the forward output and the gradient flowing into the output,
//!   it returns one gradient per input, shaped exactly like that input.
//!
//! ## Submodules
//!
//! - [`arithmetic`]: broadcasting `add`, `sub`, `mul`, `div`.
//! - [`elementwise`]: `neg`, `square`.
//! - [`reduction`]: full reductions `sum`, `mean`.
//! - [`view`]: `reshape`.

use crate::error::TapeGraphError;
use crate::tensor::Tensor;
use std::fmt;

pub mod arithmetic;
pub mod elementwise;
pub mod reduction;
pub mod view;

#[cfg(test)]
pub(crate) mod test_utils;

/// Derives the output shape from the input shapes.
pub type ShapeRule = fn(&OpKind, &[&[usize]]) -> Result<Vec<usize>, TapeGraphError>;
/// Computes the output value from the input values.
pub type ForwardRule = fn(&OpKind, &[&Tensor]) -> Result<Tensor, TapeGraphError>;
/// Maps `(inputs, output, grad_output)` to one gradient per input.
pub type BackwardRule = fn(&OpKind, &[&Tensor], &Tensor, &Tensor) -> Result<Vec<Tensor>, TapeGraphError>;

/// Dispatch table entry for one op kind.
#[derive(Clone, Copy)]
pub struct OpRules {
    pub name: &'static str,
    pub arity: usize,
    pub infer_shape: ShapeRule,
    pub forward: ForwardRule,
    pub backward: BackwardRule,
}

/// Operation kinds a derived node can apply.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OpKind {
    Add,
    Sub,
    Mul,
    Div,
    Neg,
    Square,
    /// Sum over all elements, producing a rank-0 tensor.
    Sum,
    /// Mean over all elements, producing a rank-0 tensor.
    Mean,
    /// Reinterprets the input with the given shape.
    Reshape(Vec<usize>),
}

impl OpKind {
    /// Looks up the rules for this kind.
    pub fn rules(&self) -> OpRules {
        match self {
            OpKind::Add => arithmetic::ADD,
            OpKind::Sub => arithmetic::SUB,
            OpKind::Mul => arithmetic::MUL,
            OpKind::Div => arithmetic::DIV,
            OpKind::Neg => elementwise::NEG,
            OpKind::Square => elementwise::SQUARE,
            OpKind::Sum => reduction::SUM,
            OpKind::Mean => reduction::MEAN,
            OpKind::Reshape(_) => view::RESHAPE,
        }
    }

    pub fn name(&self) -> &'static str {
        self.rules().name
    }

    pub fn arity(&self) -> usize {
        self.rules().arity
    }

    fn check_arity(&self, actual: usize) -> Result<(), TapeGraphError> {
        let expected = self.arity();
        if actual != expected {
            return Err(TapeGraphError::Arity {
                op: self.name(),
                expected,
                actual,
            });
        }
        Ok(())
    }

    /// Output shape for the given input shapes.
    pub fn infer_shape(&self, shapes: &[&[usize]]) -> Result<Vec<usize>, TapeGraphError> {
        self.check_arity(shapes.len())?;
        (self.rules().infer_shape)(self, shapes)
    }

    /// Runs the forward rule.
    pub fn forward(&self, inputs: &[&Tensor]) -> Result<Tensor, TapeGraphError> {
        self.check_arity(inputs.len())?;
        (self.rules().forward)(self, inputs)
    }

    /// Runs the backward rule and checks that every returned gradient has
    /// its input's shape.
    pub fn backward(
        &self,
        inputs: &[&Tensor],
        output: &Tensor,
        grad_output: &Tensor,
    ) -> Result<Vec<Tensor>, TapeGraphError> {
        self.check_arity(inputs.len())?;
        let grads = (self.rules().backward)(self, inputs, output, grad_output)?;
        if grads.len() != inputs.len() {
            return Err(TapeGraphError::Internal(format!(
                "{} backward returned {} gradients for {} inputs",
                self.name(),
                grads.len(),
                inputs.len()
            )));
        }
        for (grad, input) in grads.iter().zip(inputs) {
            if grad.shape() != input.shape() {
                return Err(TapeGraphError::Internal(format!(
                    "{} backward produced gradient of shape {:?} for input of shape {:?}",
                    self.name(),
                    grad.shape(),
                    input.shape()
                )));
            }
        }
        Ok(grads)
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpKind::Reshape(shape) => write!(f, "reshape{:?}", shape),
            other => write!(f, "{}", other.name()),
        }
    }
}
