// Named shorthands over `Graph::new_op`.

use super::{Graph, NodeId};
use crate::error::TapeGraphError;
use crate::ops::OpKind;

impl Graph {
    /// `a + b`, broadcasting.
    pub fn add(&mut self, a: NodeId, b: NodeId) -> Result<NodeId, TapeGraphError> {
        self.new_op(OpKind::Add, &[a, b])
    }

    /// `a - b`, broadcasting.
    pub fn sub(&mut self, a: NodeId, b: NodeId) -> Result<NodeId, TapeGraphError> {
        self.new_op(OpKind::Sub, &[a, b])
    }

    /// `a * b` elementwise, broadcasting.
    pub fn mul(&mut self, a: NodeId, b: NodeId) -> Result<NodeId, TapeGraphError> {
        self.new_op(OpKind::Mul, &[a, b])
    }

    /// `a / b` elementwise, broadcasting.
    pub fn div(&mut self, a: NodeId, b: NodeId) -> Result<NodeId, TapeGraphError> {
        self.new_op(OpKind::Div, &[a, b])
    }

    pub fn neg(&mut self, a: NodeId) -> Result<NodeId, TapeGraphError> {
        self.new_op(OpKind::Neg, &[a])
    }

    pub fn square(&mut self, a: NodeId) -> Result<NodeId, TapeGraphError> {
        self.new_op(OpKind::Square, &[a])
    }

    /// Sum of all elements, a scalar node.
    pub fn sum(&mut self, a: NodeId) -> Result<NodeId, TapeGraphError> {
        self.new_op(OpKind::Sum, &[a])
    }

    /// Mean of all elements, a scalar node.
    pub fn mean(&mut self, a: NodeId) -> Result<NodeId, TapeGraphError> {
        self.new_op(OpKind::Mean, &[a])
    }

    pub fn reshape(&mut self, a: NodeId, shape: &[usize]) -> Result<NodeId, TapeGraphError> {
        self.new_op(OpKind::Reshape(shape.to_vec()), &[a])
    }
}
