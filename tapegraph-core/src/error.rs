use crate::graph::NodeId;
use crate::types::DType;
use thiserror::Error;

/// Custom error type for the tapegraph engine.
///
/// Every error is reported synchronously by the operation that detected it.
/// The engine is deterministic, so nothing is retried internally.
#[derive(Error, Debug, PartialEq, Clone)]
pub enum TapeGraphError {
    #[error("Incompatible shapes {shapes:?} for operation {operation}")]
    Shape {
        operation: String,
        shapes: Vec<Vec<usize>>,
    },

    #[error("Operation {op} expects {expected} input(s), got {actual}")]
    Arity {
        op: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Cycle detected in the computation graph at node {node}")]
    Cycle { node: NodeId },

    #[error("Leaf node {node} ({name}) has no bound value")]
    UnboundLeaf { node: NodeId, name: String },

    #[error("Shape mismatch for node {node}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        node: NodeId,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Node {node} has no computed value; run the machine forward first")]
    NotComputed { node: NodeId },

    #[error("Operation attempted on a closed tape machine")]
    Closed,

    #[error("DType mismatch during {operation}: expected {expected:?}, got {actual:?}")]
    DTypeMismatch {
        operation: String,
        expected: DType,
        actual: DType,
    },

    #[error("Node {node} does not belong to this graph")]
    UnknownNode { node: NodeId },

    #[error("Node {node} is derived; only leaf nodes can be bound")]
    NotALeaf { node: NodeId },

    #[error("Gradient root {node} must be scalar, got shape {shape:?}")]
    NotScalar { node: NodeId, shape: Vec<usize> },

    #[error("Node {node} ({op}) produced {kind} values")]
    NumericalAnomaly {
        node: NodeId,
        op: &'static str,
        kind: &'static str,
    },

    #[error("Index out of bounds: index {index:?} for shape {shape:?}")]
    IndexOutOfBounds {
        index: Vec<usize>,
        shape: Vec<usize>,
    },

    #[error("Tensor creation error: data length {data_len} does not match shape {shape:?}")]
    TensorCreation { data_len: usize, shape: Vec<usize> },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TapeGraphError {
    pub(crate) fn shape(operation: impl Into<String>, shapes: &[&[usize]]) -> Self {
        TapeGraphError::Shape {
            operation: operation.into(),
            shapes: shapes.iter().map(|s| s.to_vec()).collect(),
        }
    }

    /// Tags a kernel shape error with the node whose op raised it.
    pub(crate) fn at_node(self, node: NodeId) -> Self {
        match self {
            TapeGraphError::Shape { operation, shapes } => TapeGraphError::Shape {
                operation: format!("{} at node {}", operation, node),
                shapes,
            },
            other => other,
        }
    }
}
