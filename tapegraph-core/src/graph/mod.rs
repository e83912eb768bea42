//! # Computation graph
//!
//! [`Graph`] is an append-only arena of [`Node`]s addressed by [`NodeId`].
//! Edges are the ordered input lists of derived nodes; the graph also keeps
//! the reverse (consumer) edges. Nodes can only reference nodes that already
//! exist, so a graph built through this API is acyclic.
//!
//! Nothing is computed here. Values are bound and computed by a
//! [`TapeMachine`](crate::vm::TapeMachine), which borrows the graph
//! read-only; several machines may share one graph.

use crate::autograd::tape::Topology;
use crate::error::TapeGraphError;
use crate::ops::OpKind;
use crate::types::DType;
use log::trace;

mod builders;
mod dot;
mod node;

pub use node::{Node, NodeId};

#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    consumers: Vec<Vec<NodeId>>,
}

impl Graph {
    pub fn new() -> Self {
        Graph::default()
    }

    fn push(&mut self, op: Option<OpKind>, inputs: Vec<NodeId>, shape: Vec<usize>, dtype: DType, name: Option<&str>) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        for input in &inputs {
            self.consumers[input.index()].push(id);
        }
        self.nodes.push(Node {
            id,
            op,
            inputs,
            shape,
            dtype,
            name: name.map(str::to_string),
        });
        self.consumers.push(Vec::new());
        id
    }

    /// Appends a leaf node: an input or parameter whose value is bound later.
    pub fn new_leaf(&mut self, shape: &[usize], dtype: DType, name: Option<&str>) -> NodeId {
        let id = self.push(None, Vec::new(), shape.to_vec(), dtype, name);
        trace!("graph: leaf {} {:?} {}", id, shape, dtype);
        id
    }

    /// Appends a rank-0 leaf.
    pub fn new_scalar(&mut self, dtype: DType, name: Option<&str>) -> NodeId {
        self.new_leaf(&[], dtype, name)
    }

    /// Appends a rank-1 leaf of length `len`.
    pub fn new_vector(&mut self, dtype: DType, len: usize, name: Option<&str>) -> NodeId {
        self.new_leaf(&[len], dtype, name)
    }

    /// Appends a rank-2 leaf.
    pub fn new_matrix(&mut self, dtype: DType, rows: usize, cols: usize, name: Option<&str>) -> NodeId {
        self.new_leaf(&[rows, cols], dtype, name)
    }

    /// Appends a derived node applying `kind` to `inputs`.
    ///
    /// The output shape is resolved here, once, so shape problems surface
    /// before anything runs.
    ///
    /// # Errors
    /// - `Arity` if the number of inputs does not match the op.
    /// - `Cycle` if an input is the node being created.
    /// - `UnknownNode` if an input does not exist in this graph.
    /// - `DTypeMismatch` if the inputs disagree on dtype.
    /// - `Shape` if the input shapes are incompatible for the op.
    pub fn new_op(&mut self, kind: OpKind, inputs: &[NodeId]) -> Result<NodeId, TapeGraphError> {
        let expected = kind.arity();
        if inputs.len() != expected {
            return Err(TapeGraphError::Arity {
                op: kind.name(),
                expected,
                actual: inputs.len(),
            });
        }
        let next = self.nodes.len();
        for &input in inputs {
            if input.index() == next {
                return Err(TapeGraphError::Cycle { node: input });
            }
            if input.index() > next {
                return Err(TapeGraphError::UnknownNode { node: input });
            }
        }

        let dtype = self.nodes[inputs[0].index()].dtype;
        for &input in &inputs[1..] {
            let actual = self.nodes[input.index()].dtype;
            if actual != dtype {
                return Err(TapeGraphError::DTypeMismatch {
                    operation: kind.name().to_string(),
                    expected: dtype,
                    actual,
                });
            }
        }

        let shapes: Vec<&[usize]> = inputs.iter().map(|i| self.nodes[i.index()].shape.as_slice()).collect();
        let shape = kind.infer_shape(&shapes)?;

        let id = self.push(Some(kind), inputs.to_vec(), shape, dtype, None);
        trace!("graph: {}", self.nodes[id.index()]);
        Ok(id)
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, TapeGraphError> {
        self.nodes.get(id.index()).ok_or(TapeGraphError::UnknownNode { node: id })
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes that take `id` as an input, in creation order.
    pub fn consumers(&self, id: NodeId) -> Result<&[NodeId], TapeGraphError> {
        self.consumers
            .get(id.index())
            .map(Vec::as_slice)
            .ok_or(TapeGraphError::UnknownNode { node: id })
    }

    /// Nodes nobody consumes. Running these runs the whole graph.
    pub fn sinks(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| self.consumers[n.id.index()].is_empty())
            .map(|n| n.id)
            .collect()
    }

    pub fn leaves(&self) -> Vec<NodeId> {
        self.nodes.iter().filter(|n| n.is_leaf()).map(|n| n.id).collect()
    }

    /// First node carrying `name`.
    pub fn by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().find(|n| n.name() == Some(name)).map(|n| n.id)
    }

    /// Attaches a name to an existing node, replacing any previous one.
    pub fn set_name(&mut self, id: NodeId, name: &str) -> Result<(), TapeGraphError> {
        let node = self
            .nodes
            .get_mut(id.index())
            .ok_or(TapeGraphError::UnknownNode { node: id })?;
        node.name = Some(name.to_string());
        Ok(())
    }
}

impl Topology for Graph {
    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn inputs_of(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].inputs
    }
}

#[cfg(test)]
#[path = "graph_test.rs"]
mod tests;
