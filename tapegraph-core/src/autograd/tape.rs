use crate::error::TapeGraphError;
use crate::graph::NodeId;
use log::debug;
use std::collections::HashMap;

/// Read-only view of graph edges needed to linearize it.
pub trait Topology {
    fn node_count(&self) -> usize;

    /// Ordered inputs of `id`. Only called with ids below `node_count()`.
    fn inputs_of(&self, id: NodeId) -> &[NodeId];
}

/// A linear execution order over the subgraph feeding a set of outputs.
///
/// Every node appears once, after all of its inputs. A tape is immutable
/// once compiled.
#[derive(Debug, Clone, PartialEq)]
pub struct Tape {
    order: Vec<NodeId>,
    outputs: Vec<NodeId>,
    positions: HashMap<NodeId, usize>,
}

impl Tape {
    /// Nodes in execution order.
    pub fn order(&self) -> &[NodeId] {
        &self.order
    }

    /// The outputs the tape was compiled for.
    pub fn outputs(&self) -> &[NodeId] {
        &self.outputs
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.positions.contains_key(&id)
    }

    /// Execution slot of `id`, if it is on the tape.
    pub fn position(&self, id: NodeId) -> Option<usize> {
        self.positions.get(&id).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Topologically orders the transitive inputs of `outputs`.
///
/// Depth-first post-order with an explicit stack, so graph depth never
/// turns into call depth. A node met again while still in progress closes
/// a cycle and fails the compilation.
///
/// # Errors
/// - `UnknownNode` if an output or input handle is out of range.
/// - `Cycle` naming the first node found on a cycle.
pub fn compile<G: Topology + ?Sized>(graph: &G, outputs: &[NodeId]) -> Result<Tape, TapeGraphError> {
    let count = graph.node_count();
    let mut marks = vec![Mark::Unvisited; count];
    let mut order = Vec::new();
    let mut stack: Vec<(NodeId, usize)> = Vec::new();

    for &output in outputs {
        if output.index() >= count {
            return Err(TapeGraphError::UnknownNode { node: output });
        }
        if marks[output.index()] == Mark::Done {
            continue;
        }
        marks[output.index()] = Mark::InProgress;
        stack.push((output, 0));

        while let Some(top) = stack.last_mut() {
            let (node, next) = *top;
            let inputs = graph.inputs_of(node);
            if next < inputs.len() {
                top.1 += 1;
                let child = inputs[next];
                if child.index() >= count {
                    return Err(TapeGraphError::UnknownNode { node: child });
                }
                match marks[child.index()] {
                    Mark::Done => {}
                    Mark::InProgress => return Err(TapeGraphError::Cycle { node: child }),
                    Mark::Unvisited => {
                        marks[child.index()] = Mark::InProgress;
                        stack.push((child, 0));
                    }
                }
            } else {
                marks[node.index()] = Mark::Done;
                order.push(node);
                stack.pop();
            }
        }
    }

    let positions = order.iter().enumerate().map(|(pos, &id)| (id, pos)).collect();
    debug!("tape: compiled {} instruction(s) for outputs {:?}", order.len(), outputs);
    Ok(Tape {
        order,
        outputs: outputs.to_vec(),
        positions,
    })
}
