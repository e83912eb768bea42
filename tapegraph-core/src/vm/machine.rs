use crate::autograd::grad::backward;
use crate::autograd::tape::{compile, Tape};
use crate::error::TapeGraphError;
use crate::graph::{Graph, NodeId};
use crate::tensor::Tensor;
use crate::vm::MachineOpts;
use log::{debug, trace, warn};
use std::collections::HashMap;
use std::sync::Arc;

/// Per-machine mutable state. Dropped as a whole by `close`.
#[derive(Debug)]
struct RunState {
    /// Values bound to leaves with `let_value`. Survive `reset`.
    bindings: Vec<Option<Tensor>>,
    /// Values produced by the last successful run.
    values: Vec<Option<Tensor>>,
    /// Accumulators of the last gradient pass.
    grads: Vec<Option<Tensor>>,
    /// Compiled tapes keyed by their sorted, deduplicated output set.
    tapes: HashMap<Vec<NodeId>, Arc<Tape>>,
}

impl RunState {
    fn new(node_count: usize) -> Self {
        RunState {
            bindings: vec![None; node_count],
            values: vec![None; node_count],
            grads: vec![None; node_count],
            tapes: HashMap::new(),
        }
    }

    fn clear_run(&mut self) {
        self.values.iter_mut().for_each(|v| *v = None);
        self.grads.iter_mut().for_each(|g| *g = None);
    }

    fn tape_for(&mut self, graph: &Graph, outputs: &[NodeId]) -> Result<Arc<Tape>, TapeGraphError> {
        let mut key = outputs.to_vec();
        key.sort();
        key.dedup();
        if let Some(tape) = self.tapes.get(&key) {
            return Ok(Arc::clone(tape));
        }
        let tape = Arc::new(compile(graph, &key)?);
        self.tapes.insert(key, Arc::clone(&tape));
        Ok(tape)
    }
}

/// Runs one compiled tape forward. Returns the full value table, or the
/// first error; on error nothing computed here escapes.
fn execute(
    graph: &Graph,
    tape: &Tape,
    bindings: &[Option<Tensor>],
    opts: MachineOpts,
) -> Result<Vec<Option<Tensor>>, TapeGraphError> {
    let mut values: Vec<Option<Tensor>> = vec![None; graph.len()];
    for &id in tape.order() {
        let node = graph.node(id)?;
        let value = match node.op() {
            None => bindings[id.index()].clone().ok_or_else(|| TapeGraphError::UnboundLeaf {
                node: id,
                name: node.label(),
            })?,
            Some(op) => {
                let inputs = node
                    .inputs()
                    .iter()
                    .map(|&input| {
                        values[input.index()]
                            .as_ref()
                            .ok_or(TapeGraphError::NotComputed { node: input })
                    })
                    .collect::<Result<Vec<&Tensor>, _>>()?;
                let out = op.forward(&inputs).map_err(|e| e.at_node(id))?;
                if out.shape() != node.shape() {
                    return Err(TapeGraphError::shape(op.name(), &[node.shape(), out.shape()]).at_node(id));
                }
                if opts.watch_nan && out.has_nan() {
                    return Err(TapeGraphError::NumericalAnomaly {
                        node: id,
                        op: op.name(),
                        kind: "NaN",
                    });
                }
                if opts.watch_inf && out.has_inf() {
                    return Err(TapeGraphError::NumericalAnomaly {
                        node: id,
                        op: op.name(),
                        kind: "infinite",
                    });
                }
                out
            }
        };
        if opts.trace_exec {
            trace!("vm: {} => {}", node, value);
        }
        values[id.index()] = Some(value);
    }
    Ok(values)
}

/// Executes a [`Graph`] on a tape and differentiates it.
///
/// The machine borrows the graph read-only and owns everything that changes
/// between runs: leaf bindings, computed values and gradient accumulators.
/// Two machines over the same graph never see each other's state.
///
/// Typical use:
/// 1. bind every leaf with [`let_value`](Self::let_value),
/// 2. [`run_all`](Self::run_all) forward,
/// 3. read results with [`value`](Self::value),
/// 4. [`grad`](Self::grad) of a scalar node with respect to any nodes,
/// 5. [`reset`](Self::reset) between runs, [`close`](Self::close) when done.
#[derive(Debug)]
pub struct TapeMachine<'g> {
    graph: &'g Graph,
    opts: MachineOpts,
    state: Option<RunState>,
}

impl<'g> TapeMachine<'g> {
    pub fn new(graph: &'g Graph) -> Self {
        Self::with_opts(graph, MachineOpts::default())
    }

    pub fn with_opts(graph: &'g Graph, opts: MachineOpts) -> Self {
        TapeMachine {
            graph,
            opts,
            state: Some(RunState::new(graph.len())),
        }
    }

    pub fn graph(&self) -> &'g Graph {
        self.graph
    }

    pub fn opts(&self) -> MachineOpts {
        self.opts
    }

    pub fn is_closed(&self) -> bool {
        self.state.is_none()
    }

    fn state(&self) -> Result<&RunState, TapeGraphError> {
        self.state.as_ref().ok_or(TapeGraphError::Closed)
    }

    fn state_mut(&mut self) -> Result<&mut RunState, TapeGraphError> {
        self.state.as_mut().ok_or(TapeGraphError::Closed)
    }

    /// Binds `value` to the leaf `node`.
    ///
    /// Binding changes the inputs of any earlier run, so computed values and
    /// gradients are dropped; other bindings are kept.
    ///
    /// # Errors
    /// `Closed`, `UnknownNode`, `NotALeaf`, `DTypeMismatch`, or
    /// `ShapeMismatch` when the value's shape differs from the declared one.
    pub fn let_value(&mut self, node: NodeId, value: Tensor) -> Result<(), TapeGraphError> {
        let graph = self.graph;
        let state = self.state_mut()?;
        let declared = graph.node(node)?;
        if !declared.is_leaf() {
            return Err(TapeGraphError::NotALeaf { node });
        }
        if value.dtype() != declared.dtype() {
            return Err(TapeGraphError::DTypeMismatch {
                operation: format!("let {}", declared.label()),
                expected: declared.dtype(),
                actual: value.dtype(),
            });
        }
        if value.shape() != declared.shape() {
            return Err(TapeGraphError::ShapeMismatch {
                node,
                expected: declared.shape().to_vec(),
                actual: value.shape().to_vec(),
            });
        }
        state.bindings[node.index()] = Some(value);
        state.clear_run();
        Ok(())
    }

    /// Runs every node of the graph (the tape of all sinks).
    pub fn run_all(&mut self) -> Result<(), TapeGraphError> {
        let sinks = self.graph.sinks();
        self.run(&sinks)
    }

    /// Runs the subgraph needed for `outputs`.
    ///
    /// The tape is compiled on first use and cached. Every leaf on it must
    /// be bound; that is checked before any op runs. Values of a previous
    /// run are discarded up front, and a failing run publishes nothing, so
    /// after an error no derived node has a value.
    ///
    /// # Errors
    /// `Closed`, `UnknownNode`, `Cycle`, `UnboundLeaf`, `Shape`,
    /// `NumericalAnomaly` (with NaN/Inf watches enabled).
    pub fn run(&mut self, outputs: &[NodeId]) -> Result<(), TapeGraphError> {
        let graph = self.graph;
        let opts = self.opts;
        let state = self.state_mut()?;
        let tape = state.tape_for(graph, outputs)?;
        state.clear_run();

        for &id in tape.order() {
            let node = graph.node(id)?;
            if node.is_leaf() && state.bindings[id.index()].is_none() {
                return Err(TapeGraphError::UnboundLeaf {
                    node: id,
                    name: node.label(),
                });
            }
        }

        match execute(graph, &tape, &state.bindings, opts) {
            Ok(values) => {
                state.values = values;
                debug!("vm: ran {} instruction(s)", tape.len());
                Ok(())
            }
            Err(e) => {
                warn!("vm: run aborted: {}", e);
                Err(e)
            }
        }
    }

    /// Current value of `node`: the computed value after a run, the bound
    /// value for a leaf, `None` if unset.
    pub fn value(&self, node: NodeId) -> Result<Option<Tensor>, TapeGraphError> {
        let state = self.state()?;
        self.graph.node(node)?;
        let i = node.index();
        Ok(state.values[i].clone().or_else(|| state.bindings[i].clone()))
    }

    /// Gradients of the scalar `root` with respect to each of `targets`.
    ///
    /// Accumulators are re-zeroed on every call, so repeated calls (even with
    /// different roots) never mix. A target the gradient does not reach gets
    /// `None`, never a tensor of zeros.
    ///
    /// # Errors
    /// `Closed`, `UnknownNode`, `NotScalar` if `root` has more than one
    /// element, `NotComputed` if any node feeding `root` has no forward value.
    pub fn grad(&mut self, root: NodeId, targets: &[NodeId]) -> Result<Vec<Option<Tensor>>, TapeGraphError> {
        let graph = self.graph;
        let state = self.state_mut()?;
        let root_node = graph.node(root)?;
        if root_node.shape().iter().product::<usize>() != 1 {
            return Err(TapeGraphError::NotScalar {
                node: root,
                shape: root_node.shape().to_vec(),
            });
        }
        for &target in targets {
            graph.node(target)?;
        }

        let tape = state.tape_for(graph, &[root])?;
        if let Some(&missing) = tape.order().iter().find(|id| state.values[id.index()].is_none()) {
            return Err(TapeGraphError::NotComputed { node: missing });
        }

        state.grads.iter_mut().for_each(|g| *g = None);
        state.grads = backward(graph, &tape, &state.values, root)?;
        debug!("vm: gradient pass from {} done", root);
        Ok(targets.iter().map(|t| state.grads[t.index()].clone()).collect())
    }

    /// Accumulated gradient of `node` from the last [`grad`](Self::grad) call.
    pub fn gradient(&self, node: NodeId) -> Result<Option<Tensor>, TapeGraphError> {
        let state = self.state()?;
        self.graph.node(node)?;
        Ok(state.grads[node.index()].clone())
    }

    /// Clears computed values and gradients. Leaf bindings and compiled
    /// tapes are kept, so a following run reproduces the same results.
    pub fn reset(&mut self) -> Result<(), TapeGraphError> {
        self.state_mut()?.clear_run();
        debug!("vm: reset");
        Ok(())
    }

    /// Releases all machine state. Every later call, including a second
    /// `close`, fails with `Closed`. The graph is untouched and can back a
    /// new machine.
    pub fn close(&mut self) -> Result<(), TapeGraphError> {
        match self.state.take() {
            Some(_) => {
                debug!("vm: closed");
                Ok(())
            }
            None => Err(TapeGraphError::Closed),
        }
    }
}

#[cfg(test)]
#[path = "machine_test.rs"]
mod tests;
