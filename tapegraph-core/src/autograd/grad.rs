use crate::autograd::tape::Tape;
use crate::error::TapeGraphError;
use crate::graph::{Graph, NodeId};
use crate::tensor::{ones_like, Tensor};
use log::{debug, trace};

/// Adds `grad` into the accumulator slot, creating it on first contribution.
fn accumulate(slot: &mut Option<Tensor>, grad: Tensor) -> Result<(), TapeGraphError> {
    *slot = Some(match slot.take() {
        Some(existing) => existing.add(&grad)?,
        None => grad,
    });
    Ok(())
}

fn forward_value(values: &[Option<Tensor>], id: NodeId) -> Result<&Tensor, TapeGraphError> {
    values
        .get(id.index())
        .and_then(Option::as_ref)
        .ok_or(TapeGraphError::NotComputed { node: id })
}

/// Reverse-mode pass over `tape`, seeded at `root`.
///
/// `values` holds the forward value of every node on the tape, indexed by
/// node. Returns one accumulator per graph node: `Some` for every node the
/// gradient reached, `None` for the rest. A node consumed several times
/// receives the sum of its consumers' contributions.
pub fn backward(
    graph: &Graph,
    tape: &Tape,
    values: &[Option<Tensor>],
    root: NodeId,
) -> Result<Vec<Option<Tensor>>, TapeGraphError> {
    let mut grads: Vec<Option<Tensor>> = vec![None; graph.len()];
    let seed = ones_like(forward_value(values, root)?);
    grads[root.index()] = Some(seed);
    debug!("grad: reverse pass from {} over {} node(s)", root, tape.len());

    for &id in tape.order().iter().rev() {
        let Some(grad_output) = grads[id.index()].clone() else {
            continue;
        };
        let node = graph.node(id)?;
        let Some(op) = node.op() else {
            continue;
        };
        let inputs = node
            .inputs()
            .iter()
            .map(|&input| forward_value(values, input))
            .collect::<Result<Vec<_>, _>>()?;
        let output = forward_value(values, id)?;
        let input_grads = op.backward(&inputs, output, &grad_output)?;
        trace!("grad: {} ({}) -> {} input gradient(s)", id, op, input_grads.len());

        for (&input, grad) in node.inputs().iter().zip(input_grads) {
            accumulate(&mut grads[input.index()], grad)?;
        }
    }
    Ok(grads)
}
