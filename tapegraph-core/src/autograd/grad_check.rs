use crate::error::TapeGraphError;
use crate::graph::{Graph, NodeId};
use crate::tensor::Tensor;
use crate::types::DType;
use crate::vm::TapeMachine;
use approx::abs_diff_eq;
use log::debug;
use thiserror::Error;

/// Failures of a finite-difference gradient check.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GradCheckError {
    #[error("Gradient mismatch for node {node}, element {element_index}: analytical {analytical_grad:?} != numerical {numerical_grad:?} (difference {difference:?})")]
    GradientMismatch {
        node: NodeId,
        element_index: usize,
        analytical_grad: f64,
        numerical_grad: f64,
        difference: f64,
    },
    #[error("Node {node} is not reached from the root, so it has no analytical gradient")]
    MissingAnalyticalGrad { node: NodeId },
    #[error("Numerical gradient is NaN or infinite for node {node}, element {element_index}. Loss+: {loss_plus:?}, Loss-: {loss_minus:?}")]
    NumericalGradNaNOrInfinite {
        node: NodeId,
        element_index: usize,
        loss_plus: f64,
        loss_minus: f64,
    },
    #[error("Node {node} is checked but has no binding")]
    MissingBinding { node: NodeId },
    #[error("Graph error during gradient check: {0}")]
    Graph(#[from] TapeGraphError),
}

fn with_data(like: &Tensor, data: Vec<f64>) -> Result<Tensor, TapeGraphError> {
    let shape = like.shape().to_vec();
    match like.dtype() {
        DType::F64 => Tensor::new_f64(data, shape),
        DType::F32 => Tensor::new(data.into_iter().map(|v| v as f32).collect(), shape),
    }
}

/// Runs the graph on `bindings` and returns the scalar value of `root`.
fn evaluate(graph: &Graph, root: NodeId, bindings: &[(NodeId, Tensor)]) -> Result<f64, TapeGraphError> {
    let mut vm = TapeMachine::new(graph);
    for (node, value) in bindings {
        vm.let_value(*node, value.clone())?;
    }
    vm.run(&[root])?;
    let out = vm.value(root)?.ok_or(TapeGraphError::NotComputed { node: root })?;
    vm.close()?;
    out.item()
}

/// Checks the machine's analytical gradients of `root` with respect to the
/// leaves in `wrt` against central finite differences.
///
/// Every leaf feeding `root` must appear in `bindings`. Each element of each
/// `wrt` leaf is perturbed by `±epsilon` on a fresh machine; an element fails
/// when the absolute and the relative difference both exceed `tolerance`.
pub fn check_grad(
    graph: &Graph,
    root: NodeId,
    bindings: &[(NodeId, Tensor)],
    wrt: &[NodeId],
    epsilon: f64,
    tolerance: f64,
) -> Result<(), GradCheckError> {
    let mut vm = TapeMachine::new(graph);
    for (node, value) in bindings {
        vm.let_value(*node, value.clone())?;
    }
    vm.run(&[root])?;
    let analytical = vm.grad(root, wrt)?;
    vm.close()?;

    for (&node, grad) in wrt.iter().zip(analytical) {
        let grad = grad.ok_or(GradCheckError::MissingAnalyticalGrad { node })?;
        let slot = bindings
            .iter()
            .position(|(n, _)| *n == node)
            .ok_or(GradCheckError::MissingBinding { node })?;
        let original = &bindings[slot].1;
        let base = original.to_vec_f64();
        let analytical_data = grad.to_vec_f64();

        for element_index in 0..base.len() {
            let mut perturbed = bindings.to_vec();

            let mut plus = base.clone();
            plus[element_index] += epsilon;
            perturbed[slot].1 = with_data(original, plus)?;
            let loss_plus = evaluate(graph, root, &perturbed)?;

            let mut minus = base.clone();
            minus[element_index] -= epsilon;
            perturbed[slot].1 = with_data(original, minus)?;
            let loss_minus = evaluate(graph, root, &perturbed)?;

            let numerical_grad = (loss_plus - loss_minus) / (2.0 * epsilon);
            if !numerical_grad.is_finite() {
                return Err(GradCheckError::NumericalGradNaNOrInfinite {
                    node,
                    element_index,
                    loss_plus,
                    loss_minus,
                });
            }

            let analytical_grad = analytical_data[element_index];
            let difference = (analytical_grad - numerical_grad).abs();
            let relative = difference / (analytical_grad.abs() + epsilon);
            if !abs_diff_eq!(analytical_grad, numerical_grad, epsilon = tolerance) && relative > tolerance {
                return Err(GradCheckError::GradientMismatch {
                    node,
                    element_index,
                    analytical_grad,
                    numerical_grad,
                    difference,
                });
            }
        }
    }
    debug!("grad_check: {} node(s) within tolerance {}", wrt.len(), tolerance);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::randn_seeded;

    #[test]
    fn test_regression_loss_gradients() -> Result<(), GradCheckError> {
        let mut g = Graph::new();
        let x = g.new_vector(DType::F64, 3, Some("x"));
        let w = g.new_vector(DType::F64, 3, Some("w"));
        let b = g.new_scalar(DType::F64, Some("b"));
        let t = g.new_scalar(DType::F64, Some("t"));
        let wx = g.mul(w, x)?;
        let y = g.add(wx, b)?;
        let d = g.sub(y, t)?;
        let sq = g.square(d)?;
        let loss = g.mean(sq)?;

        let bindings = vec![
            (x, randn_seeded(&[3], DType::F64, 7)),
            (w, randn_seeded(&[3], DType::F64, 11)),
            (b, Tensor::scalar(0.3, DType::F64)),
            (t, Tensor::scalar(1.0, DType::F64)),
        ];
        check_grad(&g, loss, &bindings, &[x, w, b, t], 1e-6, 1e-5)
    }

    #[test]
    fn test_division_and_reshape() -> Result<(), GradCheckError> {
        let mut g = Graph::new();
        let a = g.new_matrix(DType::F64, 2, 3, Some("a"));
        let c = g.new_vector(DType::F64, 3, Some("c"));
        let q = g.div(a, c)?;
        let r = g.reshape(q, &[3, 2])?;
        let n = g.neg(r)?;
        let s = g.sum(n)?;

        let bindings = vec![
            (a, randn_seeded(&[2, 3], DType::F64, 3)),
            (c, Tensor::new_f64(vec![1.5, -2.0, 3.0], vec![3])?),
        ];
        check_grad(&g, s, &bindings, &[a, c], 1e-6, 1e-5)
    }

    #[test]
    fn test_unreached_leaf_is_reported() -> Result<(), GradCheckError> {
        let mut g = Graph::new();
        let a = g.new_scalar(DType::F64, Some("a"));
        let other = g.new_scalar(DType::F64, Some("other"));
        let sq = g.square(a)?;
        let bindings = vec![
            (a, Tensor::scalar(2.0, DType::F64)),
            (other, Tensor::scalar(1.0, DType::F64)),
        ];
        assert_eq!(
            check_grad(&g, sq, &bindings, &[other], 1e-6, 1e-5),
            Err(GradCheckError::MissingAnalyticalGrad { node: other })
        );
        Ok(())
    }

    #[test]
    fn test_graph_errors_convert() {
        let mut g = Graph::new();
        let a = g.new_scalar(DType::F64, Some("a"));
        let sq = g.square(a).unwrap();
        let err = check_grad(&g, sq, &[], &[a], 1e-6, 1e-5).unwrap_err();
        assert!(matches!(err, GradCheckError::Graph(TapeGraphError::UnboundLeaf { .. })));
    }
}
