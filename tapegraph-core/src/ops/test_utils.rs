// Finite-difference helpers shared by the op tests.

use super::OpKind;
use crate::error::TapeGraphError;
use crate::tensor::Tensor;

/// <grad, forward(inputs)> as a plain number.
fn weighted_output(kind: &OpKind, inputs: &[&Tensor], grad: &Tensor) -> Result<f64, TapeGraphError> {
    let out = kind.forward(inputs)?;
    Ok(out
        .to_vec_f64()
        .iter()
        .zip(grad.to_vec_f64())
        .map(|(o, g)| o * g)
        .sum())
}

/// Central-difference estimate of the vector-Jacobian product of `kind`
/// at `inputs`, for the output gradient `grad`. F64 inputs only.
pub(crate) fn numeric_vjp(
    kind: &OpKind,
    inputs: &[&Tensor],
    grad: &Tensor,
    epsilon: f64,
) -> Result<Vec<Tensor>, TapeGraphError> {
    let mut grads = Vec::with_capacity(inputs.len());
    for (idx, input) in inputs.iter().enumerate() {
        let base = input.to_vec_f64();
        let mut estimate = Vec::with_capacity(base.len());
        for elem in 0..base.len() {
            let mut plus = base.clone();
            plus[elem] += epsilon;
            let mut minus = base.clone();
            minus[elem] -= epsilon;
            let plus_t = Tensor::new_f64(plus, input.shape().to_vec())?;
            let minus_t = Tensor::new_f64(minus, input.shape().to_vec())?;

            let mut args_plus: Vec<&Tensor> = inputs.to_vec();
            args_plus[idx] = &plus_t;
            let mut args_minus: Vec<&Tensor> = inputs.to_vec();
            args_minus[idx] = &minus_t;

            let f_plus = weighted_output(kind, &args_plus, grad)?;
            let f_minus = weighted_output(kind, &args_minus, grad)?;
            estimate.push((f_plus - f_minus) / (2.0 * epsilon));
        }
        grads.push(Tensor::new_f64(estimate, input.shape().to_vec())?);
    }
    Ok(grads)
}

/// Asserts the analytic backward rule of `kind` agrees with finite differences.
pub(crate) fn assert_backward_matches_numeric(kind: &OpKind, inputs: &[&Tensor], grad: &Tensor) {
    let output = kind.forward(inputs).expect("forward failed");
    let analytic = kind.backward(inputs, &output, grad).expect("backward failed");
    let numeric = numeric_vjp(kind, inputs, grad, 1e-6).expect("numeric vjp failed");
    for (i, (a, n)) in analytic.iter().zip(&numeric).enumerate() {
        assert_eq!(a.shape(), inputs[i].shape(), "gradient {} has the wrong shape", i);
        for (x, y) in a.to_vec_f64().iter().zip(n.to_vec_f64()) {
            approx::assert_abs_diff_eq!(*x, y, epsilon = 1e-5);
        }
    }
}
