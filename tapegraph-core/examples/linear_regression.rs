//! One forward and backward pass of `loss = mean((w * x + b - target)^2)`.
//! Prints the prediction, the loss and the gradients of the loss with respect
//! to `w` and `b`.

use tapegraph_core::{DType, Graph, TapeGraphError, TapeMachine, Tensor};

fn show(label: &str, value: Option<Tensor>) {
    match value {
        Some(t) => println!("{}: {}", label, t),
        None => println!("{}: <nil>", label),
    }
}

fn main() -> Result<(), TapeGraphError> {
    let mut g = Graph::new();

    let x = g.new_vector(DType::F64, 2, Some("x"));
    let w = g.new_vector(DType::F64, 2, Some("w"));
    let b = g.new_scalar(DType::F64, Some("b"));

    // y = w * x + b, with b reshaped to [1] so it broadcasts over the vector.
    let wx = g.mul(w, x)?;
    let b1 = g.reshape(b, &[1])?;
    let y = g.add(wx, b1)?;

    let target = g.new_scalar(DType::F64, Some("target"));
    let diff = g.sub(y, target)?;
    let sq = g.square(diff)?;
    let loss = g.mean(sq)?;

    let mut vm = TapeMachine::new(&g);
    vm.let_value(x, Tensor::new_f64(vec![1.0, 2.0], vec![2])?)?;
    vm.let_value(w, Tensor::new_f64(vec![0.5, -0.5], vec![2])?)?;
    vm.let_value(b, Tensor::scalar(0.0, DType::F64))?;
    vm.let_value(target, Tensor::scalar(1.0, DType::F64))?;

    vm.run_all()?;
    println!("After Forward Pass:");
    show("Output (y)", vm.value(y)?);
    show("Loss", vm.value(loss)?);

    vm.reset()?;
    vm.run_all()?;
    let grads = vm.grad(loss, &[w, b])?;
    let mut grads = grads.into_iter();
    show("Gradients (dy/dw)", grads.next().flatten());
    show("Gradients (dy/db)", grads.next().flatten());

    println!("\nGraph:\n{}", g.to_dot());
    vm.close()
}
