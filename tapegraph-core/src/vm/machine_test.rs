use super::*;
use crate::types::DType;
use approx::assert_relative_eq;

/// `loss = mean(square(y - target))` over `y = w * x + reshape(b, [1])`.
struct Regression {
    graph: Graph,
    x: NodeId,
    w: NodeId,
    b: NodeId,
    target: NodeId,
    wx: NodeId,
    y: NodeId,
    loss: NodeId,
}

fn regression() -> Result<Regression, TapeGraphError> {
    let mut graph = Graph::new();
    let x = graph.new_vector(DType::F64, 2, Some("x"));
    let w = graph.new_vector(DType::F64, 2, Some("w"));
    let b = graph.new_scalar(DType::F64, Some("b"));
    let wx = graph.mul(w, x)?;
    let b1 = graph.reshape(b, &[1])?;
    let y = graph.add(wx, b1)?;
    let target = graph.new_scalar(DType::F64, Some("target"));
    let diff = graph.sub(y, target)?;
    let sq = graph.square(diff)?;
    let loss = graph.mean(sq)?;
    Ok(Regression {
        graph,
        x,
        w,
        b,
        target,
        wx,
        y,
        loss,
    })
}

fn bind_all(vm: &mut TapeMachine<'_>, r: &Regression) -> Result<(), TapeGraphError> {
    vm.let_value(r.x, Tensor::new_f64(vec![1.0, 2.0], vec![2])?)?;
    vm.let_value(r.w, Tensor::new_f64(vec![0.5, -0.5], vec![2])?)?;
    vm.let_value(r.b, Tensor::scalar(0.0, DType::F64))?;
    vm.let_value(r.target, Tensor::scalar(1.0, DType::F64))?;
    Ok(())
}

fn values_of(vm: &TapeMachine<'_>, node: NodeId) -> Vec<f64> {
    vm.value(node)
        .expect("machine open")
        .map(|t| t.to_vec_f64())
        .unwrap_or_default()
}

#[test]
fn test_broadcast_regression_forward_and_grad() -> Result<(), TapeGraphError> {
    let r = regression()?;
    let mut vm = TapeMachine::new(&r.graph);
    bind_all(&mut vm, &r)?;
    vm.run_all()?;

    assert_eq!(values_of(&vm, r.y), vec![0.5, -1.0]);
    let loss = vm.value(r.loss)?.expect("loss computed");
    assert_relative_eq!(loss.item()?, 2.125);

    let grads = vm.grad(r.loss, &[r.w, r.b])?;
    let dw = grads[0].as_ref().expect("w reached");
    let db = grads[1].as_ref().expect("b reached");
    assert_eq!(dw.shape(), &[2]);
    assert_relative_eq!(dw.get(&[0])?, -0.5);
    assert_relative_eq!(dw.get(&[1])?, -4.0);
    assert_eq!(db.shape(), &[] as &[usize]);
    assert_relative_eq!(db.item()?, -2.5);
    vm.close()
}

#[test]
fn test_summed_regression() -> Result<(), TapeGraphError> {
    // y = sum(w * x) + b, loss = square(y - target)
    let mut g = Graph::new();
    let x = g.new_vector(DType::F64, 2, Some("x"));
    let w = g.new_vector(DType::F64, 2, Some("w"));
    let b = g.new_scalar(DType::F64, Some("b"));
    let target = g.new_scalar(DType::F64, Some("target"));
    let wx = g.mul(w, x)?;
    let s = g.sum(wx)?;
    let y = g.add(s, b)?;
    let diff = g.sub(y, target)?;
    let loss = g.square(diff)?;

    let mut vm = TapeMachine::new(&g);
    vm.let_value(x, Tensor::new_f64(vec![1.0, 2.0], vec![2])?)?;
    vm.let_value(w, Tensor::new_f64(vec![0.5, -0.5], vec![2])?)?;
    vm.let_value(b, Tensor::scalar(0.0, DType::F64))?;
    vm.let_value(target, Tensor::scalar(1.0, DType::F64))?;
    vm.run_all()?;

    assert_relative_eq!(vm.value(y)?.expect("y computed").item()?, -0.5);
    assert_relative_eq!(vm.value(loss)?.expect("loss computed").item()?, 2.25);

    let grads = vm.grad(loss, &[w, b])?;
    assert_eq!(grads[0].as_ref().map(|t| t.to_vec_f64()), Some(vec![-3.0, -6.0]));
    assert_eq!(grads[1].as_ref().map(|t| t.to_vec_f64()), Some(vec![-3.0]));
    Ok(())
}

#[test]
fn test_reset_is_idempotent() -> Result<(), TapeGraphError> {
    let r = regression()?;
    let mut vm = TapeMachine::new(&r.graph);
    bind_all(&mut vm, &r)?;
    vm.run_all()?;
    let first: Vec<u64> = values_of(&vm, r.loss).iter().map(|v| v.to_bits()).collect();
    let first_grad = vm.grad(r.loss, &[r.w])?;

    vm.reset()?;
    assert_eq!(vm.value(r.loss)?, None);
    assert_eq!(vm.value(r.wx)?, None);
    assert_eq!(vm.gradient(r.w)?, None);
    // Bindings survive a reset.
    assert_eq!(values_of(&vm, r.x), vec![1.0, 2.0]);

    vm.run_all()?;
    let second: Vec<u64> = values_of(&vm, r.loss).iter().map(|v| v.to_bits()).collect();
    assert_eq!(first, second);
    assert_eq!(vm.grad(r.loss, &[r.w])?, first_grad);
    Ok(())
}

#[test]
fn test_repeated_grad_does_not_accumulate() -> Result<(), TapeGraphError> {
    let r = regression()?;
    let mut vm = TapeMachine::new(&r.graph);
    bind_all(&mut vm, &r)?;
    vm.run_all()?;
    let once = vm.grad(r.loss, &[r.w, r.b])?;
    let twice = vm.grad(r.loss, &[r.w, r.b])?;
    assert_eq!(once, twice);
    assert_eq!(vm.gradient(r.w)?, once[0]);
    Ok(())
}

#[test]
fn test_unreached_target_has_no_gradient() -> Result<(), TapeGraphError> {
    let mut r = regression()?;
    let u = r.graph.new_vector(DType::F64, 2, Some("u"));
    let su = r.graph.square(u)?;
    let mut vm = TapeMachine::new(&r.graph);
    bind_all(&mut vm, &r)?;
    vm.let_value(u, Tensor::new_f64(vec![0.0, 0.0], vec![2])?)?;
    vm.run_all()?;

    let grads = vm.grad(r.loss, &[r.w, u, su, r.target])?;
    assert!(grads[0].is_some());
    assert_eq!(grads[1], None, "unreached leaf must not get a zero tensor");
    assert_eq!(grads[2], None);
    // d loss / d target = -mean(2 * (y - target)) = 2.5
    assert_relative_eq!(grads[3].as_ref().expect("target reached").item()?, 2.5);

    // Root of its own gradient is seeded with one.
    let own = vm.grad(r.loss, &[r.loss])?;
    assert_relative_eq!(own[0].as_ref().expect("root").item()?, 1.0);
    Ok(())
}

#[test]
fn test_unbound_leaf_fails_before_any_op() -> Result<(), TapeGraphError> {
    let r = regression()?;
    let mut vm = TapeMachine::new(&r.graph);
    vm.let_value(r.x, Tensor::new_f64(vec![1.0, 2.0], vec![2])?)?;
    vm.let_value(r.w, Tensor::new_f64(vec![0.5, -0.5], vec![2])?)?;
    vm.let_value(r.target, Tensor::scalar(1.0, DType::F64))?;

    let err = vm.run_all().unwrap_err();
    assert_eq!(
        err,
        TapeGraphError::UnboundLeaf {
            node: r.b,
            name: "b".to_string()
        }
    );
    // w * x does not depend on b but must not be observable either.
    assert_eq!(vm.value(r.wx)?, None);
    assert_eq!(vm.value(r.loss)?, None);
    Ok(())
}

#[test]
fn test_run_subset() -> Result<(), TapeGraphError> {
    let r = regression()?;
    let mut vm = TapeMachine::new(&r.graph);
    vm.let_value(r.x, Tensor::new_f64(vec![1.0, 2.0], vec![2])?)?;
    vm.let_value(r.w, Tensor::new_f64(vec![3.0, 4.0], vec![2])?)?;
    // b and target stay unbound; they are not needed for w * x.
    vm.run(&[r.wx])?;
    assert_eq!(values_of(&vm, r.wx), vec![3.0, 8.0]);
    assert_eq!(vm.value(r.y)?, None);
    Ok(())
}

#[test]
fn test_grad_requires_forward_values() -> Result<(), TapeGraphError> {
    let r = regression()?;
    let mut vm = TapeMachine::new(&r.graph);
    bind_all(&mut vm, &r)?;
    assert!(matches!(vm.grad(r.loss, &[r.w]), Err(TapeGraphError::NotComputed { .. })));

    vm.run_all()?;
    vm.reset()?;
    assert!(matches!(vm.grad(r.loss, &[r.w]), Err(TapeGraphError::NotComputed { .. })));
    Ok(())
}

#[test]
fn test_grad_of_non_scalar_root() -> Result<(), TapeGraphError> {
    let r = regression()?;
    let mut vm = TapeMachine::new(&r.graph);
    bind_all(&mut vm, &r)?;
    vm.run_all()?;
    assert_eq!(
        vm.grad(r.y, &[r.w]),
        Err(TapeGraphError::NotScalar {
            node: r.y,
            shape: vec![2]
        })
    );
    Ok(())
}

#[test]
fn test_let_value_errors() -> Result<(), TapeGraphError> {
    let r = regression()?;
    let mut vm = TapeMachine::new(&r.graph);
    let v2 = Tensor::new_f64(vec![1.0, 2.0], vec![2])?;

    assert_eq!(vm.let_value(r.wx, v2.clone()), Err(TapeGraphError::NotALeaf { node: r.wx }));
    assert_eq!(
        vm.let_value(r.x, Tensor::new_f64(vec![1.0, 2.0, 3.0], vec![3])?),
        Err(TapeGraphError::ShapeMismatch {
            node: r.x,
            expected: vec![2],
            actual: vec![3]
        })
    );
    assert!(matches!(
        vm.let_value(r.x, Tensor::new(vec![1.0, 2.0], vec![2])?),
        Err(TapeGraphError::DTypeMismatch {
            expected: DType::F64,
            actual: DType::F32,
            ..
        })
    ));
    let ghost = NodeId::new(r.graph.len());
    assert_eq!(vm.let_value(ghost, v2), Err(TapeGraphError::UnknownNode { node: ghost }));
    Ok(())
}

#[test]
fn test_rebinding_drops_computed_values() -> Result<(), TapeGraphError> {
    let r = regression()?;
    let mut vm = TapeMachine::new(&r.graph);
    bind_all(&mut vm, &r)?;
    vm.run_all()?;
    vm.let_value(r.w, Tensor::new_f64(vec![1.0, 1.0], vec![2])?)?;
    assert_eq!(vm.value(r.y)?, None);
    vm.run_all()?;
    assert_eq!(values_of(&vm, r.y), vec![1.0, 2.0]);
    Ok(())
}

#[test]
fn test_close_releases_machine() -> Result<(), TapeGraphError> {
    let r = regression()?;
    let mut vm = TapeMachine::new(&r.graph);
    bind_all(&mut vm, &r)?;
    vm.run_all()?;
    vm.close()?;

    assert!(vm.is_closed());
    assert_eq!(vm.close(), Err(TapeGraphError::Closed));
    assert_eq!(vm.run_all(), Err(TapeGraphError::Closed));
    assert_eq!(vm.value(r.y), Err(TapeGraphError::Closed));
    assert_eq!(vm.reset(), Err(TapeGraphError::Closed));
    assert_eq!(vm.grad(r.loss, &[r.w]), Err(TapeGraphError::Closed));
    assert_eq!(
        vm.let_value(r.b, Tensor::scalar(1.0, DType::F64)),
        Err(TapeGraphError::Closed)
    );

    // The graph outlives the machine.
    let mut again = TapeMachine::new(&r.graph);
    bind_all(&mut again, &r)?;
    again.run_all()?;
    assert_eq!(values_of(&again, r.y), vec![0.5, -1.0]);
    Ok(())
}

#[test]
fn test_machines_share_a_graph() -> Result<(), TapeGraphError> {
    let r = regression()?;
    let mut first = TapeMachine::new(&r.graph);
    let mut second = TapeMachine::new(&r.graph);
    bind_all(&mut first, &r)?;
    bind_all(&mut second, &r)?;
    second.let_value(r.w, Tensor::new_f64(vec![2.0, 2.0], vec![2])?)?;

    first.run_all()?;
    second.run_all()?;
    assert_eq!(values_of(&first, r.y), vec![0.5, -1.0]);
    assert_eq!(values_of(&second, r.y), vec![2.0, 4.0]);

    second.close()?;
    assert!(first.value(r.y)?.is_some());
    Ok(())
}

#[test]
fn test_tapes_are_cached_per_output_set() -> Result<(), TapeGraphError> {
    let r = regression()?;
    let mut vm = TapeMachine::new(&r.graph);
    bind_all(&mut vm, &r)?;
    vm.run_all()?;
    vm.run_all()?;
    vm.grad(r.loss, &[r.w])?;
    let cached = |vm: &TapeMachine<'_>| vm.state.as_ref().map(|s| s.tapes.len());
    // run_all compiles for the single sink `loss`, which grad reuses.
    assert_eq!(cached(&vm), Some(1));

    vm.run(&[r.wx, r.y, r.wx])?;
    vm.run(&[r.y, r.wx])?;
    assert_eq!(cached(&vm), Some(2));
    Ok(())
}

#[test]
fn test_nan_watch() -> Result<(), TapeGraphError> {
    let mut g = Graph::new();
    let a = g.new_scalar(DType::F64, Some("a"));
    let b = g.new_scalar(DType::F64, Some("b"));
    let q = g.div(a, b)?;
    let zero = Tensor::scalar(0.0, DType::F64);

    let mut plain = TapeMachine::new(&g);
    plain.let_value(a, zero.clone())?;
    plain.let_value(b, zero.clone())?;
    plain.run_all()?;
    assert!(plain.value(q)?.expect("computed").has_nan());

    let mut watched = TapeMachine::with_opts(&g, MachineOpts::default().with_nan_watch());
    watched.let_value(a, zero.clone())?;
    watched.let_value(b, zero)?;
    assert_eq!(
        watched.run_all(),
        Err(TapeGraphError::NumericalAnomaly {
            node: q,
            op: "div",
            kind: "NaN"
        })
    );
    assert_eq!(watched.value(q)?, None);
    Ok(())
}

#[test]
fn test_inf_watch() -> Result<(), TapeGraphError> {
    let mut g = Graph::new();
    let a = g.new_scalar(DType::F64, Some("a"));
    let b = g.new_scalar(DType::F64, Some("b"));
    let q = g.div(a, b)?;
    let opts = MachineOpts::default().with_inf_watch().with_trace();
    let mut vm = TapeMachine::with_opts(&g, opts);
    assert_eq!(vm.opts(), opts);
    vm.let_value(a, Tensor::scalar(1.0, DType::F64))?;
    vm.let_value(b, Tensor::scalar(0.0, DType::F64))?;
    assert!(matches!(
        vm.run_all(),
        Err(TapeGraphError::NumericalAnomaly { kind: "infinite", .. })
    ));

    vm.let_value(b, Tensor::scalar(4.0, DType::F64))?;
    vm.run_all()?;
    assert_relative_eq!(vm.value(q)?.expect("computed").item()?, 0.25);
    Ok(())
}

#[test]
fn test_f32_graph() -> Result<(), TapeGraphError> {
    let mut g = Graph::new();
    let x = g.new_vector(DType::F32, 3, Some("x"));
    let m = g.mean(x)?;
    let mut vm = TapeMachine::new(&g);
    vm.let_value(x, Tensor::new(vec![1.0, 2.0, 6.0], vec![3])?)?;
    vm.run_all()?;
    let out = vm.value(m)?.expect("computed");
    assert_eq!(out.dtype(), DType::F32);
    assert_relative_eq!(out.item()?, 3.0);
    let dx = vm.grad(m, &[x])?.remove(0).expect("x reached");
    assert_eq!(dx.dtype(), DType::F32);
    for v in dx.to_vec_f32() {
        assert_relative_eq!(v, 1.0 / 3.0, epsilon = 1e-6);
    }
    Ok(())
}
