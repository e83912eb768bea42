//! Differentiable computation graphs executed on a tape machine.
//!
//! Build a [`Graph`] of tensor operations, bind its leaves and run it with a
//! [`TapeMachine`], then ask the machine for reverse-mode gradients of a
//! scalar node.

pub mod autograd;
pub mod graph;
pub mod ops;
pub mod tensor;
pub mod types;
pub mod vm;

pub mod error;
pub use error::TapeGraphError;

pub use autograd::{GradCheckError, Tape};
pub use graph::{Graph, Node, NodeId};
pub use ops::OpKind;
pub use tensor::Tensor;
pub use types::DType;
pub use vm::{MachineOpts, TapeMachine};
