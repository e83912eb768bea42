//! Linearization and reverse-mode differentiation of a graph.

pub mod grad;
pub mod grad_check;
pub mod tape;

pub use grad_check::{check_grad, GradCheckError};
pub use tape::{compile, Tape, Topology};
