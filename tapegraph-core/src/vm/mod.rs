//! Tape machine: executes a graph in topological order and differentiates it.

mod machine;
pub mod opts;

pub use machine::TapeMachine;
pub use opts::MachineOpts;
