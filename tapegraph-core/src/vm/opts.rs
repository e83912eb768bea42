/// Execution options for a [`TapeMachine`](super::TapeMachine).
///
/// ```
/// use tapegraph_core::vm::MachineOpts;
///
/// let opts = MachineOpts::default().with_nan_watch().with_trace();
/// assert!(opts.watch_nan);
/// assert!(!opts.watch_inf);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MachineOpts {
    /// Fail the run with `NumericalAnomaly` when an op yields a NaN.
    pub watch_nan: bool,
    /// Fail the run with `NumericalAnomaly` when an op yields an infinity.
    pub watch_inf: bool,
    /// Emit one `trace!` record per executed instruction.
    pub trace_exec: bool,
}

impl MachineOpts {
    pub fn with_nan_watch(mut self) -> Self {
        self.watch_nan = true;
        self
    }

    pub fn with_inf_watch(mut self) -> Self {
        self.watch_inf = true;
        self
    }

    pub fn with_trace(mut self) -> Self {
        self.trace_exec = true;
        self
    }
}
