#[derive(Debug, Clone)]
pub struct VmConfig {
    /// Bound on nested `nest` calls. Every level costs a few native frames,
    /// so the default keeps a runaway recursion inside a 2 MiB thread stack.
    pub max_call_depth: usize,
    /// Bound on nodes executed while dispatching one token.
    pub max_steps: Option<usize>,
    pub max_stack_size: usize,
    /// Bound on nested `include`s.
    pub max_load_depth: usize,
    /// Print the `ok` prompt and stack dump after each line.
    pub prompt: bool,
    /// Trace lookups and dispatch to the error sink.
    pub trace: bool,
    /// Seed for `rnd`; drawn from entropy when absent.
    pub seed: Option<u64>,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            max_call_depth: 256,
            max_steps: None,
            max_stack_size: 10_000,
            max_load_depth: 16,
            prompt: true,
            trace: false,
            seed: None,
        }
    }
}
