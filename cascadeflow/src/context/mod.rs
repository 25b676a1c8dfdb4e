//! Per-run execution context shared by a pipeline and its stages.

mod run;

pub use run::RunContext;
