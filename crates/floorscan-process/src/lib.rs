#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// External tool invocations and their exit status.
pub mod command;

/// Execution of tool commands.
pub mod runner;

/// Ordered steps with failure policies.
pub mod pipeline;

/// COLMAP command builders and the sparse reconstruction sequence.
pub mod colmap;

/// nerfstudio command builders.
pub mod nerfstudio;

/// Runtime environment checks.
pub mod probe;

pub use command::{ToolCommand, ToolExit};
pub use pipeline::{FailurePolicy, Pipeline, PipelineError, PipelineReport, Step, StepOutcome};
pub use runner::{CommandRunner, DryRunRunner, ProcessError, SystemRunner};
