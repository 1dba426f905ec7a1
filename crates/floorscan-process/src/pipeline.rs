use std::path::PathBuf;

use crate::{
    command::{ToolCommand, ToolExit},
    runner::{CommandRunner, ProcessError},
};

/// What the sequencer does when a step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop the sequence and report an error.
    Abort,
    /// Log a warning and carry on with the next step.
    Warn,
}

/// One tool invocation in a pipeline.
#[derive(Debug, Clone)]
pub struct Step {
    /// Human readable step name used in logs and errors.
    pub name: String,
    /// The tool invocation.
    pub command: ToolCommand,
    /// Behaviour on a non-zero exit.
    pub policy: FailurePolicy,
    /// Directories created before the command runs.
    pub prepare_dirs: Vec<PathBuf>,
}

impl Step {
    /// Create a step that aborts the pipeline on failure.
    pub fn new(name: impl Into<String>, command: ToolCommand) -> Self {
        Self {
            name: name.into(),
            command,
            policy: FailurePolicy::Abort,
            prepare_dirs: Vec::new(),
        }
    }

    /// Only warn when this step fails.
    pub fn warn_on_failure(mut self) -> Self {
        self.policy = FailurePolicy::Warn;
        self
    }

    /// Ensure `dir` exists before the command runs.
    pub fn prepare_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prepare_dirs.push(dir.into());
        self
    }
}

/// Result of a step that was run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    /// The step name.
    pub name: String,
    /// Exit status, `None` when the tool could not be started.
    pub exit: Option<ToolExit>,
    /// The policy the step ran under.
    pub policy: FailurePolicy,
}

impl StepOutcome {
    /// Whether the step's tool exited with code 0.
    pub fn success(&self) -> bool {
        self.exit.map(|e| e.success()).unwrap_or(false)
    }
}

/// Summary of a completed pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    /// Outcomes of every step that ran, in order.
    pub outcomes: Vec<StepOutcome>,
    /// Messages for steps that failed under [`FailurePolicy::Warn`].
    pub warnings: Vec<String>,
}

impl PipelineReport {
    /// Whether the run finished without any warning.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Error types for a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A step exited unsuccessfully.
    #[error("step `{step}` failed with {exit}")]
    StepFailed {
        /// The failing step.
        step: String,
        /// Its exit status.
        exit: ToolExit,
    },

    /// A step's tool could not be started.
    #[error("step `{step}` could not run: {source}")]
    Process {
        /// The failing step.
        step: String,
        /// The underlying error.
        #[source]
        source: ProcessError,
    },

    /// An output directory could not be created.
    #[error("failed to create directory {path}: {source}")]
    PrepareDir {
        /// The directory.
        path: PathBuf,
        /// The underlying io error.
        #[source]
        source: std::io::Error,
    },
}

/// An ordered list of steps run one after the other.
#[derive(Debug, Clone)]
pub struct Pipeline {
    name: String,
    steps: Vec<Step>,
}

impl Pipeline {
    /// Create an empty pipeline.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    /// Append a step.
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// The pipeline name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The steps in execution order.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Run every step in order, halting on the first failure of an aborting step.
    ///
    /// # Arguments
    ///
    /// * `runner` - Executes the tool commands.
    ///
    /// # Returns
    ///
    /// The report of all steps that ran, or the error of the step that stopped the run.
    pub fn run<R: CommandRunner + ?Sized>(
        &self,
        runner: &mut R,
    ) -> Result<PipelineReport, PipelineError> {
        let mut report = PipelineReport::default();
        let total = self.steps.len();

        for (i, step) in self.steps.iter().enumerate() {
            log::info!("[{}/{}] {}: {}", i + 1, total, self.name, step.name);
            for dir in &step.prepare_dirs {
                runner
                    .prepare_dir(dir)
                    .map_err(|source| PipelineError::PrepareDir {
                        path: dir.clone(),
                        source,
                    })?;
            }
            log::debug!("running: {}", step.command);

            let exit = match runner.run(&step.command) {
                Ok(exit) => Some(exit),
                Err(err) => match step.policy {
                    FailurePolicy::Abort => {
                        return Err(PipelineError::Process {
                            step: step.name.clone(),
                            source: err,
                        })
                    }
                    FailurePolicy::Warn => {
                        let msg = format!("{} could not run: {}", step.name, err);
                        log::warn!("{msg}");
                        report.warnings.push(msg);
                        None
                    }
                },
            };

            if let Some(exit) = exit {
                if exit.success() {
                    log::info!("{} finished", step.name);
                } else {
                    match step.policy {
                        FailurePolicy::Abort => {
                            log::error!("{} failed with {}", step.name, exit);
                            return Err(PipelineError::StepFailed {
                                step: step.name.clone(),
                                exit,
                            });
                        }
                        FailurePolicy::Warn => {
                            let msg = format!("{} failed with {}", step.name, exit);
                            log::warn!("{msg}");
                            report.warnings.push(msg);
                        }
                    }
                }
            }

            report.outcomes.push(StepOutcome {
                name: step.name.clone(),
                exit,
                policy: step.policy,
            });
        }

        Ok(report)
    }
}
