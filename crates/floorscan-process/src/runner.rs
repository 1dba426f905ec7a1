use std::{
    path::Path,
    process::{Command, Stdio},
};

use crate::command::{ToolCommand, ToolExit};

/// Error types for running external tools.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// The program could not be started.
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        /// The program that failed to start.
        program: String,
        /// The underlying io error.
        #[source]
        source: std::io::Error,
    },
}

/// Runs a tool command to completion.
///
/// Implementations block until the tool has exited. The sequencer only looks at the
/// returned exit status, so tests substitute a runner that replays scripted codes.
pub trait CommandRunner {
    /// Run the command and return its exit status.
    fn run(&mut self, cmd: &ToolCommand) -> Result<ToolExit, ProcessError>;

    /// Create an output directory a command expects to exist.
    fn prepare_dir(&mut self, dir: &Path) -> std::io::Result<()> {
        std::fs::create_dir_all(dir)
    }
}

/// Runs commands as child processes of the current process.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&mut self, cmd: &ToolCommand) -> Result<ToolExit, ProcessError> {
        let mut command = Command::new(&cmd.program);
        command.args(&cmd.args);
        if cmd.quiet {
            command.stdout(Stdio::null()).stderr(Stdio::null());
        }

        let status = command.status().map_err(|source| ProcessError::Spawn {
            program: cmd.program_name(),
            source,
        })?;

        Ok(status.into())
    }
}

/// Records commands instead of running them; every command succeeds.
#[derive(Debug, Default, Clone)]
pub struct DryRunRunner {
    /// The commands received so far, in order.
    pub commands: Vec<ToolCommand>,
}

impl CommandRunner for DryRunRunner {
    fn run(&mut self, cmd: &ToolCommand) -> Result<ToolExit, ProcessError> {
        log::info!("[dry-run] {cmd}");
        self.commands.push(cmd.clone());
        Ok(ToolExit::SUCCESS)
    }

    fn prepare_dir(&mut self, dir: &Path) -> std::io::Result<()> {
        log::info!("[dry-run] mkdir -p {}", dir.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dry_run_records() {
        let mut runner = DryRunRunner::default();
        let exit = runner.run(&ToolCommand::new("ns-train").arg("nerfacto")).unwrap();
        assert!(exit.success());
        assert_eq!(runner.commands.len(), 1);
        assert_eq!(runner.commands[0].program, "ns-train");
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let mut runner = SystemRunner;
        let res = runner.run(&ToolCommand::new("floorscan-no-such-tool-7c1f").quiet());
        match res {
            Err(ProcessError::Spawn { program, .. }) => {
                assert_eq!(program, "floorscan-no-such-tool-7c1f")
            }
            other => panic!("expected spawn error, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_exit_codes() {
        let mut runner = SystemRunner;
        let ok = runner.run(&ToolCommand::new("true")).unwrap();
        assert!(ok.success());
        let failed = runner.run(&ToolCommand::new("false")).unwrap();
        assert_eq!(failed.code, Some(1));
    }
}
