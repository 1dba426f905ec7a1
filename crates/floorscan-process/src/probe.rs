use std::path::Path;

use crate::{command::ToolCommand, runner::CommandRunner};

/// Facts about the machine the pipeline runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Environment {
    /// A `/.dockerenv` marker is present.
    pub in_docker: bool,
    /// `nvidia-smi` ran and exited with code 0.
    pub gpu_available: bool,
}

impl Environment {
    /// Probe the current machine.
    pub fn detect<R: CommandRunner + ?Sized>(runner: &mut R) -> Self {
        Self::detect_with_root(runner, Path::new("/"))
    }

    /// Probe using `root` as the filesystem root for marker files.
    pub fn detect_with_root<R: CommandRunner + ?Sized>(runner: &mut R, root: &Path) -> Self {
        let in_docker = root.join(".dockerenv").exists();
        let gpu_available = match runner.run(&ToolCommand::new("nvidia-smi").quiet()) {
            Ok(exit) => exit.success(),
            Err(err) => {
                log::debug!("gpu check failed: {err}");
                false
            }
        };

        Self {
            in_docker,
            gpu_available,
        }
    }

    /// Log the probe results.
    pub fn log(&self) {
        if self.in_docker {
            log::info!("running in docker");
        } else {
            log::warn!("not running in docker");
        }
        if self.gpu_available {
            log::info!("gpu detected");
        } else {
            log::warn!("no gpu detected");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        command::ToolExit,
        runner::{DryRunRunner, ProcessError},
    };

    struct NoGpu;

    impl CommandRunner for NoGpu {
        fn run(&mut self, cmd: &ToolCommand) -> Result<ToolExit, ProcessError> {
            Err(ProcessError::Spawn {
                program: cmd.program_name(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
        }
    }

    #[test]
    fn test_detect_docker_marker() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::tempdir()?;
        let mut runner = DryRunRunner::default();

        let env = Environment::detect_with_root(&mut runner, tmp.path());
        assert!(!env.in_docker);
        assert!(env.gpu_available);
        assert!(runner.commands[0].quiet);

        std::fs::write(tmp.path().join(".dockerenv"), b"")?;
        let env = Environment::detect_with_root(&mut NoGpu, tmp.path());
        assert!(env.in_docker);
        assert!(!env.gpu_available);
        Ok(())
    }
}
