use std::{ffi::OsString, fmt, path::Path};

/// A program and its argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    /// The program to execute, resolved through `PATH`.
    pub program: OsString,
    /// The arguments passed to the program.
    pub args: Vec<OsString>,
    /// Discard the child's stdout and stderr.
    pub quiet: bool,
}

impl ToolCommand {
    /// Create a command for `program` with no arguments.
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            quiet: false,
        }
    }

    /// Append a single argument.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append a `--flag value` pair.
    pub fn opt(self, flag: &str, value: impl Into<OsString>) -> Self {
        self.arg(flag).arg(value)
    }

    /// Append a `--flag <path>` pair.
    pub fn path_opt(self, flag: &str, path: impl AsRef<Path>) -> Self {
        self.arg(flag).arg(path.as_ref().as_os_str())
    }

    /// Discard the child's output streams.
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    /// The program name as displayed in logs.
    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Exit status of a finished tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolExit {
    /// The exit code, `None` when the process was terminated by a signal.
    pub code: Option<i32>,
}

impl ToolExit {
    /// A zero exit code.
    pub const SUCCESS: ToolExit = ToolExit { code: Some(0) };

    /// Create an exit status from a plain exit code.
    pub fn from_code(code: i32) -> Self {
        Self { code: Some(code) }
    }

    /// Whether the tool exited with code 0.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<std::process::ExitStatus> for ToolExit {
    fn from(status: std::process::ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

impl fmt::Display for ToolExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {code}"),
            None => write!(f, "terminated by signal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_joins_args() {
        let cmd = ToolCommand::new("colmap")
            .arg("mapper")
            .opt("--database_path", "db.db");
        assert_eq!(cmd.to_string(), "colmap mapper --database_path db.db");
        assert!(!cmd.quiet);
    }

    #[test]
    fn test_exit_status() {
        assert!(ToolExit::SUCCESS.success());
        assert!(!ToolExit::from_code(1).success());
        assert!(!ToolExit { code: None }.success());
        assert_eq!(ToolExit { code: None }.to_string(), "terminated by signal");
        assert_eq!(ToolExit::from_code(3).to_string(), "exit code 3");
    }
}
