//! External process execution
//!
//! Every external tool runs through [`ToolInvocation`]: the configured
//! program and leading arguments, task-generated arguments, extra
//! environment variables, and the project root as working directory.
//! Standard streams are inherited so tool diagnostics reach the user as-is.

use crate::error::{BuildError, BuildResult};
use dualbuild_config::ToolCommand;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::debug;

/// A single tool execution
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    /// Name used in logs and errors
    name: String,
    program: String,
    args: Vec<OsString>,
    env: BTreeMap<String, OsString>,
    cwd: PathBuf,
}

/// Outcome of a successful execution
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub name: String,
    pub execution_time: Duration,
}

impl ToolInvocation {
    /// Start from a configured command, running in `cwd`
    pub fn new(name: impl Into<String>, command: &ToolCommand, cwd: &Path) -> Self {
        Self {
            name: name.into(),
            program: command.program.clone(),
            args: command.args.iter().map(OsString::from).collect(),
            env: BTreeMap::new(),
            cwd: cwd.to_path_buf(),
        }
    }

    /// Append an argument
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the child
    pub fn env(mut self, key: impl Into<String>, value: impl Into<OsString>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Command line, for logging
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }

    /// Run to completion; a non-zero exit is a [`BuildError::ToolFailed`]
    pub async fn run(self) -> BuildResult<ToolOutcome> {
        debug!("Running {}: {}", self.name, self.command_line());
        for (key, value) in &self.env {
            debug!("  {}={}", key, value.to_string_lossy());
        }

        let start = Instant::now();
        let status = Command::new(&self.program)
            .args(&self.args)
            .envs(&self.env)
            .current_dir(&self.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|error| BuildError::ToolLaunchError {
                tool: self.name.clone(),
                error,
            })?;

        let execution_time = start.elapsed();
        debug!("{} finished in {:.2?} ({})", self.name, execution_time, status);

        if !status.success() {
            return Err(BuildError::tool_failed(self.name, status.code()));
        }

        Ok(ToolOutcome {
            name: self.name,
            execution_time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_command_line() {
        let command = ToolCommand::new("npx", ["--no", "esbuild"]);
        let invocation = ToolInvocation::new("esbuild", &command, Path::new("."))
            .arg("--format=cjs")
            .args(["a.ts", "b.ts"]);

        assert_eq!(
            invocation.command_line(),
            "npx --no esbuild --format=cjs a.ts b.ts"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_success_and_failure() {
        let dir = TempDir::new().unwrap();

        let ok = ToolInvocation::new("true", &ToolCommand::new("sh", ["-c", "exit 0"]), dir.path())
            .run()
            .await
            .unwrap();
        assert_eq!(ok.name, "true");

        let err = ToolInvocation::new("false", &ToolCommand::new("sh", ["-c", "exit 3"]), dir.path())
            .run()
            .await
            .unwrap_err();
        match err {
            BuildError::ToolFailed { tool, exit_code } => {
                assert_eq!(tool, "false");
                assert_eq!(exit_code, Some(3));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_passes_environment() {
        let dir = TempDir::new().unwrap();
        let command = ToolCommand::new("sh", ["-c", "test \"$DUALBUILD_FORCE_MODULE\" = module"]);

        ToolInvocation::new("env", &command, dir.path())
            .env("DUALBUILD_FORCE_MODULE", "module")
            .run()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_missing_program() {
        let dir = TempDir::new().unwrap();
        let command = ToolCommand::new("dualbuild-no-such-program", Vec::<String>::new());

        let err = ToolInvocation::new("missing", &command, dir.path())
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::ToolLaunchError { .. }));
    }
}
