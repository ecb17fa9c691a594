//! External tool invocation shared by the `git` and `gh` adapters.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Captured result of one tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Rendered command line, for error messages.
    pub command: String,
    /// Exit code, or `None` when terminated by a signal.
    pub code: Option<i32>,
    /// Standard output, lossily decoded.
    pub stdout: String,
    /// Standard error, lossily decoded and trimmed.
    pub stderr: String,
}

impl ToolOutput {
    /// Returns `true` for a zero exit code.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.code, Some(0))
    }

    /// Describes the exit status the way `std::process::ExitStatus` does.
    #[must_use]
    pub fn status_text(&self) -> String {
        self.code.map_or_else(
            || String::from("terminated by signal"),
            |code| format!("exit status: {code}"),
        )
    }

    /// Returns trimmed standard output.
    #[must_use]
    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }
}

/// Failures to launch a tool at all.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    /// The executable is not on `PATH`.
    #[error("required tool '{tool}' was not found on PATH")]
    NotFound {
        /// Executable name.
        tool: String,
    },

    /// The process could not be spawned or awaited.
    #[error("failed to run `{command}`: {source}")]
    Io {
        /// Rendered command line.
        command: String,
        /// Underlying error.
        #[source]
        source: Arc<io::Error>,
    },
}

/// Runs one external tool in a fixed working directory.
#[derive(Debug, Clone)]
pub struct ToolRunner {
    program: String,
    workdir: Option<PathBuf>,
}

impl ToolRunner {
    /// Creates a runner for `program` in the current directory.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            workdir: None,
        }
    }

    /// Runs the tool in `workdir` instead of the current directory.
    #[must_use]
    pub fn in_dir(mut self, workdir: impl AsRef<Path>) -> Self {
        self.workdir = Some(workdir.as_ref().to_path_buf());
        self
    }

    /// Returns the executable name.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Runs the tool with `args`, capturing output. A non-zero exit is not
    /// an error here; callers decide what each code means.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::NotFound`] when the executable is missing and
    /// [`ToolError::Io`] for other spawn failures.
    pub async fn run<I, S>(&self, args: I) -> Result<ToolOutput, ToolError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|arg| arg.as_ref().to_owned()).collect();
        let command = render_command(&self.program, &args);
        let mut process = Command::new(&self.program);
        process
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.workdir {
            process.current_dir(dir);
        }

        debug!(command = %command, "running external tool");
        let output = process.output().await.map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                ToolError::NotFound {
                    tool: self.program.clone(),
                }
            } else {
                ToolError::Io {
                    command: command.clone(),
                    source: Arc::new(err),
                }
            }
        })?;

        Ok(ToolOutput {
            command,
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        })
    }
}

/// Renders a command line for display, quoting arguments that need it.
#[must_use]
pub fn render_command(program: &str, args: &[String]) -> String {
    let mut rendered = String::from(program);
    for arg in args {
        rendered.push(' ');
        if needs_quoting(arg) {
            rendered.push_str(&shell_escape(arg));
        } else {
            rendered.push_str(arg);
        }
    }
    rendered
}

fn needs_quoting(value: &str) -> bool {
    value.is_empty()
        || !value
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || "-_./:=@^{}".contains(ch))
}

/// Escapes a value for safe inclusion in a POSIX shell command.
///
/// Uses single-quote wrapping and the standard `'\''` sequence for embedded
/// quotes.
#[must_use]
pub fn shell_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('\'');
    for ch in value.chars() {
        if ch == '\'' {
            escaped.push_str("'\\''");
        } else {
            escaped.push(ch);
        }
    }
    escaped.push('\'');
    escaped
}
