//! Running external executables with captured output.

pub mod debugging_tools;
#[doc(hidden)]
pub mod scripted;

use std::io::{ErrorKind, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

use process_control::{ChildExt, Control};

use crate::error::{IndexerError, Result};

pub use debugging_tools::{DebuggingTools, ToolInvocation, PDBSTR, SRCTOOL};
#[doc(hidden)]
pub use scripted::{RecordedCall, ScriptedRunner};

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }

    /// Stdout split into lines with line terminators removed.
    pub fn stdout_lines(&self) -> Vec<String> {
        self.stdout.lines().map(str::to_string).collect()
    }
}

/// Seam for starting processes, so the indexer can run without real tools.
pub trait CommandRunner: Send + Sync {
    /// Runs `program` with `args` and waits for it to exit.
    ///
    /// `stdin` is written to the child and then closed. Stdout and stderr are
    /// always captured.
    fn run(&self, program: &Path, args: &[String], stdin: Option<&str>) -> Result<ToolOutput>;
}

/// Runs real processes without a shell, optionally with a time limit.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    timeout: Option<Duration>,
}

impl SystemRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, program: &Path, args: &[String], stdin: Option<&str>) -> Result<ToolOutput> {
        let tool = program.display().to_string();
        tracing::debug!(tool = %tool, ?args, timeout = ?self.timeout, "running tool");

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| match e.kind() {
            ErrorKind::NotFound => IndexerError::ToolMissing(tool.clone()),
            _ => IndexerError::Io(e),
        })?;

        // A child that exits without reading closes the pipe early; its exit
        // status and stderr still describe the failure
        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            let written = pipe
                .write_all(input.as_bytes())
                .and_then(|()| pipe.write_all(b"\n"));
            if let Err(e) = written {
                tracing::warn!(tool = %tool, "Cannot write to stdin: {}", e);
            }
        }

        let output = match self.timeout {
            Some(limit) => child
                .controlled_with_output()
                .time_limit(limit)
                .terminate_for_timeout()
                .wait()?,
            None => child.controlled_with_output().wait()?,
        };

        let output = output.ok_or_else(|| IndexerError::TimedOut {
            tool: tool.clone(),
            timeout: self.timeout.unwrap_or_default(),
        })?;

        let result = ToolOutput {
            code: output.status.code().and_then(|c| i32::try_from(c).ok()),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        tracing::debug!(tool = %tool, code = ?result.code, "tool exited");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stdout_lines_strip_crlf() {
        let output = ToolOutput::success("a.cpp\r\n\r\nb.cpp\r\n");
        assert_eq!(output.stdout_lines(), vec!["a.cpp", "", "b.cpp"]);
    }

    #[test]
    fn test_missing_program_is_tool_missing() {
        let runner = SystemRunner::new(Some(Duration::from_secs(5)));
        let result = runner.run(Path::new("/definitely/not/here/srctool.exe"), &[], None);
        assert!(matches!(result, Err(IndexerError::ToolMissing(_))));
    }

    #[test]
    #[cfg(unix)]
    fn test_time_limit_kills_child() {
        let runner = SystemRunner::new(Some(Duration::from_secs(1)));
        let started = std::time::Instant::now();

        let result = runner.run(Path::new("sleep"), &["5".to_string()], None);

        match result {
            Err(IndexerError::TimedOut { tool, timeout }) => {
                assert_eq!(tool, "sleep");
                assert_eq!(timeout, Duration::from_secs(1));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    #[cfg(unix)]
    fn test_stdin_is_piped_to_child() {
        let runner = SystemRunner::new(Some(Duration::from_secs(10)));

        let output = runner.run(Path::new("cat"), &[], Some("secret")).unwrap();

        assert!(output.is_success());
        assert_eq!(output.stdout, "secret\n");
    }

    #[test]
    #[cfg(unix)]
    fn test_child_ignoring_stdin_still_reports() {
        // More than a pipe buffer, so the write fails once the child exits
        let input = "x".repeat(1 << 20);
        let args = vec!["-c".to_string(), "echo rejected >&2; exit 3".to_string()];
        let runner = SystemRunner::new(Some(Duration::from_secs(10)));

        let output = runner.run(Path::new("sh"), &args, Some(&input)).unwrap();

        assert_eq!(output.code, Some(3));
        assert_eq!(output.stderr.trim_end(), "rejected");
    }

    #[test]
    fn test_failure_is_not_success() {
        let output = ToolOutput::failure(3, "boom");
        assert!(!output.is_success());
        assert!(ToolOutput::success("").is_success());
    }
}
