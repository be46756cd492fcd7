//! Gateway to the source server tools shipped with Debugging Tools for Windows.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{IndexerError, Result};
use crate::indexer::paths::components;

use super::{CommandRunner, ToolOutput};

/// Lists the source files referenced by a PDB.
pub const SRCTOOL: &str = r"srcsrv\srctool.exe";
/// Reads and writes named streams inside a PDB.
pub const PDBSTR: &str = r"srcsrv\pdbstr.exe";

/// Resolves tools relative to an installation root and runs them.
#[derive(Clone)]
pub struct DebuggingTools {
    root: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl DebuggingTools {
    pub fn new(root: impl Into<PathBuf>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            root: root.into(),
            runner,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a tool given its path relative to the root.
    pub fn tool_path(&self, relative: &str) -> PathBuf {
        components(relative).fold(self.root.clone(), |acc, part| acc.join(part))
    }

    /// Prepares an invocation of `relative` with `args`.
    ///
    /// A missing binary is logged but the invocation is still returned; running
    /// it is where the failure surfaces.
    pub fn prepare(&self, relative: &str, args: Vec<String>) -> ToolInvocation {
        let program = self.tool_path(relative);
        if !program.is_file() {
            tracing::error!(
                "Unable to find '{}'. Debugging Tools for Windows might not be installed",
                program.display()
            );
        }
        ToolInvocation {
            program,
            args,
            runner: Arc::clone(&self.runner),
        }
    }
}

/// A ready-to-run tool command.
pub struct ToolInvocation {
    program: PathBuf,
    args: Vec<String>,
    runner: Arc<dyn CommandRunner>,
}

impl ToolInvocation {
    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn tool_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }

    /// Runs the tool to completion and returns its captured output.
    pub fn run(&self) -> Result<ToolOutput> {
        self.runner.run(&self.program, &self.args, None)
    }

    /// Like [`run`](Self::run) but treats a non-zero exit as an error.
    pub fn run_checked(&self) -> Result<ToolOutput> {
        let output = self.run()?;
        if output.is_success() {
            Ok(output)
        } else {
            Err(IndexerError::NonZeroExit {
                tool: self.tool_name(),
                code: output.code,
                stderr: output.stderr.trim_end().to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ScriptedRunner;

    #[test]
    fn test_tool_path_joins_components() {
        let tools = DebuggingTools::new("/opt/dbg", Arc::new(ScriptedRunner::new()));
        assert_eq!(
            tools.tool_path(SRCTOOL),
            PathBuf::from("/opt/dbg").join("srcsrv").join("srctool.exe")
        );
    }

    #[test]
    fn test_missing_tool_still_runs_through_runner() {
        let runner = Arc::new(ScriptedRunner::new().on("srctool", &[], ToolOutput::success("a.cpp\n")));
        let tools = DebuggingTools::new("/missing/root", runner.clone());

        let invocation = tools.prepare(SRCTOOL, vec!["x.pdb".into(), "-r".into()]);
        let output = invocation.run().unwrap();

        assert_eq!(output.stdout, "a.cpp\n");
        assert_eq!(runner.calls().len(), 1);
        assert_eq!(runner.calls()[0].args, vec!["x.pdb", "-r"]);
    }

    #[test]
    fn test_run_checked_surfaces_stderr() {
        let runner = Arc::new(ScriptedRunner::new().on(
            "pdbstr",
            &[],
            ToolOutput::failure(1, "cannot open pdb\r\n"),
        ));
        let tools = DebuggingTools::new("/missing/root", runner);

        let err = tools.prepare(PDBSTR, Vec::new()).run_checked().unwrap_err();
        match err {
            IndexerError::NonZeroExit { tool, code, stderr } => {
                assert_eq!(tool, "pdbstr.exe");
                assert_eq!(code, Some(1));
                assert_eq!(stderr, "cannot open pdb");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
