//! A [`CommandRunner`] that replays canned outputs, for tests.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::error::{IndexerError, Result};

use super::{CommandRunner, ToolOutput};

struct Rule {
    program: String,
    needles: Vec<String>,
    output: ToolOutput,
    capture_prefix: Option<String>,
}

impl Rule {
    fn matches(&self, program: &Path, args: &[String]) -> bool {
        let name = program
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        name.contains(&self.program)
            && self
                .needles
                .iter()
                .all(|needle| args.iter().any(|a| a.contains(needle.as_str())))
    }
}

/// One call the runner answered.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub stdin: Option<String>,
    /// Contents of the file named by a capturing rule, read during the call.
    pub captured: Option<String>,
}

/// Answers calls from a list of rules, first match wins.
///
/// A call no rule matches fails with [`IndexerError::ToolMissing`].
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Vec<Rule>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers calls to a program whose file name contains `program` and whose
    /// arguments contain every string in `needles`.
    pub fn on(mut self, program: &str, needles: &[&str], output: ToolOutput) -> Self {
        self.rules.push(Rule {
            program: program.to_lowercase(),
            needles: needles.iter().map(|n| n.to_string()).collect(),
            output,
            capture_prefix: None,
        });
        self
    }

    /// Like [`on`](Self::on), and also records the contents of the file
    /// passed in the argument starting with `prefix` (e.g. `-i:`).
    pub fn capturing(
        mut self,
        program: &str,
        needles: &[&str],
        prefix: &str,
        output: ToolOutput,
    ) -> Self {
        self = self.on(program, needles, output);
        if let Some(rule) = self.rules.last_mut() {
            rule.capture_prefix = Some(prefix.to_string());
        }
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Calls whose program file name contains `program`.
    pub fn calls_to(&self, program: &str) -> Vec<RecordedCall> {
        let program = program.to_lowercase();
        self.calls()
            .into_iter()
            .filter(|c| {
                c.program
                    .file_name()
                    .map(|n| n.to_string_lossy().to_lowercase().contains(&program))
                    .unwrap_or(false)
            })
            .collect()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &Path, args: &[String], stdin: Option<&str>) -> Result<ToolOutput> {
        let rule = self.rules.iter().find(|r| r.matches(program, args));

        let captured = rule
            .and_then(|r| r.capture_prefix.as_deref())
            .and_then(|prefix| args.iter().find_map(|a| a.strip_prefix(prefix)))
            .and_then(|file| std::fs::read_to_string(file).ok());

        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                program: program.to_path_buf(),
                args: args.to_vec(),
                stdin: stdin.map(str::to_string),
                captured,
            });

        match rule {
            Some(rule) => Ok(rule.output.clone()),
            None => Err(IndexerError::ToolMissing(program.display().to_string())),
        }
    }
}
