//! Indexer configuration: defaults, optional TOML file, then CLI overrides.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{IndexerError, Result};
use crate::indexer::{HostOptions, IndexingHost};
use crate::tools::{CommandRunner, DebuggingTools};
use crate::vcs::{SubversionIndexer, VersionControlIndexer};

pub const DEFAULT_SVN: &str = "svn";
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexerConfig {
    /// Installation root of Debugging Tools for Windows.
    pub debug_tools_path: Option<PathBuf>,
    /// Subversion client executable.
    pub svn_path: PathBuf,
    pub use_local_backup: bool,
    pub backup_location: Option<PathBuf>,
    pub solution_directory: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Upper bound for any external tool run, 0 for none.
    pub tool_timeout_secs: u64,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            debug_tools_path: None,
            svn_path: PathBuf::from(DEFAULT_SVN),
            use_local_backup: false,
            backup_location: None,
            solution_directory: None,
            username: None,
            password: None,
            tool_timeout_secs: DEFAULT_TOOL_TIMEOUT_SECS,
        }
    }
}

impl IndexerConfig {
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| IndexerError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            IndexerError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn tool_timeout(&self) -> Option<Duration> {
        match self.tool_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn host_options(&self) -> HostOptions {
        HostOptions {
            use_local_backup: self.use_local_backup,
            backup_location: self.backup_location.clone(),
            solution_directory: self.solution_directory.clone(),
        }
    }

    /// The Subversion backend with credentials applied.
    pub fn subversion(&self, runner: Arc<dyn CommandRunner>) -> SubversionIndexer {
        let mut svn = SubversionIndexer::new(self.svn_path.clone(), runner);
        if let (Some(user), Some(pass)) = (&self.username, &self.password) {
            svn.set_credentials(user, pass);
        }
        svn
    }

    /// Wires a host for the Subversion backend.
    pub fn build_host(&self, runner: Arc<dyn CommandRunner>) -> Result<IndexingHost> {
        let tools_root = self.debug_tools_path.clone().ok_or_else(|| {
            IndexerError::Config("debug_tools_path is not configured".to_string())
        })?;
        if self.use_local_backup && self.backup_location.is_none() {
            tracing::warn!("Local backup is enabled without a backup location, no copies will be made");
        }
        Ok(self.host_with_tools(tools_root, runner))
    }

    /// Wires a host that only indexes and renders streams.
    ///
    /// Such a host never starts srctool or pdbstr, so a missing tools path
    /// is not an error.
    pub fn build_preview_host(&self, runner: Arc<dyn CommandRunner>) -> IndexingHost {
        let tools_root = self.debug_tools_path.clone().unwrap_or_default();
        self.host_with_tools(tools_root, runner)
    }

    fn host_with_tools(&self, tools_root: PathBuf, runner: Arc<dyn CommandRunner>) -> IndexingHost {
        let svn = self.subversion(Arc::clone(&runner));
        let tools = DebuggingTools::new(tools_root, runner);
        IndexingHost::new(Box::new(svn), tools, self.host_options())
    }
}

/// Conventional install directory of Debugging Tools for Windows.
///
/// `env` looks up environment variables; 64-bit hosts expose `ProgramW6432`.
pub fn default_debug_tools_path(env: impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    if let Some(program_files) = env("ProgramW6432") {
        return Some(PathBuf::from(program_files).join("Debugging Tools for Windows (x64)"));
    }
    env("ProgramFiles").map(|p| PathBuf::from(p).join("Debugging Tools for Windows"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ScriptedRunner;

    #[test]
    fn test_defaults() {
        let config = IndexerConfig::default();
        assert_eq!(config.svn_path, PathBuf::from("svn"));
        assert!(!config.use_local_backup);
        assert_eq!(config.tool_timeout(), Some(Duration::from_secs(600)));
    }

    #[test]
    fn test_from_toml() {
        let config = IndexerConfig::from_toml(
            r#"
            debug_tools_path = 'C:\Debuggers'
            use_local_backup = true
            backup_location = '\\share\backup'
            solution_directory = 'C:\Proj'
            tool_timeout_secs = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.debug_tools_path, Some(PathBuf::from(r"C:\Debuggers")));
        assert!(config.use_local_backup);
        assert_eq!(config.solution_directory.as_deref(), Some(r"C:\Proj"));
        assert_eq!(config.svn_path, PathBuf::from("svn"));
        assert_eq!(config.tool_timeout(), None);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = IndexerConfig::from_toml("use_backup = true").unwrap_err();
        assert!(matches!(err, IndexerError::Config(_)));
    }

    #[test]
    fn test_build_host_requires_tools_path() {
        let runner = Arc::new(ScriptedRunner::new());
        assert!(IndexerConfig::default().build_host(runner.clone()).is_err());

        let config = IndexerConfig {
            debug_tools_path: Some(PathBuf::from("/opt/dbg")),
            username: Some("bob".to_string()),
            password: Some("secret".to_string()),
            ..IndexerConfig::default()
        };
        let host = config.build_host(runner).unwrap();
        assert_eq!(host.indexer().name(), "Subversion");
        assert!(host.indexer().extract_command().contains("--username bob"));
    }

    #[test]
    fn test_preview_host_without_tools_path() {
        let runner = Arc::new(ScriptedRunner::new());
        let config = IndexerConfig {
            backup_location: Some(PathBuf::from("/srv/backup")),
            ..IndexerConfig::default()
        };

        let host = config.build_preview_host(runner.clone());

        let mut out = Vec::new();
        assert_eq!(host.preview_index(&mut out, &["a.cpp".to_string()]).unwrap(), 0);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("VERCTRL=Subversion"));
        assert!(text.contains("/srv/backup"));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_default_debug_tools_path() {
        let x64 = default_debug_tools_path(|k| match k {
            "ProgramW6432" => Some(r"C:\Program Files".to_string()),
            "ProgramFiles" => Some(r"C:\Program Files (x86)".to_string()),
            _ => None,
        });
        assert_eq!(
            x64,
            Some(PathBuf::from(r"C:\Program Files").join("Debugging Tools for Windows (x64)"))
        );

        let x86 = default_debug_tools_path(|k| {
            (k == "ProgramFiles").then(|| r"C:\Program Files".to_string())
        });
        assert_eq!(
            x86,
            Some(PathBuf::from(r"C:\Program Files").join("Debugging Tools for Windows"))
        );
        assert_eq!(default_debug_tools_path(|_| None), None);
    }
}
