//! Version-control backends that discover file revisions in a working copy.
//!
//! A backend walks a working copy, works out the revision and origin of each
//! versioned file and hands every file to an [`IndexerHost`]. The host decides
//! what ends up in the source server stream.

pub mod subversion;
pub mod svn_output;

use std::path::Path;

use crate::error::Result;
use crate::indexer::CommandArgumentSet;

pub use subversion::SubversionIndexer;
pub use svn_output::VersionRecord;

/// State of a file relative to its recorded revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileStatus {
    /// Committed and unchanged at the recorded revision.
    CheckedIn,
    /// Changed locally since the recorded revision.
    Modified,
    /// Not tracked by the backend.
    Unversioned,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::CheckedIn => "checked-in",
            FileStatus::Modified => "modified",
            FileStatus::Unversioned => "unversioned",
        }
    }
}

/// Handle a backend uses to register files it discovers.
pub trait IndexerHost {
    /// Fresh argument set scoped to the host's allowed names.
    fn create_command_args(&self) -> CommandArgumentSet;

    /// Registers a file. The first registration of a path wins.
    fn add_file(&self, path: &str, status: FileStatus, args: CommandArgumentSet);
}

/// A version-control backend.
pub trait VersionControlIndexer: Send + Sync {
    /// Backend name written to the `VERCTRL` header line.
    fn name(&self) -> &str;

    /// Backend-specific argument names, appended after the host's names.
    fn command_args(&self) -> &[&str];

    /// Command run by the debugger to fetch a file. It may use `%Url%`,
    /// `%Revision%` and must write to `%SRCSRVTRG%`.
    fn extract_command(&self) -> String;

    /// Sets credentials used by subsequent backend calls. Ignored when
    /// either value is empty.
    fn set_credentials(&mut self, username: &str, password: &str);

    /// Discovers every versioned file under `folder` and registers it with `host`.
    fn index_folder(&self, folder: &Path, host: &dyn IndexerHost) -> Result<()>;

    /// Queries a single file, filling `args` unless it is unversioned.
    fn file_info(&self, file: &Path, args: &mut CommandArgumentSet) -> Result<FileStatus>;
}
