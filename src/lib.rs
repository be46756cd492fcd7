pub mod config;
pub mod error;
pub mod indexer;
pub mod tools;
pub mod vcs;

pub use config::IndexerConfig;
pub use error::{IndexerError, Result};
pub use indexer::{
    CommandArgumentSet, FileRegistry, HostOptions, IndexingHost, LocalBackupEntry,
};
pub use tools::{CommandRunner, DebuggingTools, SystemRunner, ToolOutput};
#[doc(hidden)]
pub use tools::ScriptedRunner;
pub use vcs::{FileStatus, IndexerHost, SubversionIndexer, VersionControlIndexer};
