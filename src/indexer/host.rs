//! Orchestrates indexing of a working copy and patching of symbol files.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{IndexerError, Result};
use crate::tools::{DebuggingTools, PDBSTR, SRCTOOL};
use crate::vcs::{FileStatus, IndexerHost, VersionControlIndexer};

use super::args::{CommandArgumentSet, HOST_ARGS};
use super::backup::{make_local_backup, LocalBackupEntry};
use super::paths::cache_path;
use super::registry::FileRegistry;
use super::stream::{header_timestamp, StreamHeader, StreamWriter};

/// Settings of the local-backup mode.
#[derive(Debug, Clone, Default)]
pub struct HostOptions {
    /// Serve modified and unversioned files from local copies.
    pub use_local_backup: bool,
    /// Root of the backup tree, also written into the stream.
    pub backup_location: Option<PathBuf>,
    /// Files below this directory get cache paths relative to it.
    pub solution_directory: Option<String>,
}

#[derive(Default)]
struct HostState {
    registry: FileRegistry,
    backups: Vec<LocalBackupEntry>,
}

/// Indexes one working copy and writes the result into symbol files.
pub struct IndexingHost {
    indexer: Box<dyn VersionControlIndexer>,
    tools: DebuggingTools,
    options: HostOptions,
    allowed_args: Vec<String>,
    state: Mutex<HostState>,
}

impl IndexingHost {
    pub fn new(
        indexer: Box<dyn VersionControlIndexer>,
        tools: DebuggingTools,
        options: HostOptions,
    ) -> Self {
        let mut allowed_args: Vec<String> = HOST_ARGS.iter().map(|s| s.to_string()).collect();
        for name in indexer.command_args() {
            if !allowed_args.iter().any(|a| a == name) {
                allowed_args.push(name.to_string());
            }
        }

        Self {
            indexer,
            tools,
            options,
            allowed_args,
            state: Mutex::new(HostState::default()),
        }
    }

    /// Argument names in stream order: host names first, then the backend's.
    pub fn allowed_args(&self) -> &[String] {
        &self.allowed_args
    }

    pub fn indexer(&self) -> &dyn VersionControlIndexer {
        self.indexer.as_ref()
    }

    pub fn options(&self) -> &HostOptions {
        &self.options
    }

    fn state(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Indexes `source_dir` and writes the stream into `pdb`.
    pub fn index_pdb_file(&self, source_dir: &Path, pdb: &Path) -> bool {
        if let Err(e) = self.index_working_copy(source_dir) {
            tracing::error!("Indexing \"{}\" failed: {}", source_dir.display(), e);
        }
        self.update_pdb(pdb)
    }

    /// Lets the backend register every versioned file under `root`.
    ///
    /// A missing directory is logged and skipped. Cache paths are assigned
    /// afterwards either way.
    ///
    /// A relative `root` is made absolute first, so the backend reports and
    /// registers absolute paths.
    pub fn index_working_copy(&self, root: &Path) -> Result<()> {
        let root = std::path::absolute(root)?;
        let result = if root.is_dir() {
            tracing::info!("Indexing working copy \"{}\"", root.display());
            self.indexer.index_folder(&root, self)
        } else {
            tracing::warn!("\"{}\" is not a directory, nothing to index", root.display());
            Ok(())
        };

        self.set_cache_path();
        tracing::info!(files = self.file_count(), "Working copy indexed");
        result
    }

    fn set_cache_path(&self) {
        if !self.options.use_local_backup {
            return;
        }

        let solution = self.options.solution_directory.as_deref();
        let mut state = self.state();
        for entry in state.registry.entries_mut() {
            if !entry.args.is_unset("CachePath") {
                continue;
            }
            let value = cache_path(&entry.path, solution);
            if let Err(e) = entry.args.set("CachePath", value) {
                tracing::warn!("Cannot set cache path for {}: {}", entry.path, e);
            }
        }
    }

    pub fn file_count(&self) -> usize {
        self.state().registry.len()
    }

    /// Arguments registered for `path`, if any.
    pub fn lookup(&self, path: &str) -> Option<CommandArgumentSet> {
        self.state().registry.try_get(path).cloned()
    }

    /// Files that will be served from local backups, in registration order.
    pub fn local_backups(&self) -> Vec<LocalBackupEntry> {
        self.state().backups.clone()
    }

    /// Source files referenced by `pdb`, as reported by `srctool -r`.
    ///
    /// Failures are logged and yield whatever was read.
    pub fn source_names(&self, pdb: &Path) -> Vec<String> {
        let srctool = self
            .tools
            .prepare(SRCTOOL, vec![pdb.display().to_string(), "-r".to_string()]);

        let output = match srctool.run() {
            Ok(output) => output,
            Err(e) => {
                tracing::error!("Unable to list sources of \"{}\": {}", pdb.display(), e);
                return Vec::new();
            }
        };
        if !output.is_success() {
            tracing::error!(
                code = ?output.code,
                "{} failed for \"{}\": {}",
                srctool.tool_name(),
                pdb.display(),
                output.stderr.trim_end()
            );
        }

        output
            .stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Writes the stream for `sources` into `out`, making local backups of
    /// the files that need them. Returns the number of source lines written.
    pub fn write_index<W: Write>(&self, out: W, sources: &[String]) -> Result<usize> {
        self.render(out, sources, true)
    }

    /// Writes the stream for `sources` without copying any file.
    pub fn preview_index<W: Write>(&self, out: W, sources: &[String]) -> Result<usize> {
        self.render(out, sources, false)
    }

    fn render<W: Write>(&self, out: W, sources: &[String], backups: bool) -> Result<usize> {
        let backup_location = self
            .options
            .backup_location
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        let extract_command = self.indexer.extract_command();

        let mut writer = StreamWriter::new(out, &self.allowed_args);
        writer.write_header(&StreamHeader {
            indexer_name: self.indexer.name(),
            datetime: header_timestamp(),
            backup_location: &backup_location,
            extract_command: &extract_command,
        })?;

        let state = self.state();
        let mut written = 0;
        for source in sources {
            let Some(args) = state.registry.try_get(source) else {
                tracing::warn!("Unknown file status for {}", source);
                continue;
            };

            if backups && self.options.use_local_backup {
                if let Some(location) = &self.options.backup_location {
                    make_local_backup(location, source, args)?;
                }
            }

            writer.write_source(args)?;
            written += 1;
        }
        writer.write_footer()?;
        Ok(written)
    }

    /// Embeds the source index into `pdb`.
    ///
    /// Returns the number of source files indexed.
    pub fn try_update_pdb(&self, pdb: &Path) -> Result<usize> {
        if !pdb.is_file() {
            return Err(IndexerError::InvalidSymbolFile(format!(
                "\"{}\" does not exist",
                pdb.display()
            )));
        }
        let is_pdb = pdb
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("pdb"))
            .unwrap_or(false);
        if !is_pdb {
            return Err(IndexerError::InvalidSymbolFile(format!(
                "\"{}\" is not a symbol file",
                pdb.display()
            )));
        }

        let sources = self.source_names(pdb);
        tracing::info!("Indexing PDB \"{}\"", pdb.display());

        let mut temp = tempfile::Builder::new()
            .prefix("srcsrv")
            .suffix(".txt")
            .tempfile()?;
        let written = self.write_index(BufWriter::new(temp.as_file_mut()), &sources)?;
        // Close our handle before pdbstr opens the file; the path is still
        // removed on drop
        let stream_path = temp.into_temp_path();

        let pdbstr = self.tools.prepare(
            PDBSTR,
            vec![
                "-w".to_string(),
                format!("-p:{}", pdb.display()),
                "-s:srcsrv".to_string(),
                format!("-i:{}", stream_path.display()),
            ],
        );
        pdbstr.run_checked()?;

        tracing::info!(sources = written, "\"{}\" successfully indexed!", pdb.display());
        Ok(written)
    }

    /// Like [`try_update_pdb`](Self::try_update_pdb), logging the failure.
    pub fn update_pdb(&self, pdb: &Path) -> bool {
        match self.try_update_pdb(pdb) {
            Ok(_) => true,
            Err(IndexerError::NonZeroExit { stderr, .. }) => {
                tracing::error!("Unable to index PDB file \"{}\"\n{}", pdb.display(), stderr);
                false
            }
            Err(e) => {
                tracing::error!("Writing PDB \"{}\" failed: {}", pdb.display(), e);
                false
            }
        }
    }
}

impl IndexerHost for IndexingHost {
    fn create_command_args(&self) -> CommandArgumentSet {
        CommandArgumentSet::new(&self.allowed_args)
    }

    fn add_file(&self, path: &str, status: FileStatus, mut args: CommandArgumentSet) {
        let backup = if status != FileStatus::CheckedIn && self.options.use_local_backup {
            match LocalBackupEntry::for_file(path) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("Cannot read timestamp of {}, no local copy: {}", path, e);
                    None
                }
            }
        } else {
            None
        };

        let backup = match backup.map(|entry| entry.apply(&mut args).map(|_| entry)) {
            Some(Ok(entry)) => Some(entry),
            Some(Err(e)) => {
                tracing::warn!("Cannot mark {} for local copy: {}", path, e);
                None
            }
            None => None,
        };

        let mut state = self.state();
        if state.registry.add(path, args) {
            tracing::debug!(status = status.as_str(), "Adding file {}", path);
            state.backups.extend(backup);
        }
    }
}
