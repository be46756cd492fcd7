use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use srcsrv_indexer::config::default_debug_tools_path;
use srcsrv_indexer::indexer::HOST_ARGS;
use srcsrv_indexer::{
    CommandArgumentSet, CommandRunner, IndexerConfig, SystemRunner, VersionControlIndexer,
};

#[derive(Parser)]
#[command(name = "srcsrv-indexer")]
#[command(about = "Write source server index streams into PDB symbol files")]
#[command(version)]
#[command(after_long_help = r#"
EXAMPLES:
    # Index a working copy and patch one symbol file
    srcsrv-indexer index --source C:\src\app --pdb C:\build\app.pdb

    # Patch several symbol files, keeping local copies of modified files
    srcsrv-indexer index --source C:\src\app --pdb a.pdb --pdb b.pdb \
        --backup --backup-location \\share\srcbackup --solution-dir C:\src\app

    # Show what would be embedded for two source files
    srcsrv-indexer render --source C:\src\app C:\src\app\main.cpp C:\src\app\util.cpp

    # Query a single file
    srcsrv-indexer status C:\src\app\main.cpp
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// TOML configuration file; command-line flags take precedence
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Index a working copy and write the stream into symbol files
    Index {
        /// Working copy root
        #[arg(long)]
        source: PathBuf,

        /// Symbol file to patch (repeatable)
        #[arg(long = "pdb", required = true)]
        pdbs: Vec<PathBuf>,

        #[command(flatten)]
        tools: ToolArgs,

        #[command(flatten)]
        backup: BackupArgs,
    },

    /// Print the stream for the given source paths without patching anything
    Render {
        /// Working copy root
        #[arg(long)]
        source: PathBuf,

        /// Source paths as they appear in the symbol file
        #[arg(required = true)]
        paths: Vec<String>,

        #[command(flatten)]
        tools: ToolArgs,

        #[command(flatten)]
        backup: BackupArgs,
    },

    /// Show the version-control status and arguments of one file
    Status {
        file: PathBuf,

        #[command(flatten)]
        tools: ToolArgs,
    },
}

#[derive(Args, Default)]
pub struct ToolArgs {
    /// Debugging Tools for Windows installation directory
    #[arg(long, env = "SRCSRV_DEBUG_TOOLS")]
    pub debug_tools: Option<PathBuf>,

    /// Subversion client executable
    #[arg(long)]
    pub svn_path: Option<PathBuf>,

    /// Seconds any external tool may run, 0 for no limit
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Subversion user name
    #[arg(long, env = "SVN_USERNAME")]
    pub username: Option<String>,

    /// Subversion password, passed to svn on stdin
    #[arg(long, env = "SVN_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

#[derive(Args, Default)]
pub struct BackupArgs {
    /// Serve modified and unversioned files from local copies
    #[arg(long)]
    pub backup: bool,

    /// Directory that receives the local copies
    #[arg(long)]
    pub backup_location: Option<PathBuf>,

    /// Files below this directory get cache paths relative to it
    #[arg(long)]
    pub solution_dir: Option<String>,
}

/// Builds the effective configuration: file values, then flags on top.
pub fn load_config(
    file: Option<&Path>,
    tools: &ToolArgs,
    backup: Option<&BackupArgs>,
) -> anyhow::Result<IndexerConfig> {
    let mut config = match file {
        Some(path) => IndexerConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => IndexerConfig::default(),
    };

    if let Some(path) = &tools.debug_tools {
        config.debug_tools_path = Some(path.clone());
    }
    if let Some(svn) = &tools.svn_path {
        config.svn_path = svn.clone();
    }
    if let Some(secs) = tools.timeout {
        config.tool_timeout_secs = secs;
    }
    if let Some(user) = &tools.username {
        config.username = Some(user.clone());
    }
    if let Some(pass) = &tools.password {
        config.password = Some(pass.clone());
    }

    if let Some(backup) = backup {
        if backup.backup {
            config.use_local_backup = true;
        }
        if let Some(location) = &backup.backup_location {
            config.backup_location = Some(location.clone());
        }
        if let Some(dir) = &backup.solution_dir {
            config.solution_directory = Some(dir.clone());
        }
    }

    if config.debug_tools_path.is_none() {
        config.debug_tools_path = default_debug_tools_path(|key| std::env::var(key).ok());
    }

    Ok(config)
}

fn runner(config: &IndexerConfig) -> Arc<dyn CommandRunner> {
    Arc::new(SystemRunner::new(config.tool_timeout()))
}

/// Indexes `source` once and patches every symbol file.
pub fn index(source: &Path, pdbs: &[PathBuf], config: &IndexerConfig) -> anyhow::Result<()> {
    let host = config.build_host(runner(config))?;

    if let Err(e) = host.index_working_copy(source) {
        tracing::error!("Indexing \"{}\" failed: {}", source.display(), e);
    }
    println!("Found {} versioned files", host.file_count());

    let failed: Vec<_> = pdbs.iter().filter(|pdb| !host.update_pdb(pdb)).collect();
    if !failed.is_empty() {
        anyhow::bail!("{} of {} symbol files could not be indexed", failed.len(), pdbs.len());
    }

    println!("Indexed {} symbol files", pdbs.len());
    Ok(())
}

/// Prints the stream that would be embedded for `paths`.
pub fn render(source: &Path, paths: &[String], config: &IndexerConfig) -> anyhow::Result<()> {
    let host = config.build_preview_host(runner(config));
    host.index_working_copy(source)?;

    let stdout = std::io::stdout();
    let written = host.preview_index(stdout.lock(), paths)?;
    tracing::info!("{} of {} paths indexed", written, paths.len());
    Ok(())
}

/// Prints the status and stream arguments of one file.
pub fn status(file: &Path, config: &IndexerConfig) -> anyhow::Result<()> {
    let svn = config.subversion(runner(config));
    let mut args = CommandArgumentSet::new(HOST_ARGS.iter().chain(svn.command_args().iter()));

    let status = svn
        .file_info(file, &mut args)
        .with_context(|| format!("Failed to query {}", file.display()))?;

    println!("{}: {}", file.display(), status.as_str());
    println!("{}", args);
    Ok(())
}
