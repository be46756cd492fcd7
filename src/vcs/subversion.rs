//! Subversion backend driven through the `svn` command-line client.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::Result;
use crate::indexer::paths::{normalize_key, resolve_against};
use crate::indexer::CommandArgumentSet;
use crate::tools::CommandRunner;

use super::svn_output::{
    apply_modifications, parse_externals, parse_infos, parse_modified_paths,
    parse_single_status,
};
use super::{FileStatus, IndexerHost, VersionControlIndexer};

const NAME: &str = "Subversion";
const COMMAND_ARGS: &[&str] = &["Url"];

#[derive(Clone)]
struct Credentials {
    username: String,
    password: String,
}

pub struct SubversionIndexer {
    svn: PathBuf,
    runner: Arc<dyn CommandRunner>,
    credentials: Option<Credentials>,
}

impl SubversionIndexer {
    pub fn new(svn: impl Into<PathBuf>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            svn: svn.into(),
            runner,
            credentials: None,
        }
    }

    /// Runs `svn` with `args` plus the credential arguments and returns its
    /// stdout lines. A failing exit status is logged and whatever was printed
    /// is still returned.
    fn run_svn(&self, mut args: Vec<String>) -> Result<Vec<String>> {
        let mut stdin = None;
        if let Some(creds) = &self.credentials {
            args.push("--username".to_string());
            args.push(creds.username.clone());
            args.push("--password-from-stdin".to_string());
            stdin = Some(creds.password.as_str());
        }
        args.push("--non-interactive".to_string());

        let output = self.runner.run(&self.svn, &args, stdin)?;
        if !output.is_success() {
            tracing::warn!(
                command = %args.first().map(String::as_str).unwrap_or_default(),
                code = ?output.code,
                "svn reported an error: {}",
                output.stderr.trim_end()
            );
        }
        Ok(output.stdout_lines())
    }

    fn index_externals(
        &self,
        folder: &Path,
        host: &dyn IndexerHost,
        visited: &mut HashSet<String>,
    ) -> Result<()> {
        let lines = self.run_svn(vec![
            "propget".to_string(),
            "svn:externals".to_string(),
            folder.display().to_string(),
            "--recursive".to_string(),
        ])?;

        for external in parse_externals(&lines) {
            tracing::info!("Indexing external \"{}\"", external);
            self.index_folder_visited(Path::new(&external), host, visited)?;
        }
        Ok(())
    }

    fn index_folder_visited(
        &self,
        folder: &Path,
        host: &dyn IndexerHost,
        visited: &mut HashSet<String>,
    ) -> Result<()> {
        if !visited.insert(normalize_key(&folder.display().to_string())) {
            tracing::debug!("Skipping already indexed folder {}", folder.display());
            return Ok(());
        }

        self.index_externals(folder, host, visited)?;

        let infos = self.run_svn(vec![
            "info".to_string(),
            folder.display().to_string(),
            "--recursive".to_string(),
        ])?;
        let mut records = parse_infos(&infos, folder);

        // svn info has no working-copy status, so ask separately
        let statuses = self.run_svn(vec!["status".to_string(), folder.display().to_string()])?;
        let modified = parse_modified_paths(&statuses, folder);
        apply_modifications(&mut records, &modified);

        for record in records {
            let mut args = host.create_command_args();
            args.set("FilePath", record.path.as_str())?;
            args.set("Revision", record.revision.as_str())?;
            args.set("Url", record.url.as_str())?;
            host.add_file(&record.path, record.status, args);
        }
        Ok(())
    }
}

impl VersionControlIndexer for SubversionIndexer {
    fn name(&self) -> &str {
        NAME
    }

    fn command_args(&self) -> &[&str] {
        COMMAND_ARGS
    }

    fn extract_command(&self) -> String {
        match &self.credentials {
            Some(creds) => format!(
                "svn cat \"%Url%@%Revision%\" --non-interactive --username {} > \"%SRCSRVTRG%\"",
                creds.username
            ),
            None => "svn cat \"%Url%@%Revision%\" --non-interactive > \"%SRCSRVTRG%\"".to_string(),
        }
    }

    fn set_credentials(&mut self, username: &str, password: &str) {
        if username.is_empty() || password.is_empty() {
            return;
        }
        self.credentials = Some(Credentials {
            username: username.to_string(),
            password: password.to_string(),
        });
    }

    fn index_folder(&self, folder: &Path, host: &dyn IndexerHost) -> Result<()> {
        let mut visited = HashSet::new();
        self.index_folder_visited(folder, host, &mut visited)
    }

    fn file_info(&self, file: &Path, args: &mut CommandArgumentSet) -> Result<FileStatus> {
        let lines = self.run_svn(vec![
            "status".to_string(),
            file.display().to_string(),
            "-v".to_string(),
        ])?;
        let status = parse_single_status(&lines);
        if status == FileStatus::Unversioned {
            return Ok(status);
        }

        let infos = self.run_svn(vec!["info".to_string(), file.display().to_string()])?;
        let root = resolve_against(&std::env::current_dir()?, &file.display().to_string());
        let records = parse_infos(&infos, Path::new(&root));
        if let [record] = records.as_slice() {
            args.set("FilePath", file.display().to_string())?;
            args.set("Revision", record.revision.as_str())?;
            args.set("Url", record.url.as_str())?;
        }
        Ok(status)
    }
}
