//! Local backup copies of files that are not committed.
//!
//! Modified and unversioned files cannot be fetched from the repository, so
//! they are copied to `<backup>/<CachePath>/<Revision>/<file name>` and the
//! stream points the debugger at that copy instead.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use crate::error::Result;

use super::args::CommandArgumentSet;
use super::paths::{components, file_name};

/// Marks a file whose stream line copies from the backup location.
pub const COPY_LOCAL: &str = "TRUE";

/// A file that will be served from a local backup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalBackupEntry {
    pub path: String,
    /// Last write time in seconds since the Unix epoch (UTC).
    pub timestamp: u64,
}

impl LocalBackupEntry {
    /// Reads the last write time of `path`.
    pub fn for_file(path: &str) -> Result<Self> {
        let modified = fs::metadata(path)?.modified()?;
        let timestamp = modified
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Ok(Self {
            path: path.to_string(),
            timestamp,
        })
    }

    /// Rewrites `args` so the stream copies this file from the backup.
    pub fn apply(&self, args: &mut CommandArgumentSet) -> Result<()> {
        args.set("CopyLocal", COPY_LOCAL)?;
        args.set("FilePath", self.path.as_str())?;
        args.set("Revision", self.timestamp.to_string())?;
        Ok(())
    }
}

/// Destination of the backup copy of `source`.
pub fn backup_destination(
    backup_location: &Path,
    args: &CommandArgumentSet,
    source: &str,
) -> Result<PathBuf> {
    let mut dest = components(args.get("CachePath")?)
        .fold(backup_location.to_path_buf(), |acc, part| acc.join(part));
    dest.push(args.get("Revision")?);
    dest.push(file_name(source));
    Ok(dest)
}

/// Copies `source` into the backup tree unless a copy already exists.
///
/// Returns the destination when a copy was made. Entries without the
/// `CopyLocal` flag are left alone.
pub fn make_local_backup(
    backup_location: &Path,
    source: &str,
    args: &CommandArgumentSet,
) -> Result<Option<PathBuf>> {
    if args.get("CopyLocal")? != COPY_LOCAL {
        return Ok(None);
    }

    let dest = backup_destination(backup_location, args, source)?;
    if dest.exists() {
        return Ok(None);
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    tracing::info!("Creating backup of file {}", source);
    fs::copy(source, &dest)?;
    Ok(Some(dest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::args::HOST_ARGS;
    use tempfile::TempDir;

    fn local_args(path: &str, cache: &str) -> CommandArgumentSet {
        let mut args = CommandArgumentSet::new(HOST_ARGS);
        LocalBackupEntry {
            path: path.to_string(),
            timestamp: 1_700_000_000,
        }
        .apply(&mut args)
        .unwrap();
        args.set("CachePath", cache).unwrap();
        args
    }

    #[test]
    fn test_entry_reads_timestamp() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.cpp");
        fs::write(&file, "int main() {}").unwrap();

        let entry = LocalBackupEntry::for_file(file.to_str().unwrap()).unwrap();
        assert!(entry.timestamp > 0);
        assert!(LocalBackupEntry::for_file("/no/such/file.cpp").is_err());
    }

    #[test]
    fn test_apply_sets_copy_local() {
        let args = local_args("/wc/a.cpp", "src");
        assert_eq!(args.get("CopyLocal").unwrap(), "TRUE");
        assert_eq!(args.get("Revision").unwrap(), "1700000000");
        assert_eq!(args.get("FilePath").unwrap(), "/wc/a.cpp");
    }

    #[test]
    fn test_backup_copies_once() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.cpp");
        fs::write(&source, "v1").unwrap();
        let backup = dir.path().join("backup");
        let source_str = source.to_str().unwrap();
        let args = local_args(source_str, r"D_\other");

        let dest = make_local_backup(&backup, source_str, &args).unwrap().unwrap();
        assert_eq!(dest, backup.join("D_").join("other").join("1700000000").join("a.cpp"));
        assert_eq!(fs::read_to_string(&dest).unwrap(), "v1");

        // Existing copies are never overwritten
        fs::write(&source, "v2").unwrap();
        assert!(make_local_backup(&backup, source_str, &args).unwrap().is_none());
        assert_eq!(fs::read_to_string(&dest).unwrap(), "v1");
    }

    #[test]
    fn test_checked_in_files_are_not_copied() {
        let dir = TempDir::new().unwrap();
        let args = CommandArgumentSet::new(HOST_ARGS);
        let result = make_local_backup(dir.path(), "/wc/a.cpp", &args).unwrap();
        assert!(result.is_none());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
