//! Parsers for the textual output of the `svn` client.
//!
//! Every parser works on already captured lines and never fails: lines it
//! cannot make sense of are skipped.

use std::path::{Path, MAIN_SEPARATOR};

use crate::indexer::paths::resolve_against;

use super::FileStatus;

/// Column where the path starts in `svn status` output.
pub const STATUS_PATH_COLUMN: usize = 7;

/// Revision facts for one versioned file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRecord {
    pub path: String,
    pub url: String,
    pub revision: String,
    pub status: FileStatus,
}

/// Splits `KEY: value` into an upper-cased key and the value.
///
/// The separator is the first `:` followed by one more character, and the
/// value must be non-empty.
pub fn key_value(line: &str) -> Option<(String, &str)> {
    let idx = line.find(':')?;
    let value = line.get(idx + 2..).filter(|v| !v.is_empty())?;
    Some((line[..idx].to_uppercase(), value))
}

/// Parses one blank-line-terminated `svn info` block starting at `offset`.
///
/// Returns the record, if the block described a fully resolved file, and the
/// offset of the first line after the block.
pub fn parse_info_block(
    lines: &[String],
    offset: usize,
    root: &Path,
) -> (Option<VersionRecord>, usize) {
    let mut path = None;
    let mut url = None;
    let mut revision = None;
    let mut is_file = false;

    let mut next = offset;
    while next < lines.len() {
        let line = lines[next].as_str();
        next += 1;
        if line.is_empty() {
            break;
        }

        let Some((key, value)) = key_value(line) else {
            continue;
        };
        match key.as_str() {
            "PATH" => path = Some(resolve_against(root, value)),
            "URL" => url = Some(value.to_string()),
            "REVISION" => revision = Some(value.to_string()),
            "NODE KIND" => is_file = value.eq_ignore_ascii_case("file"),
            _ => {}
        }
    }

    let record = match (path, url, revision) {
        (Some(path), Some(url), Some(revision)) if is_file => Some(VersionRecord {
            path,
            url,
            revision,
            status: FileStatus::CheckedIn,
        }),
        _ => None,
    };
    (record, next)
}

/// Parses every file record in `svn info` output.
pub fn parse_infos(lines: &[String], root: &Path) -> Vec<VersionRecord> {
    let mut records = Vec::new();
    let mut offset = 0;
    while offset < lines.len() {
        let (record, next) = parse_info_block(lines, offset, root);
        records.extend(record);
        offset = next;
    }
    records
}

/// Paths that `svn status` reports as modified, resolved against `root`.
pub fn parse_modified_paths(lines: &[String], root: &Path) -> Vec<String> {
    lines
        .iter()
        .filter(|line| line.starts_with('M'))
        .filter_map(|line| line.get(STATUS_PATH_COLUMN..))
        .map(str::trim_start)
        .filter(|path| !path.is_empty())
        .map(|path| resolve_against(root, path))
        .collect()
}

/// Marks every record whose path exactly equals a modified path.
pub fn apply_modifications(records: &mut [VersionRecord], modified: &[String]) {
    for record in records.iter_mut() {
        if modified.iter().any(|m| *m == record.path) {
            record.status = FileStatus::Modified;
        }
    }
}

/// Status of one file from `svn status -v` output.
pub fn parse_single_status(lines: &[String]) -> FileStatus {
    match lines.first().and_then(|line| line.chars().next()) {
        None => FileStatus::Unversioned,
        Some(' ') => FileStatus::CheckedIn,
        Some('?') => FileStatus::Unversioned,
        Some(_) => FileStatus::Modified,
    }
}

/// Local directories of external definitions in `svn propget svn:externals`
/// output.
///
/// The first definition of a property looks like `<dir> - <definition>`;
/// further definitions of the same property follow on lines of their own
/// and belong to the same `<dir>`. The definition's local directory is
/// appended to `<dir>` and the URL token is dropped.
pub fn parse_externals(lines: &[String]) -> Vec<String> {
    let mut folders = Vec::new();
    let mut owner: Option<&str> = None;
    for line in lines {
        if line.trim().is_empty() {
            owner = None;
            continue;
        }
        let definition = match line.rfind(" - ") {
            Some(idx) => {
                owner = Some(&line[..idx]);
                &line[idx + 3..]
            }
            None => line.as_str(),
        };
        let Some(owner) = owner else {
            continue;
        };

        let tokens: Vec<&str> = definition.split_whitespace().collect();
        let (Some(first), Some(last)) = (tokens.first(), tokens.last()) else {
            continue;
        };
        if tokens.len() < 2 {
            continue;
        }
        let local = if looks_like_url(last) { first } else { last };
        folders.push(format!("{}{}{}", owner, MAIN_SEPARATOR, local));
    }
    folders
}

fn looks_like_url(token: &str) -> bool {
    token.contains("://") || token.starts_with("^/") || token.starts_with('/')
}
