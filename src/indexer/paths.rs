//! Path helpers for symbol-file source paths.
//!
//! Source paths come out of PDBs and version-control output as text, usually
//! in Windows form (`C:\src\a.cpp`). They are handled as strings here so the
//! same rules apply regardless of the host platform.

use std::path::{Component, Path, PathBuf};

/// Cache path used when nothing is left after stripping the root.
pub const ROOT_CACHE_PATH: &str = "root";

pub fn is_separator(c: char) -> bool {
    c == '\\' || c == '/'
}

/// Registry key for a path: case folded with `/` as the only separator.
pub fn normalize_key(path: &str) -> String {
    path.chars()
        .flat_map(char::to_lowercase)
        .map(|c| if c == '\\' { '/' } else { c })
        .collect()
}

/// Directory part of `path`, without the trailing separator.
pub fn parent_dir(path: &str) -> &str {
    match path.rfind(is_separator) {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Final component of `path`.
pub fn file_name(path: &str) -> &str {
    match path.rfind(is_separator) {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Strips `prefix` from `s` ignoring case and separator style.
///
/// Only matches on a component boundary, so `C:\Proj` is not a prefix of
/// `C:\Project`.
pub fn strip_prefix_ci<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let mut rest = s.char_indices();
    for p in prefix.chars() {
        let (_, c) = rest.next()?;
        let same = if is_separator(p) {
            is_separator(c)
        } else {
            c.to_lowercase().eq(p.to_lowercase())
        };
        if !same {
            return None;
        }
    }
    let remainder = match rest.next() {
        Some((idx, c)) if is_separator(c) => &s[idx..],
        Some(_) => return None,
        None => "",
    };
    Some(remainder)
}

/// Computes the cache bucket for a file.
///
/// Files under `solution_root` map to their directory relative to it. Any
/// other file maps to its drive (`C:` becomes `C_`) followed by the rest of
/// its directory. An empty result becomes [`ROOT_CACHE_PATH`].
pub fn cache_path(file: &str, solution_root: Option<&str>) -> String {
    let dir = parent_dir(file);

    let relative = solution_root
        .map(|root| root.trim_end_matches(is_separator))
        .filter(|root| !root.is_empty())
        .and_then(|root| strip_prefix_ci(dir, root));

    let computed = match relative {
        Some(rel) => rel.trim_start_matches(is_separator).to_string(),
        None => drive_relative(dir),
    };

    if computed.is_empty() {
        ROOT_CACHE_PATH.to_string()
    } else {
        computed
    }
}

fn drive_relative(dir: &str) -> String {
    let bytes = dir.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        let rest = &dir[2..];
        if rest.trim_start_matches(is_separator).is_empty() {
            return format!("{}_", &dir[..1]);
        }
        return format!("{}_{}", &dir[..1], rest);
    }
    // UNC shares and rooted Unix paths keep everything below the leading separators
    dir.trim_start_matches(is_separator).to_string()
}

/// Splits a relative text path into its non-empty components.
pub fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split(is_separator).filter(|c| !c.is_empty())
}

/// True for paths that are absolute on any platform (`/x`, `C:\x`, `\\host\x`).
pub fn is_rooted(path: &str) -> bool {
    let bytes = path.as_bytes();
    Path::new(path).has_root()
        || path.starts_with(is_separator)
        || (bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':')
}

/// Resolves `value` against `root` unless it is already rooted, then removes
/// `.` and `..` components without touching the filesystem.
pub fn resolve_against(root: &Path, value: &str) -> String {
    let joined = if is_rooted(value) {
        PathBuf::from(value)
    } else {
        root.join(value)
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_key_folds_case_and_separators() {
        assert_eq!(normalize_key(r"C:\Proj\Src\A.cpp"), "c:/proj/src/a.cpp");
        assert_eq!(normalize_key(r"c:/proj\src/a.CPP"), normalize_key(r"C:\PROJ\SRC\A.cpp"));
    }

    #[test]
    fn test_parent_and_file_name() {
        assert_eq!(parent_dir(r"C:\Proj\src\a.cpp"), r"C:\Proj\src");
        assert_eq!(file_name(r"C:\Proj\src\a.cpp"), "a.cpp");
        assert_eq!(file_name("/home/u/b.cpp"), "b.cpp");
        assert_eq!(parent_dir("a.cpp"), "");
    }

    #[test]
    fn test_cache_path_under_solution_root() {
        assert_eq!(cache_path(r"C:\Proj\src\a.cpp", Some(r"C:\Proj")), "src");
        assert_eq!(cache_path(r"c:\proj\src\deep\a.cpp", Some(r"C:\Proj\")), r"src\deep");
    }

    #[test]
    fn test_cache_path_outside_solution_root() {
        assert_eq!(cache_path(r"D:\other\b.cpp", Some(r"C:\Proj")), r"D_\other");
        assert_eq!(cache_path(r"D:\other\b.cpp", None), r"D_\other");
        assert_eq!(cache_path(r"C:\Project\x.cpp", Some(r"C:\Proj")), r"C_\Project");
    }

    #[test]
    fn test_cache_path_empty_remainder() {
        assert_eq!(cache_path(r"C:\Proj\a.cpp", Some(r"C:\Proj")), "root");
        assert_eq!(cache_path("/a.cpp", None), "root");
    }

    #[test]
    fn test_cache_path_drive_root_file() {
        assert_eq!(cache_path(r"E:\a.cpp", Some(r"C:\Proj")), "E_");
    }

    #[test]
    fn test_cache_path_unix_and_unc() {
        assert_eq!(cache_path("/srv/wc/src/a.cpp", Some("/srv/wc")), "src");
        assert_eq!(cache_path("/opt/lib/b.cpp", Some("/srv/wc")), "opt/lib");
        assert_eq!(cache_path(r"\\build\share\src\c.cpp", None), r"build\share\src");
    }

    #[test]
    fn test_strip_prefix_requires_boundary() {
        assert_eq!(strip_prefix_ci(r"C:\Proj\src", r"c:/proj"), Some(r"\src"));
        assert_eq!(strip_prefix_ci(r"C:\Proj", r"C:\Proj"), Some(""));
        assert_eq!(strip_prefix_ci(r"C:\Project", r"C:\Proj"), None);
        assert_eq!(strip_prefix_ci(r"C:\P", r"C:\Proj"), None);
    }

    #[test]
    fn test_is_rooted() {
        assert!(is_rooted("/srv/wc"));
        assert!(is_rooted(r"C:\wc\a.cpp"));
        assert!(is_rooted(r"\\host\share"));
        assert!(!is_rooted(r"src\a.cpp"));
        assert!(!is_rooted("a.cpp"));
    }

    #[test]
    #[cfg(unix)]
    fn test_resolve_against() {
        let root = Path::new("/srv/wc");
        assert_eq!(resolve_against(root, "src/a.cpp"), "/srv/wc/src/a.cpp");
        assert_eq!(resolve_against(root, "./src/../b.cpp"), "/srv/wc/b.cpp");
        assert_eq!(resolve_against(root, "/other/c.cpp"), "/other/c.cpp");
        assert_eq!(resolve_against(root, "."), "/srv/wc");
    }

    #[test]
    fn test_components() {
        let parts: Vec<_> = components(r"D_\other/sub").collect();
        assert_eq!(parts, vec!["D_", "other", "sub"]);
    }
}
