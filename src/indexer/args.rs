//! Per-file command arguments substituted into the source server stream.

use std::fmt;

use crate::error::{IndexerError, Result};

/// Value every argument holds until something writes it.
pub const UNSET: &str = "_";

/// Argument names the host always declares, in stream order.
pub const HOST_ARGS: [&str; 4] = ["FilePath", "Revision", "CopyLocal", "CachePath"];

/// Ordered set of named string variables for one source file.
///
/// The allowed names are fixed at construction; reading or writing any other
/// name fails with [`IndexerError::ArgumentNotFound`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandArgumentSet {
    values: Vec<(String, String)>,
}

impl CommandArgumentSet {
    /// Creates a set from the allowed names. Duplicate names are ignored.
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut values: Vec<(String, String)> = Vec::new();
        for name in allowed {
            let name = name.as_ref();
            if !values.iter().any(|(k, _)| k == name) {
                values.push((name.to_string(), UNSET.to_string()));
            }
        }
        Self { values }
    }

    pub fn get(&self, name: &str) -> Result<&str> {
        self.values
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .ok_or_else(|| IndexerError::ArgumentNotFound(name.to_string()))
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) -> Result<()> {
        match self.values.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => {
                *v = value.into();
                Ok(())
            }
            None => Err(IndexerError::ArgumentNotFound(name.to_string())),
        }
    }

    /// True when `name` is allowed and still holds [`UNSET`].
    pub fn is_unset(&self, name: &str) -> bool {
        matches!(self.get(name), Ok(UNSET))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(k, _)| k.as_str())
    }

    /// Values in declaration order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Display for CommandArgumentSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<")?;
        for (k, v) in &self.values {
            write!(f, "{}={};", k, v)?;
        }
        f.write_str(">")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn svn_args() -> CommandArgumentSet {
        CommandArgumentSet::new(HOST_ARGS.iter().chain(["Url"].iter()))
    }

    #[test]
    fn test_defaults_to_unset() {
        let args = svn_args();
        for name in ["FilePath", "Revision", "CopyLocal", "CachePath", "Url"] {
            assert_eq!(args.get(name).unwrap(), "_");
        }
    }

    #[test]
    fn test_set_then_get() {
        let mut args = svn_args();
        args.set("Revision", "42").unwrap();
        args.set("Url", "svn://h/trunk/a.cpp").unwrap();

        assert_eq!(args.get("Revision").unwrap(), "42");
        assert_eq!(args.get("Url").unwrap(), "svn://h/trunk/a.cpp");
        assert!(args.is_unset("CopyLocal"));
        assert!(!args.is_unset("Revision"));
    }

    #[test]
    fn test_unknown_name_fails() {
        let mut args = svn_args();
        assert!(matches!(
            args.get("Branch"),
            Err(IndexerError::ArgumentNotFound(name)) if name == "Branch"
        ));
        assert!(matches!(
            args.set("Branch", "x"),
            Err(IndexerError::ArgumentNotFound(_))
        ));
        // Names are case sensitive
        assert!(args.get("url").is_err());
        assert_eq!(args.len(), 5);
    }

    #[test]
    fn test_duplicates_ignored_and_order_kept() {
        let args = CommandArgumentSet::new(["FilePath", "Url", "FilePath", "Revision"]);
        let names: Vec<_> = args.names().collect();
        assert_eq!(names, vec!["FilePath", "Url", "Revision"]);
    }

    #[test]
    fn test_display() {
        let mut args = CommandArgumentSet::new(["FilePath", "Revision"]);
        args.set("FilePath", "a.cpp").unwrap();
        assert_eq!(args.to_string(), "<FilePath=a.cpp;Revision=_;>");
    }
}
