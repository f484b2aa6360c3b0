//! Glob expansion of journal paths.

use crate::error::{CoreError, CoreResult};
use std::path::PathBuf;

/// The files matched by a list of glob patterns, in pattern order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fileset {
    files: Vec<PathBuf>,
}

impl Fileset {
    /// Expands every pattern.
    ///
    /// Within one pattern, matches are in the order `glob` yields them
    /// (alphabetical). Unreadable directory entries are skipped.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a malformed pattern and
    /// `NoMatchingFiles` when nothing matches at all.
    pub fn expand<S: AsRef<str>>(patterns: &[S]) -> CoreResult<Self> {
        let mut files = Vec::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let paths = glob::glob(pattern).map_err(|err| {
                CoreError::invalid_argument(format!("bad pattern {pattern:?}: {err}"))
            })?;
            files.extend(paths.filter_map(Result::ok));
        }
        if files.is_empty() {
            return Err(CoreError::NoMatchingFiles {
                pattern: patterns
                    .iter()
                    .map(|p| format!("'{}'", p.as_ref()))
                    .collect::<Vec<_>>()
                    .join(" or "),
            });
        }
        Ok(Self { files })
    }

    /// Expands a pattern that must match exactly one file.
    ///
    /// # Errors
    ///
    /// Returns `NoMatchingFiles` when nothing matches and `InvalidArgument`
    /// when more than one file does.
    pub fn single(pattern: &str) -> CoreResult<PathBuf> {
        let mut set = Self::expand(&[pattern])?;
        if set.files.len() > 1 {
            return Err(CoreError::invalid_argument(format!(
                "{pattern:?} matches {} files, expected one",
                set.files.len()
            )));
        }
        Ok(set.files.remove(0))
    }

    /// The matched files.
    #[must_use]
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Number of matched files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Always false; an empty expansion is an error.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl IntoIterator for Fileset {
    type Item = PathBuf;
    type IntoIter = std::vec::IntoIter<PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.into_iter()
    }
}

impl<'a> IntoIterator for &'a Fileset {
    type Item = &'a PathBuf;
    type IntoIter = std::slice::Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn expands_in_order() {
        let dir = tempdir().unwrap();
        for name in ["b.journal", "a.journal", "c.txt"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        let pattern = format!("{}/*.journal", dir.path().display());
        let set = Fileset::expand(&[pattern]).unwrap();
        let names: Vec<_> = set
            .files()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.journal", "b.journal"]);
    }

    #[test]
    fn nothing_matches() {
        let dir = tempdir().unwrap();
        let pattern = format!("{}/*.journal", dir.path().display());
        assert!(matches!(
            Fileset::expand(&[pattern]),
            Err(CoreError::NoMatchingFiles { .. })
        ));
    }

    #[test]
    fn single_rejects_many() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("1.journal"), b"").unwrap();
        fs::write(dir.path().join("2.journal"), b"").unwrap();
        let pattern = format!("{}/*.journal", dir.path().display());
        assert!(matches!(
            Fileset::single(&pattern),
            Err(CoreError::InvalidArgument { .. })
        ));

        let one = format!("{}/1.*", dir.path().display());
        assert_eq!(Fileset::single(&one).unwrap(), dir.path().join("1.journal"));
    }
}
