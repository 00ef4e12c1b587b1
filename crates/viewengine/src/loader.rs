// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Filesystem loading for bulk and glob registration.
//!
//! Files are named by their path relative to the root directory, always with
//! `/` separators, so `views/shared/nav.gohtml` registers as `shared/nav.gohtml`
//! when the root is `views`.

use crate::error::{Result, ViewError};
use std::fs;
use std::path::{Component, Path};

/// Converts a relative path to a registration name with `/` separators.
pub fn path_to_name(path: &Path) -> String {
    let mut name = String::new();
    for component in path.components() {
        let Component::Normal(part) = component else {
            continue;
        };
        if !name.is_empty() {
            name.push('/');
        }
        name.push_str(&part.to_string_lossy());
    }
    name
}

/// Reads the source text of `name`, relative to `root`.
pub fn read_source(root: &Path, name: &str) -> Result<String> {
    let path = root.join(name);
    tracing::trace!(path = %path.display(), "reading template");
    Ok(fs::read_to_string(path)?)
}

/// Expands `pattern` under `root` into sorted registration names.
///
/// Directories matched by the pattern are skipped.
///
/// # Errors
///
/// [`ViewError::Pattern`] for a malformed pattern, [`ViewError::Glob`] for an
/// unreadable match and [`ViewError::NoMatch`] when no file matches.
pub fn expand_glob(root: &Path, pattern: &str) -> Result<Vec<String>> {
    // The root is matched literally; only `pattern` is glob syntax.
    let full = if root.as_os_str().is_empty() {
        pattern.to_string()
    } else {
        format!(
            "{}/{}",
            glob::Pattern::escape(root.to_string_lossy().trim_end_matches('/')),
            pattern.trim_start_matches('/')
        )
    };
    let mut names = Vec::new();
    for entry in glob::glob(&full)? {
        let path = entry?;
        if !path.is_file() {
            continue;
        }
        let relative = path.strip_prefix(root).unwrap_or(&path);
        names.push(path_to_name(relative));
    }

    if names.is_empty() {
        return Err(ViewError::NoMatch(pattern.to_string()));
    }
    names.sort();
    tracing::debug!(root = %root.display(), pattern, matched = names.len(), "expanded glob");
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn fixture(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            let path = dir.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        dir
    }

    #[test]
    fn test_path_to_name_uses_forward_slashes() {
        let path: PathBuf = ["shared", "nav.gohtml"].iter().collect();
        assert_eq!(path_to_name(&path), "shared/nav.gohtml");
        assert_eq!(path_to_name(Path::new("./a.gohtml")), "a.gohtml");
    }

    #[test]
    fn test_expand_glob_is_relative_and_sorted() {
        let dir = fixture(&[
            ("b.gohtml", "b"),
            ("a.gohtml", "a"),
            ("shared/nav.gohtml", "n"),
            ("notes.txt", "skip"),
        ]);
        let names = expand_glob(dir.path(), "**/*.gohtml").unwrap();
        assert_eq!(names, vec!["a.gohtml", "b.gohtml", "shared/nav.gohtml"]);
    }

    #[test]
    fn test_expand_glob_escapes_root() {
        let dir = fixture(&[("v[1]/a.gohtml", "A"), ("v1/b.gohtml", "B")]);
        let names = expand_glob(&dir.path().join("v[1]"), "*.gohtml").unwrap();
        assert_eq!(names, vec!["a.gohtml"]);
    }

    #[test]
    fn test_expand_glob_no_match() {
        let dir = fixture(&[("a.txt", "a")]);
        let err = expand_glob(dir.path(), "*.gohtml").unwrap_err();
        assert!(matches!(err, ViewError::NoMatch(ref p) if p == "*.gohtml"));
    }

    #[test]
    fn test_expand_glob_bad_pattern() {
        let dir = fixture(&[]);
        assert!(matches!(
            expand_glob(dir.path(), "[*.gohtml"),
            Err(ViewError::Pattern(_))
        ));
    }

    #[test]
    fn test_read_source_missing_file() {
        let dir = fixture(&[]);
        assert!(matches!(read_source(dir.path(), "gone.gohtml"), Err(ViewError::Io(_))));
    }
}
