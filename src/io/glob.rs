//! Resolving input paths into a sorted list of files.
//!
//! An input is either a file, a directory (its visible files, non-recursive),
//! or a glob pattern:
//!
//! ```no_run
//! use ironbeam_json::io::glob::resolve_inputs;
//!
//! let files = resolve_inputs(&["logs/2024-*.jsonl", "extra/events.json"])?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use crate::error::JsonSourceError;
use anyhow::{Context, Result};
use glob::glob;
use std::path::{Path, PathBuf};

/// Expand a glob pattern into the sorted list of matching files.
///
/// Directories matched by the pattern are skipped; zero matches is not an
/// error.
///
/// # Errors
/// Returns an error if the pattern is invalid or a matched entry cannot be read.
pub fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))?;

    let mut result = Vec::new();
    for entry in paths {
        let path =
            entry.with_context(|| format!("error reading glob entry for pattern: {pattern}"))?;
        if path.is_file() {
            result.push(path);
        }
    }
    result.sort();
    Ok(result)
}

/// Resolve every input into files, keeping the order of `inputs` and sorting
/// within each directory or pattern.
///
/// Files whose names start with `.` or `_` are treated as hidden when listing
/// directories (marker files such as `_SUCCESS`).
///
/// # Errors
/// Returns [`JsonSourceError::InputNotFound`] for a literal path that does not
/// exist, or an I/O error if a directory cannot be listed.
pub fn resolve_inputs<P: AsRef<str>>(inputs: &[P]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        let input = input.as_ref();
        if is_glob_pattern(input) {
            files.extend(expand_glob(input)?);
            continue;
        }
        let path = Path::new(input);
        if path.is_dir() {
            files.extend(list_dir(path)?);
        } else if path.is_file() {
            files.push(path.to_path_buf());
        } else {
            return Err(JsonSourceError::InputNotFound(path.to_path_buf()).into());
        }
    }
    tracing::debug!(inputs = inputs.len(), files = files.len(), "resolved JSON inputs");
    Ok(files)
}

fn is_glob_pattern(s: &str) -> bool {
    s.contains(['*', '?', '['])
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.') || n.starts_with('_'))
}

fn list_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("list {}", dir.display()))? {
        let path = entry
            .with_context(|| format!("read entry in {}", dir.display()))?
            .path();
        if path.is_file() && !is_hidden(&path) {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}
