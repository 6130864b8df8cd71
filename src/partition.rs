//! Partition descriptors: the unit of work handed to one reader.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A byte window `[start, start + length)` of one input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePartition {
    pub path: PathBuf,
    pub start: u64,
    pub length: u64,
    /// Raw size of the whole file when the partition was planned.
    pub file_len: u64,
}

impl FilePartition {
    /// A partition covering all of `path`.
    pub fn whole_file(path: impl Into<PathBuf>, file_len: u64) -> Self {
        Self {
            path: path.into(),
            start: 0,
            length: file_len,
            file_len,
        }
    }

    #[must_use]
    pub fn end(&self) -> u64 {
        self.start.saturating_add(self.length)
    }

    /// Whether this partition reads the file from the first byte to the last.
    #[must_use]
    pub fn is_whole_file(&self) -> bool {
        self.start == 0 && self.length >= self.file_len
    }
}

/// Cut one file into partitions of at most `max_split_bytes`.
///
/// Non-splittable files, and empty files, always produce a single whole-file
/// partition.
pub fn split_file(
    path: &Path,
    file_len: u64,
    max_split_bytes: u64,
    splittable: bool,
) -> Vec<FilePartition> {
    if !splittable || file_len == 0 {
        return vec![FilePartition::whole_file(path, file_len)];
    }
    let step = max_split_bytes.max(1);
    let mut parts = Vec::with_capacity(file_len.div_ceil(step) as usize);
    let mut start = 0;
    while start < file_len {
        let length = step.min(file_len - start);
        parts.push(FilePartition {
            path: path.to_path_buf(),
            start,
            length,
            file_len,
        });
        start += length;
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_cover_the_file_contiguously() {
        let parts = split_file(Path::new("a.json"), 10, 4, true);
        let windows: Vec<(u64, u64)> = parts.iter().map(|p| (p.start, p.length)).collect();
        assert_eq!(windows, vec![(0, 4), (4, 4), (8, 2)]);
        assert!(parts.iter().all(|p| !p.is_whole_file()));
    }

    #[test]
    fn unsplittable_and_empty_files_are_whole() {
        let parts = split_file(Path::new("a.json"), 10, 4, false);
        assert_eq!(parts.len(), 1);
        assert!(parts[0].is_whole_file());

        let parts = split_file(Path::new("empty.json"), 0, 4, true);
        assert_eq!(parts.len(), 1);
        assert!(parts[0].is_whole_file());
    }
}
