//! One JSON record per line.

use super::merge_record;
use crate::error::JsonSourceError;
use crate::failure_safe::{BadRecord, FailureSafeParser};
use crate::infer::SchemaMerger;
use crate::io::lines::LineReader;
use crate::io::opener::StreamOpener;
use crate::options::JsonOptions;
use crate::partition::FilePartition;
use crate::row::{Row, RowConverter};
use crate::sample::Sampler;
use crate::schema::Schema;
use anyhow::Result;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Reads files where each non-blank line is one JSON record.
#[derive(Clone)]
pub struct LineOrientedSource {
    opener: Arc<dyn StreamOpener>,
}

impl LineOrientedSource {
    pub fn new(opener: Arc<dyn StreamOpener>) -> Self {
        Self { opener }
    }

    #[must_use]
    pub fn opener(&self) -> &Arc<dyn StreamOpener> {
        &self.opener
    }

    /// Record boundaries are line boundaries, so any byte offset is a safe
    /// split point, except inside a compressed stream. Compression is detected
    /// the way the file is opened: by extension, then by its leading bytes. A
    /// file whose head cannot be read is not split.
    #[must_use]
    pub fn is_splittable(&self, path: &Path) -> bool {
        match self.opener.is_encoded(path) {
            Ok(encoded) => !encoded,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "cannot inspect file, not splitting it");
                false
            }
        }
    }

    /// Sample lines across `files` and merge their shapes.
    ///
    /// Files are opened one at a time, each released before the next is opened.
    ///
    /// # Errors
    /// Returns an error if a file cannot be read, or on the first malformed
    /// sampled line in `FAILFAST` mode.
    pub fn infer_schema(&self, files: &[PathBuf], options: &JsonOptions) -> Result<Option<Schema>> {
        if files.is_empty() {
            return Ok(None);
        }
        let opener = self.opener.as_ref();
        let lines = files
            .iter()
            .flat_map(|path| -> Box<dyn Iterator<Item = Result<String>>> {
                match opener.open(path) {
                    Ok(stream) => Box::new(LineReader::from_stream(stream, path.clone())),
                    Err(e) => Box::new(std::iter::once(Err(e))),
                }
            })
            .filter(|line| !matches!(line, Ok(l) if is_blank(l)));

        let mut merger = SchemaMerger::new(options);
        for line in Sampler::from_options(options).sample(lines) {
            let line = line?;
            let parsed = serde_json::from_str::<Value>(&line).map_err(BadRecord::from);
            merge_record(&mut merger, options, line.as_str(), parsed)?;
        }
        let sampled = merger.records();
        let schema = merger.finish();
        tracing::info!(
            files = files.len(),
            sampled,
            columns = schema.len(),
            "inferred schema from JSON lines"
        );
        Ok(Some(schema))
    }

    /// Open a lazy row iterator over the lines of `partition`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened, or if a partial window of
    /// a compressed file is requested.
    pub fn read_partition(
        &self,
        partition: &FilePartition,
        schema: Arc<Schema>,
        options: &JsonOptions,
    ) -> Result<LineRows> {
        if !partition.is_whole_file() && !self.is_splittable(&partition.path) {
            return Err(JsonSourceError::UnsplittablePartition {
                path: partition.path.clone(),
                start: partition.start,
                length: partition.length,
            }
            .into());
        }
        let lines = LineReader::open(self.opener.as_ref(), partition)?;
        tracing::debug!(
            path = %partition.path.display(),
            start = partition.start,
            length = partition.length,
            "opened JSON lines partition"
        );
        let corrupt = options.column_name_of_corrupt_record.as_str();
        let parser = FailureSafeParser::new(
            RowConverter::new(Arc::clone(&schema), Some(corrupt)),
            options.parse_mode,
            &schema,
            Some(corrupt),
        );
        Ok(LineRows {
            lines: Some(lines),
            parser,
            pending: Vec::new().into_iter(),
            path: partition.path.clone(),
            start: partition.start,
        })
    }
}

/// Lazy rows of one line-oriented partition, in file order.
pub struct LineRows {
    /// `None` once the reader has been released.
    lines: Option<LineReader>,
    parser: FailureSafeParser<RowConverter>,
    pending: std::vec::IntoIter<Row>,
    path: PathBuf,
    start: u64,
}

impl LineRows {
    fn release(&mut self) {
        if self.lines.take().is_some() {
            let malformed = self.parser.malformed_count();
            if malformed > 0 {
                tracing::warn!(
                    path = %self.path.display(),
                    start = self.start,
                    malformed,
                    mode = %self.parser.mode(),
                    "partition contained malformed JSON lines"
                );
            }
            tracing::debug!(path = %self.path.display(), start = self.start, "closed JSON lines partition");
        }
    }
}

impl Iterator for LineRows {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(row) = self.pending.next() {
                return Some(Ok(row));
            }
            let lines = self.lines.as_mut()?;
            let line = match lines.next() {
                None => {
                    self.release();
                    return None;
                }
                Some(Err(e)) => {
                    self.release();
                    return Some(Err(e));
                }
                Some(Ok(line)) => line,
            };
            if is_blank(&line) {
                continue;
            }
            match self.parser.parse(line.as_str()) {
                Ok(rows) => self.pending = rows.into_iter(),
                Err(e) => {
                    self.release();
                    let err = anyhow::Error::new(e)
                        .context(format!("read JSON lines from {}", self.path.display()));
                    return Some(Err(err));
                }
            }
        }
    }
}

impl Drop for LineRows {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::opener::FileOpener;
    use crate::options::ParseMode;
    use crate::row::Cell;
    use std::fs;

    #[test]
    fn blank_lines_are_not_records() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("blank.jsonl");
        fs::write(&path, "{\"a\":1}\n\n   \n{\"a\":2}\n")?;
        let src = LineOrientedSource::new(Arc::new(FileOpener));
        let opts = JsonOptions::default().with_parse_mode(ParseMode::FailFast);
        let schema = src.infer_schema(&[path.clone()], &opts)?.unwrap();
        let len = fs::metadata(&path)?.len();
        let rows: Vec<Row> = src
            .read_partition(&FilePartition::whole_file(&path, len), Arc::new(schema), &opts)?
            .collect::<Result<_>>()?;
        assert_eq!(rows, vec![Row(vec![Cell::Long(1)]), Row(vec![Cell::Long(2)])]);
        Ok(())
    }
}
