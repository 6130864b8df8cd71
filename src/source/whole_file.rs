//! One JSON document per file.
//!
//! The document is either a single object (one row) or a top-level array of
//! objects (one row per element). Its structure cannot be found by scanning for
//! line breaks, so a file is always read start to finish by one reader.

use super::merge_record;
use crate::error::JsonSourceError;
use crate::failure_safe::{BadRecord, FailureSafeParser};
use crate::infer::SchemaMerger;
use crate::io::opener::StreamOpener;
use crate::options::JsonOptions;
use crate::partition::FilePartition;
use crate::row::{Row, RowConverter};
use crate::sample::Sampler;
use crate::schema::Schema;
use anyhow::{Context, Result};
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Reads each input file as a single JSON document.
#[derive(Clone)]
pub struct WholeFileSource {
    opener: Arc<dyn StreamOpener>,
}

impl WholeFileSource {
    pub fn new(opener: Arc<dyn StreamOpener>) -> Self {
        Self { opener }
    }

    #[must_use]
    pub fn opener(&self) -> &Arc<dyn StreamOpener> {
        &self.opener
    }

    /// Always `false`: a record may span the whole file.
    #[must_use]
    pub fn is_splittable(&self, _path: &Path) -> bool {
        false
    }

    /// Read the full content of `path`. The stream is closed before returning.
    fn read_document(&self, path: &Path) -> Result<Vec<u8>> {
        let mut stream = self.opener.open(path)?;
        let mut buf = Vec::new();
        stream
            .read_to_end(&mut buf)
            .with_context(|| format!("read {}", path.display()))?;
        Ok(buf)
    }

    /// Sample whole files and merge the shapes of their documents.
    ///
    /// # Errors
    /// Returns an error if a sampled file cannot be read, or on the first
    /// malformed document in `FAILFAST` mode.
    pub fn infer_schema(&self, files: &[PathBuf], options: &JsonOptions) -> Result<Option<Schema>> {
        if files.is_empty() {
            return Ok(None);
        }
        let mut merger = SchemaMerger::new(options);
        for path in Sampler::from_options(options).sample(files.iter().map(Ok)) {
            let path = path?;
            let content = self.read_document(path)?;
            if content.iter().all(u8::is_ascii_whitespace) {
                tracing::debug!(path = %path.display(), "skipping empty JSON document");
                continue;
            }
            let parsed = serde_json::from_slice::<Value>(&content).map_err(BadRecord::from);
            merge_record(&mut merger, options, &content[..], parsed)
                .with_context(|| format!("infer schema of {}", path.display()))?;
        }
        let sampled = merger.records();
        let schema = merger.finish();
        tracing::info!(
            files = files.len(),
            sampled,
            columns = schema.len(),
            "inferred schema from multi-line JSON documents"
        );
        Ok(Some(schema))
    }

    /// Read the single document of `partition` into rows.
    ///
    /// The file is read and closed before any row is produced. A malformed
    /// document in `FAILFAST` mode surfaces as the first item of the returned
    /// iterator.
    ///
    /// # Errors
    /// Returns [`JsonSourceError::UnsplittablePartition`] if `partition` does
    /// not cover the whole file, or an I/O error if the file cannot be read.
    pub fn read_partition(
        &self,
        partition: &FilePartition,
        schema: Arc<Schema>,
        options: &JsonOptions,
    ) -> Result<DocumentRows> {
        if !partition.is_whole_file() {
            return Err(JsonSourceError::UnsplittablePartition {
                path: partition.path.clone(),
                start: partition.start,
                length: partition.length,
            }
            .into());
        }
        let content = self.read_document(&partition.path)?;
        tracing::debug!(
            path = %partition.path.display(),
            bytes = content.len(),
            "read multi-line JSON document"
        );

        let corrupt = options.column_name_of_corrupt_record.as_str();
        let mut parser = FailureSafeParser::new(
            RowConverter::new(Arc::clone(&schema), Some(corrupt)),
            options.parse_mode,
            &schema,
            Some(corrupt),
        );
        let (rows, error) = match parser.parse(&content[..]) {
            Ok(rows) => (rows, None),
            Err(e) => {
                let err = anyhow::Error::new(e)
                    .context(format!("read JSON document {}", partition.path.display()));
                (Vec::new(), Some(err))
            }
        };
        if parser.malformed_count() > 0 {
            tracing::warn!(
                path = %partition.path.display(),
                mode = %options.parse_mode,
                "malformed multi-line JSON document"
            );
        }
        Ok(DocumentRows {
            rows: rows.into_iter(),
            error,
        })
    }
}

/// Rows of one whole-file document.
pub struct DocumentRows {
    rows: std::vec::IntoIter<Row>,
    error: Option<anyhow::Error>,
}

impl Iterator for DocumentRows {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(err) = self.error.take() {
            return Some(Err(err));
        }
        self.rows.next().map(Ok)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.rows.len() + usize::from(self.error.is_some());
        (n, Some(n))
    }
}
