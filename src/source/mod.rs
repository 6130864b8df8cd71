//! The JSON data source contract and its two layouts.
//!
//! [`JsonDataSource`] is chosen once per scan from [`JsonOptions::multi_line`]:
//!
//! | Variant        | Record unit   | Splittable                 |
//! |----------------|---------------|----------------------------|
//! | `LineOriented` | one line      | yes, unless compressed     |
//! | `WholeFile`    | one file      | never                      |
//!
//! Both variants infer a schema from a sample of their records and read one
//! partition at a time into a lazy [`RowIter`].

pub mod line;
pub mod whole_file;

use crate::failure_safe::{BadRecord, RawRecord, resolve_bad_record};
use crate::infer::{SchemaMerger, corrupt_record_shape, record_shape};
use crate::io::opener::{FileOpener, StreamOpener};
use crate::options::JsonOptions;
use crate::partition::FilePartition;
use crate::row::Row;
use crate::schema::Schema;
use anyhow::Result;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use line::{LineOrientedSource, LineRows};
pub use whole_file::{DocumentRows, WholeFileSource};

/// One of the two JSON layouts.
#[derive(Clone)]
pub enum JsonDataSource {
    LineOriented(LineOrientedSource),
    WholeFile(WholeFileSource),
}

impl JsonDataSource {
    /// Select the layout for `options`, reading from the local filesystem.
    #[must_use]
    pub fn for_options(options: &JsonOptions) -> Self {
        Self::with_opener(options, Arc::new(FileOpener))
    }

    /// Select the layout for `options`, reading through `opener`.
    #[must_use]
    pub fn with_opener(options: &JsonOptions, opener: Arc<dyn StreamOpener>) -> Self {
        if options.multi_line {
            Self::WholeFile(WholeFileSource::new(opener))
        } else {
            Self::LineOriented(LineOrientedSource::new(opener))
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::LineOriented(_) => "json-lines",
            Self::WholeFile(_) => "json-whole-file",
        }
    }

    /// Whether `path` may be cut into several byte-range partitions.
    #[must_use]
    pub fn is_splittable(&self, path: &Path) -> bool {
        match self {
            Self::LineOriented(s) => s.is_splittable(path),
            Self::WholeFile(s) => s.is_splittable(path),
        }
    }

    #[must_use]
    pub fn opener(&self) -> &Arc<dyn StreamOpener> {
        match self {
            Self::LineOriented(s) => s.opener(),
            Self::WholeFile(s) => s.opener(),
        }
    }

    /// Infer a schema from a sample of `files`.
    ///
    /// Returns `Ok(None)` when `files` is empty.
    ///
    /// # Errors
    /// Returns an error if a file cannot be read, or on the first malformed
    /// record in `FAILFAST` mode.
    pub fn infer_schema(&self, files: &[PathBuf], options: &JsonOptions) -> Result<Option<Schema>> {
        match self {
            Self::LineOriented(s) => s.infer_schema(files, options),
            Self::WholeFile(s) => s.infer_schema(files, options),
        }
    }

    /// Read one partition into rows of `schema`.
    ///
    /// # Errors
    /// Returns an error if the partition cannot be opened, or if it asks for a
    /// split the layout cannot serve.
    pub fn read_partition(
        &self,
        partition: &FilePartition,
        schema: Arc<Schema>,
        options: &JsonOptions,
    ) -> Result<RowIter> {
        match self {
            Self::LineOriented(s) => s.read_partition(partition, schema, options).map(RowIter::Lines),
            Self::WholeFile(s) => s
                .read_partition(partition, schema, options)
                .map(RowIter::Document),
        }
    }
}

/// Rows of one partition.
///
/// Yields `Err` at most once; after that the iterator is exhausted. Dropping
/// it early releases the partition's file handle.
pub enum RowIter {
    Lines(LineRows),
    Document(DocumentRows),
}

impl Iterator for RowIter {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::Lines(rows) => rows.next(),
            Self::Document(rows) => rows.next(),
        }
    }
}

/// Fold the shape of one sampled record into `merger`, resolving a malformed
/// record with the configured parse mode.
fn merge_record<R>(
    merger: &mut SchemaMerger,
    options: &JsonOptions,
    raw: &R,
    parsed: Result<Value, BadRecord>,
) -> Result<()>
where
    R: RawRecord + ?Sized,
{
    let shape = parsed.and_then(|v| record_shape(&v, options.primitives_as_string));
    match shape {
        Ok(t) => merger.add(t),
        Err(bad) => {
            let recovered = resolve_bad_record(options.parse_mode, raw, bad, || {
                corrupt_record_shape(&options.column_name_of_corrupt_record)
            })?;
            if let Some(t) = recovered {
                merger.add(t);
            }
        }
    }
    Ok(())
}
