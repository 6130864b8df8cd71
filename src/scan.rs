//! Driving a JSON scan end to end.
//!
//! [`JsonScan`] plays the part of the host engine: it resolves inputs, picks
//! the layout, infers the schema (pass 1), plans partitions and reads them
//! (pass 2). Partitions are independent, so [`JsonScan::collect`] reads them on
//! the rayon pool when the `parallel-io` feature is enabled, keeping plan
//! order in the output.
//!
//! ```no_run
//! use ironbeam_json::{JsonOptions, JsonScan, ParseMode};
//!
//! let opts = JsonOptions::default().with_parse_mode(ParseMode::DropMalformed);
//! let scan = JsonScan::new(&["data/events/*.jsonl"], opts)?;
//! if let Some(out) = scan.collect()? {
//!     println!("{} rows of {}", out.rows.len(), out.schema);
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

use crate::error::JsonSourceError;
use crate::io::glob::resolve_inputs;
use crate::io::opener::{FileOpener, StreamOpener};
use crate::options::{JsonOptions, ParseMode};
use crate::partition::{FilePartition, split_file};
use crate::row::Row;
use crate::schema::{DataType, Schema};
use crate::source::{JsonDataSource, RowIter};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

/// Largest partition planned by default (128 MiB).
pub const DEFAULT_MAX_SPLIT_BYTES: u64 = 128 * 1024 * 1024;
/// Smallest partition planned by [`JsonScan::plan_partitions_auto`] (4 MiB).
pub const MIN_SPLIT_BYTES: u64 = 4 * 1024 * 1024;

/// Schema and rows of a completed scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanOutput {
    pub schema: Schema,
    pub rows: Vec<Row>,
}

/// A configured scan over a fixed set of input files.
pub struct JsonScan {
    source: JsonDataSource,
    options: JsonOptions,
    files: Vec<PathBuf>,
    user_schema: Option<Schema>,
}

impl JsonScan {
    /// Resolve `inputs` (files, directories or glob patterns) and select the
    /// layout from `options`.
    ///
    /// # Errors
    /// Returns an error if the options are invalid or an explicit input path
    /// does not exist.
    pub fn new<P: AsRef<str>>(inputs: &[P], options: JsonOptions) -> Result<Self> {
        let files = resolve_inputs(inputs)?;
        Self::from_files(files, options, Arc::new(FileOpener))
    }

    /// Scan an already resolved list of files through `opener`.
    ///
    /// # Errors
    /// Returns an error if the options are invalid.
    pub fn from_files(
        files: Vec<PathBuf>,
        options: JsonOptions,
        opener: Arc<dyn StreamOpener>,
    ) -> Result<Self> {
        options.validate()?;
        let source = JsonDataSource::with_opener(&options, opener);
        tracing::info!(
            source = source.name(),
            files = files.len(),
            mode = %options.parse_mode,
            "configured JSON scan"
        );
        Ok(Self {
            source,
            options,
            files,
            user_schema: None,
        })
    }

    /// Use `schema` instead of inferring one.
    ///
    /// # Errors
    /// Returns [`JsonSourceError::InvalidCorruptColumn`] if, in permissive
    /// mode, the schema's corrupt-record column is not a nullable string.
    pub fn with_schema(mut self, schema: Schema) -> Result<Self> {
        if self.options.parse_mode == ParseMode::Permissive
            && let Some(field) = schema.field(&self.options.column_name_of_corrupt_record)
            && (field.data_type != DataType::String || !field.nullable)
        {
            return Err(JsonSourceError::InvalidCorruptColumn {
                column: field.name.clone(),
            }
            .into());
        }
        self.user_schema = Some(schema);
        Ok(self)
    }

    #[must_use]
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    #[must_use]
    pub fn source(&self) -> &JsonDataSource {
        &self.source
    }

    #[must_use]
    pub fn options(&self) -> &JsonOptions {
        &self.options
    }

    /// The user schema if one was given, otherwise the inferred one.
    /// `None` means there were no input files.
    ///
    /// # Errors
    /// Propagates inference failures.
    pub fn infer_schema(&self) -> Result<Option<Schema>> {
        if let Some(schema) = &self.user_schema {
            return Ok(Some(schema.clone()));
        }
        self.source.infer_schema(&self.files, &self.options)
    }

    /// Cut every input file into partitions of at most `max_split_bytes`.
    /// Files the layout cannot split get a single partition each.
    ///
    /// # Errors
    /// Returns an error if a file's size cannot be read.
    pub fn plan_partitions(&self, max_split_bytes: u64) -> Result<Vec<FilePartition>> {
        let opener = self.source.opener();
        let mut parts = Vec::new();
        for path in &self.files {
            let len = opener.file_len(path)?;
            let splittable = self.source.is_splittable(path);
            parts.extend(split_file(path, len, max_split_bytes, splittable));
        }
        tracing::info!(
            files = self.files.len(),
            partitions = parts.len(),
            max_split_bytes,
            "planned JSON partitions"
        );
        Ok(parts)
    }

    /// Plan partitions sized to spread the input over the available cores,
    /// between [`MIN_SPLIT_BYTES`] and [`DEFAULT_MAX_SPLIT_BYTES`].
    ///
    /// # Errors
    /// Returns an error if a file's size cannot be read.
    pub fn plan_partitions_auto(&self) -> Result<Vec<FilePartition>> {
        let opener = self.source.opener();
        let mut total: u64 = 0;
        for path in &self.files {
            total = total.saturating_add(opener.file_len(path)?);
        }
        let per_core = total.div_ceil(num_cpus::get().max(1) as u64);
        self.plan_partitions(per_core.clamp(MIN_SPLIT_BYTES, DEFAULT_MAX_SPLIT_BYTES))
    }

    /// Read one partition into rows of `schema`.
    ///
    /// # Errors
    /// See [`JsonDataSource::read_partition`].
    pub fn read_partition(&self, partition: &FilePartition, schema: Arc<Schema>) -> Result<RowIter> {
        self.source.read_partition(partition, schema, &self.options)
    }

    /// Infer the schema, then read every partition.
    ///
    /// Returns `None` when there were no input files.
    ///
    /// # Errors
    /// Returns the first structural failure, or the first malformed record in
    /// `FAILFAST` mode.
    pub fn collect(&self) -> Result<Option<ScanOutput>> {
        let Some(schema) = self.infer_schema()? else {
            tracing::info!("no JSON input files, nothing to read");
            return Ok(None);
        };
        let partitions = self.plan_partitions_auto()?;
        let rows = self.read_all(&partitions, Arc::new(schema.clone()))?;
        Ok(Some(ScanOutput { schema, rows }))
    }

    fn read_one(&self, partition: &FilePartition, schema: Arc<Schema>) -> Result<Vec<Row>> {
        self.read_partition(partition, schema)?.collect()
    }

    #[cfg(feature = "parallel-io")]
    fn read_all(&self, partitions: &[FilePartition], schema: Arc<Schema>) -> Result<Vec<Row>> {
        use rayon::prelude::*;
        let chunks: Vec<Vec<Row>> = partitions
            .par_iter()
            .map(|p| self.read_one(p, Arc::clone(&schema)))
            .collect::<Result<_>>()?;
        Ok(chunks.into_iter().flatten().collect())
    }

    #[cfg(not(feature = "parallel-io"))]
    fn read_all(&self, partitions: &[FilePartition], schema: Arc<Schema>) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        for p in partitions {
            rows.extend(self.read_one(p, Arc::clone(&schema))?);
        }
        Ok(rows)
    }
}
