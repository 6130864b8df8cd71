//! # ironbeam-json
//!
//! A **JSON ingestion layer** for batch query engines: it infers a column
//! schema from a sample of the input, then reads file partitions into typed
//! rows, isolating malformed records according to a configurable policy.
//!
//! ## Key Features
//!
//! - **Two layouts, one contract** - JSON Lines (one record per line,
//!   splittable at any byte offset) and multi-line JSON (one document per
//!   file, never split), chosen by [`JsonOptions::multi_line`]
//! - **Schema inference** - sampled by ratio and/or size with a fixed seed,
//!   widened across records (`bigint` + `double` = `double`, conflicts become
//!   `string`)
//! - **Record-failure policies** - [`ParseMode::Permissive`],
//!   [`ParseMode::DropMalformed`] and [`ParseMode::FailFast`], applied the same
//!   way during inference and reading
//! - **Lazy, owned partition reads** - each partition's rows are pulled one at
//!   a time and its file handle is released on exhaustion, error or drop
//! - **Transparent decompression** - gzip, zstd, bzip2 and xz (feature-gated)
//!
//! ## Quick Start
//!
//! ```no_run
//! use ironbeam_json::*;
//! # use anyhow::Result;
//!
//! # fn main() -> Result<()> {
//! let opts = JsonOptions::default(); // JSON Lines, PERMISSIVE
//! let scan = JsonScan::new(&["logs/"], opts)?;
//!
//! // Pass 1: schema
//! let Some(schema) = scan.infer_schema()? else {
//!     return Ok(()); // no input files
//! };
//! let schema = std::sync::Arc::new(schema);
//!
//! // Pass 2: one call per partition; each may run on its own thread
//! for partition in scan.plan_partitions(64 * 1024 * 1024)? {
//!     for row in scan.read_partition(&partition, schema.clone())? {
//!         println!("{}", row?.to_json(&schema));
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Record-failure policies
//!
//! | Mode            | Malformed record becomes                                  |
//! |-----------------|-----------------------------------------------------------|
//! | `PERMISSIVE`    | one row, nulls except the corrupt-record column (raw text) |
//! | `DROPMALFORMED` | nothing                                                   |
//! | `FAILFAST`      | an error naming the record; the partition ends there      |
//!
//! In permissive mode a malformed sample adds the corrupt-record column
//! (default `_corrupt_record`) to the inferred schema.
//!
//! ## Module Overview
//!
//! - [`source`] - the [`JsonDataSource`] contract and its two layouts
//! - [`failure_safe`] - record-level failure isolation
//! - [`infer`] - per-record shapes and type widening
//! - [`row`] - typed rows and JSON-to-row conversion
//! - [`sample`] - deterministic sampling for inference
//! - [`scan`] - end-to-end driver: input resolution, planning, parallel reads
//! - [`io`] - stream opening, decompression, byte-range line reading, globbing
//! - [`options`] / [`error`] - configuration and typed errors

pub mod error;
pub mod failure_safe;
pub mod infer;
pub mod io;
pub mod options;
pub mod partition;
pub mod row;
pub mod sample;
pub mod scan;
pub mod schema;
pub mod source;

pub use error::JsonSourceError;
pub use failure_safe::{BadRecord, FailureSafeParser, RecordParser};
pub use io::opener::{FileOpener, StreamOpener};
pub use options::{DEFAULT_CORRUPT_RECORD_COLUMN, JsonOptions, ParseMode};
pub use partition::FilePartition;
pub use row::{Cell, Row, RowConverter};
pub use scan::{JsonScan, ScanOutput};
pub use schema::{DataType, Field, Schema};
pub use source::{JsonDataSource, RowIter};
