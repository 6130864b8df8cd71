//! Record-level failure isolation.
//!
//! Every record, whether a line or a whole file, is parsed through
//! [`FailureSafeParser`]. A parse failure is resolved by the configured
//! [`ParseMode`] in [`resolve_bad_record`], which is also what schema
//! inference calls, so both passes treat a malformed record the same way.

use crate::error::JsonSourceError;
use crate::options::ParseMode;
use crate::row::{Cell, Row};
use crate::schema::{DataType, Schema};
use std::borrow::Cow;
use std::fmt;

/// Why a single record could not be turned into rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadRecord {
    pub reason: String,
}

impl BadRecord {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for BadRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

impl std::error::Error for BadRecord {}

impl From<serde_json::Error> for BadRecord {
    fn from(e: serde_json::Error) -> Self {
        Self::new(e.to_string())
    }
}

/// Raw record representation that can be shown as text.
pub trait RawRecord {
    fn raw_text(&self) -> Cow<'_, str>;
}

impl RawRecord for str {
    fn raw_text(&self) -> Cow<'_, str> {
        Cow::Borrowed(self)
    }
}

impl RawRecord for [u8] {
    fn raw_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self)
    }
}

/// Turns one raw record into zero or more rows.
pub trait RecordParser<R: ?Sized> {
    /// # Errors
    /// Returns [`BadRecord`] if the record is malformed or does not fit the schema.
    fn parse_record(&self, record: &R) -> Result<Vec<Row>, BadRecord>;
}

impl<R: ?Sized, F> RecordParser<R> for F
where
    F: Fn(&R) -> Result<Vec<Row>, BadRecord>,
{
    fn parse_record(&self, record: &R) -> Result<Vec<Row>, BadRecord> {
        self(record)
    }
}

/// Resolve a malformed record according to `mode`.
///
/// Returns `Ok(Some(recover()))` in permissive mode, `Ok(None)` when the
/// record is dropped, and the fail-fast error otherwise.
///
/// # Errors
/// Returns [`JsonSourceError::MalformedRecord`] in [`ParseMode::FailFast`].
pub fn resolve_bad_record<R, T>(
    mode: ParseMode,
    record: &R,
    bad: BadRecord,
    recover: impl FnOnce() -> T,
) -> Result<Option<T>, JsonSourceError>
where
    R: RawRecord + ?Sized,
{
    match mode {
        ParseMode::Permissive => Ok(Some(recover())),
        ParseMode::DropMalformed => {
            tracing::debug!(reason = %bad, "dropping malformed record");
            Ok(None)
        }
        ParseMode::FailFast => Err(JsonSourceError::malformed(&record.raw_text(), bad.reason)),
    }
}

/// Wraps a [`RecordParser`] so that a bad record never escapes as anything
/// other than what the [`ParseMode`] prescribes.
pub struct FailureSafeParser<P> {
    parser: P,
    mode: ParseMode,
    width: usize,
    corrupt_index: Option<usize>,
    malformed: usize,
}

impl<P> FailureSafeParser<P> {
    /// `corrupt_column` is only used if `schema` has a string column of that
    /// name; otherwise permissive mode emits all-null rows.
    pub fn new(parser: P, mode: ParseMode, schema: &Schema, corrupt_column: Option<&str>) -> Self {
        let corrupt_index = corrupt_column
            .and_then(|name| schema.index_of(name))
            .filter(|&i| schema.fields[i].data_type == DataType::String);
        Self {
            parser,
            mode,
            width: schema.len(),
            corrupt_index,
            malformed: 0,
        }
    }

    /// Number of malformed records seen so far.
    #[must_use]
    pub fn malformed_count(&self) -> usize {
        self.malformed
    }

    #[must_use]
    pub fn mode(&self) -> ParseMode {
        self.mode
    }

    /// Parse one record.
    ///
    /// A good record yields its rows. A bad record yields one recovered row
    /// (permissive), nothing (drop-malformed), or an error (fail-fast).
    ///
    /// # Errors
    /// Returns [`JsonSourceError::MalformedRecord`] for a bad record in
    /// [`ParseMode::FailFast`].
    pub fn parse<R>(&mut self, record: &R) -> Result<Vec<Row>, JsonSourceError>
    where
        R: RawRecord + ?Sized,
        P: RecordParser<R>,
    {
        match self.parser.parse_record(record) {
            Ok(rows) => Ok(rows),
            Err(bad) => {
                self.malformed += 1;
                let (width, corrupt_index) = (self.width, self.corrupt_index);
                let recovered = resolve_bad_record(self.mode, record, bad, || {
                    let mut row = Row::null(width);
                    if let Some(i) = corrupt_index {
                        row.0[i] = Cell::String(record.raw_text().into_owned());
                    }
                    row
                })?;
                Ok(recovered.into_iter().collect())
            }
        }
    }
}
