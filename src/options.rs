//! Reader options and the record-failure policy.
//!
//! Options can be built in code, deserialized with serde, or parsed from a
//! string map where keys match case-insensitively:
//!
//! ```
//! use ironbeam_json::{JsonOptions, ParseMode};
//! use std::collections::HashMap;
//!
//! let mut raw = HashMap::new();
//! raw.insert("multiline", "true");
//! raw.insert("MODE", "dropmalformed");
//! let opts = JsonOptions::from_map(&raw)?;
//! assert!(opts.multi_line);
//! assert_eq!(opts.parse_mode, ParseMode::DropMalformed);
//! # Ok::<(), anyhow::Error>(())
//! ```

use crate::error::JsonSourceError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Default name of the column that captures unparsable records.
pub const DEFAULT_CORRUPT_RECORD_COLUMN: &str = "_corrupt_record";

/// What to do with a record that cannot be parsed.
///
/// Names are matched case-insensitively wherever they are read, and an unknown
/// name falls back to [`ParseMode::Permissive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", from = "String")]
pub enum ParseMode {
    /// Emit one row of nulls carrying the raw text in the corrupt-record column.
    #[default]
    Permissive,
    /// Silently drop the record.
    #[serde(rename = "DROPMALFORMED")]
    DropMalformed,
    /// Abort the partition with an error naming the record.
    #[serde(rename = "FAILFAST")]
    FailFast,
}

impl ParseMode {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Permissive => "PERMISSIVE",
            Self::DropMalformed => "DROPMALFORMED",
            Self::FailFast => "FAILFAST",
        }
    }
}

impl fmt::Display for ParseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl ParseMode {
    fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_uppercase().as_str() {
            "PERMISSIVE" => Self::Permissive,
            "DROPMALFORMED" => Self::DropMalformed,
            "FAILFAST" => Self::FailFast,
            other => {
                tracing::warn!(mode = other, "unknown parse mode, using PERMISSIVE");
                Self::Permissive
            }
        }
    }
}

impl FromStr for ParseMode {
    type Err = std::convert::Infallible;

    /// Unknown names fall back to [`ParseMode::Permissive`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_name(s))
    }
}

impl From<String> for ParseMode {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

/// Options recognized by both JSON strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JsonOptions {
    /// Treat each file as a single JSON document instead of one record per line.
    pub multi_line: bool,
    /// Fraction of records (or files, for multi-line input) read during inference.
    pub sampling_ratio: f64,
    /// Upper bound on the number of sampled records, applied after the ratio.
    pub sample_size: Option<usize>,
    /// Seed for sampling; fixed seeds make inference reproducible.
    pub seed: u64,
    #[serde(rename = "mode")]
    pub parse_mode: ParseMode,
    pub column_name_of_corrupt_record: String,
    /// Infer every primitive value as a string.
    pub primitives_as_string: bool,
    /// Drop columns whose sampled values were all null instead of typing them as strings.
    pub drop_field_if_all_null: bool,
}

impl Default for JsonOptions {
    fn default() -> Self {
        Self {
            multi_line: false,
            sampling_ratio: 1.0,
            sample_size: None,
            seed: 0,
            parse_mode: ParseMode::Permissive,
            column_name_of_corrupt_record: DEFAULT_CORRUPT_RECORD_COLUMN.to_string(),
            primitives_as_string: false,
            drop_field_if_all_null: false,
        }
    }
}

impl JsonOptions {
    /// Parse options from string key/value pairs. Keys are case-insensitive and
    /// unrecognized keys are ignored.
    ///
    /// # Errors
    /// Returns [`JsonSourceError::InvalidOption`] for values that do not parse
    /// or fail validation.
    pub fn from_map<K, V>(raw: &HashMap<K, V>) -> Result<Self>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut opts = Self::default();
        for (k, v) in raw {
            let (key, value) = (k.as_ref(), v.as_ref().trim());
            match key.to_ascii_lowercase().as_str() {
                "multiline" => opts.multi_line = parse_bool(key, value)?,
                "samplingratio" => {
                    opts.sampling_ratio = value.parse().map_err(|_| {
                        JsonSourceError::invalid_option(key, format!("`{value}` is not a number"))
                    })?;
                }
                "samplesize" => {
                    opts.sample_size = Some(value.parse().map_err(|_| {
                        JsonSourceError::invalid_option(key, format!("`{value}` is not a count"))
                    })?);
                }
                "seed" => {
                    opts.seed = value.parse().map_err(|_| {
                        JsonSourceError::invalid_option(key, format!("`{value}` is not a seed"))
                    })?;
                }
                "mode" => opts.parse_mode = value.parse().unwrap_or_default(),
                "columnnameofcorruptrecord" => {
                    opts.column_name_of_corrupt_record = value.to_string();
                }
                "primitivesasstring" => opts.primitives_as_string = parse_bool(key, value)?,
                "dropfieldifallnull" => opts.drop_field_if_all_null = parse_bool(key, value)?,
                _ => tracing::debug!(option = key, "ignoring unrecognized JSON option"),
            }
        }
        opts.validate()?;
        Ok(opts)
    }

    /// Check value ranges.
    ///
    /// # Errors
    /// Returns [`JsonSourceError::InvalidOption`] describing the first bad value.
    pub fn validate(&self) -> Result<()> {
        if !(self.sampling_ratio > 0.0 && self.sampling_ratio <= 1.0) {
            return Err(JsonSourceError::invalid_option(
                "samplingRatio",
                format!("must be in (0, 1], got {}", self.sampling_ratio),
            )
            .into());
        }
        if self.sample_size == Some(0) {
            return Err(
                JsonSourceError::invalid_option("sampleSize", "must be at least 1").into(),
            );
        }
        if self.column_name_of_corrupt_record.is_empty() {
            return Err(JsonSourceError::invalid_option(
                "columnNameOfCorruptRecord",
                "must not be empty",
            )
            .into());
        }
        Ok(())
    }

    #[must_use]
    pub fn with_multi_line(mut self, multi_line: bool) -> Self {
        self.multi_line = multi_line;
        self
    }

    #[must_use]
    pub fn with_parse_mode(mut self, mode: ParseMode) -> Self {
        self.parse_mode = mode;
        self
    }

    #[must_use]
    pub fn with_sampling(mut self, ratio: f64, seed: u64) -> Self {
        self.sampling_ratio = ratio;
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_sample_size(mut self, n: usize) -> Self {
        self.sample_size = Some(n);
        self
    }

    #[must_use]
    pub fn with_corrupt_record_column(mut self, name: impl Into<String>) -> Self {
        self.column_name_of_corrupt_record = name.into();
        self
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(JsonSourceError::invalid_option(key, format!("`{value}` is not a boolean")).into()),
    }
}
