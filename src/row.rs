//! Typed rows and conversion of parsed JSON into them.

use crate::failure_safe::{BadRecord, RecordParser};
use crate::schema::{DataType, Field, Schema};
use serde_json::{Map, Value};
use std::sync::Arc;

/// One typed value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Boolean(bool),
    Long(i64),
    Double(f64),
    String(String),
    Array(Vec<Cell>),
    Struct(Row),
}

impl Cell {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Render back to JSON, using `data_type` to name struct members.
    #[must_use]
    pub fn to_json(&self, data_type: &DataType) -> Value {
        match (self, data_type) {
            (Self::Null, _) => Value::Null,
            (Self::Boolean(b), _) => Value::Bool(*b),
            (Self::Long(n), _) => Value::from(*n),
            (Self::Double(d), _) => {
                serde_json::Number::from_f64(*d).map_or_else(|| Value::String(d.to_string()), Value::Number)
            }
            (Self::String(s), _) => Value::String(s.clone()),
            (Self::Array(items), DataType::Array(elem)) => {
                Value::Array(items.iter().map(|c| c.to_json(elem)).collect())
            }
            (Self::Struct(row), DataType::Struct(fields)) => row.to_json_fields(fields),
            // Shape and type disagree; fall back to positional output.
            (Self::Array(items), _) => {
                Value::Array(items.iter().map(|c| c.to_json(&DataType::String)).collect())
            }
            (Self::Struct(row), _) => Value::Array(
                row.0.iter().map(|c| c.to_json(&DataType::String)).collect(),
            ),
        }
    }
}

/// A row of cells positionally aligned with a [`Schema`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row(pub Vec<Cell>);

impl Row {
    /// A row of `width` nulls.
    #[must_use]
    pub fn null(width: usize) -> Self {
        Self(vec![Cell::Null; width])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, i: usize) -> Option<&Cell> {
        self.0.get(i)
    }

    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.0
    }

    /// Render as a JSON object keyed by the schema's column names.
    #[must_use]
    pub fn to_json(&self, schema: &Schema) -> Value {
        self.to_json_fields(&schema.fields)
    }

    fn to_json_fields(&self, fields: &[Field]) -> Value {
        let obj: Map<String, Value> = fields
            .iter()
            .zip(&self.0)
            .map(|(f, c)| (f.name.clone(), c.to_json(&f.data_type)))
            .collect();
        Value::Object(obj)
    }
}

/// The objects a parsed record contributes as rows.
///
/// An object is one row, an array of objects is one row per element. Any other
/// top-level value cannot be mapped onto columns.
pub(crate) fn root_objects(value: &Value) -> Result<Vec<&Map<String, Value>>, BadRecord> {
    match value {
        Value::Object(obj) => Ok(vec![obj]),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Object(obj) => Ok(obj),
                other => Err(BadRecord::new(format!(
                    "top-level array element is {}, expected an object",
                    kind(other)
                ))),
            })
            .collect(),
        other => Err(BadRecord::new(format!(
            "top-level value is {}, expected an object or array",
            kind(other)
        ))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(u8::is_ascii_whitespace)
}

/// Parses raw JSON records into rows of a fixed schema.
///
/// The corrupt-record column, if present, is always null in converted rows; it
/// is only ever filled by the failure-safe parser.
#[derive(Debug, Clone)]
pub struct RowConverter {
    schema: Arc<Schema>,
    corrupt_index: Option<usize>,
}

impl RowConverter {
    pub fn new(schema: Arc<Schema>, corrupt_column: Option<&str>) -> Self {
        let corrupt_index = corrupt_column.and_then(|c| schema.index_of(c));
        Self {
            schema,
            corrupt_index,
        }
    }

    /// Convert an already parsed value into rows.
    ///
    /// # Errors
    /// Returns [`BadRecord`] if the value's shape or any field type does not
    /// fit the schema.
    pub fn convert(&self, value: &Value) -> Result<Vec<Row>, BadRecord> {
        root_objects(value)?
            .into_iter()
            .map(|obj| self.convert_root(obj))
            .collect()
    }

    fn convert_root(&self, obj: &Map<String, Value>) -> Result<Row, BadRecord> {
        let mut cells = Vec::with_capacity(self.schema.len());
        for (i, field) in self.schema.fields.iter().enumerate() {
            if Some(i) == self.corrupt_index {
                cells.push(Cell::Null);
                continue;
            }
            cells.push(convert_field(obj, field)?);
        }
        Ok(Row(cells))
    }
}

impl RecordParser<str> for RowConverter {
    fn parse_record(&self, record: &str) -> Result<Vec<Row>, BadRecord> {
        if is_blank(record.as_bytes()) {
            return Ok(Vec::new());
        }
        let value: Value = serde_json::from_str(record)?;
        self.convert(&value)
    }
}

impl RecordParser<[u8]> for RowConverter {
    fn parse_record(&self, record: &[u8]) -> Result<Vec<Row>, BadRecord> {
        if is_blank(record) {
            return Ok(Vec::new());
        }
        let value: Value = serde_json::from_slice(record)?;
        self.convert(&value)
    }
}

fn convert_field(obj: &Map<String, Value>, field: &Field) -> Result<Cell, BadRecord> {
    match obj.get(&field.name) {
        None => Ok(Cell::Null),
        Some(v) => convert_value(v, &field.data_type)
            .map_err(|reason| BadRecord::new(format!("field `{}`: {reason}", field.name))),
    }
}

fn convert_value(value: &Value, data_type: &DataType) -> Result<Cell, String> {
    match (value, data_type) {
        (Value::Null, _) | (_, DataType::Null) => Ok(Cell::Null),
        (Value::Bool(b), DataType::Boolean) => Ok(Cell::Boolean(*b)),
        (Value::Number(n), DataType::Long) => n
            .as_i64()
            .map(Cell::Long)
            .ok_or_else(|| format!("{n} does not fit in bigint")),
        (Value::Number(n), DataType::Double) => n
            .as_f64()
            .map(Cell::Double)
            .ok_or_else(|| format!("{n} is not a double")),
        (Value::String(s), DataType::Double) => match s.as_str() {
            "NaN" => Ok(Cell::Double(f64::NAN)),
            "Infinity" | "+Infinity" => Ok(Cell::Double(f64::INFINITY)),
            "-Infinity" => Ok(Cell::Double(f64::NEG_INFINITY)),
            _ => Err(format!("string {s:?} cannot be read as double")),
        },
        (Value::String(s), DataType::String) => Ok(Cell::String(s.clone())),
        (other, DataType::String) => Ok(Cell::String(other.to_string())),
        (Value::Array(items), DataType::Array(elem)) => items
            .iter()
            .map(|item| convert_value(item, elem))
            .collect::<Result<Vec<_>, _>>()
            .map(Cell::Array),
        (Value::Object(obj), DataType::Struct(fields)) => fields
            .iter()
            .map(|f| convert_field(obj, f).map_err(|b| b.reason))
            .collect::<Result<Vec<_>, _>>()
            .map(|cells| Cell::Struct(Row(cells))),
        (other, expected) => Err(format!("{} cannot be read as {expected}", kind(other))),
    }
}
