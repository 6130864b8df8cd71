//! Schema inference: per-record shapes and the widening rules that merge them.
//!
//! Each record is reduced to a [`DataType::Struct`] describing its columns.
//! [`SchemaMerger`] folds those shapes together with [`compatible_type`] and
//! turns the result into a [`Schema`] once every sampled record has been seen.
//!
//! Widening:
//! - equal types merge to themselves, `null` merges into anything;
//! - `bigint` and `double` merge to `double`;
//! - structs merge field by field, arrays merge their element types;
//! - every other combination becomes `string`.

use crate::failure_safe::BadRecord;
use crate::options::JsonOptions;
use crate::row::root_objects;
use crate::schema::{DataType, Field, Schema};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Shape of one JSON value.
#[must_use]
pub fn infer_type(value: &Value, primitives_as_string: bool) -> DataType {
    match value {
        Value::Null => DataType::Null,
        Value::Bool(_) | Value::Number(_) | Value::String(_) if primitives_as_string => {
            DataType::String
        }
        Value::Bool(_) => DataType::Boolean,
        Value::Number(n) if n.is_i64() => DataType::Long,
        Value::Number(_) => DataType::Double,
        Value::String(_) => DataType::String,
        Value::Array(items) => {
            let elem = items
                .iter()
                .map(|v| infer_type(v, primitives_as_string))
                .fold(DataType::Null, compatible_type);
            DataType::array_of(elem)
        }
        Value::Object(obj) => infer_object(obj, primitives_as_string),
    }
}

fn infer_object(obj: &Map<String, Value>, primitives_as_string: bool) -> DataType {
    let sorted: BTreeMap<&str, DataType> = obj
        .iter()
        .map(|(k, v)| (k.as_str(), infer_type(v, primitives_as_string)))
        .collect();
    DataType::Struct(
        sorted
            .into_iter()
            .map(|(name, t)| Field::new(name, t))
            .collect(),
    )
}

/// Shape of a whole record: the struct its top-level object (or the merged
/// objects of its top-level array) maps to.
///
/// # Errors
/// Returns [`BadRecord`] when the record's top level is not an object or an
/// array of objects.
pub fn record_shape(value: &Value, primitives_as_string: bool) -> Result<DataType, BadRecord> {
    Ok(root_objects(value)?
        .into_iter()
        .map(|obj| infer_object(obj, primitives_as_string))
        .fold(DataType::Struct(Vec::new()), compatible_type))
}

/// Shape contributed by a malformed record in permissive mode.
#[must_use]
pub fn corrupt_record_shape(column: &str) -> DataType {
    DataType::Struct(vec![Field::new(column, DataType::String)])
}

/// Least type both `a` and `b` can be read as.
#[must_use]
pub fn compatible_type(a: DataType, b: DataType) -> DataType {
    match (a, b) {
        (a, b) if a == b => a,
        (DataType::Null, t) | (t, DataType::Null) => t,
        (DataType::Long, DataType::Double) | (DataType::Double, DataType::Long) => {
            DataType::Double
        }
        (DataType::Struct(fa), DataType::Struct(fb)) => DataType::Struct(merge_fields(fa, fb)),
        (DataType::Array(ea), DataType::Array(eb)) => {
            DataType::array_of(compatible_type(*ea, *eb))
        }
        _ => DataType::String,
    }
}

fn merge_fields(a: Vec<Field>, b: Vec<Field>) -> Vec<Field> {
    let mut merged: BTreeMap<String, DataType> = BTreeMap::new();
    for f in a.into_iter().chain(b) {
        let t = match merged.remove(&f.name) {
            Some(prev) => compatible_type(prev, f.data_type),
            None => f.data_type,
        };
        merged.insert(f.name, t);
    }
    merged
        .into_iter()
        .map(|(name, t)| Field::new(name, t))
        .collect()
}

/// Replace types that never saw a value. `None` means drop the field.
fn canonicalize(t: DataType, drop_if_all_null: bool) -> Option<DataType> {
    match t {
        DataType::Null => (!drop_if_all_null).then_some(DataType::String),
        DataType::Array(elem) => canonicalize(*elem, drop_if_all_null).map(DataType::array_of),
        DataType::Struct(fields) => {
            let kept: Vec<Field> = fields
                .into_iter()
                .filter(|f| !f.name.is_empty())
                .filter_map(|f| {
                    canonicalize(f.data_type, drop_if_all_null).map(|t| Field::new(f.name, t))
                })
                .collect();
            (!kept.is_empty() || !drop_if_all_null).then_some(DataType::Struct(kept))
        }
        other => Some(other),
    }
}

/// Accumulates record shapes into one schema.
#[derive(Debug, Clone)]
pub struct SchemaMerger {
    root: DataType,
    records: usize,
    drop_field_if_all_null: bool,
}

impl SchemaMerger {
    #[must_use]
    pub fn new(options: &JsonOptions) -> Self {
        Self {
            root: DataType::Struct(Vec::new()),
            records: 0,
            drop_field_if_all_null: options.drop_field_if_all_null,
        }
    }

    /// Fold one record shape in. Non-struct shapes are ignored.
    pub fn add(&mut self, shape: DataType) {
        if !matches!(shape, DataType::Struct(_)) {
            return;
        }
        let root = std::mem::replace(&mut self.root, DataType::Null);
        self.root = compatible_type(root, shape);
        self.records += 1;
    }

    /// Number of shapes merged so far.
    #[must_use]
    pub fn records(&self) -> usize {
        self.records
    }

    /// The merged schema, with never-typed columns resolved.
    #[must_use]
    pub fn finish(self) -> Schema {
        match canonicalize(self.root, self.drop_field_if_all_null) {
            Some(DataType::Struct(fields)) => Schema::new(fields),
            _ => Schema::default(),
        }
    }
}
