//! Column classification and typed value extraction.
//!
//! Columns are either numeric (any Arrow integer or float type) or
//! categorical (everything else). Values are pulled out of a
//! [`RecordBatch`] through Arrow casts: numeric columns as `f64`,
//! categorical columns (and identifier / grouping keys) as strings.

// Statistical helpers work on f64 and cast counts freely
#![allow(clippy::cast_precision_loss)]

use std::sync::Arc;

use arrow::{
    array::{Array, ArrayRef, Float64Array, RecordBatch, StringArray},
    compute::cast,
    datatypes::{DataType, SchemaRef},
};
use serde::Serialize;

use crate::error::{Error, Result};

/// Logical type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Integer or floating point values.
    Numeric,
    /// Anything compared by value only (strings, booleans, dates).
    Categorical,
}

impl ColumnKind {
    /// Classify an Arrow data type.
    pub fn of(dtype: &DataType) -> Self {
        if dtype.is_numeric() {
            Self::Numeric
        } else {
            Self::Categorical
        }
    }
}

/// Returns true for Arrow integer types.
pub fn is_integral(dtype: &DataType) -> bool {
    dtype.is_integer()
}

/// Names of the numeric columns of `schema`, in schema order.
pub fn numeric_columns(schema: &SchemaRef) -> Vec<String> {
    schema
        .fields()
        .iter()
        .filter(|f| ColumnKind::of(f.data_type()) == ColumnKind::Numeric)
        .map(|f| f.name().clone())
        .collect()
}

/// Returns the named column of `batch` or a `ColumnNotFound` error.
pub fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    batch
        .column_by_name(name)
        .ok_or_else(|| Error::column_not_found(name))
}

/// Reads a numeric column as `f64`, keeping nulls.
///
/// # Errors
///
/// Returns an error if the column is missing or cannot be cast to Float64.
pub fn numeric_values(batch: &RecordBatch, name: &str) -> Result<Vec<Option<f64>>> {
    let array = column(batch, name)?;
    let floats = cast(array.as_ref(), &DataType::Float64)
        .map_err(|e| Error::transform(format!("Failed to cast '{name}' to Float64: {e}")))?;
    let floats = floats
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| Error::transform("Expected Float64Array after cast"))?;

    Ok(floats.iter().collect())
}

/// Reads any column through its UTF-8 rendering, keeping nulls.
///
/// # Errors
///
/// Returns an error if the column is missing or has no string rendering.
pub fn string_values(batch: &RecordBatch, name: &str) -> Result<Vec<Option<String>>> {
    let array = column(batch, name)?;
    let strings = cast(array.as_ref(), &DataType::Utf8)
        .map_err(|e| Error::transform(format!("Failed to cast '{name}' to Utf8: {e}")))?;
    let strings = strings
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| Error::transform("Expected StringArray after cast"))?;

    Ok(strings.iter().map(|v| v.map(str::to_string)).collect())
}

/// Reads a column as value-equality keys, keeping nulls.
///
/// Integer columns render exactly. Float columns render whole values the
/// way integers do, so `1` and `1.0` (and `0.0` and `-0.0`) share a key;
/// NaN becomes null. Categorical columns use their UTF-8 rendering.
///
/// # Errors
///
/// Returns an error if the column is missing or cannot be cast.
pub fn key_values(batch: &RecordBatch, name: &str) -> Result<Vec<Option<String>>> {
    let dtype = column(batch, name)?.data_type();
    if ColumnKind::of(dtype) == ColumnKind::Categorical || is_integral(dtype) {
        return string_values(batch, name);
    }

    Ok(numeric_values(batch, name)?
        .into_iter()
        .map(|v| v.and_then(numeric_key))
        .collect())
}

fn numeric_key(value: f64) -> Option<String> {
    const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

    if value.is_nan() {
        None
    } else if value.fract() == 0.0 && value.abs() < I64_BOUND {
        #[allow(clippy::cast_possible_truncation)]
        Some((value as i64).to_string())
    } else {
        Some(value.to_string())
    }
}

/// Builds a Float64 array from optional values.
pub fn float_array(values: Vec<Option<f64>>) -> ArrayRef {
    Arc::new(Float64Array::from(values))
}

/// Drops nulls and non-finite values.
pub fn present(values: &[Option<f64>]) -> Vec<f64> {
    values
        .iter()
        .flatten()
        .copied()
        .filter(|v| v.is_finite())
        .collect()
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator), `None` below two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// Median with the midpoint rule for even lengths.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Minimum and maximum, `None` for an empty slice.
pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    let first = *values.first()?;
    Some(
        values
            .iter()
            .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v))),
    )
}

#[cfg(test)]
mod tests {
    use arrow::{
        array::{Float64Array, Int64Array, StringArray},
        datatypes::{Field, Schema},
    };

    use super::*;

    fn batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("age", DataType::Int64, true),
            Field::new("location", DataType::Utf8, true),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(vec![Some(30), None, Some(47)])),
                Arc::new(StringArray::from(vec![Some("Delhi"), Some("Pune"), None])),
            ],
        )
        .unwrap_or_else(|e| panic!("batch: {e}"))
    }

    #[test]
    fn test_column_kind() {
        assert_eq!(ColumnKind::of(&DataType::Int32), ColumnKind::Numeric);
        assert_eq!(ColumnKind::of(&DataType::Float64), ColumnKind::Numeric);
        assert_eq!(ColumnKind::of(&DataType::Utf8), ColumnKind::Categorical);
        assert_eq!(ColumnKind::of(&DataType::Boolean), ColumnKind::Categorical);
        assert!(is_integral(&DataType::Int64));
        assert!(!is_integral(&DataType::Float32));
    }

    #[test]
    fn test_numeric_columns() {
        let b = batch();
        assert_eq!(numeric_columns(&b.schema()), vec!["age"]);
    }

    #[test]
    fn test_numeric_values_keep_nulls() {
        let values = numeric_values(&batch(), "age").unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(values, vec![Some(30.0), None, Some(47.0)]);
    }

    #[test]
    fn test_string_values_of_numeric_column() {
        let values = string_values(&batch(), "age").unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(values[0].as_deref(), Some("30"));
        assert_eq!(values[1], None);
    }

    #[test]
    fn test_missing_column() {
        assert!(matches!(
            numeric_values(&batch(), "income"),
            Err(Error::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn test_statistics() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&v), Some(5.0));
        assert_eq!(median(&v), Some(4.5));
        assert_eq!(min_max(&v), Some((2.0, 9.0)));
        let std = sample_std(&v).unwrap_or(0.0);
        assert!((std - 2.138_089_935).abs() < 1e-6);
    }

    #[test]
    fn test_statistics_degenerate() {
        assert_eq!(mean(&[]), None);
        assert_eq!(median(&[]), None);
        assert_eq!(min_max(&[]), None);
        assert_eq!(sample_std(&[3.0]), None);
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
    }

    #[test]
    fn test_present_drops_nulls_and_nan() {
        assert_eq!(present(&[Some(1.0), None, Some(f64::NAN), Some(2.0)]), vec![1.0, 2.0]);
    }

    #[test]
    fn test_key_values_compare_numbers_by_value() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("int_id", DataType::Int64, true),
            Field::new("float_id", DataType::Float64, true),
        ]));
        let b = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(vec![Some(1), Some(0), None, Some(-3)])),
                Arc::new(Float64Array::from(vec![
                    Some(1.0),
                    Some(-0.0),
                    Some(f64::NAN),
                    Some(3.5),
                ])),
            ],
        )
        .unwrap_or_else(|e| panic!("batch: {e}"));

        let ints = key_values(&b, "int_id").unwrap_or_else(|e| panic!("{e}"));
        let floats = key_values(&b, "float_id").unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(ints[0], floats[0]);
        assert_eq!(ints[1], floats[1]);
        assert_eq!(floats[1].as_deref(), Some("0"));
        assert_eq!(ints[2], None);
        assert_eq!(floats[2], None);
        assert_eq!(floats[3].as_deref(), Some("3.5"));
        assert_eq!(ints[3].as_deref(), Some("-3"));
    }

    #[test]
    fn test_key_values_of_categorical_column() {
        let keys = key_values(&batch(), "location").unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(keys, vec![Some("Delhi".to_string()), Some("Pune".to_string()), None]);
    }
}
