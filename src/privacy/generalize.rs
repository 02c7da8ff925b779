//! Generalization: coarsen column values so more records share them.

use std::{collections::BTreeMap, sync::Arc};

use arrow::{
    array::{ArrayRef, Float64Array, Int64Array, RecordBatch, StringArray},
    datatypes::{Field, Schema},
};
use serde::{Deserialize, Serialize};

use crate::{
    column::{self, ColumnKind},
    error::{Error, Result},
    transform::Transform,
};

/// Cities kept verbatim by the default location rule.
pub const MAJOR_CITIES: [&str; 4] = ["Mumbai", "Delhi", "Bangalore", "Chennai"];

/// How a single column is generalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum GeneralizationRule {
    /// Numeric values become `floor(v / width) * width`.
    FloorToMultiple {
        /// Bucket width, at least 1.
        width: u32,
    },
    /// Values outside `retained` become `other`.
    AllowList {
        /// Values kept as they are.
        retained: Vec<String>,
        /// Replacement for everything else.
        other: String,
    },
}

impl GeneralizationRule {
    /// `age` bucketed by decade, `location` collapsed to major cities.
    pub fn defaults() -> BTreeMap<String, Self> {
        BTreeMap::from([
            ("age".to_string(), Self::FloorToMultiple { width: 10 }),
            (
                "location".to_string(),
                Self::AllowList {
                    retained: MAJOR_CITIES.iter().map(|c| (*c).to_string()).collect(),
                    other: "Other".to_string(),
                },
            ),
        ])
    }

    /// Checks the rule parameters.
    ///
    /// # Errors
    ///
    /// Returns a message describing the invalid parameter.
    pub fn validate(&self) -> std::result::Result<(), String> {
        match self {
            Self::FloorToMultiple { width: 0 } => Err("width must be at least 1".to_string()),
            _ => Ok(()),
        }
    }

    fn apply(&self, batch: &RecordBatch, name: &str) -> Result<Option<ArrayRef>> {
        let array = column::column(batch, name)?;
        match self {
            Self::FloorToMultiple { width } => {
                if ColumnKind::of(array.data_type()) != ColumnKind::Numeric {
                    tracing::warn!(column = name, "cannot bucket a non-numeric column, skipped");
                    return Ok(None);
                }
                let values = column::numeric_values(batch, name)?;
                let width = f64::from(*width);
                let floored = values
                    .into_iter()
                    .map(|v| v.map(|v| (v / width).floor() * width));

                let array: ArrayRef = if column::is_integral(array.data_type()) {
                    #[allow(clippy::cast_possible_truncation)]
                    let ints: Int64Array = floored.map(|v| v.map(|v| v as i64)).collect();
                    Arc::new(ints)
                } else {
                    Arc::new(floored.collect::<Float64Array>())
                };
                Ok(Some(array))
            }
            Self::AllowList { retained, other } => {
                let values = column::string_values(batch, name)?;
                let mapped: StringArray = values
                    .into_iter()
                    .map(|v| {
                        v.map(|v| {
                            if retained.iter().any(|r| *r == v) {
                                v
                            } else {
                                other.clone()
                            }
                        })
                    })
                    .collect();
                Ok(Some(Arc::new(mapped)))
            }
        }
    }
}

/// Applies a [`GeneralizationRule`] to each configured column.
///
/// Rules naming absent columns are skipped. Nulls stay null.
#[derive(Debug, Clone)]
pub struct Generalize {
    rules: BTreeMap<String, GeneralizationRule>,
}

impl Generalize {
    /// Creates a generalization with the given rules.
    pub fn new(rules: BTreeMap<String, GeneralizationRule>) -> Self {
        Self { rules }
    }

    /// Creates a generalization with [`GeneralizationRule::defaults`].
    pub fn with_defaults() -> Self {
        Self::new(GeneralizationRule::defaults())
    }

    /// Columns bucketed by a [`GeneralizationRule::FloorToMultiple`] rule.
    pub fn bucketed_columns(&self) -> Vec<String> {
        self.rules
            .iter()
            .filter(|(_, rule)| matches!(rule, GeneralizationRule::FloorToMultiple { .. }))
            .map(|(name, _)| name.clone())
            .collect()
    }
}

impl Transform for Generalize {
    fn apply(&self, batch: RecordBatch) -> Result<RecordBatch> {
        for (column, rule) in &self.rules {
            rule.validate().map_err(|e| {
                Error::transform(format!("invalid generalization rule for '{column}': {e}"))
            })?;
        }

        let schema = batch.schema();
        let mut fields = Vec::with_capacity(schema.fields().len());
        let mut columns = Vec::with_capacity(schema.fields().len());

        for (field, array) in schema.fields().iter().zip(batch.columns()) {
            let generalized = match self.rules.get(field.name()) {
                Some(rule) => rule.apply(&batch, field.name())?,
                None => None,
            };
            match generalized {
                Some(array) => {
                    fields.push(Field::new(
                        field.name(),
                        array.data_type().clone(),
                        field.is_nullable(),
                    ));
                    columns.push(array);
                }
                None => {
                    fields.push(field.as_ref().clone());
                    columns.push(Arc::clone(array));
                }
            }
        }

        for name in self.rules.keys().filter(|n| schema.index_of(n).is_err()) {
            tracing::debug!(column = %name, "generalization rule for absent column skipped");
        }

        RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).map_err(Error::Arrow)
    }

    fn name(&self) -> &'static str {
        "generalize"
    }
}
