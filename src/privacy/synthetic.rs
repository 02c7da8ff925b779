//! Synthetic record generation.
//!
//! Every column is resampled independently from the source batch, so
//! cross-column correlations are not preserved.

use std::sync::Arc;

use arrow::{
    array::{new_null_array, ArrayRef, Int64Array, RecordBatch, StringArray},
    compute::cast,
    datatypes::{DataType, Field, Schema},
};
use rand::{rngs::StdRng, seq::SliceRandom};
use rand_distr::{Distribution, Normal};

use super::noise::rng_from;
use crate::{
    column::{self, ColumnKind},
    error::{Error, Result},
    transform::Transform,
};

/// Replaces a batch with `num_records` synthetic rows.
///
/// - the identifier column is renumbered `1..=num_records`
/// - categorical columns are sampled uniformly, with replacement, from the
///   non-null source values
/// - numeric columns are drawn from a normal distribution with the source
///   mean and sample standard deviation, rounded for integer columns
#[derive(Debug, Clone)]
pub struct SyntheticGenerator {
    num_records: usize,
    identifier: String,
    seed: Option<u64>,
}

impl SyntheticGenerator {
    /// Creates a generator producing `num_records` rows.
    pub fn new(num_records: usize) -> Self {
        Self {
            num_records,
            identifier: "id".to_string(),
            seed: None,
        }
    }

    /// Sets the identifier column.
    #[must_use]
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    /// Fixes the random seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Number of rows produced.
    pub fn num_records(&self) -> usize {
        self.num_records
    }

    fn identifiers(&self) -> ArrayRef {
        #[allow(clippy::cast_possible_wrap)]
        let ids: Int64Array = (1..=self.num_records as i64).collect();
        Arc::new(ids)
    }

    fn categorical(
        &self,
        batch: &RecordBatch,
        field: &Field,
        rng: &mut StdRng,
    ) -> Result<ArrayRef> {
        let pool: Vec<String> = column::string_values(batch, field.name())?
            .into_iter()
            .flatten()
            .collect();
        if pool.is_empty() {
            return Ok(new_null_array(field.data_type(), self.num_records));
        }

        let sampled: StringArray = (0..self.num_records)
            .map(|_| pool.choose(rng).map(String::as_str))
            .collect();
        if field.data_type() == &DataType::Utf8 {
            return Ok(Arc::new(sampled));
        }
        cast(&sampled, field.data_type()).map_err(|e| {
            Error::transform(format!(
                "Failed to restore type of '{}': {e}",
                field.name()
            ))
        })
    }

    fn numeric(&self, batch: &RecordBatch, field: &Field, rng: &mut StdRng) -> Result<ArrayRef> {
        let values = column::present(&column::numeric_values(batch, field.name())?);
        let Some(mean) = column::mean(&values) else {
            return Ok(new_null_array(field.data_type(), self.num_records));
        };
        let std = column::sample_std(&values).unwrap_or(0.0);
        let normal = Normal::new(mean, std).map_err(|e| {
            Error::transform(format!(
                "Invalid distribution for '{}' (mean {mean}, std {std}): {e}",
                field.name()
            ))
        })?;

        let draws = (0..self.num_records).map(|_| normal.sample(rng));
        if column::is_integral(field.data_type()) {
            #[allow(clippy::cast_possible_truncation)]
            let ints: Int64Array = draws.map(|v| v.round() as i64).collect();
            Ok(Arc::new(ints))
        } else {
            Ok(column::float_array(draws.map(Some).collect()))
        }
    }
}

impl Transform for SyntheticGenerator {
    fn apply(&self, batch: RecordBatch) -> Result<RecordBatch> {
        let mut rng = rng_from(self.seed);
        let schema = batch.schema();
        let mut fields = Vec::with_capacity(schema.fields().len());
        let mut columns = Vec::with_capacity(schema.fields().len());

        for field in schema.fields() {
            let array = if *field.name() == self.identifier {
                self.identifiers()
            } else {
                match ColumnKind::of(field.data_type()) {
                    ColumnKind::Categorical => self.categorical(&batch, field, &mut rng)?,
                    ColumnKind::Numeric => self.numeric(&batch, field, &mut rng)?,
                }
            };
            fields.push(Field::new(field.name(), array.data_type().clone(), true));
            columns.push(array);
        }

        tracing::debug!(rows = self.num_records, "synthetic records generated");
        RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).map_err(Error::Arrow)
    }

    fn name(&self) -> &'static str {
        "synthetic"
    }
}
