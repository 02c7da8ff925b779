//! Laplace noise injection.
//!
//! Every numeric column except the identifier gets independent noise drawn
//! from `Laplace(0, (max - min) / epsilon)`. Laplace samples are produced as
//! the difference of two exponential variates.

use std::sync::Arc;

use arrow::{
    array::RecordBatch,
    datatypes::{DataType, Field, Schema},
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Distribution, Exp};

use crate::{
    column::{self, ColumnKind},
    error::{Error, Result},
    transform::Transform,
};

/// Adds Laplace noise scaled to each column's range.
///
/// Constant and all-null columns are left untouched. Columns whose original
/// minimum is non-negative are clamped at zero after noising. Noised columns
/// become `Float64`.
#[derive(Debug, Clone)]
pub struct LaplaceNoise {
    epsilon: f64,
    identifier: String,
    exclude: Vec<String>,
    seed: Option<u64>,
}

impl LaplaceNoise {
    /// Creates a noise transform with the given privacy parameter.
    pub fn new(epsilon: f64) -> Self {
        Self {
            epsilon,
            identifier: "id".to_string(),
            exclude: Vec::new(),
            seed: None,
        }
    }

    /// Sets the identifier column, which never receives noise.
    #[must_use]
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    /// Excludes additional columns from noise.
    #[must_use]
    pub fn with_exclude(mut self, columns: impl IntoIterator<Item = String>) -> Self {
        self.exclude.extend(columns);
        self
    }

    /// Fixes the random seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Privacy parameter.
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    fn skips(&self, name: &str) -> bool {
        name == self.identifier || self.exclude.iter().any(|c| c == name)
    }
}

/// Draws one `Laplace(0, scale)` sample from `exp = Exp(1 / scale)`.
pub fn laplace<R: Rng + ?Sized>(rng: &mut R, exp: &Exp<f64>) -> f64 {
    exp.sample(rng) - exp.sample(rng)
}

pub(crate) fn rng_from(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

impl Transform for LaplaceNoise {
    fn apply(&self, batch: RecordBatch) -> Result<RecordBatch> {
        if self.epsilon.is_nan() || self.epsilon <= 0.0 {
            return Err(Error::transform(format!(
                "epsilon must be positive, got {}",
                self.epsilon
            )));
        }

        let mut rng = rng_from(self.seed);
        let schema = batch.schema();
        let mut fields = Vec::with_capacity(schema.fields().len());
        let mut columns = Vec::with_capacity(schema.fields().len());

        for (field, array) in schema.fields().iter().zip(batch.columns()) {
            let name = field.name();
            let keep = || (field.as_ref().clone(), Arc::clone(array));

            if ColumnKind::of(field.data_type()) != ColumnKind::Numeric || self.skips(name) {
                let (f, a) = keep();
                fields.push(f);
                columns.push(a);
                continue;
            }

            let values = column::numeric_values(&batch, name)?;
            let Some((min, max)) = column::min_max(&column::present(&values)) else {
                tracing::debug!(column = %name, "all-null column, no noise");
                let (f, a) = keep();
                fields.push(f);
                columns.push(a);
                continue;
            };

            let scale = (max - min) / self.epsilon;
            if !(scale > 0.0 && scale.is_finite()) {
                tracing::debug!(column = %name, "zero sensitivity, no noise");
                let (f, a) = keep();
                fields.push(f);
                columns.push(a);
                continue;
            }

            let exp = Exp::new(1.0 / scale)
                .map_err(|e| Error::transform(format!("invalid noise scale {scale}: {e}")))?;
            let clamp = min >= 0.0;
            let noised = values
                .into_iter()
                .map(|v| {
                    v.map(|v| {
                        let noisy = v + laplace(&mut rng, &exp);
                        if clamp {
                            noisy.max(0.0)
                        } else {
                            noisy
                        }
                    })
                })
                .collect();

            tracing::debug!(column = %name, scale, "laplace noise added");
            fields.push(Field::new(name, DataType::Float64, field.is_nullable()));
            columns.push(column::float_array(noised));
        }

        RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).map_err(Error::Arrow)
    }

    fn name(&self) -> &'static str {
        "laplace_noise"
    }
}
