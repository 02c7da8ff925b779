//! Per-column statistical similarity between original and protected data.

#![allow(clippy::cast_precision_loss)]

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    column::{self, ColumnKind},
    dataset::{ArrowDataset, Dataset},
    error::Result,
};

/// Similarity of one numeric column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColumnSimilarity {
    /// `|original_mean - protected_mean| / |original_mean|`, 0 when the
    /// original mean is 0.
    pub mean_difference: f64,
    /// Pearson correlation of the two columns row by row, 0 when undefined.
    pub correlation: f64,
    /// Mean of the original column.
    pub original_mean: f64,
    /// Mean of the protected column.
    pub protected_mean: f64,
}

/// Compares every numeric column of `original` (except `identifier`) that is
/// also numeric in `protected`.
///
/// Correlation is only computed when both datasets have the same number of
/// rows. Columns with no values in either dataset are skipped.
///
/// # Errors
///
/// Returns an error if the batches cannot be concatenated or cast.
pub fn statistical_similarity(
    original: &ArrowDataset,
    protected: &ArrowDataset,
    identifier: &str,
) -> Result<BTreeMap<String, ColumnSimilarity>> {
    let original_batch = original.to_single_batch()?;
    let protected_batch = protected.to_single_batch()?;
    let protected_schema = protected.schema();
    let same_length = original.len() == protected.len();

    let mut results = BTreeMap::new();
    for name in column::numeric_columns(&original.schema()) {
        if name == identifier {
            continue;
        }
        let numeric_in_protected = protected_schema
            .field_with_name(&name)
            .is_ok_and(|f| ColumnKind::of(f.data_type()) == ColumnKind::Numeric);
        if !numeric_in_protected {
            tracing::debug!(column = %name, "not numeric in protected data, skipped");
            continue;
        }

        let a = column::numeric_values(&original_batch, &name)?;
        let b = column::numeric_values(&protected_batch, &name)?;
        let (Some(original_mean), Some(protected_mean)) = (
            column::mean(&column::present(&a)),
            column::mean(&column::present(&b)),
        ) else {
            tracing::debug!(column = %name, "no values to compare, skipped");
            continue;
        };

        let mean_difference = if original_mean == 0.0 {
            0.0
        } else {
            (original_mean - protected_mean).abs() / original_mean.abs()
        };
        let correlation = if same_length { pearson(&a, &b) } else { 0.0 };

        results.insert(
            name,
            ColumnSimilarity {
                mean_difference,
                correlation,
                original_mean,
                protected_mean,
            },
        );
    }

    Ok(results)
}

/// Pearson correlation over the rows where both values are present.
///
/// Returns 0 for fewer than two pairs, zero variance, or a non-finite result.
pub fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> f64 {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| match (x, y) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some((*x, *y)),
            _ => None,
        })
        .collect();
    if pairs.len() < 2 {
        return 0.0;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let r = cov / (var_x * var_y).sqrt();
    if r.is_finite() {
        r.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}
