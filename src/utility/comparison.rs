//! Side-by-side distribution comparison of numeric columns.

#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use serde::Serialize;

use crate::{
    column::{self, ColumnKind},
    dataset::{ArrowDataset, Dataset},
    error::Result,
};

/// Default number of histogram bins.
pub const DEFAULT_BINS: usize = 10;

/// Histograms of one column over shared bin edges.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnHistogram {
    /// Column name.
    pub column: String,
    /// Bin edges, one more than the number of bins.
    pub edges: Vec<f64>,
    /// Original counts per bin.
    pub original: Vec<usize>,
    /// Protected counts per bin.
    pub protected: Vec<usize>,
}

/// Histograms for every compared column.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DistributionComparison {
    /// One entry per numeric column, in schema order.
    pub columns: Vec<ColumnHistogram>,
}

impl DistributionComparison {
    /// Returns true if no column could be compared.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Builds histograms for the numeric columns of `original` (except
/// `identifier`) that are numeric in `protected` too.
///
/// # Errors
///
/// Returns an error if the batches cannot be concatenated or cast.
pub fn comparison_artifact(
    original: &ArrowDataset,
    protected: &ArrowDataset,
    identifier: &str,
    bins: usize,
) -> Result<DistributionComparison> {
    let original_batch = original.to_single_batch()?;
    let protected_batch = protected.to_single_batch()?;
    let protected_schema = protected.schema();
    let bins = bins.max(1);

    let mut columns = Vec::new();
    for name in column::numeric_columns(&original.schema()) {
        let comparable = name != identifier
            && protected_schema
                .field_with_name(&name)
                .is_ok_and(|f| ColumnKind::of(f.data_type()) == ColumnKind::Numeric);
        if !comparable {
            continue;
        }

        let a = column::present(&column::numeric_values(&original_batch, &name)?);
        let b = column::present(&column::numeric_values(&protected_batch, &name)?);
        if let Some(histogram) = histogram(&name, &a, &b, bins) {
            columns.push(histogram);
        }
    }

    Ok(DistributionComparison { columns })
}

/// Bins both samples over their combined range. `None` when both are empty.
fn histogram(name: &str, original: &[f64], protected: &[f64], bins: usize) -> Option<ColumnHistogram> {
    let all: Vec<f64> = original.iter().chain(protected).copied().collect();
    let (min, max) = column::min_max(&all)?;

    if (max - min).abs() < f64::EPSILON {
        return Some(ColumnHistogram {
            column: name.to_string(),
            edges: vec![min, max],
            original: vec![original.len()],
            protected: vec![protected.len()],
        });
    }

    let width = (max - min) / bins as f64;
    let bin_of = |v: f64| (((v - min) / width).floor() as usize).min(bins - 1);

    let mut original_counts = vec![0usize; bins];
    let mut protected_counts = vec![0usize; bins];
    for &v in original {
        original_counts[bin_of(v)] += 1;
    }
    for &v in protected {
        protected_counts[bin_of(v)] += 1;
    }

    Some(ColumnHistogram {
        column: name.to_string(),
        edges: (0..=bins).map(|i| min + width * i as f64).collect(),
        original: original_counts,
        protected: protected_counts,
    })
}
