//! Rendering of the distribution comparison artifact.

use std::{
    fs::File,
    path::{Path, PathBuf},
    sync::Arc,
};

use arrow::{
    array::{Float64Array, RecordBatch, StringArray, UInt64Array},
    datatypes::{DataType, Field, Schema},
};

use super::output_path;
use crate::{
    error::{Error, Result},
    utility::DistributionComparison,
};

/// Turns a [`DistributionComparison`] into a file.
pub trait ComparisonRenderer {
    /// Writes the artifact into `out_dir` and returns its path.
    ///
    /// # Errors
    ///
    /// Returns a render error if the artifact cannot be written.
    fn render(&self, comparison: &DistributionComparison, out_dir: &Path) -> Result<PathBuf>;
}

/// Writes `comparison.csv` with one row per column and bin.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvComparisonRenderer;

impl CsvComparisonRenderer {
    /// Flattens the histograms into a table.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch cannot be assembled.
    pub fn to_batch(&self, comparison: &DistributionComparison) -> Result<RecordBatch> {
        let mut columns = Vec::new();
        let mut bins = Vec::new();
        let mut lower = Vec::new();
        let mut upper = Vec::new();
        let mut original = Vec::new();
        let mut protected = Vec::new();

        for histogram in &comparison.columns {
            for (i, (&o, &p)) in histogram
                .original
                .iter()
                .zip(&histogram.protected)
                .enumerate()
            {
                columns.push(histogram.column.clone());
                bins.push(i as u64);
                lower.push(histogram.edges.get(i).copied());
                upper.push(histogram.edges.get(i + 1).copied());
                original.push(o as u64);
                protected.push(p as u64);
            }
        }

        let schema = Arc::new(Schema::new(vec![
            Field::new("column", DataType::Utf8, false),
            Field::new("bin", DataType::UInt64, false),
            Field::new("lower", DataType::Float64, true),
            Field::new("upper", DataType::Float64, true),
            Field::new("original", DataType::UInt64, false),
            Field::new("protected", DataType::UInt64, false),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(columns)),
                Arc::new(UInt64Array::from(bins)),
                Arc::new(Float64Array::from(lower)),
                Arc::new(Float64Array::from(upper)),
                Arc::new(UInt64Array::from(original)),
                Arc::new(UInt64Array::from(protected)),
            ],
        )
        .map_err(Error::Arrow)
    }
}

impl ComparisonRenderer for CsvComparisonRenderer {
    fn render(&self, comparison: &DistributionComparison, out_dir: &Path) -> Result<PathBuf> {
        if comparison.is_empty() {
            return Err(Error::render("no numeric columns to compare"));
        }

        let batch = self.to_batch(comparison)?;
        let path = output_path(out_dir, "comparison.csv")?;
        let file = File::create(&path)
            .map_err(|e| Error::render(format!("cannot create {}: {e}", path.display())))?;

        let mut writer = arrow_csv::WriterBuilder::new().with_header(true).build(file);
        writer
            .write(&batch)
            .map_err(|e| Error::render(format!("cannot write {}: {e}", path.display())))?;
        Ok(path)
    }
}
