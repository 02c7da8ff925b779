//! Utility measurement: how much analytical value survives protection.
//!
//! - [`statistical_similarity`]: per-column mean shift and correlation
//! - [`MlTask`]: accuracy of a proxy classifier trained on each dataset
//! - [`comparison_artifact`]: histograms for a side-by-side view

mod comparison;
mod ml;
mod similarity;

use std::collections::BTreeMap;

pub use comparison::{comparison_artifact, ColumnHistogram, DistributionComparison, DEFAULT_BINS};
pub use ml::{split_indices, MlTask, MlUtility};
use serde::Serialize;
pub use similarity::{pearson, statistical_similarity, ColumnSimilarity};

use crate::{config::PipelineConfig, dataset::ArrowDataset, error::Result};

/// Similarity map plus the proxy-task result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UtilityReport {
    /// Per-column similarity, keyed by column name.
    pub statistical_similarity: BTreeMap<String, ColumnSimilarity>,
    /// Proxy classification result.
    pub ml_utility: MlUtility,
}

/// Runs the ML proxy task with default settings.
pub fn ml_utility(original: &ArrowDataset, protected: &ArrowDataset) -> MlUtility {
    MlTask::new().evaluate(original, protected)
}

/// Compares an original dataset with its protected version.
#[derive(Debug, Clone)]
pub struct UtilityMeasurer {
    identifier: String,
    task: MlTask,
}

impl Default for UtilityMeasurer {
    fn default() -> Self {
        Self {
            identifier: "id".to_string(),
            task: MlTask::new(),
        }
    }
}

impl UtilityMeasurer {
    /// Creates a measurer with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a measurer from the pipeline configuration.
    pub fn from_config(config: &PipelineConfig) -> Self {
        let identifier = config.risk_settings.identifier_column.clone();
        Self {
            task: MlTask::from_settings(&config.utility, &identifier),
            identifier,
        }
    }

    /// Sets the identifier column.
    #[must_use]
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self.task = self.task.with_identifier(self.identifier.clone());
        self
    }

    /// Replaces the proxy task.
    #[must_use]
    pub fn with_task(mut self, task: MlTask) -> Self {
        self.task = task;
        self
    }

    /// Builds the utility report.
    ///
    /// # Errors
    ///
    /// Returns an error if the similarity computation cannot read a column.
    /// The ML task never fails.
    pub fn report(&self, original: &ArrowDataset, protected: &ArrowDataset) -> Result<UtilityReport> {
        let statistical_similarity = statistical_similarity(original, protected, &self.identifier)?;
        let ml_utility = self.task.evaluate(original, protected);

        tracing::info!(
            columns = statistical_similarity.len(),
            original_accuracy = ml_utility.original_accuracy,
            protected_accuracy = ml_utility.protected_accuracy,
            "utility measured"
        );

        Ok(UtilityReport {
            statistical_similarity,
            ml_utility,
        })
    }

    /// Builds the distribution comparison.
    ///
    /// # Errors
    ///
    /// Returns an error if a column cannot be read.
    pub fn comparison(
        &self,
        original: &ArrowDataset,
        protected: &ArrowDataset,
    ) -> Result<DistributionComparison> {
        comparison_artifact(original, protected, &self.identifier, DEFAULT_BINS)
    }
}
