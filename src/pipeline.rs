//! End-to-end run: load, assess, protect, measure, report.

use std::path::PathBuf;

use crate::{
    config::PipelineConfig,
    dataset::{ArrowDataset, Dataset},
    error::Result,
    privacy::PrivacyEnhancer,
    report::{renderer_for, ComparisonRenderer, CsvComparisonRenderer},
    risk::{self, RiskAssessor, RiskReport},
    utility::{UtilityMeasurer, UtilityReport},
};

/// Everything a pipeline run produced.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// Risk of the original dataset.
    pub risk: RiskReport,
    /// Utility of the protected dataset relative to the original.
    pub utility: UtilityReport,
    /// The protected dataset.
    pub protected: ArrowDataset,
    /// Where the protected dataset was written.
    pub protected_path: PathBuf,
    /// Distribution comparison artifact, if produced.
    pub comparison_path: Option<PathBuf>,
    /// Rendered report, if rendering succeeded.
    pub report_path: Option<PathBuf>,
}

/// The configured risk, privacy and utility stages.
pub struct Pipeline<'a> {
    config: &'a PipelineConfig,
}

impl<'a> Pipeline<'a> {
    /// Creates a pipeline over a validated configuration.
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    /// Runs every stage.
    ///
    /// Loading, assessment, protection and utility errors abort the run.
    /// Comparison and report rendering failures are logged and leave the
    /// corresponding path empty.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error.
    pub fn run(&self) -> Result<PipelineOutcome> {
        let settings = &self.config.data_settings;
        let (original, ground_truth) =
            risk::load(&settings.input_file, settings.ground_truth_file.as_deref())?;

        self.run_on(&original, ground_truth.as_ref())
    }

    /// Runs every stage on already loaded data.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error.
    pub fn run_on(
        &self,
        original: &ArrowDataset,
        ground_truth: Option<&ArrowDataset>,
    ) -> Result<PipelineOutcome> {
        let config = self.config;

        tracing::info!("step 1: risk assessment");
        let risk = RiskAssessor::from_settings(
            &config.risk_settings,
            config.privacy.k_anonymity.k_value,
        )
        .assess(original, ground_truth)?;

        tracing::info!("step 2: privacy enhancement");
        let protected = PrivacyEnhancer::from_config(config).enhance(original)?;
        let protected_path = config.data_settings.output_file.clone();
        protected.save(&protected_path)?;
        tracing::info!(path = %protected_path.display(), rows = protected.len(), "protected data written");

        tracing::info!("step 3: utility measurement");
        let measurer = UtilityMeasurer::from_config(config);
        let utility = measurer.report(original, &protected)?;

        let output = &config.output;
        let comparison_path = if output.show_plots {
            measurer
                .comparison(original, &protected)
                .and_then(|c| CsvComparisonRenderer.render(&c, &output.report_dir))
                .map_err(|e| tracing::warn!(error = %e, "comparison artifact skipped"))
                .ok()
        } else {
            None
        };

        tracing::info!("step 4: reporting");
        let report_path = renderer_for(output.report_format, output)
            .render(&risk, &utility, comparison_path.as_deref(), &output.report_dir)
            .map_err(|e| tracing::warn!(error = %e, "report rendering failed"))
            .ok();
        if let Some(path) = &report_path {
            tracing::info!(path = %path.display(), "report generated");
        }

        Ok(PipelineOutcome {
            risk,
            utility,
            protected,
            protected_path,
            comparison_path,
            report_path,
        })
    }
}
