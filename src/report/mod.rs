//! Report rendering.
//!
//! The core hands over a [`RiskReport`] and a [`UtilityReport`]; renderers
//! turn them into documents. Rendering is a presentation step: the pipeline
//! logs a failed render and carries on.

mod comparison;
mod html;
mod json;
#[cfg(feature = "pdf")]
mod pdf;

use std::path::{Path, PathBuf};

pub use comparison::{ComparisonRenderer, CsvComparisonRenderer};
pub use html::HtmlRenderer;
pub use json::JsonRenderer;
#[cfg(feature = "pdf")]
pub use pdf::PdfRenderer;

use crate::{
    config::{OutputSettings, ReportFormat},
    error::{Error, Result},
    risk::RiskReport,
    utility::UtilityReport,
};

/// Title shown at the top of every report.
pub const REPORT_TITLE: &str = "SafeData Privacy-Utility Report";

/// Turns the two reports into a document.
pub trait ReportRenderer {
    /// Format produced by this renderer.
    fn format(&self) -> ReportFormat;

    /// Writes the document into `out_dir` and returns its path.
    ///
    /// `comparison` is the distribution comparison artifact, if one was
    /// produced.
    ///
    /// # Errors
    ///
    /// Returns a render error if the document cannot be produced.
    fn render(
        &self,
        risk: &RiskReport,
        utility: &UtilityReport,
        comparison: Option<&Path>,
        out_dir: &Path,
    ) -> Result<PathBuf>;
}

/// Picks the renderer for `format`.
///
/// Without the `pdf` feature, PDF requests fall back to HTML.
pub fn renderer_for(format: ReportFormat, output: &OutputSettings) -> Box<dyn ReportRenderer> {
    match format {
        ReportFormat::Html => Box::new(HtmlRenderer),
        ReportFormat::Json => Box::new(JsonRenderer),
        #[cfg(feature = "pdf")]
        ReportFormat::Pdf => Box::new(PdfRenderer::new(output.font_dir.clone())),
        #[cfg(not(feature = "pdf"))]
        ReportFormat::Pdf => {
            let _ = output;
            tracing::warn!("built without PDF support, writing HTML instead");
            Box::new(HtmlRenderer)
        }
    }
}

/// Labelled lines of the risk section.
pub(crate) fn risk_lines(risk: &RiskReport) -> Vec<(String, String)> {
    vec![
        (
            "k_anonymity".to_string(),
            format!("k = {} ({})", risk.k_anonymity.value, risk.k_anonymity.detail),
        ),
        (
            "linkage_attack".to_string(),
            risk.linkage_attack.detail.clone(),
        ),
        (
            "prosecutor_risk".to_string(),
            risk.prosecutor_risk.detail.clone(),
        ),
        (
            "journalist_risk".to_string(),
            risk.journalist_risk.detail.clone(),
        ),
    ]
}

/// Labelled lines of the utility section.
pub(crate) fn utility_lines(utility: &UtilityReport) -> Vec<(String, String)> {
    let mut lines: Vec<(String, String)> = utility
        .statistical_similarity
        .iter()
        .map(|(column, s)| {
            (
                column.clone(),
                format!(
                    "mean_diff={:.3}, corr={:.3}",
                    s.mean_difference, s.correlation
                ),
            )
        })
        .collect();

    let ml = &utility.ml_utility;
    let mut accuracy = format!(
        "orig={:.3}, prot={:.3}, loss={:.3}",
        ml.original_accuracy, ml.protected_accuracy, ml.accuracy_loss
    );
    if let Some(note) = &ml.note {
        accuracy.push_str(&format!(" ({note})"));
    }
    lines.push(("ML Accuracy".to_string(), accuracy));
    lines
}

/// Creates `out_dir` and returns the path of `file_name` inside it.
pub(crate) fn output_path(out_dir: &Path, file_name: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(out_dir)
        .map_err(|e| Error::render(format!("cannot create {}: {e}", out_dir.display())))?;
    Ok(out_dir.join(file_name))
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::{
        dataset::ArrowDataset,
        risk::{RiskAssessor, RiskReport},
        utility::{UtilityMeasurer, UtilityReport},
    };

    pub fn reports() -> (RiskReport, UtilityReport) {
        let data = ArrowDataset::from_csv_str(
            "id,age,location,income\n1,20,Delhi,100\n2,20,Delhi,200\n3,40,Pune,300\n",
        )
        .unwrap_or_else(|e| panic!("{e}"));
        let risk = RiskAssessor::new(["age", "location"])
            .assess(&data, Some(&data))
            .unwrap_or_else(|e| panic!("{e}"));
        let utility = UtilityMeasurer::new()
            .report(&data, &data)
            .unwrap_or_else(|e| panic!("{e}"));
        (risk, utility)
    }
}
