//! Machine-readable JSON report.

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::{output_path, ReportRenderer, REPORT_TITLE};
use crate::{
    config::ReportFormat,
    error::{Error, Result},
    risk::RiskReport,
    utility::UtilityReport,
};

/// Writes `report.json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

#[derive(Serialize)]
struct Document<'a> {
    title: &'a str,
    risk: &'a RiskReport,
    utility: &'a UtilityReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    comparison_artifact: Option<&'a Path>,
}

impl JsonRenderer {
    /// Serializes both reports into one pretty-printed JSON document.
    ///
    /// # Errors
    ///
    /// Returns a render error if serialization fails.
    pub fn document(
        &self,
        risk: &RiskReport,
        utility: &UtilityReport,
        comparison: Option<&Path>,
    ) -> Result<String> {
        serde_json::to_string_pretty(&Document {
            title: REPORT_TITLE,
            risk,
            utility,
            comparison_artifact: comparison,
        })
        .map_err(|e| Error::render(format!("cannot serialize report: {e}")))
    }
}

impl ReportRenderer for JsonRenderer {
    fn format(&self) -> ReportFormat {
        ReportFormat::Json
    }

    fn render(
        &self,
        risk: &RiskReport,
        utility: &UtilityReport,
        comparison: Option<&Path>,
        out_dir: &Path,
    ) -> Result<PathBuf> {
        let path = output_path(out_dir, "report.json")?;
        std::fs::write(&path, self.document(risk, utility, comparison)?)
            .map_err(|e| Error::render(format!("cannot write {}: {e}", path.display())))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::test_support::reports;

    #[test]
    fn test_document_shape() {
        let (risk, utility) = reports();
        let text = JsonRenderer
            .document(&risk, &utility, None)
            .unwrap_or_else(|e| panic!("{e}"));
        let json: serde_json::Value = serde_json::from_str(&text).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(json["title"], REPORT_TITLE);
        assert_eq!(json["risk"]["k_anonymity"]["value"], 1);
        assert!(json["utility"]["statistical_similarity"]["income"].is_object());
        assert!(json.get("comparison_artifact").is_none());
    }

    #[test]
    fn test_render_writes_file() {
        let (risk, utility) = reports();
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        let path = JsonRenderer
            .render(&risk, &utility, Some(Path::new("comparison.csv")), dir.path())
            .unwrap_or_else(|e| panic!("{e}"));
        let text = std::fs::read_to_string(path).unwrap_or_else(|e| panic!("{e}"));
        assert!(text.contains("\"comparison_artifact\": \"comparison.csv\""));
    }
}
