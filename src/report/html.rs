//! Standalone HTML report.

use std::{
    fmt::Write,
    path::{Path, PathBuf},
};

use super::{output_path, risk_lines, utility_lines, ReportRenderer, REPORT_TITLE};
use crate::{
    config::ReportFormat,
    error::{Error, Result},
    risk::RiskReport,
    utility::UtilityReport,
};

/// Writes `report.html`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

impl HtmlRenderer {
    /// Builds the HTML document.
    pub fn document(
        &self,
        risk: &RiskReport,
        utility: &UtilityReport,
        comparison: Option<&Path>,
    ) -> String {
        let mut html = String::new();
        let _ = writeln!(
            html,
            "<html><head><meta charset=\"utf-8\"><title>Privacy-Utility Report</title></head><body>"
        );
        let _ = writeln!(html, "<h1>{}</h1>", escape(REPORT_TITLE));

        section(&mut html, "Risk Assessment", &risk_lines(risk));
        section(&mut html, "Utility Measurement", &utility_lines(utility));

        if let Some(path) = comparison {
            let name = path
                .file_name()
                .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
            let _ = writeln!(html, "<h2>Distribution Comparison</h2>");
            let _ = writeln!(
                html,
                "<p><a href=\"{0}\">{0}</a></p>",
                escape(&name)
            );
        }

        html.push_str("</body></html>\n");
        html
    }
}

fn section(html: &mut String, title: &str, lines: &[(String, String)]) {
    let _ = writeln!(html, "<h2>{}</h2><ul>", escape(title));
    for (label, value) in lines {
        let _ = writeln!(
            html,
            "<li><strong>{}:</strong> {}</li>",
            escape(label),
            escape(value)
        );
    }
    html.push_str("</ul>\n");
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

impl ReportRenderer for HtmlRenderer {
    fn format(&self) -> ReportFormat {
        ReportFormat::Html
    }

    fn render(
        &self,
        risk: &RiskReport,
        utility: &UtilityReport,
        comparison: Option<&Path>,
        out_dir: &Path,
    ) -> Result<PathBuf> {
        let path = output_path(out_dir, "report.html")?;
        std::fs::write(&path, self.document(risk, utility, comparison))
            .map_err(|e| Error::render(format!("cannot write {}: {e}", path.display())))?;
        Ok(path)
    }
}
