//! PDF report rendered with `genpdf`.

use std::path::{Path, PathBuf};

use genpdf::{
    elements::{Break, Paragraph},
    fonts::{self, FontData, FontFamily},
    style::{Style, StyledString},
    Document, SimplePageDecorator,
};

use super::{output_path, risk_lines, utility_lines, ReportRenderer, REPORT_TITLE};
use crate::{
    config::ReportFormat,
    error::{Error, Result},
    risk::RiskReport,
    utility::UtilityReport,
};

/// Directories searched for `LiberationSans-*.ttf` when none is configured.
const FONT_DIRS: [&str; 3] = [
    "fonts",
    "/usr/share/fonts/truetype/liberation",
    "/usr/share/fonts/liberation",
];

/// Writes `report.pdf`.
#[derive(Debug, Clone, Default)]
pub struct PdfRenderer {
    font_dir: Option<PathBuf>,
}

impl PdfRenderer {
    /// Creates a renderer, optionally with a font directory searched first.
    pub fn new(font_dir: Option<PathBuf>) -> Self {
        Self { font_dir }
    }

    fn font_family(&self) -> Result<FontFamily<FontData>> {
        let configured = self.font_dir.iter().map(PathBuf::as_path);
        let defaults = FONT_DIRS.iter().map(Path::new);

        let mut last_error = None;
        for dir in configured.chain(defaults) {
            match fonts::from_files(dir, "LiberationSans", None) {
                Ok(family) => return Ok(family),
                Err(e) => last_error = Some(format!("{}: {e}", dir.display())),
            }
        }
        Err(Error::render(format!(
            "no LiberationSans font found ({})",
            last_error.unwrap_or_default()
        )))
    }
}

impl ReportRenderer for PdfRenderer {
    fn format(&self) -> ReportFormat {
        ReportFormat::Pdf
    }

    fn render(
        &self,
        risk: &RiskReport,
        utility: &UtilityReport,
        comparison: Option<&Path>,
        out_dir: &Path,
    ) -> Result<PathBuf> {
        let mut doc = Document::new(self.font_family()?);
        doc.set_title(REPORT_TITLE);

        let mut decorator = SimplePageDecorator::new();
        decorator.set_margins(15);
        doc.set_page_decorator(decorator);

        doc.push(Paragraph::new(StyledString::new(
            REPORT_TITLE.to_string(),
            Style::new().bold().with_font_size(16),
        )));
        doc.push(Break::new(1));

        let heading = Style::new().bold().with_font_size(12);
        for (title, lines) in [
            ("Risk Assessment:", risk_lines(risk)),
            ("Utility Measurement:", utility_lines(utility)),
        ] {
            doc.push(Paragraph::new(StyledString::new(title.to_string(), heading)));
            for (label, value) in lines {
                doc.push(Paragraph::new(format!("{label}: {value}")));
            }
            doc.push(Break::new(0.5));
        }

        if let Some(path) = comparison {
            doc.push(Paragraph::new(format!(
                "Distribution comparison: {}",
                path.display()
            )));
        }

        let path = output_path(out_dir, "report.pdf")?;
        doc.render_to_file(&path)
            .map_err(|e| Error::render(format!("failed to render PDF: {e}")))?;
        Ok(path)
    }
}
