//! Pipeline configuration.
//!
//! Configuration is layered (highest priority last):
//! 1. Built-in defaults
//! 2. A YAML file (`config/config.yaml` by convention)
//! 3. Environment variables prefixed with `SAFEDATA_`, using `__` as the
//!    nesting separator (`SAFEDATA_PRIVACY__DIFFERENTIAL_PRIVACY__EPSILON=0.5`)
//!
//! The merged value is validated once by [`PipelineConfig::load`] and then
//! passed by reference to every stage.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    privacy::GeneralizationRule,
};

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "SAFEDATA_";

/// Complete configuration for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Input and output locations.
    pub data_settings: DataSettings,
    /// Risk assessment settings.
    pub risk_settings: RiskSettings,
    /// Disclosure-control transforms.
    pub privacy: PrivacySettings,
    /// Utility measurement settings.
    pub utility: UtilitySettings,
    /// Report output settings.
    pub output: OutputSettings,
}

/// Input and output file locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    /// Primary dataset.
    pub input_file: PathBuf,
    /// Optional ground-truth table for the linkage attack.
    pub ground_truth_file: Option<PathBuf>,
    /// Where the protected dataset is written.
    pub output_file: PathBuf,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            input_file: PathBuf::from("data/input.csv"),
            ground_truth_file: None,
            output_file: PathBuf::from("data/protected.csv"),
        }
    }
}

/// Risk assessment settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskSettings {
    /// Columns an attacker could know about a person.
    pub quasi_identifiers: Vec<String>,
    /// Column holding the record identifier.
    pub identifier_column: String,
}

impl Default for RiskSettings {
    fn default() -> Self {
        Self {
            quasi_identifiers: vec!["age".to_string(), "location".to_string()],
            identifier_column: "id".to_string(),
        }
    }
}

/// Disclosure-control settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivacySettings {
    /// Base seed for noise and synthetic sampling; entropy when absent.
    pub seed: Option<u64>,
    /// Generalization towards k-anonymity.
    pub k_anonymity: KAnonymitySettings,
    /// Laplace noise injection.
    pub differential_privacy: DifferentialPrivacySettings,
    /// Synthetic record generation.
    pub synthetic_data: SyntheticDataSettings,
}

/// Generalization settings.
///
/// `k_value` doubles as the risk threshold: equivalence groups smaller than
/// it are reported as risky.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KAnonymitySettings {
    /// Whether generalization runs.
    pub enabled: bool,
    /// Target minimum group size.
    pub k_value: usize,
    /// Generalization rule per column.
    pub generalizations: BTreeMap<String, GeneralizationRule>,
}

impl Default for KAnonymitySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            k_value: 5,
            generalizations: GeneralizationRule::defaults(),
        }
    }
}

/// Laplace noise settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifferentialPrivacySettings {
    /// Whether noise is injected.
    pub enabled: bool,
    /// Privacy parameter; smaller means more noise.
    pub epsilon: f64,
}

impl Default for DifferentialPrivacySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            epsilon: 1.0,
        }
    }
}

/// Synthetic generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticDataSettings {
    /// Whether the output is replaced by synthetic records.
    pub enabled: bool,
    /// Number of synthetic records.
    pub num_records: usize,
}

impl Default for SyntheticDataSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            num_records: 100,
        }
    }
}

/// Utility measurement settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UtilitySettings {
    /// Column binarised at its median for the proxy classification task.
    pub target_column: String,
    /// Held-out fraction for the proxy task.
    pub test_ratio: f64,
    /// Seed for the train/test shuffle.
    pub seed: u64,
    /// Minimum rows in each dataset for the proxy task.
    pub min_rows: usize,
}

impl Default for UtilitySettings {
    fn default() -> Self {
        Self {
            target_column: "income".to_string(),
            test_ratio: 0.3,
            seed: 42,
            min_rows: 5,
        }
    }
}

/// Report document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Standalone HTML page.
    Html,
    /// PDF document.
    Pdf,
    /// Machine-readable JSON.
    Json,
}

impl ReportFormat {
    /// File extension for the format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Pdf => "pdf",
            Self::Json => "json",
        }
    }
}

impl std::str::FromStr for ReportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "html" => Ok(Self::Html),
            "pdf" => Ok(Self::Pdf),
            "json" => Ok(Self::Json),
            other => Err(Error::invalid_config(format!(
                "unknown report format '{other}' (expected html, pdf or json)"
            ))),
        }
    }
}

/// Report output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Report document format.
    pub report_format: ReportFormat,
    /// Whether the distribution comparison artifact is produced.
    pub show_plots: bool,
    /// Directory receiving the report and artifacts.
    pub report_dir: PathBuf,
    /// Directory with LiberationSans TTF files for PDF output.
    pub font_dir: Option<PathBuf>,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            report_format: ReportFormat::Html,
            show_plots: true,
            report_dir: PathBuf::from("reports"),
            font_dir: None,
        }
    }
}

impl PipelineConfig {
    /// Loads configuration from defaults, an optional YAML file and the
    /// environment, then validates it.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file is missing, cannot be
    /// parsed, or holds invalid values.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(path) = path {
            if !path.exists() {
                return Err(Error::invalid_config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            figment = figment.merge(Yaml::file(path));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        Self::from_figment(&figment)
    }

    /// Parses and validates configuration from a YAML string (no
    /// environment layer).
    ///
    /// # Errors
    ///
    /// Returns a configuration error on malformed YAML or invalid values.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let figment =
            Figment::from(Serialized::defaults(Self::default())).merge(Yaml::string(yaml));
        Self::from_figment(&figment)
    }

    fn from_figment(figment: &Figment) -> Result<Self> {
        let config: Self = figment.extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// Renders the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| Error::invalid_config(e.to_string()))
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` describing the first offending key.
    pub fn validate(&self) -> Result<()> {
        if self
            .risk_settings
            .quasi_identifiers
            .iter()
            .any(|qi| qi.trim().is_empty())
        {
            return Err(Error::invalid_config(
                "risk_settings.quasi_identifiers must not contain empty names",
            ));
        }
        if self.risk_settings.identifier_column.trim().is_empty() {
            return Err(Error::invalid_config(
                "risk_settings.identifier_column must not be empty",
            ));
        }

        let privacy = &self.privacy;
        if privacy.k_anonymity.k_value == 0 {
            return Err(Error::invalid_config(
                "privacy.k_anonymity.k_value must be at least 1",
            ));
        }
        for (column, rule) in &privacy.k_anonymity.generalizations {
            rule.validate().map_err(|message| {
                Error::invalid_config(format!(
                    "privacy.k_anonymity.generalizations.{column}: {message}"
                ))
            })?;
        }
        let epsilon = privacy.differential_privacy.epsilon;
        if epsilon.is_nan() || epsilon <= 0.0 {
            return Err(Error::invalid_config(format!(
                "privacy.differential_privacy.epsilon must be positive, got {epsilon}"
            )));
        }
        if privacy.synthetic_data.enabled && privacy.synthetic_data.num_records == 0 {
            return Err(Error::invalid_config(
                "privacy.synthetic_data.num_records must be at least 1",
            ));
        }

        let utility = &self.utility;
        let ratio = utility.test_ratio;
        if ratio.is_nan() || ratio <= 0.0 || ratio >= 1.0 {
            return Err(Error::invalid_config(format!(
                "utility.test_ratio must be in (0, 1), got {ratio}"
            )));
        }
        if utility.min_rows < 2 {
            return Err(Error::invalid_config("utility.min_rows must be at least 2"));
        }
        if utility.target_column.trim().is_empty() {
            return Err(Error::invalid_config("utility.target_column must not be empty"));
        }

        Ok(())
    }
}
