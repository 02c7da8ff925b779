//! Disclosure control: generalization, noise injection and synthetic data.
//!
//! The three stages are independent [`Transform`]s. [`PrivacyEnhancer`]
//! runs the enabled ones in the order generalization, noise. Synthetic
//! generation resamples from the original dataset and replaces the other
//! two stages when enabled.
//!
//! # Example
//!
//! ```ignore
//! use safedata::privacy::{Generalize, LaplaceNoise, PrivacyEnhancer};
//!
//! let enhancer = PrivacyEnhancer::new()
//!     .with_generalization(Generalize::with_defaults())
//!     .with_noise(LaplaceNoise::new(1.0).with_seed(42));
//! let protected = enhancer.enhance(&dataset)?;
//! ```

mod generalize;
mod noise;
mod synthetic;

pub use generalize::{Generalize, GeneralizationRule, MAJOR_CITIES};
pub use noise::{laplace, LaplaceNoise};
pub use synthetic::SyntheticGenerator;

use crate::{
    config::PipelineConfig,
    dataset::{ArrowDataset, Dataset},
    error::Result,
    transform::{Chain, Transform},
};

/// Runs the enabled disclosure-control stages.
#[derive(Debug, Clone, Default)]
pub struct PrivacyEnhancer {
    generalize: Option<Generalize>,
    noise: Option<LaplaceNoise>,
    synthetic: Option<SyntheticGenerator>,
}

impl PrivacyEnhancer {
    /// Creates an enhancer with no stage enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the enhancer described by `config`.
    ///
    /// With a base seed, noise uses `seed` and synthetic generation uses
    /// `seed + 1`. When generalization and noise are both enabled, columns
    /// bucketed by generalization are excluded from noise.
    pub fn from_config(config: &PipelineConfig) -> Self {
        let privacy = &config.privacy;
        let identifier = &config.risk_settings.identifier_column;
        let mut enhancer = Self::new();

        if privacy.k_anonymity.enabled {
            enhancer = enhancer.with_generalization(Generalize::new(
                privacy.k_anonymity.generalizations.clone(),
            ));
        }

        if privacy.differential_privacy.enabled {
            let mut noise = LaplaceNoise::new(privacy.differential_privacy.epsilon)
                .with_identifier(identifier.clone());
            if let Some(seed) = privacy.seed {
                noise = noise.with_seed(seed);
            }
            enhancer = enhancer.with_noise(noise);
        }

        if privacy.synthetic_data.enabled {
            let mut synthetic = SyntheticGenerator::new(privacy.synthetic_data.num_records)
                .with_identifier(identifier.clone());
            if let Some(seed) = privacy.seed {
                synthetic = synthetic.with_seed(seed.wrapping_add(1));
            }
            enhancer = enhancer.with_synthetic(synthetic);
        }

        enhancer
    }

    /// Enables generalization.
    #[must_use]
    pub fn with_generalization(mut self, generalize: Generalize) -> Self {
        self.generalize = Some(generalize);
        self
    }

    /// Enables noise injection.
    #[must_use]
    pub fn with_noise(mut self, noise: LaplaceNoise) -> Self {
        self.noise = Some(noise);
        self
    }

    /// Enables synthetic generation.
    #[must_use]
    pub fn with_synthetic(mut self, synthetic: SyntheticGenerator) -> Self {
        self.synthetic = Some(synthetic);
        self
    }

    /// Returns true if no stage is enabled.
    pub fn is_noop(&self) -> bool {
        self.generalize.is_none() && self.noise.is_none() && self.synthetic.is_none()
    }

    /// Names of the stages that `enhance` runs, in application order.
    ///
    /// Synthetic generation reads the original data, so it replaces the
    /// other stages when enabled.
    pub fn stages(&self) -> Vec<&'static str> {
        if let Some(s) = &self.synthetic {
            return vec![s.name()];
        }
        let mut stages = Vec::new();
        if let Some(g) = &self.generalize {
            stages.push(g.name());
        }
        if let Some(n) = &self.noise {
            stages.push(n.name());
        }
        stages
    }

    /// Applies the enabled stages and returns the protected dataset.
    ///
    /// # Errors
    ///
    /// Returns an error if a stage fails.
    pub fn enhance(&self, dataset: &ArrowDataset) -> Result<ArrowDataset> {
        let protected = match &self.synthetic {
            Some(synthetic) => {
                if self.generalize.is_some() || self.noise.is_some() {
                    tracing::debug!("synthetic generation enabled, other stages skipped");
                }
                dataset.with_transform(synthetic)?
            }
            None => self.perturb(dataset)?,
        };

        tracing::info!(
            stages = ?self.stages(),
            rows_in = dataset.len(),
            rows_out = protected.len(),
            "privacy enhancement applied"
        );
        Ok(protected)
    }

    fn perturb(&self, dataset: &ArrowDataset) -> Result<ArrowDataset> {
        let mut chain = Chain::new();
        if let Some(generalize) = &self.generalize {
            chain = chain.then(generalize.clone());
        }
        if let Some(noise) = &self.noise {
            let noise = match &self.generalize {
                Some(generalize) => noise.clone().with_exclude(generalize.bucketed_columns()),
                None => noise.clone(),
            };
            chain = chain.then(noise);
        }

        if chain.is_empty() {
            Ok(dataset.clone())
        } else {
            dataset.with_transform(&chain)
        }
    }
}

/// Applies the stages enabled in `config` to `dataset`.
///
/// # Errors
///
/// Returns an error if a stage fails.
pub fn enhance(dataset: &ArrowDataset, config: &PipelineConfig) -> Result<ArrowDataset> {
    PrivacyEnhancer::from_config(config).enhance(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column;

    const CSV: &str = "id,age,location,income\n\
        1,23,Delhi,32000\n\
        2,37,Pune,54000\n\
        3,41,Mumbai,61000\n\
        4,58,Chennai,72000\n\
        5,62,Surat,45000\n\
        6,19,Delhi,21000\n";

    fn dataset() -> ArrowDataset {
        ArrowDataset::from_csv_str(CSV).unwrap_or_else(|e| panic!("{e}"))
    }

    fn config(generalize: bool, noise: bool, synthetic: bool) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.privacy.seed = Some(42);
        config.privacy.k_anonymity.enabled = generalize;
        config.privacy.differential_privacy.enabled = noise;
        config.privacy.synthetic_data.enabled = synthetic;
        config.privacy.synthetic_data.num_records = 12;
        config
    }

    #[test]
    fn test_no_stage_is_identity() {
        let data = dataset();
        let protected = enhance(&data, &config(false, false, false)).unwrap_or_else(|e| panic!("{e}"));
        assert!(PrivacyEnhancer::from_config(&config(false, false, false)).is_noop());
        assert_eq!(protected.batches(), data.batches());
    }

    #[test]
    fn test_generalize_then_noise_keeps_buckets() {
        let data = dataset();
        let protected = enhance(&data, &config(true, true, false)).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(protected.len(), data.len());
        assert_eq!(protected.column_names(), data.column_names());

        let batch = protected.to_single_batch().unwrap_or_else(|e| panic!("{e}"));
        let ages = column::numeric_values(&batch, "age").unwrap_or_else(|e| panic!("{e}"));
        assert!(ages.iter().flatten().all(|a| a % 10.0 == 0.0));

        let before = column::numeric_values(
            &data.to_single_batch().unwrap_or_else(|e| panic!("{e}")),
            "income",
        )
        .unwrap_or_else(|e| panic!("{e}"));
        let after = column::numeric_values(&batch, "income").unwrap_or_else(|e| panic!("{e}"));
        assert_ne!(before, after);

        let ids = column::numeric_values(&batch, "id").unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(ids, (1..=6).map(|i| Some(f64::from(i))).collect::<Vec<_>>());
    }

    #[test]
    fn test_synthetic_reads_original() {
        let data = dataset();
        let protected = enhance(&data, &config(true, false, true)).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(protected.len(), 12);

        // Ungeneralized source categories survive only if synthesis used the original.
        let batch = protected.to_single_batch().unwrap_or_else(|e| panic!("{e}"));
        let locations = column::string_values(&batch, "location").unwrap_or_else(|e| panic!("{e}"));
        assert!(locations.iter().flatten().all(|l| l != "Other"));
    }

    #[test]
    fn test_stage_order() {
        let enhancer = PrivacyEnhancer::from_config(&config(true, true, false));
        assert_eq!(enhancer.stages(), vec!["generalize", "laplace_noise"]);
    }

    #[test]
    fn test_synthetic_replaces_other_stages() {
        let enhancer = PrivacyEnhancer::from_config(&config(true, true, true));
        assert_eq!(enhancer.stages(), vec!["synthetic"]);
    }

    #[test]
    fn test_input_not_mutated() {
        let data = dataset();
        let snapshot = data.batches().to_vec();
        let _ = enhance(&data, &config(true, true, false)).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(data.batches(), snapshot.as_slice());
    }
}
