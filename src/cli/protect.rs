//! Protection command.

use std::path::Path;

use crate::{
    privacy::{Generalize, LaplaceNoise, PrivacyEnhancer, SyntheticGenerator},
    ArrowDataset, Dataset,
};

/// Which stages `protect` runs.
pub(crate) struct ProtectOptions {
    pub generalize: bool,
    pub epsilon: Option<f64>,
    pub synthetic: Option<usize>,
    pub seed: Option<u64>,
    pub identifier: String,
}

impl ProtectOptions {
    fn enhancer(&self) -> crate::Result<PrivacyEnhancer> {
        let mut enhancer = PrivacyEnhancer::new();
        let mut bucketed = Vec::new();

        if self.generalize {
            let generalize = Generalize::with_defaults();
            bucketed = generalize.bucketed_columns();
            enhancer = enhancer.with_generalization(generalize);
        }
        if let Some(epsilon) = self.epsilon {
            if epsilon.is_nan() || epsilon <= 0.0 {
                return Err(crate::Error::invalid_config(format!(
                    "epsilon must be positive, got {epsilon}"
                )));
            }
            let mut noise = LaplaceNoise::new(epsilon)
                .with_identifier(self.identifier.clone())
                .with_exclude(bucketed);
            if let Some(seed) = self.seed {
                noise = noise.with_seed(seed);
            }
            enhancer = enhancer.with_noise(noise);
        }
        if let Some(n) = self.synthetic {
            let mut synthetic =
                SyntheticGenerator::new(n).with_identifier(self.identifier.clone());
            if let Some(seed) = self.seed {
                synthetic = synthetic.with_seed(seed.wrapping_add(1));
            }
            enhancer = enhancer.with_synthetic(synthetic);
        }

        Ok(enhancer)
    }
}

/// Protect a dataset and write the result.
pub(crate) fn cmd_protect(input: &Path, output: &Path, options: &ProtectOptions) -> crate::Result<()> {
    let enhancer = options.enhancer()?;
    if enhancer.is_noop() {
        tracing::warn!("no protection stage selected, output is a copy of the input");
    }

    let dataset = ArrowDataset::open(input)?;
    let protected = enhancer.enhance(&dataset)?;
    protected.save(output)?;

    println!(
        "Protected {} rows -> {} ({} rows, stages: {})",
        dataset.len(),
        output.display(),
        protected.len(),
        if enhancer.is_noop() {
            "none".to_string()
        } else {
            enhancer.stages().join(", ")
        }
    );
    Ok(())
}
