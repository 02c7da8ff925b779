//! Proxy machine-learning utility.
//!
//! A binary task ("is the target above its median?") is trained and scored
//! separately on the original and the protected data. The gap between the
//! two held-out accuracies shows how much predictive signal survived.
//!
//! The classifier is an L2-regularised logistic regression fitted by batch
//! gradient descent on z-scored features.

#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::many_single_char_names)]

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::Serialize;

use crate::{
    column,
    config::UtilitySettings,
    dataset::{ArrowDataset, Dataset},
    error::{Error, Result},
};

/// Held-out accuracies of the proxy task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MlUtility {
    /// Accuracy when trained on the original data.
    pub original_accuracy: f64,
    /// Accuracy when trained on the protected data.
    pub protected_accuracy: f64,
    /// `original_accuracy - protected_accuracy`.
    pub accuracy_loss: f64,
    /// `protected_accuracy / original_accuracy`, 0 when the original is 0.
    pub utility_retention: f64,
    /// Why the task could not run, if it did not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl MlUtility {
    /// The all-zero result used when the task cannot run.
    pub fn degenerate(note: impl Into<String>) -> Self {
        Self {
            original_accuracy: 0.0,
            protected_accuracy: 0.0,
            accuracy_loss: 0.0,
            utility_retention: 0.0,
            note: Some(note.into()),
        }
    }

    fn from_accuracies(original: f64, protected: f64) -> Self {
        Self {
            original_accuracy: original,
            protected_accuracy: protected,
            accuracy_loss: original - protected,
            utility_retention: if original > 0.0 {
                protected / original
            } else {
                0.0
            },
            note: None,
        }
    }

    /// Returns true if the task did not run.
    pub fn is_degenerate(&self) -> bool {
        self.note.is_some()
    }
}

/// Configuration of the proxy task.
#[derive(Debug, Clone)]
pub struct MlTask {
    target: String,
    identifier: String,
    test_ratio: f64,
    seed: u64,
    min_rows: usize,
    iterations: usize,
    learning_rate: f64,
    l2: f64,
}

impl Default for MlTask {
    fn default() -> Self {
        Self {
            target: "income".to_string(),
            identifier: "id".to_string(),
            test_ratio: 0.3,
            seed: 42,
            min_rows: 5,
            iterations: 500,
            learning_rate: 0.1,
            l2: 1.0,
        }
    }
}

impl MlTask {
    /// Creates a task with the default income target.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a task from utility settings.
    pub fn from_settings(settings: &UtilitySettings, identifier: &str) -> Self {
        Self::new()
            .with_target(settings.target_column.clone())
            .with_identifier(identifier)
            .with_test_ratio(settings.test_ratio)
            .with_seed(settings.seed)
            .with_min_rows(settings.min_rows)
    }

    /// Sets the target column.
    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    /// Sets the identifier column, never used as a feature.
    #[must_use]
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    /// Sets the held-out fraction.
    #[must_use]
    pub fn with_test_ratio(mut self, ratio: f64) -> Self {
        self.test_ratio = ratio;
        self
    }

    /// Sets the shuffle seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the minimum row count for both datasets.
    #[must_use]
    pub fn with_min_rows(mut self, min_rows: usize) -> Self {
        self.min_rows = min_rows;
        self
    }

    /// Runs the task on both datasets.
    ///
    /// Never fails: any problem yields [`MlUtility::degenerate`] with a note,
    /// logged at `warn`.
    pub fn evaluate(&self, original: &ArrowDataset, protected: &ArrowDataset) -> MlUtility {
        match self.try_evaluate(original, protected) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, "ML utility not computed");
                MlUtility::degenerate(e.to_string())
            }
        }
    }

    fn try_evaluate(&self, original: &ArrowDataset, protected: &ArrowDataset) -> Result<MlUtility> {
        if !original.has_column(&self.target) || !protected.has_column(&self.target) {
            return Err(Error::column_not_found(&self.target));
        }

        let features: Vec<String> = column::numeric_columns(&original.schema())
            .into_iter()
            .filter(|c| *c != self.identifier && *c != self.target)
            .collect();
        if features.is_empty() {
            return Err(Error::data("no numeric feature columns"));
        }

        if original.len() < self.min_rows || protected.len() < self.min_rows {
            return Err(Error::data(format!(
                "need at least {} rows in both datasets (original {}, protected {})",
                self.min_rows,
                original.len(),
                protected.len()
            )));
        }

        let original_accuracy = self.score(original, &features)?;
        let protected_accuracy = self.score(protected, &features)?;
        Ok(MlUtility::from_accuracies(original_accuracy, protected_accuracy))
    }

    fn score(&self, dataset: &ArrowDataset, features: &[String]) -> Result<f64> {
        let batch = dataset.to_single_batch()?;

        let columns = features
            .iter()
            .map(|f| column::numeric_values(&batch, f))
            .collect::<Result<Vec<_>>>()?;
        let n = batch.num_rows();
        let x: Vec<Vec<f64>> = (0..n)
            .map(|row| {
                columns
                    .iter()
                    .map(|col| col[row].filter(|v| v.is_finite()).unwrap_or(0.0))
                    .collect()
            })
            .collect();

        let target = column::numeric_values(&batch, &self.target)?;
        let median = column::median(&column::present(&target))
            .ok_or_else(|| Error::data(format!("target column '{}' has no values", self.target)))?;
        let y: Vec<f64> = target
            .iter()
            .map(|v| if v.is_some_and(|v| v > median) { 1.0 } else { 0.0 })
            .collect();

        let (train, test) = split_indices(n, self.test_ratio, self.seed);
        let positives = train.iter().filter(|&&i| y[i] > 0.5).count();
        if positives == 0 || positives == train.len() {
            return Err(Error::data("training target has a single class"));
        }

        let scaler = Scaler::fit(&x, &train);
        let model = LogisticRegression::fit(
            &train.iter().map(|&i| scaler.transform(&x[i])).collect::<Vec<_>>(),
            &train.iter().map(|&i| y[i]).collect::<Vec<_>>(),
            self.iterations,
            self.learning_rate,
            self.l2,
        );

        let correct = test
            .iter()
            .filter(|&&i| model.predict(&scaler.transform(&x[i])) == (y[i] > 0.5))
            .count();
        Ok(correct as f64 / test.len() as f64)
    }
}

/// Shuffles `0..n` with `seed` and returns `(train, test)` index sets.
///
/// The test part has `ceil(n * ratio)` rows, kept between 1 and `n - 1`.
pub fn split_indices(n: usize, ratio: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut StdRng::seed_from_u64(seed));

    let test_size = ((n as f64) * ratio).ceil() as usize;
    let test_size = test_size.clamp(1, n.saturating_sub(1).max(1));
    let test = indices.split_off(n.saturating_sub(test_size));
    (indices, test)
}

/// Z-score scaling fitted on the training rows.
struct Scaler {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl Scaler {
    fn fit(x: &[Vec<f64>], rows: &[usize]) -> Self {
        let width = x.first().map_or(0, Vec::len);
        let mut means = Vec::with_capacity(width);
        let mut stds = Vec::with_capacity(width);
        for j in 0..width {
            let values: Vec<f64> = rows.iter().map(|&i| x[i][j]).collect();
            let mean = column::mean(&values).unwrap_or(0.0);
            let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>()
                / values.len().max(1) as f64;
            means.push(mean);
            stds.push(if var > 0.0 { var.sqrt() } else { 1.0 });
        }
        Self { means, stds }
    }

    fn transform(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.means.iter().zip(&self.stds))
            .map(|(v, (m, s))| (v - m) / s)
            .collect()
    }
}

/// Binary logistic regression.
struct LogisticRegression {
    weights: Vec<f64>,
    bias: f64,
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl LogisticRegression {
    fn fit(x: &[Vec<f64>], y: &[f64], iterations: usize, learning_rate: f64, l2: f64) -> Self {
        let m = x.len() as f64;
        let width = x.first().map_or(0, Vec::len);
        let mut model = Self {
            weights: vec![0.0; width],
            bias: 0.0,
        };

        for _ in 0..iterations {
            let mut grad_w = vec![0.0; width];
            let mut grad_b = 0.0;
            for (row, &target) in x.iter().zip(y) {
                let err = model.probability(row) - target;
                for (g, v) in grad_w.iter_mut().zip(row) {
                    *g += err * v;
                }
                grad_b += err;
            }
            for (w, g) in model.weights.iter_mut().zip(&grad_w) {
                *w -= learning_rate * (g + l2 * *w) / m;
            }
            model.bias -= learning_rate * grad_b / m;
        }
        model
    }

    fn probability(&self, row: &[f64]) -> f64 {
        let z = self
            .weights
            .iter()
            .zip(row)
            .map(|(w, v)| w * v)
            .sum::<f64>()
            + self.bias;
        sigmoid(z)
    }

    fn predict(&self, row: &[f64]) -> bool {
        self.probability(row) >= 0.5
    }
}
