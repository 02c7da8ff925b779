//! Record batch transforms.
//!
//! Every disclosure-control step (generalization, noise, synthesis) is a
//! [`Transform`]; [`Chain`] composes them in order.

use arrow::array::RecordBatch;

use crate::error::Result;

/// A transform that can be applied to RecordBatches.
///
/// Transforms take a RecordBatch and produce a new RecordBatch with the
/// transformation applied. The input batch is never mutated.
pub trait Transform: Send + Sync {
    /// Applies the transform to a RecordBatch.
    ///
    /// # Errors
    ///
    /// Returns an error if the transform cannot be applied to the batch.
    fn apply(&self, batch: RecordBatch) -> Result<RecordBatch>;

    /// Short name used in log lines.
    fn name(&self) -> &'static str {
        "transform"
    }
}

/// A chain of transforms applied in sequence.
///
/// # Example
///
/// ```ignore
/// use safedata::{Chain, Generalize, LaplaceNoise};
///
/// let chain = Chain::new()
///     .then(Generalize::with_defaults())
///     .then(LaplaceNoise::new(1.0).with_seed(7));
/// ```
pub struct Chain {
    transforms: Vec<Box<dyn Transform>>,
}

impl Chain {
    /// Creates a new empty transform chain.
    pub fn new() -> Self {
        Self {
            transforms: Vec::new(),
        }
    }

    /// Adds a transform to the chain.
    #[must_use]
    pub fn then<T: Transform + 'static>(mut self, transform: T) -> Self {
        self.transforms.push(Box::new(transform));
        self
    }

    /// Returns the number of transforms in the chain.
    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    /// Returns true if the chain has no transforms.
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform for Chain {
    fn apply(&self, batch: RecordBatch) -> Result<RecordBatch> {
        let mut result = batch;
        for transform in &self.transforms {
            tracing::debug!(transform = transform.name(), rows = result.num_rows(), "applying");
            result = transform.apply(result)?;
        }
        Ok(result)
    }

    fn name(&self) -> &'static str {
        "chain"
    }
}
