//! safedata - Privacy Risk and Utility Evaluation for Tabular Data
//!
//! Measures how re-identifiable a table is, produces a protected copy, and
//! quantifies how much analytical value the protection costs.
//!
//! # Components
//!
//! 1. **Risk** - k-anonymity, linkage attack, prosecutor and journalist risk
//! 2. **Privacy** - generalization, Laplace noise, synthetic records
//! 3. **Utility** - statistical similarity and a proxy classification task
//! 4. **Report** - HTML, JSON or PDF summary of a run
//!
//! # Quick Start
//!
//! ```no_run
//! use safedata::{ArrowDataset, PrivacyEnhancer, RiskAssessor, UtilityMeasurer};
//! use safedata::privacy::{Generalize, LaplaceNoise};
//!
//! let original = ArrowDataset::from_csv("data/input.csv").unwrap();
//!
//! let risk = RiskAssessor::new(["age", "location"])
//!     .assess(&original, None)
//!     .unwrap();
//! println!("k = {}", risk.k_anonymity.value);
//!
//! let protected = PrivacyEnhancer::new()
//!     .with_generalization(Generalize::with_defaults())
//!     .with_noise(LaplaceNoise::new(1.0).with_exclude(["age".to_string()]))
//!     .enhance(&original)
//!     .unwrap();
//!
//! let utility = UtilityMeasurer::new().report(&original, &protected).unwrap();
//! println!("retention = {:.3}", utility.ml_utility.utility_retention);
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
// Allow common test patterns
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::cast_lossless,
        clippy::cast_possible_truncation,
        clippy::cast_possible_wrap,
        clippy::cast_precision_loss,
        clippy::redundant_clone,
        clippy::too_many_lines,
        clippy::float_cmp,
        clippy::similar_names,
        clippy::unreadable_literal
    )
)]
// Allow some pedantic lints for cleaner code
#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::map_unwrap_or)]
#![allow(clippy::cast_precision_loss)]

/// CLI module for command-line interface
#[cfg(feature = "cli")]
pub mod cli;
pub mod column;
pub mod config;
pub mod dataset;
pub mod error;
pub mod pipeline;
pub mod privacy;
pub mod report;
pub mod risk;
pub mod transform;
pub mod utility;

pub use config::{PipelineConfig, ReportFormat};
pub use dataset::{ArrowDataset, CsvOptions, Dataset};
pub use error::{Error, ErrorKind, Result};
pub use pipeline::{Pipeline, PipelineOutcome};
pub use privacy::{Generalize, LaplaceNoise, PrivacyEnhancer, SyntheticGenerator};
pub use report::{renderer_for, ReportRenderer};
pub use risk::{KValue, RiskAssessor, RiskReport, RiskScore};
pub use transform::{Chain, Transform};
pub use utility::{MlUtility, UtilityMeasurer, UtilityReport};
