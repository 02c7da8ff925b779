//! Re-identification risk assessment.
//!
//! Measures how exposed the records of a dataset are to an attacker who
//! knows some of their attributes:
//!
//! - **k-anonymity**: size of the smallest group of records sharing the same
//!   quasi-identifier values
//! - **Prosecutor risk**: the attacker knows the target is in the dataset
//!   (`1/k`)
//! - **Journalist risk**: the attacker only suspects it (`1/(k·n)`)
//! - **Linkage attack**: fraction of records that can be joined to a
//!   ground-truth table on the identifier column
//!
//! # Example
//!
//! ```ignore
//! use safedata::risk::RiskAssessor;
//!
//! let assessor = RiskAssessor::new(["age", "location"])
//!     .with_threshold(5)
//!     .with_identifier("id");
//!
//! let report = assessor.assess(&dataset, ground_truth.as_ref())?;
//! println!("{}", report.k_anonymity.detail);
//! ```

#![allow(clippy::cast_precision_loss)]

use std::{
    collections::{HashMap, HashSet},
    fmt,
    path::Path,
};

use serde::{Serialize, Serializer};

use crate::{
    column,
    config::RiskSettings,
    dataset::{ArrowDataset, Dataset},
    error::Result,
};

/// Loads the primary dataset and, when a path is given, the ground-truth
/// table with the same rules.
///
/// # Errors
///
/// Returns a data-load error if either file is missing or unparsable.
pub fn load(
    primary: impl AsRef<Path>,
    ground_truth: Option<&Path>,
) -> Result<(ArrowDataset, Option<ArrowDataset>)> {
    let data = ArrowDataset::open(primary.as_ref())?;
    tracing::info!(
        path = %primary.as_ref().display(),
        rows = data.len(),
        columns = data.schema().fields().len(),
        "loaded dataset"
    );

    let truth = ground_truth.map(ArrowDataset::open).transpose()?;
    if let (Some(path), Some(truth)) = (ground_truth, &truth) {
        tracing::info!(path = %path.display(), rows = truth.len(), "loaded ground truth");
    }

    Ok((data, truth))
}

/// Result of the k-anonymity computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KValue {
    /// Smallest equivalence group size (at least 1).
    Finite(usize),
    /// No quasi-identifier applies, so no group can be formed.
    Infinite,
}

impl KValue {
    /// Returns the finite value, if any.
    pub fn finite(self) -> Option<usize> {
        match self {
            Self::Finite(k) => Some(k),
            Self::Infinite => None,
        }
    }

    /// Returns true for [`KValue::Infinite`].
    pub fn is_infinite(self) -> bool {
        matches!(self, Self::Infinite)
    }
}

impl fmt::Display for KValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finite(k) => write!(f, "{k}"),
            Self::Infinite => f.write_str("inf"),
        }
    }
}

impl Serialize for KValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Finite(k) => serializer.serialize_u64(*k as u64),
            Self::Infinite => serializer.serialize_str("inf"),
        }
    }
}

/// An attacker-model risk value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RiskScore {
    /// Probability of re-identification in `[0, 1]`.
    Score(f64),
    /// k is infinite, so the model does not apply.
    NotApplicable,
}

impl RiskScore {
    /// Returns the numeric score, if any.
    pub fn value(self) -> Option<f64> {
        match self {
            Self::Score(v) => Some(v),
            Self::NotApplicable => None,
        }
    }
}

impl fmt::Display for RiskScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Score(v) => write!(f, "{v:.6}"),
            Self::NotApplicable => f.write_str("n/a"),
        }
    }
}

impl Serialize for RiskScore {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Score(v) => serializer.serialize_f64(*v),
            Self::NotApplicable => serializer.serialize_none(),
        }
    }
}

/// A measured value with its human-readable explanation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assessment<T> {
    /// The measurement.
    pub value: T,
    /// Explanation shown in reports.
    pub detail: String,
}

impl<T> Assessment<T> {
    fn new(value: T, detail: impl Into<String>) -> Self {
        Self {
            value,
            detail: detail.into(),
        }
    }
}

/// k-anonymity statistics over the effective quasi-identifiers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KAnonymity {
    /// Smallest group size.
    pub value: KValue,
    /// Number of equivalence groups.
    pub group_count: usize,
    /// Groups smaller than the risk threshold.
    pub risky_groups: usize,
    /// Quasi-identifiers that were present in the data.
    pub quasi_identifiers: Vec<String>,
    /// Explanation shown in reports.
    pub detail: String,
}

/// Outcome of the linkage attack simulation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Linkage {
    /// Records that matched a ground-truth record.
    pub matches: usize,
    /// Records tried.
    pub attempts: usize,
    /// `matches / attempts × 100`, 0 when nothing was attempted.
    pub success_rate: f64,
    /// Explanation shown in reports.
    pub detail: String,
}

impl Linkage {
    fn skipped(detail: impl Into<String>) -> Self {
        Self {
            matches: 0,
            attempts: 0,
            success_rate: 0.0,
            detail: detail.into(),
        }
    }
}

/// Four independent risk measurements over one dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskReport {
    /// Dataset size.
    pub records: usize,
    /// k-anonymity statistics.
    pub k_anonymity: KAnonymity,
    /// Linkage attack against the ground truth.
    pub linkage_attack: Linkage,
    /// Prosecutor model risk.
    pub prosecutor_risk: Assessment<RiskScore>,
    /// Journalist model risk.
    pub journalist_risk: Assessment<RiskScore>,
}

/// Groups records by the quasi-identifiers present in `dataset`.
///
/// Absent quasi-identifiers are dropped. Records with a null in any
/// effective quasi-identifier are not grouped. Groups smaller than
/// `risk_threshold` are counted as risky.
///
/// # Errors
///
/// Returns an error if a column cannot be rendered as strings.
pub fn k_anonymity<S: AsRef<str>>(
    dataset: &ArrowDataset,
    quasi_identifiers: &[S],
    risk_threshold: usize,
) -> Result<KAnonymity> {
    let effective: Vec<String> = quasi_identifiers
        .iter()
        .map(|qi| qi.as_ref())
        .filter(|&qi| {
            let present = dataset.has_column(qi);
            if !present {
                tracing::debug!(column = qi, "quasi-identifier not in dataset, dropped");
            }
            present
        })
        .map(str::to_string)
        .collect();

    if effective.is_empty() {
        return Ok(KAnonymity {
            value: KValue::Infinite,
            group_count: 0,
            risky_groups: 0,
            quasi_identifiers: effective,
            detail: "No quasi-identifiers found".to_string(),
        });
    }

    let mut groups: HashMap<Vec<String>, usize> = HashMap::new();
    for batch in dataset.iter() {
        let keys = effective
            .iter()
            .map(|qi| column::key_values(&batch, qi))
            .collect::<Result<Vec<_>>>()?;

        for row in 0..batch.num_rows() {
            let key: Option<Vec<String>> = keys.iter().map(|col| col[row].clone()).collect();
            if let Some(key) = key {
                *groups.entry(key).or_insert(0) += 1;
            }
        }
    }

    let Some(&k) = groups.values().min() else {
        return Ok(KAnonymity {
            value: KValue::Infinite,
            group_count: 0,
            risky_groups: 0,
            quasi_identifiers: effective,
            detail: "No record has complete quasi-identifier values".to_string(),
        });
    };
    let risky_groups = groups.values().filter(|&&size| size < risk_threshold).count();

    Ok(KAnonymity {
        value: KValue::Finite(k),
        group_count: groups.len(),
        risky_groups,
        quasi_identifiers: effective,
        detail: format!("Minimum group size: {k}, Risky groups: {risky_groups}"),
    })
}

/// Tries to find every record of `dataset` in `ground_truth` by identifier.
///
/// Identifiers match by value, so an integer `1` links to a float `1.0`.
///
/// # Errors
///
/// Returns an error if the identifier column cannot be read.
pub fn simulate_linkage_attack(
    dataset: &ArrowDataset,
    ground_truth: Option<&ArrowDataset>,
    identifier: &str,
) -> Result<Linkage> {
    let Some(ground_truth) = ground_truth else {
        return Ok(Linkage::skipped("No ground truth data available"));
    };

    let attempts = dataset.len();
    if !dataset.has_column(identifier) || !ground_truth.has_column(identifier) {
        tracing::warn!(column = identifier, "identifier column missing, no records linked");
        return Ok(Linkage {
            attempts,
            ..Linkage::skipped(format!(
                "Identifier column '{identifier}' not present in both tables; linked 0/{attempts} records"
            ))
        });
    }

    let mut known: HashSet<String> = HashSet::new();
    for batch in ground_truth.iter() {
        known.extend(column::key_values(&batch, identifier)?.into_iter().flatten());
    }

    let mut matches = 0;
    for batch in dataset.iter() {
        matches += column::key_values(&batch, identifier)?
            .iter()
            .flatten()
            .filter(|id| known.contains(id.as_str()))
            .count();
    }

    let success_rate = if attempts > 0 {
        matches as f64 / attempts as f64 * 100.0
    } else {
        0.0
    };

    Ok(Linkage {
        matches,
        attempts,
        success_rate,
        detail: format!("Linked {matches}/{attempts} records ({success_rate:.1}%)"),
    })
}

/// Prosecutor risk `1/k`, or the worst case 1.0 when `k` is 0.
pub fn prosecutor_risk(k: usize) -> f64 {
    if k > 0 {
        1.0 / k as f64
    } else {
        1.0
    }
}

/// Journalist risk `1/(k·n)`, or the worst case 1.0 when either is 0.
pub fn journalist_risk(k: usize, n: usize) -> f64 {
    if k > 0 && n > 0 {
        1.0 / (k as f64 * n as f64)
    } else {
        1.0
    }
}

/// Risk assessor configured with quasi-identifiers, a risk threshold and an
/// identifier column.
#[derive(Debug, Clone)]
pub struct RiskAssessor {
    quasi_identifiers: Vec<String>,
    threshold: usize,
    identifier: String,
}

impl RiskAssessor {
    /// Creates an assessor for the given quasi-identifiers.
    pub fn new<I, S>(quasi_identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            quasi_identifiers: quasi_identifiers.into_iter().map(Into::into).collect(),
            threshold: 5,
            identifier: "id".to_string(),
        }
    }

    /// Creates an assessor from risk settings and the k-anonymity target.
    pub fn from_settings(settings: &RiskSettings, threshold: usize) -> Self {
        Self::new(settings.quasi_identifiers.iter().cloned())
            .with_threshold(threshold)
            .with_identifier(settings.identifier_column.clone())
    }

    /// Sets the group size below which groups are reported as risky.
    #[must_use]
    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    /// Sets the identifier column used by the linkage attack.
    #[must_use]
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    /// Configured quasi-identifiers.
    pub fn quasi_identifiers(&self) -> &[String] {
        &self.quasi_identifiers
    }

    /// Computes all four measurements.
    ///
    /// # Errors
    ///
    /// Returns an error if a grouping or identifier column cannot be read.
    pub fn assess(
        &self,
        dataset: &ArrowDataset,
        ground_truth: Option<&ArrowDataset>,
    ) -> Result<RiskReport> {
        let records = dataset.len();
        let k_anonymity = k_anonymity(dataset, &self.quasi_identifiers, self.threshold)?;
        let linkage_attack = simulate_linkage_attack(dataset, ground_truth, &self.identifier)?;

        let (prosecutor, journalist) = match k_anonymity.value {
            KValue::Finite(k) => {
                let p = prosecutor_risk(k);
                let j = journalist_risk(k, records);
                (
                    Assessment::new(RiskScore::Score(p), format!("Prosecutor risk: {p:.3} (1/{k})")),
                    Assessment::new(RiskScore::Score(j), format!("Journalist risk: {j:.6}")),
                )
            }
            KValue::Infinite => (
                Assessment::new(
                    RiskScore::NotApplicable,
                    "Prosecutor risk: not applicable (k is infinite)",
                ),
                Assessment::new(
                    RiskScore::NotApplicable,
                    "Journalist risk: not applicable (k is infinite)",
                ),
            ),
        };

        tracing::info!(
            k = %k_anonymity.value,
            risky_groups = k_anonymity.risky_groups,
            linkage = linkage_attack.success_rate,
            "risk assessed"
        );

        Ok(RiskReport {
            records,
            k_anonymity,
            linkage_attack,
            prosecutor_risk: prosecutor,
            journalist_risk: journalist,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::{
        array::{Float64Array, Int64Array, RecordBatch, StringArray},
        datatypes::{DataType, Field, Schema},
    };

    use super::*;

    fn float_column(name: &str, values: Vec<Option<f64>>) -> ArrowDataset {
        let schema = Arc::new(Schema::new(vec![Field::new(name, DataType::Float64, true)]));
        let batch = RecordBatch::try_new(schema, vec![Arc::new(Float64Array::from(values))])
            .unwrap_or_else(|e| panic!("batch: {e}"));
        ArrowDataset::from_batch(batch).unwrap_or_else(|e| panic!("dataset: {e}"))
    }

    fn people(ids: Vec<i64>, ages: Vec<Option<i64>>, locations: Vec<Option<&str>>) -> ArrowDataset {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("age", DataType::Int64, true),
            Field::new("location", DataType::Utf8, true),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(ids)),
                Arc::new(Int64Array::from(ages)),
                Arc::new(StringArray::from(locations)),
            ],
        )
        .unwrap_or_else(|e| panic!("batch: {e}"));
        ArrowDataset::from_batch(batch).unwrap_or_else(|e| panic!("dataset: {e}"))
    }

    /// Three groups of sizes 2, 5 and 10.
    fn grouped() -> ArrowDataset {
        let mut ages = Vec::new();
        let mut locations = Vec::new();
        for (age, location, size) in [(20, "Delhi", 2), (30, "Mumbai", 5), (40, "Chennai", 10)] {
            for _ in 0..size {
                ages.push(Some(age));
                locations.push(Some(location));
            }
        }
        let ids = (1..=17).collect();
        people(ids, ages, locations)
    }

    #[test]
    fn test_k_anonymity_known_groups() {
        let result = k_anonymity(&grouped(), &["age", "location"], 5)
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(result.value, KValue::Finite(2));
        assert_eq!(result.group_count, 3);
        assert_eq!(result.risky_groups, 1);
        assert_eq!(result.detail, "Minimum group size: 2, Risky groups: 1");
    }

    #[test]
    fn test_k_anonymity_no_quasi_identifiers() {
        let none: [&str; 0] = [];
        let result = k_anonymity(&grouped(), &none, 5).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(result.value, KValue::Infinite);
        assert_eq!(result.detail, "No quasi-identifiers found");
    }

    #[test]
    fn test_k_anonymity_drops_absent_columns() {
        let result = k_anonymity(&grouped(), &["zip", "location"], 3)
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(result.quasi_identifiers, vec!["location"]);
        assert_eq!(result.value, KValue::Finite(2));

        let result = k_anonymity(&grouped(), &["zip"], 3).unwrap_or_else(|e| panic!("{e}"));
        assert!(result.value.is_infinite());
    }

    #[test]
    fn test_k_anonymity_skips_null_keys() {
        let data = people(
            vec![1, 2, 3, 4],
            vec![Some(30), Some(30), None, Some(30)],
            vec![Some("Delhi"), Some("Delhi"), Some("Delhi"), Some("Delhi")],
        );
        let result =
            k_anonymity(&data, &["age", "location"], 2).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(result.value, KValue::Finite(3));
        assert_eq!(result.group_count, 1);
    }

    #[test]
    fn test_k_anonymity_all_keys_null() {
        let data = people(vec![1, 2], vec![None, None], vec![Some("Delhi"), None]);
        let result = k_anonymity(&data, &["age"], 2).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(result.value, KValue::Infinite);
    }

    #[test]
    fn test_attacker_models() {
        assert!((prosecutor_risk(5) - 0.2).abs() < f64::EPSILON);
        assert!((prosecutor_risk(0) - 1.0).abs() < f64::EPSILON);
        assert!((journalist_risk(2, 50) - 0.01).abs() < 1e-12);
        assert!((journalist_risk(0, 50) - 1.0).abs() < f64::EPSILON);
        assert!((journalist_risk(3, 0) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_linkage_without_ground_truth() {
        let result =
            simulate_linkage_attack(&grouped(), None, "id").unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(result.success_rate, 0.0);
        assert_eq!(result.detail, "No ground truth data available");
    }

    #[test]
    fn test_linkage_partial_match() {
        let data = people(
            vec![1, 2, 3, 4],
            vec![Some(1); 4],
            vec![Some("Delhi"); 4],
        );
        let truth = people(vec![2, 4, 9], vec![Some(1); 3], vec![Some("Delhi"); 3]);
        let result =
            simulate_linkage_attack(&data, Some(&truth), "id").unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(result.matches, 2);
        assert_eq!(result.attempts, 4);
        assert!((result.success_rate - 50.0).abs() < f64::EPSILON);
        assert_eq!(result.detail, "Linked 2/4 records (50.0%)");
    }

    #[test]
    fn test_linkage_integer_ids_match_float_ids() {
        let data = people(vec![1, 2, 3], vec![Some(1); 3], vec![Some("Delhi"); 3]);
        let truth = float_column("id", vec![Some(1.0), Some(2.0), Some(3.5)]);
        let result =
            simulate_linkage_attack(&data, Some(&truth), "id").unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(result.matches, 2);
        assert_eq!(result.attempts, 3);
        assert_eq!(result.detail, "Linked 2/3 records (66.7%)");
    }

    #[test]
    fn test_k_anonymity_signed_zero_is_one_group() {
        let data = float_column("score", vec![Some(0.0), Some(-0.0), Some(1.5), Some(1.5)]);
        let result = k_anonymity(&data, &["score"], 2).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(result.value, KValue::Finite(2));
        assert_eq!(result.group_count, 2);
    }

    #[test]
    fn test_linkage_missing_identifier() {
        let data = grouped();
        let result = simulate_linkage_attack(&data, Some(&data), "ssn")
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(result.matches, 0);
        assert_eq!(result.attempts, 17);
        assert!(result.detail.contains("ssn"));
    }

    #[test]
    fn test_assess_report() {
        let data = grouped();
        let report = RiskAssessor::new(["age", "location"])
            .with_threshold(5)
            .assess(&data, Some(&data))
            .unwrap_or_else(|e| panic!("{e}"));

        assert_eq!(report.records, 17);
        assert_eq!(report.k_anonymity.value, KValue::Finite(2));
        assert!((report.linkage_attack.success_rate - 100.0).abs() < f64::EPSILON);
        assert_eq!(report.prosecutor_risk.value, RiskScore::Score(0.5));
        assert_eq!(report.prosecutor_risk.detail, "Prosecutor risk: 0.500 (1/2)");
        let journalist = report.journalist_risk.value.value().unwrap_or(f64::NAN);
        assert!((journalist - 1.0 / 34.0).abs() < 1e-12);
    }

    #[test]
    fn test_assess_infinite_k_is_not_applicable() {
        let report = RiskAssessor::new(["zip"])
            .assess(&grouped(), None)
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(report.prosecutor_risk.value, RiskScore::NotApplicable);
        assert_eq!(report.journalist_risk.value, RiskScore::NotApplicable);
    }

    #[test]
    fn test_report_serialization() {
        let report = RiskAssessor::new(["zip"])
            .assess(&grouped(), None)
            .unwrap_or_else(|e| panic!("{e}"));
        let json = serde_json::to_value(&report).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(json["k_anonymity"]["value"], "inf");
        assert!(json["prosecutor_risk"]["value"].is_null());

        let report = RiskAssessor::new(["age"])
            .assess(&grouped(), None)
            .unwrap_or_else(|e| panic!("{e}"));
        let json = serde_json::to_value(&report).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(json["k_anonymity"]["value"], 2);
    }

    #[test]
    fn test_load_primary_and_ground_truth() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        let primary = dir.path().join("data.csv");
        let truth = dir.path().join("truth.csv");
        std::fs::write(&primary, "id,age\n1,30\n2,40\n").unwrap_or_else(|e| panic!("{e}"));
        std::fs::write(&truth, "id,age\n1,30\n").unwrap_or_else(|e| panic!("{e}"));

        let (data, gt) = load(&primary, Some(truth.as_path())).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(data.len(), 2);
        assert_eq!(gt.map(|g| g.len()), Some(1));

        let missing = load(dir.path().join("nope.csv"), None);
        assert!(missing.map_err(|e| e.is_fatal()).err().unwrap_or(false));
    }
}
