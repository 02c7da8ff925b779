//! Risk assessment command.

use std::path::Path;

use super::print_json;
use crate::risk::{self, RiskAssessor};

/// Assess re-identification risk and print the report.
pub(crate) fn cmd_assess(
    input: &Path,
    ground_truth: Option<&Path>,
    quasi_identifiers: &[String],
    threshold: usize,
    identifier: &str,
    format: &str,
) -> crate::Result<()> {
    let (data, truth) = risk::load(input, ground_truth)?;
    let report = RiskAssessor::new(quasi_identifiers.iter().cloned())
        .with_threshold(threshold)
        .with_identifier(identifier)
        .assess(&data, truth.as_ref())?;

    if format == "json" {
        return print_json(&report);
    }

    println!("Risk Assessment");
    println!("===============");
    println!("Dataset:  {}", input.display());
    println!("Records:  {}", report.records);
    println!(
        "QIs used: {}",
        if report.k_anonymity.quasi_identifiers.is_empty() {
            "(none)".to_string()
        } else {
            report.k_anonymity.quasi_identifiers.join(", ")
        }
    );
    println!();
    println!(
        "k-anonymity:     {} ({})",
        report.k_anonymity.value, report.k_anonymity.detail
    );
    println!("Linkage attack:  {}", report.linkage_attack.detail);
    println!("Prosecutor risk: {}", report.prosecutor_risk.detail);
    println!("Journalist risk: {}", report.journalist_risk.detail);

    Ok(())
}
