//! Utility measurement command.

use std::path::Path;

use super::print_json;
use crate::{
    utility::{MlTask, UtilityMeasurer},
    ArrowDataset,
};

/// Compare a protected dataset with its original and print the report.
pub(crate) fn cmd_utility(
    original: &Path,
    protected: &Path,
    identifier: &str,
    target: &str,
    format: &str,
) -> crate::Result<()> {
    let original_data = ArrowDataset::open(original)?;
    let protected_data = ArrowDataset::open(protected)?;

    let measurer = UtilityMeasurer::new()
        .with_identifier(identifier)
        .with_task(MlTask::new().with_identifier(identifier).with_target(target));
    let report = measurer.report(&original_data, &protected_data)?;

    if format == "json" {
        return print_json(&report);
    }

    println!("Utility Measurement");
    println!("===================");
    println!("Original:  {}", original.display());
    println!("Protected: {}", protected.display());
    println!();
    println!(
        "{:<20} {:>12} {:>12} {:>10} {:>8}",
        "COLUMN", "ORIG MEAN", "PROT MEAN", "MEAN DIFF", "CORR"
    );
    println!("{}", "-".repeat(66));
    for (column, s) in &report.statistical_similarity {
        println!(
            "{:<20} {:>12.3} {:>12.3} {:>10.3} {:>8.3}",
            column, s.original_mean, s.protected_mean, s.mean_difference, s.correlation
        );
    }
    println!();

    let ml = &report.ml_utility;
    println!(
        "ML accuracy: original {:.3}, protected {:.3}, loss {:.3}, retention {:.3}",
        ml.original_accuracy, ml.protected_accuracy, ml.accuracy_loss, ml.utility_retention
    );
    if let Some(note) = &ml.note {
        println!("  (not computed: {note})");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmd_utility_formats() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "id,age,income\n1,20,100\n2,30,200\n3,40,300\n")
            .unwrap_or_else(|e| panic!("{e}"));

        assert!(cmd_utility(&path, &path, "id", "income", "text").is_ok());
        assert!(cmd_utility(&path, &path, "id", "income", "json").is_ok());
    }

    #[test]
    fn test_cmd_utility_missing_protected() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "id,age\n1,20\n").unwrap_or_else(|e| panic!("{e}"));
        assert!(cmd_utility(&path, &dir.path().join("nope.csv"), "id", "income", "text").is_err());
    }
}
