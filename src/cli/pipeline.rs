//! Full pipeline and configuration commands.

use std::path::Path;

use crate::{config::PipelineConfig, pipeline::Pipeline, Dataset};

/// Run the configured pipeline.
pub(crate) fn cmd_run(config_path: &Path, seed: Option<u64>) -> crate::Result<()> {
    let mut config = PipelineConfig::load(Some(config_path))?;
    if seed.is_some() {
        config.privacy.seed = seed;
    }

    let outcome = Pipeline::new(&config).run()?;

    println!(
        "Risk: k = {}, linkage {:.1}%",
        outcome.risk.k_anonymity.value, outcome.risk.linkage_attack.success_rate
    );
    println!(
        "Protected data: {} ({} rows)",
        outcome.protected_path.display(),
        outcome.protected.len()
    );
    if let Some(path) = &outcome.comparison_path {
        println!("Comparison: {}", path.display());
    }
    match &outcome.report_path {
        Some(path) => println!("Report generated: {}", path.display()),
        None => println!("Report not generated (see log)"),
    }

    Ok(())
}

/// Write a default configuration file.
pub(crate) fn cmd_init_config(path: &Path, force: bool) -> crate::Result<()> {
    if path.exists() && !force {
        return Err(crate::Error::invalid_config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| crate::Error::io(e, parent))?;
    }

    let yaml = PipelineConfig::default().to_yaml()?;
    std::fs::write(path, yaml).map_err(|e| crate::Error::io(e, path))?;
    println!("Wrote {}", path.display());
    Ok(())
}
