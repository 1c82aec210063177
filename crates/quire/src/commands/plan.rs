//! Print the page plan.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use quire_plan::generate_plan;

use crate::config::load_config;

/// Run the plan command.
pub fn run(config_path: &Path, json: bool) -> Result<()> {
    let file_config = load_config(config_path)?;
    let pages_dir = PathBuf::from(&file_config.pages.dir);

    let plan = generate_plan(&pages_dir, &file_config.plan_options())?;

    if json {
        let out = serde_json::to_string_pretty(&plan).context("Failed to serialize plan")?;
        println!("{}", out);
        return Ok(());
    }

    for descriptor in &plan {
        println!(
            "{} <- {}{}",
            descriptor.output_name,
            descriptor.source_path.display(),
            if descriptor.inject_assets {
                " (inject)"
            } else {
                ""
            }
        );
    }

    tracing::info!("{} pages planned from {}", plan.len(), pages_dir.display());

    Ok(())
}
