//! Static site build command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use quire_static::{Mode, StaticBuilder};

use crate::config::load_config;

/// Run the build command.
pub async fn run(
    config_path: &Path,
    output: Option<PathBuf>,
    mode: Mode,
    minify: Option<bool>,
) -> Result<()> {
    tracing::info!("Building site ({})...", mode);

    let file_config = load_config(config_path)?;
    let config = file_config.build_config(mode, output, minify);

    let builder = StaticBuilder::new(config);
    let result = tokio::task::spawn_blocking(move || builder.build())
        .await
        .context("Build task failed")??;

    tracing::info!(
        "Built {} pages, {} scripts, {} stylesheets and {} assets in {}ms",
        result.pages,
        result.scripts,
        result.stylesheets,
        result.assets,
        result.duration_ms
    );

    tracing::info!("Output: {}", result.output_dir.display());

    Ok(())
}
