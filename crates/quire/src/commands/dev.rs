//! Development server command.

use std::path::Path;

use anyhow::Result;
use quire_server::{DevServer, DevServerConfig};
use quire_static::Mode;

use crate::config::load_config;

/// Run the dev server.
pub async fn run(config_path: &Path, port: Option<u16>, open: bool) -> Result<()> {
    let file_config = load_config(config_path)?;
    let port = port.unwrap_or(file_config.server.port);

    tracing::info!("Starting development server on port {}", port);

    let config = DevServerConfig {
        build: file_config.build_config(Mode::Development, None, None),
        port,
        host: file_config.server.host.clone(),
        open,
        overlay: file_config.server.overlay,
        content: file_config.content_options(),
    };

    DevServer::new(config).start().await?;

    Ok(())
}
