//! Configuration file (quire.toml).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use quire_plan::PlanOptions;
use quire_server::ContentOptions;
use quire_static::{BrowserTargets, BuildConfig, CopyRule, Mode};
use serde::Deserialize;

/// Configuration file structure.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ConfigFile {
    pub pages: PagesConfig,
    pub bundle: BundleConfig,
    pub copy: Option<Vec<CopyConfig>>,
    pub build: BuildSettings,
    pub server: ServerSettings,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PagesConfig {
    /// One output document per entry of this directory
    pub dir: String,
    /// Partials available to `{% include %}`
    pub includes: Option<String>,
    pub output_extension: String,
    pub inject_assets: bool,
}

impl Default for PagesConfig {
    fn default() -> Self {
        Self {
            dir: "src/html/pages".to_string(),
            includes: Some("src/html/includes".to_string()),
            output_extension: ".html".to_string(),
            inject_assets: false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BundleConfig {
    pub scripts: Vec<String>,
    pub styles: Vec<String>,
    pub script_output: String,
    pub style_output: String,
    /// Oldest browser major versions to support
    pub targets: Option<TargetsConfig>,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            scripts: vec!["src/js/index.js".to_string()],
            styles: vec!["src/css/index.css".to_string()],
            script_output: "app.bundle.js".to_string(),
            style_output: "app.bundle.css".to_string(),
            targets: None,
        }
    }
}

#[derive(Debug, Deserialize, Default, PartialEq, Eq)]
pub struct TargetsConfig {
    pub chrome: Option<u32>,
    pub edge: Option<u32>,
    pub firefox: Option<u32>,
    pub ie: Option<u32>,
    pub ios_saf: Option<u32>,
    pub safari: Option<u32>,
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
pub struct CopyConfig {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    pub output: String,
    /// Defaults to minifying in production only
    pub minify: Option<bool>,
    /// Defaults to writing source maps in development only
    pub source_maps: Option<bool>,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            output: "public".to_string(),
            minify: None,
            source_maps: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub port: u16,
    pub host: String,
    pub compress: bool,
    pub overlay: bool,
    /// Served for unknown paths; empty disables the fallback
    pub fallback: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "127.0.0.1".to_string(),
            compress: true,
            overlay: true,
            fallback: "index.html".to_string(),
        }
    }
}

/// Load configuration from `path` if it exists.
/// Returns an error if the config file exists but is malformed.
pub fn load_config(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        tracing::debug!("No {} found, using defaults", path.display());
        return Ok(ConfigFile::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config = parse_config(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    tracing::info!("Loaded config from {}", path.display());
    Ok(config)
}

fn parse_config(content: &str) -> Result<ConfigFile> {
    Ok(toml::from_str(content)?)
}

impl ConfigFile {
    /// Plan options from the `[pages]` section.
    pub fn plan_options(&self) -> PlanOptions {
        PlanOptions {
            output_extension: self.pages.output_extension.clone(),
            inject_assets: self.pages.inject_assets,
        }
    }

    /// Build configuration for `mode`.
    ///
    /// `output` and `minify` override the file when given.
    pub fn build_config(
        &self,
        mode: Mode,
        output: Option<PathBuf>,
        minify: Option<bool>,
    ) -> BuildConfig {
        let copy = match &self.copy {
            Some(rules) => rules
                .iter()
                .map(|rule| CopyRule {
                    from: PathBuf::from(&rule.from),
                    to: PathBuf::from(&rule.to),
                })
                .collect(),
            None => BuildConfig::default().copy,
        };

        let targets = match &self.bundle.targets {
            Some(t) => BrowserTargets {
                chrome: t.chrome,
                edge: t.edge,
                firefox: t.firefox,
                ie: t.ie,
                ios_saf: t.ios_saf,
                safari: t.safari,
            },
            None => BrowserTargets::default(),
        };

        BuildConfig {
            pages_dir: PathBuf::from(&self.pages.dir),
            includes_dir: self.pages.includes.as_ref().map(PathBuf::from),
            output_dir: output.unwrap_or_else(|| PathBuf::from(&self.build.output)),
            scripts: self.bundle.scripts.iter().map(PathBuf::from).collect(),
            styles: self.bundle.styles.iter().map(PathBuf::from).collect(),
            script_bundle: self.bundle.script_output.clone(),
            style_bundle: self.bundle.style_output.clone(),
            copy,
            plan: self.plan_options(),
            mode,
            minify: minify
                .or(self.build.minify)
                .unwrap_or(mode == Mode::Production),
            source_maps: self
                .build
                .source_maps
                .unwrap_or(mode == Mode::Development),
            targets,
            live_reload: None,
        }
    }

    /// Serving options from the `[server]` section.
    pub fn content_options(&self) -> ContentOptions {
        ContentOptions {
            compress: self.server.compress,
            fallback: Some(self.server.fallback.clone()).filter(|f| !f.is_empty()),
        }
    }
}
