//! Static site builder.

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use quire_plan::{generate_plan, ArtifactDescriptor, PlanError, PlanOptions};
use rayon::prelude::*;

use crate::assets::{AssetPipeline, BrowserTargets, Bundle, BundleOptions, CopyRule};
use crate::templates::{PageContext, TemplateEngine};

/// Build mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    Development,
    #[default]
    Production,
}

impl Mode {
    /// Name exposed to templates.
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Development => "development",
            Mode::Production => "production",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for building a site.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Directory of page templates, one output document per entry
    pub pages_dir: PathBuf,

    /// Directory of partials available to `{% include %}`
    pub includes_dir: Option<PathBuf>,

    /// Output directory
    pub output_dir: PathBuf,

    /// Script entries, concatenated in order
    pub scripts: Vec<PathBuf>,

    /// Stylesheet entries, compiled in order
    pub styles: Vec<PathBuf>,

    /// File name of the script bundle
    pub script_bundle: String,

    /// File name of the stylesheet bundle
    pub style_bundle: String,

    /// Static asset directories to copy
    pub copy: Vec<CopyRule>,

    /// Options for the page plan
    pub plan: PlanOptions,

    /// Build mode
    pub mode: Mode,

    /// Minify the script and stylesheet bundles
    pub minify: bool,

    /// Write source maps next to the bundles
    pub source_maps: bool,

    /// Browsers the stylesheet bundle must support
    pub targets: BrowserTargets,

    /// Live reload client script added to every page
    pub live_reload: Option<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            pages_dir: PathBuf::from("src/html/pages"),
            includes_dir: Some(PathBuf::from("src/html/includes")),
            output_dir: PathBuf::from("public"),
            scripts: vec![PathBuf::from("src/js/index.js")],
            styles: vec![PathBuf::from("src/css/index.css")],
            script_bundle: "app.bundle.js".to_string(),
            style_bundle: "app.bundle.css".to_string(),
            copy: vec![CopyRule {
                from: PathBuf::from("src/assets"),
                to: PathBuf::from("assets"),
            }],
            plan: PlanOptions::default(),
            mode: Mode::Production,
            minify: true,
            source_maps: false,
            targets: BrowserTargets::default(),
            live_reload: None,
        }
    }
}

/// Result of a build operation.
#[derive(Debug)]
pub struct BuildResult {
    /// Number of pages generated
    pub pages: usize,

    /// Number of script entries bundled
    pub scripts: usize,

    /// Number of stylesheet entries compiled
    pub stylesheets: usize,

    /// Number of static files copied
    pub assets: usize,

    /// Total build time in milliseconds
    pub duration_ms: u64,

    /// Output directory
    pub output_dir: PathBuf,
}

/// Errors that can occur during build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error("Failed to read source: {0}")]
    ReadError(String),

    #[error("Failed to compile stylesheet: {path}: {message}")]
    StyleError { path: String, message: String },

    #[error("Failed to minify script bundle: {0}")]
    ScriptError(String),

    #[error("Failed to render template: {0}")]
    TemplateError(String),

    #[error("Failed to write output: {0}")]
    WriteError(String),
}

/// Static site builder.
///
/// A builder can run any number of builds; partials are loaded afresh on
/// every build so edits made between builds are picked up.
pub struct StaticBuilder {
    config: BuildConfig,
    includes_dir: Option<PathBuf>,
}

impl StaticBuilder {
    /// Create a new static builder.
    pub fn new(config: BuildConfig) -> Self {
        let includes_dir = match config.includes_dir.as_deref() {
            Some(dir) if dir.is_dir() => Some(dir.to_path_buf()),
            Some(dir) => {
                tracing::warn!("Includes directory not found: {}", dir.display());
                None
            }
            None => None,
        };

        Self {
            config,
            includes_dir,
        }
    }

    /// Configuration this builder was created with.
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Build the site.
    ///
    /// Any failure aborts the build; a site with missing pages is never
    /// reported as a success.
    pub fn build(&self) -> Result<BuildResult, BuildError> {
        let start = Instant::now();

        fs::create_dir_all(&self.config.output_dir)
            .map_err(|e| BuildError::WriteError(e.to_string()))?;

        let plan = generate_plan(&self.config.pages_dir, &self.config.plan)?;
        tracing::debug!("Planned {} pages", plan.len());

        let script = self.write_script_bundle()?;
        let stylesheet = self.write_style_bundle()?;

        let mut assets = 0;
        for rule in &self.config.copy {
            assets += AssetPipeline::copy_tree(rule, &self.config.output_dir)?;
        }

        let context = PageContext {
            page: String::new(),
            mode: self.config.mode.to_string(),
            script,
            stylesheet,
            live_reload: self.config.live_reload.clone(),
        };

        let templates = TemplateEngine::new(self.includes_dir.as_deref());

        plan.par_iter()
            .map(|descriptor| self.build_page(&templates, descriptor, &context))
            .collect::<Result<Vec<()>, BuildError>>()?;

        let duration = start.elapsed();

        Ok(BuildResult {
            pages: plan.len(),
            scripts: self.config.scripts.len(),
            stylesheets: self.config.styles.len(),
            assets,
            duration_ms: duration.as_millis() as u64,
            output_dir: self.config.output_dir.clone(),
        })
    }

    fn bundle_options(&self) -> BundleOptions {
        BundleOptions {
            annotate: self.config.mode == Mode::Development,
            minify: self.config.minify,
            source_map: self.config.source_maps,
        }
    }

    /// Write the script bundle, returning its URL.
    fn write_script_bundle(&self) -> Result<Option<String>, BuildError> {
        if self.config.scripts.is_empty() {
            return Ok(None);
        }

        let bundle = AssetPipeline::bundle_scripts(&self.config.scripts, self.bundle_options())?;
        self.write_bundle(&self.config.script_bundle, bundle, |map| {
            format!("//# sourceMappingURL={}\n", map)
        })?;

        Ok(Some(self.config.script_bundle.clone()))
    }

    /// Write the stylesheet bundle, returning its URL.
    fn write_style_bundle(&self) -> Result<Option<String>, BuildError> {
        if self.config.styles.is_empty() {
            return Ok(None);
        }

        let bundle = AssetPipeline::bundle_stylesheets(
            &self.config.styles,
            self.config.targets,
            self.bundle_options(),
        )?;
        self.write_bundle(&self.config.style_bundle, bundle, |map| {
            format!("\n/*# sourceMappingURL={} */\n", map)
        })?;

        Ok(Some(self.config.style_bundle.clone()))
    }

    /// Write `bundle` as `name`, with its source map as `name.map`.
    ///
    /// `map_comment` renders the comment that links the bundle to its map.
    fn write_bundle(
        &self,
        name: &str,
        bundle: Bundle,
        map_comment: impl Fn(&str) -> String,
    ) -> Result<(), BuildError> {
        let write = |path: &PathBuf, contents: &str| {
            fs::write(path, contents)
                .map_err(|e| BuildError::WriteError(format!("{}: {}", path.display(), e)))
        };

        let path = self.config.output_dir.join(name);
        let mut code = bundle.code;

        if let Some(map) = bundle.source_map {
            let map_name = format!("{}.map", name);
            write(&self.config.output_dir.join(&map_name), map.as_str())?;
            code.push_str(&map_comment(&map_name));
        }

        write(&path, code.as_str())?;
        tracing::debug!("Wrote {}", path.display());

        Ok(())
    }

    /// Render and write a single page.
    fn build_page(
        &self,
        templates: &TemplateEngine,
        descriptor: &ArtifactDescriptor,
        shared: &PageContext,
    ) -> Result<(), BuildError> {
        let page = descriptor
            .output_name
            .split('.')
            .next()
            .unwrap_or_default()
            .to_string();

        let context = PageContext {
            page,
            ..shared.clone()
        };

        let html = templates.render_page(descriptor, &context)?;

        let output_path = self.config.output_dir.join(&descriptor.output_name);
        fs::write(&output_path, html).map_err(|e| BuildError::WriteError(e.to_string()))?;

        Ok(())
    }
}
