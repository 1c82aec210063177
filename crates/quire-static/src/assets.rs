//! Asset pipeline for scripts, stylesheets and static files.

use std::fs;
use std::path::{Path, PathBuf};

use parcel_sourcemap::{OriginalLocation, SourceMap, SourceMapError};
use walkdir::WalkDir;

use crate::builder::BuildError;

fn source_map_error(e: SourceMapError) -> BuildError {
    BuildError::WriteError(format!("source map: {}", e))
}

/// Copy a source tree into the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyRule {
    /// Source directory
    pub from: PathBuf,

    /// Destination, relative to the output directory
    pub to: PathBuf,
}

/// Oldest browser versions the stylesheet bundle must support.
///
/// Versions are major versions. `None` means the browser is not targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrowserTargets {
    pub chrome: Option<u32>,
    pub edge: Option<u32>,
    pub firefox: Option<u32>,
    pub ie: Option<u32>,
    pub ios_saf: Option<u32>,
    pub safari: Option<u32>,
}

impl Default for BrowserTargets {
    fn default() -> Self {
        Self {
            chrome: None,
            edge: None,
            firefox: None,
            ie: Some(10),
            ios_saf: Some(8),
            safari: None,
        }
    }
}

impl BrowserTargets {
    fn to_targets(self) -> lightningcss::targets::Targets {
        use lightningcss::targets::{Browsers, Targets};

        // lightningcss packs versions as major << 16 | minor << 8 | patch
        let version = |major: Option<u32>| major.map(|m| m << 16);

        Targets::from(Browsers {
            chrome: version(self.chrome),
            edge: version(self.edge),
            firefox: version(self.firefox),
            ie: version(self.ie),
            ios_saf: version(self.ios_saf),
            safari: version(self.safari),
            ..Browsers::default()
        })
    }
}

/// A generated bundle and, when requested, its source map as JSON.
#[derive(Debug, Clone, Default)]
pub struct Bundle {
    pub code: String,
    pub source_map: Option<String>,
}

/// Output settings shared by the script and stylesheet bundles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BundleOptions {
    /// Precede each script entry with a comment naming its source file
    pub annotate: bool,

    /// Minify the bundle
    pub minify: bool,

    /// Produce a source map alongside the bundle
    pub source_map: bool,
}

/// Asset pipeline utilities.
pub struct AssetPipeline;

impl AssetPipeline {
    /// Concatenate script entries, in order, into a single bundle.
    ///
    /// Minification runs over the concatenated output. Source maps map each
    /// bundle line back to its entry and are only produced for unminified
    /// bundles.
    pub fn bundle_scripts(
        entries: &[PathBuf],
        options: BundleOptions,
    ) -> Result<Bundle, BuildError> {
        let mut code = String::new();
        let mut map = (options.source_map && !options.minify).then(|| SourceMap::new("/"));

        for entry in entries {
            let source = fs::read_to_string(entry)
                .map_err(|e| BuildError::ReadError(format!("{}: {}", entry.display(), e)))?;
            let source = source.trim_end();

            if options.annotate {
                code.push_str(&format!("/* {} */\n", entry.display()));
            }

            if let Some(map) = map.as_mut() {
                let index = map.add_source(&entry.to_string_lossy());
                map.set_source_content(index as usize, source).map_err(source_map_error)?;

                let first_line = code.matches('\n').count() as u32;
                for line in 0..source.lines().count() as u32 {
                    map.add_mapping(
                        first_line + line,
                        0,
                        Some(OriginalLocation::new(line, 0, index, None)),
                    );
                }
            }

            code.push_str(source);
            // Guard against entries that end without a semicolon
            code.push_str("\n;\n");
        }

        if options.minify {
            if options.source_map {
                tracing::debug!("Skipping source map for minified script bundle");
            }
            code = Self::minify_script(&code)?;
        }

        let source_map = map
            .map(|mut map| map.to_json(None))
            .transpose()
            .map_err(source_map_error)?;

        Ok(Bundle { code, source_map })
    }

    /// Minify JavaScript with oxc.
    ///
    /// The source is parsed as a classic script, so top-level names stay
    /// visible to other scripts on the page.
    pub fn minify_script(source: &str) -> Result<String, BuildError> {
        use oxc_allocator::Allocator;
        use oxc_codegen::{Codegen, CodegenOptions};
        use oxc_minifier::{Minifier, MinifierOptions};
        use oxc_parser::Parser;
        use oxc_span::SourceType;

        let allocator = Allocator::default();
        let parsed = Parser::new(&allocator, source, SourceType::cjs()).parse();

        if let Some(error) = parsed.errors.first() {
            return Err(BuildError::ScriptError(error.to_string()));
        }

        let mut program = parsed.program;
        let minified = Minifier::new(MinifierOptions::default()).build(&allocator, &mut program);

        let output = Codegen::new()
            .with_options(CodegenOptions::minify())
            .with_scoping(minified.scoping)
            .build(&program);

        Ok(output.code)
    }

    /// Compile one stylesheet entry with lightningcss.
    ///
    /// `@import` rules are inlined, vendor prefixes are added for `targets`,
    /// and the output is minified when `minify` is set. Mappings for the
    /// printed CSS are recorded in `source_map` when one is given.
    pub fn compile_stylesheet(
        entry: &Path,
        targets: BrowserTargets,
        minify: bool,
        mut source_map: Option<&mut SourceMap>,
    ) -> Result<String, BuildError> {
        use lightningcss::bundler::{Bundler, FileProvider};
        use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions};

        let style_error = |message: String| BuildError::StyleError {
            path: entry.display().to_string(),
            message,
        };

        let provider = FileProvider::new();

        let mut stylesheet = {
            let mut bundler =
                Bundler::new(&provider, source_map.as_deref_mut(), ParserOptions::default());
            bundler
                .bundle(entry)
                .map_err(|e| style_error(e.to_string()))?
        };

        stylesheet
            .minify(MinifyOptions {
                targets: targets.to_targets(),
                ..Default::default()
            })
            .map_err(|e| style_error(e.to_string()))?;

        let output = stylesheet
            .to_css(PrinterOptions {
                minify,
                targets: targets.to_targets(),
                source_map: source_map.as_deref_mut(),
                ..Default::default()
            })
            .map_err(|e| style_error(e.to_string()))?;

        Ok(output.code)
    }

    /// Compile all stylesheet entries into one bundle.
    ///
    /// Each entry's source map is shifted by the lines that precede it in
    /// the bundle before being merged.
    pub fn bundle_stylesheets(
        entries: &[PathBuf],
        targets: BrowserTargets,
        options: BundleOptions,
    ) -> Result<Bundle, BuildError> {
        let mut code = String::new();
        let mut map = options.source_map.then(|| SourceMap::new("/"));

        for entry in entries {
            if !code.is_empty() {
                code.push('\n');
            }

            let mut entry_map = map.is_some().then(|| SourceMap::new("/"));
            let css =
                Self::compile_stylesheet(entry, targets, options.minify, entry_map.as_mut())?;

            if let (Some(map), Some(entry_map)) = (map.as_mut(), entry_map.as_mut()) {
                let line_offset = code.matches('\n').count() as i64;
                map.add_sourcemap(entry_map, line_offset).map_err(source_map_error)?;
            }

            code.push_str(&css);
        }

        let source_map = map
            .map(|mut map| map.to_json(None))
            .transpose()
            .map_err(source_map_error)?;

        Ok(Bundle { code, source_map })
    }

    /// Copy the files under `rule.from` into `output_dir/rule.to`.
    ///
    /// Returns the number of files copied. A missing source directory is
    /// skipped with a warning.
    pub fn copy_tree(rule: &CopyRule, output_dir: &Path) -> Result<usize, BuildError> {
        if !rule.from.exists() {
            tracing::warn!("Asset directory not found: {}", rule.from.display());
            return Ok(0);
        }

        let destination = output_dir.join(&rule.to);
        let mut count = 0;

        for entry in WalkDir::new(&rule.from).follow_links(true) {
            let entry = entry.map_err(|e| BuildError::ReadError(e.to_string()))?;
            let path = entry.path();

            if !path.is_file() {
                continue;
            }

            let relative = path.strip_prefix(&rule.from).unwrap_or(path);
            let target = destination.join(relative);

            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| BuildError::WriteError(e.to_string()))?;
            }

            fs::copy(path, &target)
                .map_err(|e| BuildError::WriteError(format!("{}: {}", target.display(), e)))?;
            count += 1;
        }

        tracing::debug!(
            "Copied {} files from {} to {}",
            count,
            rule.from.display(),
            destination.display()
        );

        Ok(count)
    }
}
