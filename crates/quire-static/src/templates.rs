//! Template engine for rendering pages.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use minijinja::{context, Environment};
use quire_plan::ArtifactDescriptor;
use regex::Regex;

use crate::builder::BuildError;

static HEAD_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</head\s*>").expect("valid regex"));
static BODY_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</body\s*>").expect("valid regex"));

/// Values exposed to every page template.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    /// Base name of the page (`about` for `about.html`)
    pub page: String,
    /// Build mode ("development" or "production")
    pub mode: String,
    /// Script bundle URL, if a script bundle was produced
    pub script: Option<String>,
    /// Stylesheet bundle URL, if a stylesheet bundle was produced
    pub stylesheet: Option<String>,
    /// Live reload client URL (dev server only)
    pub live_reload: Option<String>,
}

/// Template engine using minijinja.
///
/// Page templates are rendered from their source file; `{% include %}` and
/// `{% extends %}` resolve against the includes directory.
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    /// Create a template engine, optionally loading partials from `includes_dir`.
    pub fn new(includes_dir: Option<&Path>) -> Self {
        let mut env = Environment::new();

        if let Some(dir) = includes_dir {
            env.set_loader(minijinja::path_loader(dir));
        }

        Self { env }
    }

    /// Render the template behind `descriptor`.
    pub fn render_page(
        &self,
        descriptor: &ArtifactDescriptor,
        context: &PageContext,
    ) -> Result<String, BuildError> {
        let source = fs::read_to_string(&descriptor.source_path).map_err(|e| {
            BuildError::ReadError(format!("{}: {}", descriptor.source_path.display(), e))
        })?;

        let name = descriptor
            .source_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&descriptor.output_name);

        let mut html = self
            .env
            .render_named_str(
                name,
                &source,
                context! {
                    page => &context.page,
                    mode => &context.mode,
                    script => &context.script,
                    stylesheet => &context.stylesheet,
                    live_reload => &context.live_reload,
                },
            )
            .map_err(|e| BuildError::TemplateError(format!("{}: {:#}", name, e)))?;

        if descriptor.inject_assets {
            if let Some(href) = &context.stylesheet {
                let tag = format!("<link rel=\"stylesheet\" href=\"{}\">\n", href);
                html = insert_before(&html, &HEAD_CLOSE, &tag);
            }
            if let Some(src) = &context.script {
                let tag = format!("<script src=\"{}\"></script>\n", src);
                html = insert_before(&html, &BODY_CLOSE, &tag);
            }
        }

        if let Some(src) = &context.live_reload {
            let tag = format!("<script src=\"{}\"></script>\n", src);
            html = insert_before(&html, &BODY_CLOSE, &tag);
        }

        Ok(html)
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Insert `tag` before the last match of `pattern`, or append it.
fn insert_before(html: &str, pattern: &Regex, tag: &str) -> String {
    match pattern.find_iter(html).last() {
        Some(m) => format!("{}{}{}", &html[..m.start()], tag, &html[m.start()..]),
        None => format!("{}{}", html, tag),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn descriptor(path: PathBuf, inject_assets: bool) -> ArtifactDescriptor {
        ArtifactDescriptor {
            output_name: "index.html".to_string(),
            source_path: path,
            inject_assets,
        }
    }

    fn bundles() -> PageContext {
        PageContext {
            page: "index".to_string(),
            mode: "production".to_string(),
            script: Some("app.bundle.js".to_string()),
            stylesheet: Some("app.bundle.css".to_string()),
            live_reload: None,
        }
    }

    #[test]
    fn renders_context_values() {
        let temp = tempdir().unwrap();
        let page = temp.path().join("index.html");
        fs::write(&page, "<title>{{ page }}</title><p>{{ mode }}</p>").unwrap();

        let engine = TemplateEngine::default();
        let html = engine
            .render_page(&descriptor(page, false), &bundles())
            .unwrap();

        assert!(html.contains("<title>index</title>"));
        assert!(html.contains("<p>production</p>"));
    }

    #[test]
    fn resolves_includes() {
        let temp = tempdir().unwrap();
        let includes = temp.path().join("includes");
        fs::create_dir_all(&includes).unwrap();
        fs::write(includes.join("header.html"), "<header>Site</header>").unwrap();
        let page = temp.path().join("index.html");
        fs::write(&page, "{% include \"header.html\" %}<main></main>").unwrap();

        let engine = TemplateEngine::new(Some(&includes));
        let html = engine
            .render_page(&descriptor(page, false), &bundles())
            .unwrap();

        assert!(html.contains("<header>Site</header><main></main>"));
    }

    #[test]
    fn leaves_pages_alone_without_injection() {
        let temp = tempdir().unwrap();
        let page = temp.path().join("index.html");
        fs::write(&page, "<html><head></head><body></body></html>").unwrap();

        let html = TemplateEngine::default()
            .render_page(&descriptor(page, false), &bundles())
            .unwrap();

        assert_eq!(html, "<html><head></head><body></body></html>");
    }

    #[test]
    fn injects_bundle_tags() {
        let temp = tempdir().unwrap();
        let page = temp.path().join("index.html");
        fs::write(&page, "<html><head></head><body></body></html>").unwrap();

        let html = TemplateEngine::default()
            .render_page(&descriptor(page, true), &bundles())
            .unwrap();

        let link = html.find("app.bundle.css").unwrap();
        let head = html.find("</head>").unwrap();
        let script = html.find("app.bundle.js").unwrap();
        let body = html.find("</body>").unwrap();
        assert!(link < head);
        assert!(head < script && script < body);
    }

    #[test]
    fn appends_tags_to_fragments() {
        let temp = tempdir().unwrap();
        let page = temp.path().join("index.html");
        fs::write(&page, "<p>fragment</p>").unwrap();

        let html = TemplateEngine::default()
            .render_page(&descriptor(page, true), &bundles())
            .unwrap();

        assert!(html.starts_with("<p>fragment</p>"));
        assert!(html.contains("<script src=\"app.bundle.js\"></script>"));
    }

    #[test]
    fn adds_live_reload_client() {
        let temp = tempdir().unwrap();
        let page = temp.path().join("index.html");
        fs::write(&page, "<body></body>").unwrap();

        let context = PageContext {
            live_reload: Some("/__quire/client.js".to_string()),
            ..bundles()
        };
        let html = TemplateEngine::default()
            .render_page(&descriptor(page, false), &context)
            .unwrap();

        assert_eq!(
            html,
            "<body><script src=\"/__quire/client.js\"></script>\n</body>"
        );
    }

    #[test]
    fn reports_template_errors() {
        let temp = tempdir().unwrap();
        let page = temp.path().join("index.html");
        fs::write(&page, "{% include \"missing.html\" %}").unwrap();

        let result = TemplateEngine::default().render_page(&descriptor(page, false), &bundles());

        assert!(matches!(result, Err(BuildError::TemplateError(_))));
    }
}
