//! Scaffold a new site.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Run the init command.
pub fn run(config_path: &Path, yes: bool) -> Result<()> {
    tracing::info!("Initializing quire...");

    let src_dir = Path::new("src");
    if src_dir.exists() && !yes {
        tracing::warn!("src/ directory already exists. Use --yes to overwrite.");
        return Ok(());
    }

    write_scaffold(config_path, Path::new("."), yes)?;

    tracing::info!("Initialization complete!");
    tracing::info!("Run 'quire dev' to start the development server.");

    Ok(())
}

/// Write the config file and starter sources under `root`.
fn write_scaffold(config_path: &Path, root: &Path, overwrite: bool) -> Result<()> {
    let files = [
        ("src/html/pages/index.html", DEFAULT_INDEX),
        ("src/html/pages/about.html", DEFAULT_ABOUT),
        ("src/html/includes/head.html", DEFAULT_HEAD),
        ("src/html/includes/header.html", DEFAULT_HEADER),
        ("src/js/index.js", DEFAULT_JS),
        ("src/css/index.css", DEFAULT_CSS),
        ("src/css/base.css", DEFAULT_BASE_CSS),
    ];

    let config = root.join(config_path);
    if !config.exists() || overwrite {
        fs::write(&config, DEFAULT_CONFIG)
            .with_context(|| format!("Failed to write {}", config.display()))?;
        tracing::info!("Created {}", config_path.display());
    }

    for (relative, content) in files {
        let path = root.join(relative);
        if path.exists() && !overwrite {
            continue;
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&path, content).with_context(|| format!("Failed to write {}", relative))?;
        tracing::info!("Created {}", relative);
    }

    let assets = root.join("src/assets");
    fs::create_dir_all(&assets).context("Failed to create assets directory")?;

    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# Quire Configuration

[pages]
# Every file in this directory becomes one page
dir = "src/html/pages"

# Partials available to {% include %}
includes = "src/html/includes"

# Add bundle <script>/<link> tags to pages automatically
inject_assets = false

[bundle]
scripts = ["src/js/index.js"]
styles = ["src/css/index.css"]
script_output = "app.bundle.js"
style_output = "app.bundle.css"

# Oldest browsers to add vendor prefixes for
targets = { ie = 10, ios_saf = 8 }

[[copy]]
from = "src/assets"
to = "assets"

[build]
output = "public"

[server]
port = 3000
compress = true
overlay = true
fallback = "index.html"
"#;

const DEFAULT_HEAD: &str = r#"<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
{% if stylesheet %}<link rel="stylesheet" href="{{ stylesheet }}">{% endif %}
"#;

const DEFAULT_HEADER: &str = r#"<header class="site-header">
  <a href="index.html"{% if page == "index" %} class="active"{% endif %}>Home</a>
  <a href="about.html"{% if page == "about" %} class="active"{% endif %}>About</a>
</header>
"#;

const DEFAULT_INDEX: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  {% include "head.html" %}
  <title>Home</title>
</head>
<body>
  {% include "header.html" %}
  <main>
    <h1>Welcome</h1>
    <p>Edit <code>src/html/pages/index.html</code> to get started.</p>
  </main>
  {% if script %}<script src="{{ script }}"></script>{% endif %}
</body>
</html>
"#;

const DEFAULT_ABOUT: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  {% include "head.html" %}
  <title>About</title>
</head>
<body>
  {% include "header.html" %}
  <main>
    <h1>About</h1>
    <p>Built in {{ mode }} mode.</p>
  </main>
  {% if script %}<script src="{{ script }}"></script>{% endif %}
</body>
</html>
"#;

const DEFAULT_JS: &str = r#"document.addEventListener('DOMContentLoaded', function () {
  document.documentElement.classList.add('js');
});
"#;

const DEFAULT_CSS: &str = r#"@import "base.css";

.site-header {
  display: flex;
  gap: 1rem;
  padding: 1rem 2rem;
  user-select: none;
}

.site-header a.active {
  font-weight: 700;
}

main {
  padding: 2rem;
}
"#;

const DEFAULT_BASE_CSS: &str = r#"* {
  box-sizing: border-box;
  margin: 0;
}

body {
  font-family: system-ui, -apple-system, sans-serif;
  line-height: 1.6;
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn scaffolds_site() {
        let temp = tempdir().unwrap();

        write_scaffold(Path::new("quire.toml"), temp.path(), false).unwrap();

        assert!(temp.path().join("quire.toml").exists());
        assert!(temp.path().join("src/html/pages/index.html").exists());
        assert!(temp.path().join("src/html/includes/header.html").exists());
        assert!(temp.path().join("src/js/index.js").exists());
        assert!(temp.path().join("src/css/index.css").exists());
        assert!(temp.path().join("src/assets").is_dir());
    }

    #[test]
    fn keeps_existing_files_without_overwrite() {
        let temp = tempdir().unwrap();
        let index = temp.path().join("src/html/pages/index.html");
        fs::create_dir_all(index.parent().unwrap()).unwrap();
        fs::write(&index, "mine").unwrap();

        write_scaffold(Path::new("quire.toml"), temp.path(), false).unwrap();

        assert_eq!(fs::read_to_string(&index).unwrap(), "mine");
    }

    /// Build config for a scaffold under `root`, with paths made absolute.
    fn scaffold_config(root: &Path) -> quire_static::BuildConfig {
        use quire_static::Mode;

        let file = crate::config::load_config(&root.join("quire.toml")).unwrap();
        let mut build = file.build_config(Mode::Production, None, None);
        build.pages_dir = root.join(&build.pages_dir);
        build.includes_dir = build.includes_dir.map(|dir| root.join(dir));
        build.output_dir = root.join(&build.output_dir);
        build.scripts = build.scripts.iter().map(|p| root.join(p)).collect();
        build.styles = build.styles.iter().map(|p| root.join(p)).collect();
        for rule in &mut build.copy {
            rule.from = root.join(&rule.from);
        }
        build
    }

    #[test]
    fn scaffold_builds() {
        use quire_static::StaticBuilder;

        let temp = tempdir().unwrap();
        let root = temp.path();
        write_scaffold(Path::new("quire.toml"), root, false).unwrap();

        let result = StaticBuilder::new(scaffold_config(root)).build().unwrap();

        assert_eq!(result.pages, 2);
        let index = fs::read_to_string(root.join("public/index.html")).unwrap();
        assert!(index.contains("<link rel=\"stylesheet\" href=\"app.bundle.css\">"));
        assert!(index.contains("class=\"active\">Home"));
        let css = fs::read_to_string(root.join("public/app.bundle.css")).unwrap();
        assert!(css.contains(".site-header"));
        assert!(css.contains("box-sizing"));
    }

    #[test]
    fn scaffold_omits_tags_for_missing_bundles() {
        use quire_static::StaticBuilder;

        let temp = tempdir().unwrap();
        let root = temp.path();
        write_scaffold(Path::new("quire.toml"), root, false).unwrap();

        let mut build = scaffold_config(root);
        build.scripts.clear();
        build.styles.clear();
        StaticBuilder::new(build).build().unwrap();

        let index = fs::read_to_string(root.join("public/index.html")).unwrap();
        assert!(!index.contains("href=\"none\""));
        assert!(!index.contains("src=\"none\""));
        assert!(!index.contains("<link rel=\"stylesheet\""));
        assert!(!index.contains("<script"));
    }

    #[test]
    fn default_config_parses() {
        let config: crate::config::ConfigFile = toml::from_str(DEFAULT_CONFIG).unwrap();

        assert_eq!(config.pages.dir, "src/html/pages");
        assert_eq!(config.bundle.targets.unwrap().ie, Some(10));
    }
}
