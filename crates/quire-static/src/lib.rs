//! Asset pipeline for quire sites.
//!
//! Consumes a page plan and produces the output directory: rendered pages,
//! a script bundle, a stylesheet bundle and copied static assets.

pub mod assets;
pub mod builder;
pub mod templates;

pub use assets::{AssetPipeline, BrowserTargets, Bundle, BundleOptions, CopyRule};
pub use builder::{BuildConfig, BuildError, BuildResult, Mode, StaticBuilder};
pub use templates::{PageContext, TemplateEngine};
