//! Directory scan and descriptor derivation.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use walkdir::WalkDir;

use crate::resource::{NameError, TemplateResource};

/// Options applied to every descriptor in a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanOptions {
    /// Extension given to generated documents (e.g. ".html")
    pub output_extension: String,

    /// Whether the pipeline should inject bundle tags into rendered pages
    pub inject_assets: bool,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            output_extension: ".html".to_string(),
            inject_assets: false,
        }
    }
}

/// Instruction to produce one output document from one template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactDescriptor {
    /// File name of the generated document
    pub output_name: String,

    /// Absolute path to the template
    pub source_path: PathBuf,

    /// Inject bundle tags into the rendered document
    pub inject_assets: bool,
}

impl ArtifactDescriptor {
    /// Derive a descriptor for `resource`, which lives in `dir`.
    pub fn from_resource(dir: &Path, resource: &TemplateResource, options: &PlanOptions) -> Self {
        let output_name = match options.output_extension.trim_start_matches('.') {
            "" => resource.base_name().to_string(),
            extension => format!("{}.{}", resource.base_name(), extension),
        };

        Self {
            output_name,
            source_path: dir.join(resource.file_name()),
            inject_assets: options.inject_assets,
        }
    }
}

/// Errors that can occur while generating a plan.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("Template directory not found: {}: {source}", path.display())]
    NotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed template name {name:?}: {reason}")]
    MalformedName {
        name: String,
        #[source]
        reason: NameError,
    },
}

/// Scan `dir` and produce one descriptor per entry, in listing order.
///
/// Every entry must be a usable template name; the first malformed one
/// fails the whole plan.
pub fn generate_plan(
    dir: &Path,
    options: &PlanOptions,
) -> Result<Vec<ArtifactDescriptor>, PlanError> {
    let not_found = |source: io::Error| PlanError::NotFound {
        path: dir.to_path_buf(),
        source,
    };

    let root = fs::canonicalize(dir).map_err(not_found)?;
    if !root.is_dir() {
        return Err(not_found(io::Error::other("not a directory")));
    }

    let mut plan = Vec::new();

    for entry in WalkDir::new(&root).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| not_found(e.into()))?;

        let Some(file_name) = entry.file_name().to_str() else {
            return Err(PlanError::MalformedName {
                name: entry.file_name().to_string_lossy().into_owned(),
                reason: NameError::NotUtf8,
            });
        };

        let resource =
            TemplateResource::parse(file_name).map_err(|reason| PlanError::MalformedName {
                name: file_name.to_string(),
                reason,
            })?;

        if !resource.extra_segments().is_empty() {
            tracing::warn!(
                "Ignoring trailing segments {:?} in template name {}",
                resource.extra_segments(),
                file_name
            );
        }

        let descriptor = ArtifactDescriptor::from_resource(&root, &resource, options);
        tracing::debug!(
            "Planned {} from {}",
            descriptor.output_name,
            descriptor.source_path.display()
        );
        plan.push(descriptor);
    }

    Ok(plan)
}
