//! Page plan generation for quire.
//!
//! Scans a directory of page templates and derives one [`ArtifactDescriptor`]
//! per entry. The resulting plan is handed to the asset pipeline, which
//! renders one output document per descriptor.

pub mod plan;
pub mod resource;

pub use plan::{generate_plan, ArtifactDescriptor, PlanError, PlanOptions};
pub use resource::{NameError, TemplateResource};
