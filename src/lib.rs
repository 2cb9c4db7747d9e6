//! pom-builder - effective project model builder
//!
//! Turns a raw project descriptor into its effective model: the parent chain
//! is resolved and merged root to leaf with active profiles overlaid, then
//! properties are interpolated, management is injected and finalizers run.
//! Every anomaly is collected as a problem; the build fails once, at the
//! end, if the problems warrant it.

pub mod builder;
pub mod config;
pub mod context;
pub mod explain;
pub mod finalize;
pub mod interpolate;
pub mod lineage;
pub mod management;
pub mod merge;
pub mod problem;
pub mod profile;
pub mod session;
pub mod signal;
pub mod source;
pub mod superpom;
pub mod validate;

pub use builder::{ModelBuilder, ModelBuildingError, ModelBuildingRequest, ModelBuildingResult};
pub use context::ActivationContext;
pub use explain::ExplainReport;
pub use problem::{ModelProblem, ProblemCollector, ProblemKind, Severity, ValidationLevel};
pub use session::BuildSession;
pub use source::{FileModelSource, LocalRepository, ModelSource, RepositorySystem, SourceError};
