//! Project descriptor data model.
//!
//! Plain, serde-derived types describing one project descriptor: identity,
//! parent reference, dependencies, plugins, profiles and the nested
//! configuration trees plugins carry. The types hold no behavior beyond key
//! extraction and traversal; merging, activation and interpolation live in
//! the `pom-builder` crate.

pub mod config_node;
pub mod dependency;
pub mod model;
pub mod plugin;
pub mod profile;
mod visit;

pub use config_node::{ConfigNode, COMBINE_CHILDREN, COMBINE_ID, COMBINE_KEYS, COMBINE_SELF};
pub use dependency::{Dependency, DependencyKey, Exclusion};
pub use model::{BuildSettings, DistributionManagement, Model, ModelId, Parent, PathField, Scm};
pub use plugin::{Execution, Plugin, PluginKey, DEFAULT_EXECUTION_ID, DEFAULT_PLUGIN_GROUP_ID};
pub use profile::{Activation, Profile};

/// Packaging used when a descriptor does not declare one.
pub const DEFAULT_PACKAGING: &str = "jar";

/// Dependency type used when a dependency does not declare one.
pub const DEFAULT_DEPENDENCY_TYPE: &str = "jar";
