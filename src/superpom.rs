//! The implicit root of every parent chain.

use pom_model::{BuildSettings, Model, Plugin, DEFAULT_PACKAGING, DEFAULT_PLUGIN_GROUP_ID};

/// Label used for the super default in chain listings and problems.
pub const SUPER_DEFAULT_ID: &str = "[super-default]";

/// Baseline values every descriptor inherits.
pub fn super_default() -> Model {
    Model {
        packaging: Some(DEFAULT_PACKAGING.to_string()),
        build: BuildSettings {
            default_goal: None,
            directory: Some("${project.basedir}/target".to_string()),
            final_name: Some("${project.artifactId}-${project.version}".to_string()),
            output_directory: Some("${project.build.directory}/classes".to_string()),
            source_directory: Some("${project.basedir}/src/main/java".to_string()),
        },
        plugin_management: vec![
            Plugin::new(DEFAULT_PLUGIN_GROUP_ID, "maven-antrun-plugin").with_version("3.1.0"),
            Plugin::new(DEFAULT_PLUGIN_GROUP_ID, "maven-assembly-plugin").with_version("3.7.1"),
            Plugin::new(DEFAULT_PLUGIN_GROUP_ID, "maven-dependency-plugin").with_version("3.7.0"),
            Plugin::new(DEFAULT_PLUGIN_GROUP_ID, "maven-release-plugin").with_version("3.0.1"),
        ],
        ..Model::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_super_default_has_no_identity() {
        let model = super_default();
        assert!(model.id().is_none());
        assert!(model.parent.is_none());
        assert_eq!(model.packaging.as_deref(), Some("jar"));
    }

    #[test]
    fn test_super_default_build_paths_are_expressions() {
        let model = super_default();
        assert_eq!(
            model.build.output_directory.as_deref(),
            Some("${project.build.directory}/classes")
        );
        assert!(model.plugin_management.iter().all(|p| p.version.is_some()));
    }
}
