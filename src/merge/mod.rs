//! Model merging
//!
//! Two operations, applied once per chain level from the root down:
//! 1. Profile overlay: a level's raw model with its active profiles on top
//! 2. Inheritance: the overlaid level over the parent's effective model
//!
//! Scalars: the dominant side wins when set. Lists merge by key (see
//! [`keyed`]). Configuration trees merge recursively (see [`config`]).

pub mod config;
pub mod keyed;
pub mod path;

use std::collections::BTreeMap;

use pom_model::{BuildSettings, DistributionManagement, Model, Profile, Scm, DEFAULT_PACKAGING};

pub use config::{merge_config, merge_optional};
pub use keyed::{
    inheritable_plugins, merge_dependencies, merge_dependency, merge_exclusions, merge_executions,
    merge_keyed, merge_plugin, merge_plugins,
};
pub use path::{append_path, inherit_path_field, module_path};

/// Merge `child` (already profile-overlaid) over the parent's effective
/// model. `module_path` is appended to inherited path fields.
///
/// Not inherited: artifactId, packaging (defaults to `jar`), name, modules
/// and profiles.
pub fn inherit(child: Model, parent: &Model, module_path: &str) -> Model {
    Model {
        parent: child.parent,
        group_id: child.group_id.or_else(|| parent.group_id.clone()),
        artifact_id: child.artifact_id,
        version: child.version.or_else(|| parent.version.clone()),
        packaging: child
            .packaging
            .or_else(|| Some(DEFAULT_PACKAGING.to_string())),
        name: child.name,
        description: child.description.or_else(|| parent.description.clone()),
        url: inherit_path_field(child.url, &parent.url, module_path),
        scm: Scm {
            url: inherit_path_field(child.scm.url, &parent.scm.url, module_path),
            connection: inherit_path_field(child.scm.connection, &parent.scm.connection, module_path),
            developer_connection: inherit_path_field(
                child.scm.developer_connection,
                &parent.scm.developer_connection,
                module_path,
            ),
            tag: child.scm.tag.or_else(|| parent.scm.tag.clone()),
        },
        distribution_management: DistributionManagement {
            url: inherit_path_field(
                child.distribution_management.url,
                &parent.distribution_management.url,
                module_path,
            ),
        },
        properties: merge_properties(child.properties, &parent.properties),
        dependencies: merge_dependencies(child.dependencies, parent.dependencies.clone()),
        dependency_management: merge_dependencies(
            child.dependency_management,
            parent.dependency_management.clone(),
        ),
        build: merge_build(child.build, &parent.build),
        plugins: merge_plugins(child.plugins, inheritable_plugins(&parent.plugins)),
        plugin_management: merge_plugins(
            child.plugin_management,
            inheritable_plugins(&parent.plugin_management),
        ),
        profiles: child.profiles,
        modules: child.modules,
    }
}

/// Apply one profile over `base`, the profile being dominant.
pub fn apply_profile(base: Model, profile: &Profile) -> Model {
    let mut modules = base.modules;
    for module in &profile.modules {
        if !modules.contains(module) {
            modules.push(module.clone());
        }
    }
    Model {
        properties: merge_properties(profile.properties.clone(), &base.properties),
        dependencies: merge_dependencies(profile.dependencies.clone(), base.dependencies),
        dependency_management: merge_dependencies(
            profile.dependency_management.clone(),
            base.dependency_management,
        ),
        build: merge_build(profile.build.clone(), &base.build),
        plugins: merge_plugins(profile.plugins.clone(), base.plugins),
        plugin_management: merge_plugins(profile.plugin_management.clone(), base.plugin_management),
        modules,
        ..base
    }
}

/// Overlay the active profiles of one level over its raw model. The first
/// declared profile dominates the later ones; the base ranks lowest.
pub fn overlay_profiles<'a>(base: Model, active: impl DoubleEndedIterator<Item = &'a Profile>) -> Model {
    active.rev().fold(base, apply_profile)
}

fn merge_properties(
    dominant: BTreeMap<String, String>,
    recessive: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = recessive.clone();
    merged.extend(dominant);
    merged
}

fn merge_build(dominant: BuildSettings, recessive: &BuildSettings) -> BuildSettings {
    BuildSettings {
        default_goal: dominant.default_goal.or_else(|| recessive.default_goal.clone()),
        directory: dominant.directory.or_else(|| recessive.directory.clone()),
        final_name: dominant.final_name.or_else(|| recessive.final_name.clone()),
        output_directory: dominant
            .output_directory
            .or_else(|| recessive.output_directory.clone()),
        source_directory: dominant
            .source_directory
            .or_else(|| recessive.source_directory.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pom_model::{Dependency, Parent, PathField, Plugin};

    #[test]
    fn test_inherit_fills_unset_scalars() {
        let parent = Model {
            description: Some("parent description".into()),
            name: Some("Parent".into()),
            packaging: Some("pom".into()),
            ..Model::new("org.acme", "parent", "1.0")
        }
        .with_property("shared", "p")
        .with_property("over", "p");

        let child = Model {
            artifact_id: Some("child".into()),
            parent: Some(Parent::new("org.acme", "parent", "1.0")),
            ..Model::default()
        }
        .with_property("over", "c");

        let effective = inherit(child, &parent, "child");
        assert_eq!(effective.group_id.as_deref(), Some("org.acme"));
        assert_eq!(effective.version.as_deref(), Some("1.0"));
        assert_eq!(effective.description.as_deref(), Some("parent description"));
        assert_eq!(effective.name, None);
        assert_eq!(effective.packaging.as_deref(), Some("jar"));
        assert_eq!(effective.properties["shared"], "p");
        assert_eq!(effective.properties["over"], "c");
    }

    #[test]
    fn test_inherit_appends_module_path() {
        let mut parent = Model::new("g", "p0", "1");
        parent.scm.url = PathField::new("http://host/p0");

        let effective = inherit(Model::new("g", "p1", "1"), &parent, "modules/p1");
        assert_eq!(effective.scm.url.as_deref(), Some("http://host/p0/modules/p1"));
    }

    #[test]
    fn test_inherit_skips_private_plugins() {
        let parent = Model::new("g", "p", "1")
            .with_plugin(Plugin::new("g", "private").with_inherited(false))
            .with_plugin(Plugin::new("g", "shared").with_version("1"));

        let effective = inherit(Model::new("g", "c", "1"), &parent, "c");
        assert_eq!(effective.plugins.len(), 1);
        assert_eq!(effective.plugins[0].artifact_id, "shared");
    }

    #[test]
    fn test_profile_overlay_first_declared_wins() {
        let base = Model::new("g", "a", "1").with_property("env", "base");
        let first = Profile::new("first").with_property("env", "first");
        let second = Profile::new("second")
            .with_property("env", "second")
            .with_property("only-second", "yes");

        let overlaid = overlay_profiles(base, [&first, &second].into_iter());
        assert_eq!(overlaid.properties["env"], "first");
        assert_eq!(overlaid.properties["only-second"], "yes");
    }

    #[test]
    fn test_profile_overlay_unions_dependencies() {
        let base = Model::new("g", "a", "1").with_dependency(Dependency::new("d", "base").with_version("1"));
        let profile = Profile::new("extra")
            .with_dependency(Dependency::new("d", "base").with_scope("test"))
            .with_dependency(Dependency::new("d", "extra").with_version("2"));

        let overlaid = apply_profile(base, &profile);
        assert_eq!(overlaid.dependencies.len(), 2);
        let base_dep = overlaid
            .dependencies
            .iter()
            .find(|d| d.artifact_id == "base")
            .unwrap();
        assert_eq!(base_dep.version.as_deref(), Some("1"));
        assert_eq!(base_dep.scope.as_deref(), Some("test"));
    }

    #[test]
    fn test_no_profiles_is_identity() {
        let base = Model::new("g", "a", "1").with_property("k", "v");
        let overlaid = overlay_profiles(base.clone(), std::iter::empty());
        assert_eq!(overlaid, base);
    }
}
