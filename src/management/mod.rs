//! Management injection
//!
//! Runs once on the fully merged, interpolated model. Declared dependencies
//! and plugins take the fields they leave unset from the matching
//! `dependencyManagement` / `pluginManagement` entry. A declared field is
//! never overwritten.
//!
//! Entries imported from `scope=import` descriptors are merged in before
//! injection, recessively: an imported entry only lands when its management
//! key is not managed yet, and earlier imports win over later ones.

use std::collections::{HashMap, HashSet};

use pom_model::{Dependency, DependencyKey, Exclusion, Model, Plugin, PluginKey};
use tracing::debug;

use crate::merge::{merge_exclusions, merge_plugin};

/// Apply dependency and plugin management to `model`.
pub fn inject(mut model: Model) -> Model {
    let injected = inject_dependencies(&mut model.dependencies, &model.dependency_management);
    let managed_plugins = inject_plugins(&mut model.plugins, &model.plugin_management);
    debug!(
        model = %model.display_id(),
        dependencies = injected,
        plugins = managed_plugins,
        "injected management"
    );
    model
}

/// Fill `dependencies` from `managed`. Returns how many declarations
/// matched a managed entry.
pub fn inject_dependencies(dependencies: &mut [Dependency], managed: &[Dependency]) -> usize {
    if managed.is_empty() {
        return 0;
    }
    let index: HashMap<DependencyKey, &Dependency> = managed
        .iter()
        .rev()
        .map(|d| (d.management_key(), d))
        .collect();

    let mut matched = 0;
    for dependency in dependencies.iter_mut() {
        if let Some(entry) = index.get(&dependency.management_key()) {
            apply_dependency_management(dependency, entry);
            matched += 1;
        }
    }
    matched
}

/// Whether a managed entry pulls in another descriptor's management.
pub fn is_import(dependency: &Dependency) -> bool {
    dependency.type_.as_deref() == Some("pom") && dependency.scope.as_deref() == Some("import")
}

/// Append imported entries whose management key is not in `managed` yet.
/// Imports are taken in declaration order. Returns how many were added.
pub fn import_dependencies(managed: &mut Vec<Dependency>, imports: Vec<Vec<Dependency>>) -> usize {
    let mut seen: HashSet<DependencyKey> = managed.iter().map(Dependency::management_key).collect();
    let before = managed.len();
    for dependency in imports.into_iter().flatten() {
        if seen.insert(dependency.management_key()) {
            managed.push(dependency);
        }
    }
    managed.len() - before
}

/// Drop imported entries matched by one of the import's exclusions and carry
/// the exclusions onto the entries that remain. `*` matches any group or
/// artifact.
pub fn exclude_imported(imported: Vec<Dependency>, exclusions: &[Exclusion]) -> Vec<Dependency> {
    if exclusions.is_empty() {
        return imported;
    }
    imported
        .into_iter()
        .filter(|candidate| !exclusions.iter().any(|e| excludes(e, candidate)))
        .map(|mut candidate| {
            candidate.exclusions = merge_exclusions(candidate.exclusions, exclusions.to_vec());
            candidate
        })
        .collect()
}

fn excludes(exclusion: &Exclusion, candidate: &Dependency) -> bool {
    let matches = |pattern: &str, value: &str| pattern == "*" || pattern == value;
    matches(&exclusion.group_id, &candidate.group_id) && matches(&exclusion.artifact_id, &candidate.artifact_id)
}

fn apply_dependency_management(dependency: &mut Dependency, managed: &Dependency) {
    if dependency.version.is_none() {
        dependency.version = managed.version.clone();
    }
    if dependency.scope.is_none() {
        dependency.scope = managed.scope.clone();
    }
    if dependency.optional.is_none() {
        dependency.optional = managed.optional;
    }
    if dependency.exclusions.is_empty() {
        dependency.exclusions = managed.exclusions.clone();
    }
}

fn inject_plugins(plugins: &mut [Plugin], managed: &[Plugin]) -> usize {
    if managed.is_empty() {
        return 0;
    }
    let index: HashMap<PluginKey, &Plugin> = managed.iter().rev().map(|p| (p.key(), p)).collect();

    let mut matched = 0;
    for plugin in plugins.iter_mut() {
        if let Some(entry) = index.get(&plugin.key()) {
            *plugin = merge_plugin(plugin.clone(), (*entry).clone());
            matched += 1;
        }
    }
    matched
}
