//! Merge-by-key for dependency, plugin, execution and exclusion lists.
//!
//! Dominant entries keep their order; recessive entries with a new key are
//! appended. Entries present on both sides merge field by field, an unset
//! dominant field taking the recessive value.

use std::collections::HashMap;
use std::hash::Hash;

use pom_model::{Dependency, Execution, Exclusion, Plugin};

use super::config::merge_optional;

/// Generic keyed merge. Only the first dominant entry per key takes part in
/// matching; duplicates are left for validation to report.
pub fn merge_keyed<T, K>(
    dominant: Vec<T>,
    recessive: Vec<T>,
    key: impl Fn(&T) -> K,
    merge: impl Fn(T, T) -> T,
) -> Vec<T>
where
    K: Eq + Hash,
{
    if recessive.is_empty() {
        return dominant;
    }

    let mut slots: Vec<Option<T>> = Vec::with_capacity(dominant.len() + recessive.len());
    let mut index: HashMap<K, usize> = HashMap::new();
    for entry in dominant {
        index.entry(key(&entry)).or_insert(slots.len());
        slots.push(Some(entry));
    }

    for entry in recessive {
        let k = key(&entry);
        match index.get(&k) {
            Some(&pos) => {
                if let Some(existing) = slots[pos].take() {
                    slots[pos] = Some(merge(existing, entry));
                }
            }
            None => {
                index.insert(k, slots.len());
                slots.push(Some(entry));
            }
        }
    }
    slots.into_iter().flatten().collect()
}

pub fn merge_dependency(dominant: Dependency, recessive: Dependency) -> Dependency {
    Dependency {
        version: dominant.version.or(recessive.version),
        type_: dominant.type_.or(recessive.type_),
        classifier: dominant.classifier.or(recessive.classifier),
        scope: dominant.scope.or(recessive.scope),
        optional: dominant.optional.or(recessive.optional),
        exclusions: merge_exclusions(dominant.exclusions, recessive.exclusions),
        ..dominant
    }
}

pub fn merge_dependencies(dominant: Vec<Dependency>, recessive: Vec<Dependency>) -> Vec<Dependency> {
    merge_keyed(dominant, recessive, Dependency::management_key, merge_dependency)
}

/// Set union keyed by (groupId, artifactId).
pub fn merge_exclusions(dominant: Vec<Exclusion>, recessive: Vec<Exclusion>) -> Vec<Exclusion> {
    merge_keyed(
        dominant,
        recessive,
        |e| (e.group_id.clone(), e.artifact_id.clone()),
        |d, _| d,
    )
}

pub fn merge_plugin(dominant: Plugin, recessive: Plugin) -> Plugin {
    Plugin {
        version: dominant.version.or(recessive.version),
        extensions: dominant.extensions.or(recessive.extensions),
        inherited: dominant.inherited.or(recessive.inherited),
        executions: merge_executions(dominant.executions, recessive.executions),
        dependencies: merge_dependencies(dominant.dependencies, recessive.dependencies),
        configuration: merge_optional(dominant.configuration, recessive.configuration),
        ..dominant
    }
}

pub fn merge_plugins(dominant: Vec<Plugin>, recessive: Vec<Plugin>) -> Vec<Plugin> {
    merge_keyed(dominant, recessive, Plugin::key, merge_plugin)
}

pub fn merge_execution(dominant: Execution, recessive: Execution) -> Execution {
    let mut goals = dominant.goals;
    for goal in recessive.goals {
        if !goals.contains(&goal) {
            goals.push(goal);
        }
    }
    Execution {
        phase: dominant.phase.or(recessive.phase),
        goals,
        inherited: dominant.inherited.or(recessive.inherited),
        configuration: merge_optional(dominant.configuration, recessive.configuration),
        ..dominant
    }
}

pub fn merge_executions(dominant: Vec<Execution>, recessive: Vec<Execution>) -> Vec<Execution> {
    merge_keyed(dominant, recessive, |e| e.id.clone(), merge_execution)
}

/// Drop the entries a parent keeps to itself (`inherited=false`), both
/// plugins and individual executions.
pub fn inheritable_plugins(plugins: &[Plugin]) -> Vec<Plugin> {
    plugins
        .iter()
        .filter(|p| p.is_inherited())
        .map(|p| {
            let mut plugin = p.clone();
            plugin.executions.retain(Execution::is_inherited);
            plugin
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pom_model::ConfigNode;

    #[test]
    fn test_child_scalar_wins_and_keys_union() {
        let child = vec![Dependency::new("g", "A").with_version("1.0")];
        let parent = vec![
            Dependency::new("g", "A").with_version("0.9"),
            Dependency::new("g", "B").with_version("2.0"),
        ];

        let merged = merge_dependencies(child, parent);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].artifact_id, "A");
        assert_eq!(merged[0].version.as_deref(), Some("1.0"));
        assert_eq!(merged[1].artifact_id, "B");
        assert_eq!(merged[1].version.as_deref(), Some("2.0"));
    }

    #[test]
    fn test_unset_dominant_field_inherits() {
        let child = vec![Dependency::new("g", "A").with_version("1.0")];
        let parent = vec![Dependency::new("g", "A").with_scope("test").with_optional(true)];

        let merged = merge_dependencies(child, parent);
        assert_eq!(merged[0].scope.as_deref(), Some("test"));
        assert_eq!(merged[0].optional, Some(true));
    }

    #[test]
    fn test_classifier_is_part_of_key() {
        let child = vec![Dependency::new("g", "A").with_classifier("tests")];
        let parent = vec![Dependency::new("g", "A").with_version("1")];

        let merged = merge_dependencies(child, parent);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].version, None);
    }

    #[test]
    fn test_exclusions_union() {
        let child = vec![Dependency::new("g", "A").with_exclusion(Exclusion::new("x", "one"))];
        let parent = vec![Dependency::new("g", "A")
            .with_exclusion(Exclusion::new("x", "two"))
            .with_exclusion(Exclusion::new("x", "one"))];

        let merged = merge_dependencies(child, parent);
        let names: Vec<_> = merged[0].exclusions.iter().map(|e| e.artifact_id.as_str()).collect();
        assert_eq!(names, vec!["one", "two"]);
    }

    #[test]
    fn test_plugin_merge_unions_executions_and_goals() {
        let child = vec![Plugin::new("p", "compiler").with_execution(
            Execution::new("default").with_goal("compile"),
        )];
        let parent = vec![Plugin::new("p", "compiler")
            .with_version("3.11")
            .with_execution(Execution::new("default").with_goal("testCompile").with_phase("compile"))
            .with_execution(Execution::new("extra").with_goal("x"))];

        let merged = merge_plugins(child, parent);
        assert_eq!(merged.len(), 1);
        let plugin = &merged[0];
        assert_eq!(plugin.version.as_deref(), Some("3.11"));
        assert_eq!(plugin.executions.len(), 2);
        assert_eq!(plugin.executions[0].goals, vec!["compile", "testCompile"]);
        assert_eq!(plugin.executions[0].phase.as_deref(), Some("compile"));
        assert_eq!(plugin.executions[1].id, "extra");
    }

    #[test]
    fn test_plugin_configuration_merges_recursively() {
        let child = vec![Plugin::new("p", "c").with_configuration(
            ConfigNode::new("configuration").with_child(ConfigNode::leaf("release", "21")),
        )];
        let parent = vec![Plugin::new("p", "c").with_configuration(
            ConfigNode::new("configuration")
                .with_child(ConfigNode::leaf("release", "17"))
                .with_child(ConfigNode::leaf("encoding", "UTF-8")),
        )];

        let merged = merge_plugins(child, parent);
        let config = merged[0].configuration.as_ref().unwrap();
        assert_eq!(config.child("release").and_then(|c| c.value.as_deref()), Some("21"));
        assert_eq!(config.child("encoding").and_then(|c| c.value.as_deref()), Some("UTF-8"));
    }

    #[test]
    fn test_inheritable_plugins_filters_private_entries() {
        let plugins = vec![
            Plugin::new("p", "private").with_inherited(false),
            Plugin::new("p", "shared")
                .with_execution(Execution {
                    inherited: Some(false),
                    ..Execution::new("local")
                })
                .with_execution(Execution::new("default")),
        ];

        let inherited = inheritable_plugins(&plugins);
        assert_eq!(inherited.len(), 1);
        assert_eq!(inherited[0].artifact_id, "shared");
        assert_eq!(inherited[0].executions.len(), 1);
        assert_eq!(inherited[0].executions[0].id, "default");
    }
}
