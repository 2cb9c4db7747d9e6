//! Traversal over every string value of a model.
//!
//! Paths handed to the visitor use dotted field names with list indices,
//! e.g. `dependencies[2].version` or `properties.java.version`.

use std::collections::BTreeMap;

use crate::config_node::ConfigNode;
use crate::dependency::Dependency;
use crate::model::{BuildSettings, Model, PathField};
use crate::plugin::Plugin;
use crate::profile::Profile;

type Visitor<'a> = dyn FnMut(&str, &mut String) + 'a;

impl Model {
    /// Call `f` on every string value in the model, in declaration order.
    ///
    /// Identity keys of list entries (groupId, artifactId, ids) are visited
    /// too; profile activation conditions are not.
    pub fn visit_strings_mut(&mut self, f: &mut Visitor<'_>) {
        if let Some(parent) = &mut self.parent {
            opt(f, "parent.groupId", &mut parent.group_id);
            opt(f, "parent.artifactId", &mut parent.artifact_id);
            opt(f, "parent.version", &mut parent.version);
            opt(f, "parent.relativePath", &mut parent.relative_path);
        }
        opt(f, "groupId", &mut self.group_id);
        opt(f, "artifactId", &mut self.artifact_id);
        opt(f, "version", &mut self.version);
        opt(f, "packaging", &mut self.packaging);
        opt(f, "name", &mut self.name);
        opt(f, "description", &mut self.description);
        path_field(f, "url", &mut self.url);
        path_field(f, "scm.url", &mut self.scm.url);
        path_field(f, "scm.connection", &mut self.scm.connection);
        path_field(f, "scm.developerConnection", &mut self.scm.developer_connection);
        opt(f, "scm.tag", &mut self.scm.tag);
        path_field(
            f,
            "distributionManagement.url",
            &mut self.distribution_management.url,
        );
        properties(f, "properties", &mut self.properties);
        dependencies(f, "dependencies", &mut self.dependencies);
        dependencies(f, "dependencyManagement", &mut self.dependency_management);
        build(f, "build", &mut self.build);
        plugins(f, "plugins", &mut self.plugins);
        plugins(f, "pluginManagement", &mut self.plugin_management);
        for (i, profile) in self.profiles.iter_mut().enumerate() {
            visit_profile(f, &format!("profiles[{}]", i), profile);
        }
        for (i, module) in self.modules.iter_mut().enumerate() {
            f(&format!("modules[{}]", i), module);
        }
    }
}

fn opt(f: &mut Visitor<'_>, path: &str, value: &mut Option<String>) {
    if let Some(v) = value {
        f(path, v);
    }
}

fn path_field(f: &mut Visitor<'_>, path: &str, field: &mut PathField) {
    opt(f, path, &mut field.value);
}

fn properties(f: &mut Visitor<'_>, prefix: &str, map: &mut BTreeMap<String, String>) {
    for (key, value) in map.iter_mut() {
        f(&format!("{}.{}", prefix, key), value);
    }
}

fn build(f: &mut Visitor<'_>, prefix: &str, build: &mut BuildSettings) {
    opt(f, &format!("{}.defaultGoal", prefix), &mut build.default_goal);
    opt(f, &format!("{}.directory", prefix), &mut build.directory);
    opt(f, &format!("{}.finalName", prefix), &mut build.final_name);
    opt(f, &format!("{}.outputDirectory", prefix), &mut build.output_directory);
    opt(f, &format!("{}.sourceDirectory", prefix), &mut build.source_directory);
}

fn dependencies(f: &mut Visitor<'_>, prefix: &str, deps: &mut [Dependency]) {
    for (i, dep) in deps.iter_mut().enumerate() {
        let at = format!("{}[{}]", prefix, i);
        f(&format!("{}.groupId", at), &mut dep.group_id);
        f(&format!("{}.artifactId", at), &mut dep.artifact_id);
        opt(f, &format!("{}.version", at), &mut dep.version);
        opt(f, &format!("{}.type", at), &mut dep.type_);
        opt(f, &format!("{}.classifier", at), &mut dep.classifier);
        opt(f, &format!("{}.scope", at), &mut dep.scope);
        for (j, exclusion) in dep.exclusions.iter_mut().enumerate() {
            f(&format!("{}.exclusions[{}].groupId", at, j), &mut exclusion.group_id);
            f(&format!("{}.exclusions[{}].artifactId", at, j), &mut exclusion.artifact_id);
        }
    }
}

fn plugins(f: &mut Visitor<'_>, prefix: &str, plugins: &mut [Plugin]) {
    for (i, plugin) in plugins.iter_mut().enumerate() {
        let at = format!("{}[{}]", prefix, i);
        f(&format!("{}.groupId", at), &mut plugin.group_id);
        f(&format!("{}.artifactId", at), &mut plugin.artifact_id);
        opt(f, &format!("{}.version", at), &mut plugin.version);
        for (j, execution) in plugin.executions.iter_mut().enumerate() {
            let exec_at = format!("{}.executions[{}]", at, j);
            f(&format!("{}.id", exec_at), &mut execution.id);
            opt(f, &format!("{}.phase", exec_at), &mut execution.phase);
            for (k, goal) in execution.goals.iter_mut().enumerate() {
                f(&format!("{}.goals[{}]", exec_at, k), goal);
            }
            if let Some(node) = &mut execution.configuration {
                config_node(f, &format!("{}.configuration", exec_at), node);
            }
        }
        dependencies(f, &format!("{}.dependencies", at), &mut plugin.dependencies);
        if let Some(node) = &mut plugin.configuration {
            config_node(f, &format!("{}.configuration", at), node);
        }
    }
}

fn config_node(f: &mut Visitor<'_>, path: &str, node: &mut ConfigNode) {
    opt(f, path, &mut node.value);
    for (key, value) in node.attributes.iter_mut() {
        f(&format!("{}@{}", path, key), value);
    }
    for child in node.children.iter_mut() {
        let child_path = format!("{}.{}", path, child.name);
        config_node(f, &child_path, child);
    }
}

fn visit_profile(f: &mut Visitor<'_>, prefix: &str, profile: &mut Profile) {
    properties(f, &format!("{}.properties", prefix), &mut profile.properties);
    dependencies(f, &format!("{}.dependencies", prefix), &mut profile.dependencies);
    dependencies(
        f,
        &format!("{}.dependencyManagement", prefix),
        &mut profile.dependency_management,
    );
    build(f, &format!("{}.build", prefix), &mut profile.build);
    plugins(f, &format!("{}.plugins", prefix), &mut profile.plugins);
    plugins(f, &format!("{}.pluginManagement", prefix), &mut profile.plugin_management);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConfigNode, Dependency, Plugin};

    #[test]
    fn test_visits_nested_paths() {
        let mut model = Model::new("g", "a", "1")
            .with_property("p", "v")
            .with_dependency(Dependency::new("dg", "da").with_version("${v}"))
            .with_plugin(
                Plugin::new("pg", "pa").with_configuration(
                    ConfigNode::new("configuration").with_child(ConfigNode::leaf("source", "${s}")),
                ),
            );

        let mut seen = Vec::new();
        model.visit_strings_mut(&mut |path, value| seen.push((path.to_string(), value.clone())));

        assert!(seen.contains(&("properties.p".to_string(), "v".to_string())));
        assert!(seen.contains(&("dependencies[0].version".to_string(), "${v}".to_string())));
        assert!(seen.contains(&(
            "plugins[0].configuration.source".to_string(),
            "${s}".to_string()
        )));
    }

    #[test]
    fn test_visitor_can_rewrite() {
        let mut model = Model::new("g", "a", "1").with_property("p", "old");
        model.visit_strings_mut(&mut |_, value| {
            if value == "old" {
                *value = "new".to_string();
            }
        });
        assert_eq!(model.properties["p"], "new");
    }
}
