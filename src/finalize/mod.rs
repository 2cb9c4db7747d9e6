//! Post-injection model finalizers
//!
//! A finalizer is a named function over the injected model. The builder
//! runs each registered finalizer exactly once, in registration order, after
//! management injection. Management is not re-applied afterwards: a
//! finalizer that adds manageable entries injects them itself.

use std::fmt;

use pom_model::Model;
use tracing::debug;

use crate::management::inject_dependencies;
use crate::merge::merge_optional;
use crate::problem::ProblemCollector;

type FinalizeFn = dyn Fn(Model, &mut ProblemCollector) -> Model + Send + Sync;

pub struct Finalizer {
    name: String,
    run: Box<FinalizeFn>,
}

impl Finalizer {
    pub fn new(
        name: impl Into<String>,
        run: impl Fn(Model, &mut ProblemCollector) -> Model + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            run: Box::new(run),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn finalize(&self, model: Model, problems: &mut ProblemCollector) -> Model {
        debug!(finalizer = %self.name, "running finalizer");
        (self.run)(model, problems)
    }
}

impl fmt::Debug for Finalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Finalizer").field("name", &self.name).finish()
    }
}

/// Run `finalizers` in order, once each.
pub fn run_all(finalizers: &[Finalizer], model: Model, problems: &mut ProblemCollector) -> Model {
    finalizers
        .iter()
        .fold(model, |model, finalizer| finalizer.finalize(model, problems))
}

/// Merge each plugin's configuration into each of its executions, the
/// execution's own configuration dominant.
pub fn plugin_configuration_expansion() -> Finalizer {
    Finalizer::new("plugin-configuration-expansion", |mut model, _| {
        for plugin in &mut model.plugins {
            let Some(config) = &plugin.configuration else {
                continue;
            };
            for execution in &mut plugin.executions {
                execution.configuration = merge_optional(execution.configuration.take(), Some(config.clone()));
            }
        }
        model
    })
}

/// For every classifier-less managed dependency, add a managed entry per
/// classifier unless one exists, then inject the new entries into matching
/// declared dependencies.
pub fn classifier_management(classifiers: Vec<String>) -> Finalizer {
    Finalizer::new("classifier-management", move |mut model, _| {
        let mut added = Vec::new();
        for managed in model
            .dependency_management
            .iter()
            .filter(|d| d.classifier.as_deref().map_or(true, str::is_empty))
        {
            for classifier in &classifiers {
                let mut entry = managed.clone();
                entry.classifier = Some(classifier.clone());
                let key = entry.management_key();
                let exists = model
                    .dependency_management
                    .iter()
                    .chain(added.iter())
                    .any(|d| d.management_key() == key);
                if !exists {
                    added.push(entry);
                }
            }
        }
        if added.is_empty() {
            return model;
        }

        let injected = inject_dependencies(&mut model.dependencies, &added);
        debug!(added = added.len(), injected, "added classifier management");
        model.dependency_management.extend(added);
        model
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pom_model::{ConfigNode, Dependency, Execution, Plugin};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_each_finalizer_runs_once_in_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let first_calls = Arc::clone(&calls);
        let finalizers = vec![
            Finalizer::new("first", move |model, _| {
                first_calls.fetch_add(1, Ordering::SeqCst);
                model.with_property("order", "first")
            }),
            Finalizer::new("second", |mut model, _| {
                let order = model.properties.get("order").cloned().unwrap_or_default();
                model.properties.insert("order".into(), format!("{},second", order));
                model
            }),
        ];

        let mut problems = ProblemCollector::new();
        let model = run_all(&finalizers, Model::new("g", "a", "1"), &mut problems);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(model.properties["order"], "first,second");
        assert_eq!(format!("{:?}", finalizers[0]), "Finalizer { name: \"first\" }");
    }

    #[test]
    fn test_plugin_configuration_expansion() {
        let plugin = Plugin::new("org.acme", "tool")
            .with_configuration(
                ConfigNode::new("configuration")
                    .with_child(ConfigNode::leaf("fork", "true"))
                    .with_child(ConfigNode::leaf("level", "info")),
            )
            .with_execution(
                Execution::new("check")
                    .with_configuration(ConfigNode::new("configuration").with_child(ConfigNode::leaf("level", "debug"))),
            )
            .with_execution(Execution::new("other"));
        let model = Model::new("g", "a", "1").with_plugin(plugin);

        let mut problems = ProblemCollector::new();
        let model = plugin_configuration_expansion().finalize(model, &mut problems);

        let executions = &model.plugins[0].executions;
        let check = executions[0].configuration.as_ref().unwrap();
        assert_eq!(check.child("level").and_then(|c| c.value.as_deref()), Some("debug"));
        assert_eq!(check.child("fork").and_then(|c| c.value.as_deref()), Some("true"));
        let other = executions[1].configuration.as_ref().unwrap();
        assert_eq!(other.child("level").and_then(|c| c.value.as_deref()), Some("info"));
    }

    #[test]
    fn test_classifier_management_injects_its_own_entries() {
        let model = Model::new("g", "a", "1")
            .with_dependency(Dependency::new("org.acme", "lib").with_classifier("tests"))
            .with_dependency(Dependency::new("org.acme", "lib").with_classifier("sources"))
            .with_managed_dependency(Dependency::new("org.acme", "lib").with_version("2.0"))
            .with_managed_dependency(
                Dependency::new("org.acme", "lib")
                    .with_classifier("sources")
                    .with_version("2.0-src"),
            );

        let mut problems = ProblemCollector::new();
        let model = classifier_management(vec!["tests".into(), "sources".into()]).finalize(model, &mut problems);

        assert_eq!(model.dependency_management.len(), 3);
        assert_eq!(model.dependencies[0].version.as_deref(), Some("2.0"));
        // only entries added by this finalizer are injected
        assert_eq!(model.dependencies[1].version, None);
    }
}
