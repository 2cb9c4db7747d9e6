//! Semantic model validation
//!
//! Two passes:
//! - [`validate_raw`] on every declared chain level before merging. Missing
//!   identity is STRUCTURAL/FATAL. Malformed ids follow the validation
//!   level. Duplicate list entries are reported and the later one is dropped.
//! - [`validate_effective`] on the finalized model: unmanaged dependencies
//!   without a version, and plugins left without a version (WARNING).

use std::collections::HashSet;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::OnceLock;

use pom_model::{Dependency, Model, Plugin};
use regex_lite::Regex;

use crate::problem::{ModelProblem, ProblemCollector, ProblemKind, Severity, ValidationLevel};

const ID_PATTERN: &str = r"^[A-Za-z0-9_.\-]+$";

fn id_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(ID_PATTERN).ok()).as_ref()
}

/// Validate one raw model, returning it with duplicate entries removed.
pub fn validate_raw(mut model: Model, level: ValidationLevel, problems: &mut ProblemCollector) -> Model {
    let model_id = model.display_id();
    check_identity(&model, &model_id, level, problems);

    for (i, dep) in model.dependencies.iter().enumerate() {
        check_coordinates(dep, &format!("dependencies[{}]", i), &model_id, problems);
    }
    for (i, dep) in model.dependency_management.iter().enumerate() {
        check_coordinates(dep, &format!("dependencyManagement[{}]", i), &model_id, problems);
    }

    let mut dedupe = Dedupe {
        model_id: &model_id,
        problems: &mut *problems,
    };
    dedupe.dependencies(&mut model.dependencies, "dependencies", ProblemKind::ValidationViolation);
    dedupe.dependencies(
        &mut model.dependency_management,
        "dependencyManagement",
        ProblemKind::DuplicateManagementKey,
    );
    dedupe.plugins(&mut model.plugins, "plugins", ProblemKind::ValidationViolation);
    dedupe.plugins(
        &mut model.plugin_management,
        "pluginManagement",
        ProblemKind::DuplicateManagementKey,
    );
    for (i, profile) in model.profiles.iter_mut().enumerate() {
        let at = format!("profiles[{}]", i);
        dedupe.dependencies(
            &mut profile.dependencies,
            &format!("{}.dependencies", at),
            ProblemKind::ValidationViolation,
        );
        dedupe.dependencies(
            &mut profile.dependency_management,
            &format!("{}.dependencyManagement", at),
            ProblemKind::DuplicateManagementKey,
        );
        dedupe.plugins(&mut profile.plugins, &format!("{}.plugins", at), ProblemKind::ValidationViolation);
        dedupe.plugins(
            &mut profile.plugin_management,
            &format!("{}.pluginManagement", at),
            ProblemKind::DuplicateManagementKey,
        );
    }

    let mut seen = HashSet::new();
    for (i, profile) in model.profiles.iter().enumerate() {
        if !seen.insert(profile.id.as_str()) {
            problems.add(
                ModelProblem::new(
                    Severity::Warning,
                    ProblemKind::ValidationViolation,
                    &model_id,
                    format!("profiles.profile.id must be unique but found duplicate profile with id {}", profile.id),
                )
                .at(format!("profiles[{}].id", i)),
            );
        }
    }

    model
}

/// Checks on the finalized effective model.
pub fn validate_effective(model: &Model, level: ValidationLevel, problems: &mut ProblemCollector) {
    if level == ValidationLevel::Minimal {
        return;
    }
    let model_id = model.display_id();
    for (i, dep) in model.dependencies.iter().enumerate() {
        if dep.version.as_deref().map_or(true, str::is_empty) {
            problems.add(
                ModelProblem::new(
                    Severity::Error,
                    ProblemKind::ValidationViolation,
                    &model_id,
                    format!("'dependencies.dependency.version' for {} is missing.", dep.management_key()),
                )
                .at(format!("dependencies[{}].version", i)),
            );
        }
    }
    // management has been injected, so a plugin still without a version had
    // none anywhere in the chain
    for (i, plugin) in model.plugins.iter().enumerate() {
        if plugin.version.as_deref().map_or(true, str::is_empty) {
            problems.add(
                ModelProblem::new(
                    Severity::Warning,
                    ProblemKind::ValidationViolation,
                    &model_id,
                    format!("'build.plugins.plugin.version' for {} is missing.", plugin.key()),
                )
                .at(format!("plugins[{}].version", i)),
            );
        }
    }
}

fn check_identity(model: &Model, model_id: &str, level: ValidationLevel, problems: &mut ProblemCollector) {
    let missing = |value: Option<&str>| value.map_or(true, str::is_empty);

    if missing(model.artifact_id.as_deref()) {
        problems.add(structural(model_id, "'artifactId' is missing.", "artifactId"));
    }
    if let Some(parent) = &model.parent {
        for (field, value) in [
            ("groupId", &parent.group_id),
            ("artifactId", &parent.artifact_id),
            ("version", &parent.version),
        ] {
            if missing(value.as_deref()) {
                problems.add(structural(
                    model_id,
                    &format!("'parent.{}' is missing.", field),
                    &format!("parent.{}", field),
                ));
            }
        }
    } else {
        if missing(model.group_id.as_deref()) {
            problems.add(structural(model_id, "'groupId' is missing.", "groupId"));
        }
        if missing(model.version.as_deref()) {
            problems.add(structural(model_id, "'version' is missing.", "version"));
        }
    }

    let Some(severity) = level.graded() else {
        return;
    };
    for (field, value) in [("groupId", &model.group_id), ("artifactId", &model.artifact_id)] {
        let Some(value) = value.as_deref().filter(|v| !v.is_empty()) else {
            continue;
        };
        if !is_valid_id(value) {
            problems.add(
                ModelProblem::new(
                    severity,
                    ProblemKind::ValidationViolation,
                    model_id,
                    format!(
                        "'{}' with value '{}' does not match a valid id pattern.",
                        field, value
                    ),
                )
                .at(field),
            );
        }
    }
}

fn check_coordinates(dep: &Dependency, at: &str, model_id: &str, problems: &mut ProblemCollector) {
    for (field, value) in [("groupId", &dep.group_id), ("artifactId", &dep.artifact_id)] {
        if value.is_empty() {
            problems.add(
                ModelProblem::new(
                    Severity::Error,
                    ProblemKind::Structural,
                    model_id,
                    format!("'{}.{}' is missing.", at, field),
                )
                .at(format!("{}.{}", at, field)),
            );
        }
    }
}

fn structural(model_id: &str, message: &str, location: &str) -> ModelProblem {
    ModelProblem::new(Severity::Fatal, ProblemKind::Structural, model_id, message).at(location)
}

fn is_valid_id(value: &str) -> bool {
    // Expressions are checked after interpolation instead.
    if value.contains("${") {
        return true;
    }
    id_pattern().map_or(true, |re| re.is_match(value))
}

struct Dedupe<'a> {
    model_id: &'a str,
    problems: &'a mut ProblemCollector,
}

impl Dedupe<'_> {
    fn dependencies(&mut self, entries: &mut Vec<Dependency>, section: &str, kind: ProblemKind) {
        self.retain_first(entries, section, kind, Dependency::management_key);
    }

    fn plugins(&mut self, entries: &mut Vec<Plugin>, section: &str, kind: ProblemKind) {
        self.retain_first(entries, section, kind, Plugin::key);
    }

    fn retain_first<T, K>(&mut self, entries: &mut Vec<T>, section: &str, kind: ProblemKind, key: impl Fn(&T) -> K)
    where
        K: Eq + Hash + Display,
    {
        let mut seen = HashSet::new();
        let mut index = 0;
        entries.retain(|entry| {
            let k = key(entry);
            let at = index;
            index += 1;
            if seen.contains(&k) {
                self.problems.add(
                    ModelProblem::new(
                        Severity::Warning,
                        kind,
                        self.model_id,
                        format!("'{}' must be unique: {} -> duplicate declaration ignored", section, k),
                    )
                    .at(format!("{}[{}]", section, at)),
                );
                return false;
            }
            seen.insert(k);
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pom_model::{Parent, Profile};

    #[test]
    fn test_valid_model_has_no_problems() {
        let model = Model::new("org.acme", "app", "1.0").with_dependency(Dependency::new("org.acme", "lib").with_version("1"));
        let mut problems = ProblemCollector::new();
        validate_raw(model, ValidationLevel::Strict, &mut problems);
        assert!(problems.is_empty());
    }

    #[test]
    fn test_missing_identity_is_fatal() {
        let model = Model {
            artifact_id: None,
            version: None,
            ..Model::new("org.acme", "x", "1")
        };
        let mut problems = ProblemCollector::new();
        validate_raw(model, ValidationLevel::Minimal, &mut problems);

        assert_eq!(problems.count(Severity::Fatal), 2);
        assert!(problems.problems().iter().all(|p| p.kind == ProblemKind::Structural));
    }

    #[test]
    fn test_parent_supplies_group_and_version() {
        let model = Model {
            group_id: None,
            version: None,
            ..Model::new("", "child", "")
        }
        .with_parent(Parent::new("org.acme", "parent", "1"));
        let mut problems = ProblemCollector::new();
        validate_raw(model, ValidationLevel::Strict, &mut problems);
        assert!(problems.is_empty());
    }

    #[test]
    fn test_incomplete_parent_is_fatal() {
        let mut parent = Parent::new("org.acme", "parent", "1");
        parent.version = None;
        let model = Model::new("org.acme", "child", "1").with_parent(parent);
        let mut problems = ProblemCollector::new();
        validate_raw(model, ValidationLevel::Strict, &mut problems);

        assert!(problems.has_fatal());
        assert_eq!(problems.problems()[0].location.as_deref(), Some("parent.version"));
    }

    #[test]
    fn test_bad_id_follows_level() {
        let model = || Model::new("org acme", "app", "1");

        let mut strict = ProblemCollector::new();
        validate_raw(model(), ValidationLevel::Strict, &mut strict);
        assert_eq!(strict.count(Severity::Error), 1);

        let mut lenient = ProblemCollector::new();
        validate_raw(model(), ValidationLevel::Lenient, &mut lenient);
        assert_eq!(lenient.count(Severity::Warning), 1);

        let mut minimal = ProblemCollector::new();
        validate_raw(model(), ValidationLevel::Minimal, &mut minimal);
        assert!(minimal.is_empty());
    }

    #[test]
    fn test_duplicate_management_key_keeps_first() {
        let model = Model::new("g", "a", "1")
            .with_managed_dependency(Dependency::new("org.acme", "lib").with_version("1"))
            .with_managed_dependency(Dependency::new("org.acme", "lib").with_version("2"))
            .with_managed_dependency(Dependency::new("org.acme", "lib").with_classifier("tests"));
        let mut problems = ProblemCollector::new();
        let model = validate_raw(model, ValidationLevel::Strict, &mut problems);

        assert_eq!(model.dependency_management.len(), 2);
        assert_eq!(model.dependency_management[0].version.as_deref(), Some("1"));
        assert_eq!(problems.len(), 1);
        let problem = &problems.problems()[0];
        assert_eq!(problem.kind, ProblemKind::DuplicateManagementKey);
        assert_eq!(problem.severity, Severity::Warning);
        assert_eq!(problem.location.as_deref(), Some("dependencyManagement[1]"));
    }

    #[test]
    fn test_duplicates_inside_profiles() {
        let mut profile = Profile::new("ci")
            .with_dependency(Dependency::new("g", "d"))
            .with_dependency(Dependency::new("g", "d"));
        profile.plugins.push(Plugin::new("g", "p"));
        profile.plugins.push(Plugin::new("g", "p"));
        let model = Model::new("g", "a", "1").with_profile(profile);

        let mut problems = ProblemCollector::new();
        let model = validate_raw(model, ValidationLevel::Strict, &mut problems);
        assert_eq!(model.profiles[0].dependencies.len(), 1);
        assert_eq!(model.profiles[0].plugins.len(), 1);
        assert_eq!(problems.count(Severity::Warning), 2);
    }

    #[test]
    fn test_effective_missing_version() {
        let model = Model::new("g", "a", "1").with_dependency(Dependency::new("org.acme", "lib"));

        let mut strict = ProblemCollector::new();
        validate_effective(&model, ValidationLevel::Lenient, &mut strict);
        assert_eq!(strict.count(Severity::Error), 1);

        let mut minimal = ProblemCollector::new();
        validate_effective(&model, ValidationLevel::Minimal, &mut minimal);
        assert!(minimal.is_empty());
    }

    #[test]
    fn test_effective_plugin_without_version_warns() {
        let model = Model::new("g", "a", "1")
            .with_plugin(Plugin::new("org.acme", "tool"))
            .with_plugin(Plugin::new("org.acme", "pinned").with_version("1.0"));

        let mut strict = ProblemCollector::new();
        validate_effective(&model, ValidationLevel::Strict, &mut strict);
        assert_eq!(strict.len(), 1);
        assert_eq!(strict.count(Severity::Warning), 1);
        assert_eq!(strict.problems()[0].location.as_deref(), Some("plugins[0].version"));
        assert!(!strict.is_failure(ValidationLevel::Strict));

        let mut minimal = ProblemCollector::new();
        validate_effective(&model, ValidationLevel::Minimal, &mut minimal);
        assert!(minimal.is_empty());
    }
}
