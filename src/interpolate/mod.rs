//! Property interpolation
//!
//! Replaces `${expr}` tokens in every string of a merged model. Lookup order
//! for `expr`, first hit wins:
//! 1. user properties
//! 2. environment (`env.NAME`)
//! 3. system properties
//! 4. built-ins: `basedir`, `project.basedir`, `project.baseUri`,
//!    `maven.build.timestamp`
//! 5. model fields (`project.version`, `project.build.directory`, ...;
//!    `pom.` is a deprecated alias of `project.`)
//! 6. the model's `properties`
//!
//! Resolved values are themselves interpolated. A key met again while it is
//! still being resolved is a cycle: the token stays literal and the cycle is
//! reported once. A key whose value depends on a cycle anywhere is left
//! unresolved as a whole, so `${c}` with `c = "${x}-${a}"` and `a` cyclic
//! stays `${c}` rather than a half-resolved value. Unknown keys stay literal
//! without a problem.

mod fields;

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};
use pom_model::Model;
use tracing::{instrument, warn};

use crate::context::ActivationContext;
use crate::problem::{ModelProblem, ProblemCollector, ProblemKind, Severity, ValidationLevel};

use fields::model_field;

/// Expression yielding the build start time.
pub const BUILD_TIMESTAMP: &str = "maven.build.timestamp";
/// Model property holding the strftime pattern for [`BUILD_TIMESTAMP`].
pub const BUILD_TIMESTAMP_FORMAT: &str = "maven.build.timestamp.format";
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Interpolates effective models for one build.
#[derive(Debug, Clone)]
pub struct Interpolator<'a> {
    ctx: &'a ActivationContext,
    build_started: DateTime<Utc>,
    level: ValidationLevel,
}

impl<'a> Interpolator<'a> {
    pub fn new(ctx: &'a ActivationContext, build_started: DateTime<Utc>, level: ValidationLevel) -> Self {
        Self {
            ctx,
            build_started,
            level,
        }
    }

    /// Interpolate every string of `model`, then check that the required
    /// expressions resolved.
    #[instrument(skip_all, fields(model = %model.display_id()))]
    pub fn interpolate(&self, mut model: Model, problems: &mut ProblemCollector) -> Model {
        let snapshot = model.clone();
        let mut resolution = Resolution::new(self, &snapshot);

        model.visit_strings_mut(&mut |location, value| {
            if value.contains("${") {
                let (resolved, _) = resolution.resolve_text(value, location);
                *value = resolved;
            }
        });

        problems.extend(resolution.problems);
        check_required_expressions(&model, self.level, problems);
        model
    }

    /// Interpolate a single string against `model` without touching it.
    pub fn interpolate_str(&self, text: &str, model: &Model, problems: &mut ProblemCollector) -> String {
        let mut resolution = Resolution::new(self, model);
        let (resolved, _) = resolution.resolve_text(text, "");
        problems.extend(resolution.problems);
        resolved
    }
}

enum Lookup {
    Value(String),
    /// The key's value leads back to itself
    Cyclic,
    Unknown,
}

/// State of one interpolation pass.
struct Resolution<'a> {
    ctx: &'a ActivationContext,
    model: &'a Model,
    model_id: String,
    build_started: DateTime<Utc>,
    cycle_severity: Severity,
    cache: HashMap<String, String>,
    in_progress: Vec<String>,
    max_depth: usize,
    reported_cycles: HashSet<BTreeSet<String>>,
    reported_aliases: HashSet<String>,
    problems: Vec<ModelProblem>,
}

impl<'a> Resolution<'a> {
    fn new(interpolator: &Interpolator<'a>, model: &'a Model) -> Self {
        let ctx = interpolator.ctx;
        let keys = model.properties.len() + ctx.user_properties.len() + ctx.system_properties.len();
        Self {
            ctx,
            model,
            model_id: model.display_id(),
            build_started: interpolator.build_started,
            cycle_severity: if interpolator.level == ValidationLevel::Minimal {
                Severity::Warning
            } else {
                Severity::Error
            },
            cache: HashMap::new(),
            in_progress: Vec::new(),
            max_depth: 2 * keys + 16,
            reported_cycles: HashSet::new(),
            reported_aliases: HashSet::new(),
            problems: Vec::new(),
        }
    }

    /// Replace every `${..}` token in `text`. The flag reports whether a
    /// cycle was met; such results are never cached.
    fn resolve_text(&mut self, text: &str, location: &str) -> (String, bool) {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        let mut cyclic = false;

        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find('}') else {
                out.push_str(&rest[start..]);
                return (out, cyclic);
            };
            let token = &rest[start..start + 2 + end + 1];
            match self.resolve_key(&after[..end], location) {
                Lookup::Value(value) => out.push_str(&value),
                Lookup::Cyclic => {
                    cyclic = true;
                    out.push_str(token);
                }
                Lookup::Unknown => out.push_str(token),
            }
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        (out, cyclic)
    }

    fn resolve_key(&mut self, expr: &str, location: &str) -> Lookup {
        let key = self.canonical_key(expr.trim(), location);
        if key.is_empty() {
            return Lookup::Unknown;
        }
        if let Some(value) = self.cache.get(&key) {
            return Lookup::Value(value.clone());
        }
        if self.in_progress.contains(&key) {
            self.report_cycle(&key, location);
            return Lookup::Cyclic;
        }
        if self.in_progress.len() >= self.max_depth {
            warn!(key = %key, location, "expression nesting too deep, leaving it unresolved");
            return Lookup::Unknown;
        }
        let Some(raw) = self.raw_value(&key) else {
            return Lookup::Unknown;
        };

        self.in_progress.push(key.clone());
        let (value, tainted) = self.resolve_text(&raw, location);
        self.in_progress.pop();

        if tainted {
            return Lookup::Cyclic;
        }
        self.cache.insert(key, value.clone());
        Lookup::Value(value)
    }

    /// Map the deprecated `pom.` prefix onto `project.`, warning once per
    /// expression.
    fn canonical_key(&mut self, expr: &str, location: &str) -> String {
        let Some(rest) = expr.strip_prefix("pom.") else {
            return expr.to_string();
        };
        if self.reported_aliases.insert(expr.to_string()) {
            self.problems.push(
                ModelProblem::new(
                    Severity::Warning,
                    ProblemKind::ValidationViolation,
                    &self.model_id,
                    format!(
                        "The expression ${{{}}} is deprecated. Please use ${{project.{}}} instead.",
                        expr, rest
                    ),
                )
                .at(location),
            );
        }
        format!("project.{}", rest)
    }

    fn raw_value(&self, key: &str) -> Option<String> {
        if let Some(value) = self.ctx.user_properties.get(key) {
            return Some(value.clone());
        }
        if let Some(value) = key
            .strip_prefix("env.")
            .and_then(|name| self.ctx.environment.get(name))
        {
            return Some(value.clone());
        }
        if let Some(value) = self.ctx.system_properties.get(key) {
            return Some(value.clone());
        }
        match key {
            "basedir" | "project.basedir" => {
                return self
                    .ctx
                    .base_dir()
                    .map(|dir| dir.to_string_lossy().into_owned())
            }
            "project.baseUri" => {
                return self.ctx.base_dir().map(|dir| {
                    let path = dir.to_string_lossy();
                    let path = path.trim_end_matches('/');
                    if path.starts_with('/') {
                        format!("file://{}/", path)
                    } else {
                        format!("file:///{}/", path.replace('\\', "/"))
                    }
                })
            }
            BUILD_TIMESTAMP => return Some(self.build_timestamp()),
            _ => {}
        }
        if let Some(value) = key.strip_prefix("project.").and_then(|f| model_field(self.model, f)) {
            return Some(value);
        }
        self.model.properties.get(key).cloned()
    }

    fn build_timestamp(&self) -> String {
        let format = self
            .model
            .properties
            .get(BUILD_TIMESTAMP_FORMAT)
            .map(String::as_str)
            .unwrap_or(DEFAULT_TIMESTAMP_FORMAT);
        let items: Vec<Item<'_>> = StrftimeItems::new(format).collect();
        if items.iter().any(|item| matches!(item, Item::Error)) {
            warn!(format, "invalid build timestamp format, using the default");
            return self.build_started.format(DEFAULT_TIMESTAMP_FORMAT).to_string();
        }
        self.build_started
            .format_with_items(items.into_iter())
            .to_string()
    }

    fn report_cycle(&mut self, key: &str, location: &str) {
        let start = self
            .in_progress
            .iter()
            .position(|k| k == key)
            .unwrap_or(0);
        let mut cycle: Vec<&str> = self.in_progress[start..].iter().map(String::as_str).collect();
        cycle.push(key);

        let members: BTreeSet<String> = cycle.iter().map(|k| k.to_string()).collect();
        if !self.reported_cycles.insert(members) {
            return;
        }
        self.problems.push(
            ModelProblem::new(
                self.cycle_severity,
                ProblemKind::CyclicInterpolation,
                &self.model_id,
                format!(
                    "Cyclic reference in expression ${{{}}}: {}",
                    key,
                    cycle.join(" -> ")
                ),
            )
            .at(location),
        );
    }
}

/// Identity coordinates, dependency coordinates and plugin versions must be
/// free of `${` once interpolated.
pub fn check_required_expressions(model: &Model, level: ValidationLevel, problems: &mut ProblemCollector) {
    let Some(severity) = level.graded() else {
        return;
    };
    let model_id = model.display_id();
    let mut check = |location: String, value: Option<&str>| {
        if let Some(value) = value.filter(|v| v.contains("${")) {
            problems.add(
                ModelProblem::new(
                    severity,
                    ProblemKind::ValidationViolation,
                    &model_id,
                    format!("'{}' contains an expression that cannot be resolved: {}", location, value),
                )
                .at(location),
            );
        }
    };

    check("groupId".into(), model.group_id.as_deref());
    check("artifactId".into(), model.artifact_id.as_deref());
    check("version".into(), model.version.as_deref());
    for (section, deps) in [
        ("dependencies", &model.dependencies),
        ("dependencyManagement", &model.dependency_management),
    ] {
        for (i, dep) in deps.iter().enumerate() {
            check(format!("{}[{}].groupId", section, i), Some(dep.group_id.as_str()));
            check(format!("{}[{}].artifactId", section, i), Some(dep.artifact_id.as_str()));
            check(format!("{}[{}].version", section, i), dep.version.as_deref());
        }
    }
    for (section, plugins) in [
        ("plugins", &model.plugins),
        ("pluginManagement", &model.plugin_management),
    ] {
        for (i, plugin) in plugins.iter().enumerate() {
            check(format!("{}[{}].version", section, i), plugin.version.as_deref());
        }
    }
}
