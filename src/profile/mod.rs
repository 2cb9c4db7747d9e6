//! Profile activation
//!
//! Decides, for one chain level, which of its profiles apply:
//! 1. Explicitly deactivated ids are never active
//! 2. Explicitly activated ids are always active
//! 3. Otherwise the activation predicate decides
//! 4. `ActiveByDefault` profiles apply only when nothing else at the same
//!    level is active
//!
//! A predicate that cannot be evaluated is reported as a WARNING and the
//! profile stays inactive; its siblings are still evaluated.

mod jdk;

use std::path::PathBuf;

use pom_model::{Activation, Model, Profile};
use tracing::debug;

use crate::context::ActivationContext;
use crate::problem::{ModelProblem, ProblemCollector, ProblemKind, Severity};

pub use jdk::{jdk_matches, VersionRangeError};

/// Failure to evaluate one activation predicate
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActivationError {
    #[error("invalid JDK requirement: {0}")]
    Jdk(#[from] VersionRangeError),

    #[error("no JDK version in the activation context")]
    MissingJdkVersion,

    #[error("property activation without a property name")]
    EmptyPropertyName,

    #[error("unresolved expression in file activation path '{0}'")]
    UnresolvedExpression(String),

    #[error("relative file activation path '{0}' but no project base directory")]
    RelativePathWithoutBaseDir(String),
}

impl ActivationError {
    pub fn code(&self) -> &'static str {
        match self {
            ActivationError::Jdk(e) => e.code(),
            ActivationError::MissingJdkVersion => "MISSING_JDK_VERSION",
            ActivationError::EmptyPropertyName => "EMPTY_PROPERTY_NAME",
            ActivationError::UnresolvedExpression(_) => "UNRESOLVED_EXPRESSION",
            ActivationError::RelativePathWithoutBaseDir(_) => "RELATIVE_PATH_WITHOUT_BASEDIR",
        }
    }
}

/// Active profiles of `model`, in declaration order.
pub fn active_profiles<'m>(
    model: &'m Model,
    ctx: &ActivationContext,
    problems: &mut ProblemCollector,
) -> Vec<&'m Profile> {
    let mut active = vec![false; model.profiles.len()];
    let mut any_active = false;

    for (i, profile) in model.profiles.iter().enumerate() {
        if ctx.is_deactivated(&profile.id) {
            debug!(profile = %profile.id, "profile explicitly deactivated");
            continue;
        }
        if ctx.is_activated(&profile.id) {
            active[i] = true;
            any_active = true;
            continue;
        }
        let Some(activation) = &profile.activation else {
            continue;
        };
        if matches!(activation, Activation::ActiveByDefault) {
            continue;
        }
        match is_active(activation, ctx) {
            Ok(true) => {
                active[i] = true;
                any_active = true;
            }
            Ok(false) => {}
            Err(e) => problems.add(
                ModelProblem::new(
                    Severity::Warning,
                    ProblemKind::ActivationEvaluationFailure,
                    model.display_id(),
                    format!("Failed to evaluate activation of profile '{}': {}", profile.id, e),
                )
                .at(format!("profiles[{}].activation", i)),
            ),
        }
    }

    if !any_active {
        for (i, profile) in model.profiles.iter().enumerate() {
            if profile.is_active_by_default() && !ctx.is_deactivated(&profile.id) {
                active[i] = true;
            }
        }
    }

    let selected: Vec<&Profile> = model
        .profiles
        .iter()
        .zip(active)
        .filter_map(|(profile, on)| on.then_some(profile))
        .collect();
    if !selected.is_empty() {
        debug!(
            model = %model.display_id(),
            profiles = ?selected.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(),
            "active profiles"
        );
    }
    selected
}

/// Ids of the active profiles of `model`, in declaration order.
pub fn activate(model: &Model, ctx: &ActivationContext, problems: &mut ProblemCollector) -> Vec<String> {
    active_profiles(model, ctx, problems)
        .into_iter()
        .map(|p| p.id.clone())
        .collect()
}

/// Explicitly activated ids that no model in `chain` declares.
pub fn unknown_profile_ids<'a>(
    chain: impl IntoIterator<Item = &'a Model>,
    ctx: &ActivationContext,
) -> Vec<String> {
    let declared: Vec<&str> = chain
        .into_iter()
        .flat_map(|m| m.profiles.iter().map(|p| p.id.as_str()))
        .collect();
    ctx.explicitly_activated
        .iter()
        .filter(|id| !declared.contains(&id.as_str()))
        .cloned()
        .collect()
}

/// Evaluate one activation predicate against `ctx`.
pub fn is_active(activation: &Activation, ctx: &ActivationContext) -> Result<bool, ActivationError> {
    match activation {
        Activation::Jdk { version, negated } => {
            if ctx.jdk_version.is_empty() {
                return Err(ActivationError::MissingJdkVersion);
            }
            Ok(jdk_matches(version, &ctx.jdk_version)? != *negated)
        }
        Activation::Os {
            name,
            family,
            arch,
            version,
        } => {
            let os = &ctx.os;
            let checks = [
                name.as_deref().map(|n| negatable(n, |v| os.name.eq_ignore_ascii_case(v))),
                family.as_deref().map(|f| negatable(f, |v| os.is_family(v))),
                arch.as_deref().map(|a| negatable(a, |v| os.arch.eq_ignore_ascii_case(v))),
                version
                    .as_deref()
                    .map(|v| negatable(v, |v| os.version.eq_ignore_ascii_case(v))),
            ];
            let declared: Vec<bool> = checks.into_iter().flatten().collect();
            Ok(!declared.is_empty() && declared.into_iter().all(|m| m))
        }
        Activation::Property { name, value } => {
            let (negated, name) = split_negation(name);
            if name.is_empty() {
                return Err(ActivationError::EmptyPropertyName);
            }
            let actual = ctx.property(name).filter(|v| !v.is_empty());
            let matched = match value {
                None => actual.is_some(),
                Some(expected) => {
                    let (value_negated, expected) = split_negation(expected);
                    (actual == Some(expected)) != value_negated
                }
            };
            Ok(matched != negated)
        }
        Activation::File { exists, missing } => {
            if let Some(path) = exists.as_deref().filter(|p| !p.trim().is_empty()) {
                Ok(resolve_file(path, ctx)?.exists())
            } else if let Some(path) = missing.as_deref().filter(|p| !p.trim().is_empty()) {
                Ok(!resolve_file(path, ctx)?.exists())
            } else {
                Ok(false)
            }
        }
        Activation::ActiveByDefault => Ok(false),
    }
}

fn split_negation(value: &str) -> (bool, &str) {
    match value.trim().strip_prefix('!') {
        Some(rest) => (true, rest.trim()),
        None => (false, value.trim()),
    }
}

fn negatable(expected: &str, matches: impl Fn(&str) -> bool) -> bool {
    let (negated, expected) = split_negation(expected);
    matches(expected) != negated
}

/// Expand `${basedir}`, `${project.basedir}` and context properties in a
/// file activation path, then resolve it against the project base directory.
fn resolve_file(raw: &str, ctx: &ActivationContext) -> Result<PathBuf, ActivationError> {
    let base_dir = ctx.base_dir().map(|p| p.to_string_lossy().into_owned());

    let mut expanded = String::with_capacity(raw.len());
    let mut rest = raw.trim();
    while let Some(start) = rest.find("${") {
        expanded.push_str(&rest[..start]);
        let Some(len) = rest[start + 2..].find('}') else {
            return Err(ActivationError::UnresolvedExpression(raw.to_string()));
        };
        let key = &rest[start + 2..start + 2 + len];
        let value = match key {
            "basedir" | "project.basedir" => base_dir.as_deref(),
            other => ctx.property(other),
        };
        match value {
            Some(v) => expanded.push_str(v),
            None => return Err(ActivationError::UnresolvedExpression(raw.to_string())),
        }
        rest = &rest[start + 2 + len + 1..];
    }
    expanded.push_str(rest);

    let path = PathBuf::from(&expanded);
    if path.is_absolute() {
        return Ok(path);
    }
    match ctx.base_dir() {
        Some(base) => Ok(base.join(path)),
        None => Err(ActivationError::RelativePathWithoutBaseDir(expanded)),
    }
}
