//! Diagnostics collected while building an effective model
//!
//! Every anomaly found by a pipeline stage is recorded here instead of being
//! raised. Only the final gate turns the collected problems into a failure:
//! - any FATAL problem fails the build
//! - ERROR problems fail the build unless the validation level is `minimal`
//! - WARNING problems never fail the build

use serde::{Deserialize, Serialize};
use std::fmt;

/// Problem severity, ordered `Warning < Error < Fatal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Warning,
    Error,
    Fatal,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Problem taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProblemKind {
    /// Mandatory identity fields are missing
    Structural,
    /// The parent chain loops back onto itself
    CyclicInheritance,
    /// A declared parent could not be located
    MissingParent,
    /// A property expression refers back to itself
    CyclicInterpolation,
    /// Two managed entries share a management key
    DuplicateManagementKey,
    /// A profile activation condition could not be evaluated
    ActivationEvaluationFailure,
    /// A semantic rule was broken; severity follows the validation level
    ValidationViolation,
    /// An explicitly requested profile does not exist in the chain
    UnknownProfile,
    /// `scope=import` entries lead back to a descriptor being imported
    CyclicImport,
    /// An imported descriptor could not be located or read
    UnresolvableImport,
}

impl ProblemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProblemKind::Structural => "STRUCTURAL",
            ProblemKind::CyclicInheritance => "CYCLIC_INHERITANCE",
            ProblemKind::MissingParent => "MISSING_PARENT",
            ProblemKind::CyclicInterpolation => "CYCLIC_INTERPOLATION",
            ProblemKind::DuplicateManagementKey => "DUPLICATE_MANAGEMENT_KEY",
            ProblemKind::ActivationEvaluationFailure => "ACTIVATION_EVALUATION_FAILURE",
            ProblemKind::ValidationViolation => "VALIDATION_VIOLATION",
            ProblemKind::UnknownProfile => "UNKNOWN_PROFILE",
            ProblemKind::CyclicImport => "CYCLIC_IMPORT",
            ProblemKind::UnresolvableImport => "UNRESOLVABLE_IMPORT",
        }
    }
}

impl fmt::Display for ProblemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How strictly semantic checks are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationLevel {
    /// Structural checks only; errors do not fail the build
    Minimal,
    /// Semantic checks report warnings where `strict` reports errors
    Lenient,
    /// Every semantic check applies at full severity
    Strict,
}

impl ValidationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationLevel::Minimal => "minimal",
            ValidationLevel::Lenient => "lenient",
            ValidationLevel::Strict => "strict",
        }
    }

    /// Whether an ERROR problem fails the build at this level.
    pub fn fails_on_error(&self) -> bool {
        *self >= ValidationLevel::Lenient
    }

    /// Severity for a check that is an error when strict, a warning when
    /// lenient and skipped when minimal.
    pub fn graded(&self) -> Option<Severity> {
        match self {
            ValidationLevel::Minimal => None,
            ValidationLevel::Lenient => Some(Severity::Warning),
            ValidationLevel::Strict => Some(Severity::Error),
        }
    }
}

impl Default for ValidationLevel {
    fn default() -> Self {
        ValidationLevel::Strict
    }
}

impl fmt::Display for ValidationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ValidationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "minimal" => Ok(ValidationLevel::Minimal),
            "lenient" => Ok(ValidationLevel::Lenient),
            "strict" => Ok(ValidationLevel::Strict),
            other => Err(format!(
                "unknown validation level '{}': expected minimal, lenient or strict",
                other
            )),
        }
    }
}

/// One diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelProblem {
    pub severity: Severity,
    pub kind: ProblemKind,
    pub message: String,
    /// Display id of the descriptor the problem belongs to
    pub model_id: String,
    /// Field path inside the descriptor, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl ModelProblem {
    pub fn new(
        severity: Severity,
        kind: ProblemKind,
        model_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            kind,
            message: message.into(),
            model_id: model_id.into(),
            location: None,
        }
    }

    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

impl fmt::Display for ModelProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({}", self.severity, self.message, self.model_id)?;
        if let Some(location) = &self.location {
            write!(f, " @ {}", location)?;
        }
        write!(f, ") {}", self.kind)
    }
}

/// Ordered accumulator of problems for one build.
#[derive(Debug, Default)]
pub struct ProblemCollector {
    problems: Vec<ModelProblem>,
}

impl ProblemCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a problem. Problems are never dropped or reordered.
    pub fn add(&mut self, problem: ModelProblem) {
        match problem.severity {
            Severity::Fatal | Severity::Error => tracing::error!(
                kind = problem.kind.as_str(),
                model = %problem.model_id,
                location = problem.location.as_deref().unwrap_or(""),
                "{}",
                problem.message
            ),
            Severity::Warning => tracing::warn!(
                kind = problem.kind.as_str(),
                model = %problem.model_id,
                location = problem.location.as_deref().unwrap_or(""),
                "{}",
                problem.message
            ),
        }
        self.problems.push(problem);
    }

    pub fn fatal(&mut self, kind: ProblemKind, model_id: &str, message: impl Into<String>) {
        self.add(ModelProblem::new(Severity::Fatal, kind, model_id, message));
    }

    pub fn error(&mut self, kind: ProblemKind, model_id: &str, message: impl Into<String>) {
        self.add(ModelProblem::new(Severity::Error, kind, model_id, message));
    }

    pub fn warning(&mut self, kind: ProblemKind, model_id: &str, message: impl Into<String>) {
        self.add(ModelProblem::new(Severity::Warning, kind, model_id, message));
    }

    pub fn extend(&mut self, problems: impl IntoIterator<Item = ModelProblem>) {
        for problem in problems {
            self.add(problem);
        }
    }

    pub fn problems(&self) -> &[ModelProblem] {
        &self.problems
    }

    pub fn into_problems(self) -> Vec<ModelProblem> {
        self.problems
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.problems.iter().filter(|p| p.severity == severity).count()
    }

    pub fn has_fatal(&self) -> bool {
        self.count(Severity::Fatal) > 0
    }

    pub fn max_severity(&self) -> Option<Severity> {
        self.problems.iter().map(|p| p.severity).max()
    }

    /// Whether the collected problems fail the build at `level`.
    pub fn is_failure(&self, level: ValidationLevel) -> bool {
        is_failure(&self.problems, level)
    }
}

/// Whether `problems` fail a build validated at `level`.
pub fn is_failure(problems: &[ModelProblem], level: ValidationLevel) -> bool {
    problems.iter().any(|p| match p.severity {
        Severity::Fatal => true,
        Severity::Error => level.fails_on_error(),
        Severity::Warning => false,
    })
}
