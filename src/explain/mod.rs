//! Explain output for a model build
//!
//! Turns a build outcome, success or failure, into a report of the chain,
//! the active profiles, every problem and the final decision. Rendered as
//! JSON or as text for humans.

use serde::Serialize;

use crate::builder::{ChainEntry, ModelBuildingError, ModelBuildingResult};
use crate::problem::{ModelProblem, Severity};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProblemCounts {
    pub fatal: usize,
    pub error: usize,
    pub warning: usize,
}

impl ProblemCounts {
    fn of(problems: &[ModelProblem]) -> Self {
        problems.iter().fold(Self::default(), |mut counts, p| {
            match p.severity {
                Severity::Fatal => counts.fatal += 1,
                Severity::Error => counts.error += 1,
                Severity::Warning => counts.warning += 1,
            }
            counts
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExplainReport {
    /// Identity of the project that was built
    pub model: String,

    /// Whether the effective model is valid
    pub accepted: bool,

    /// Machine-readable failure code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,

    /// Chain levels, root first; empty when aborted
    pub chain: Vec<ChainEntry>,

    pub active_profiles: Vec<String>,

    pub problems: Vec<ModelProblem>,

    pub counts: ProblemCounts,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,

    /// Human-readable summary
    pub explanation: String,
}

impl ExplainReport {
    /// Report for a build of the project identified by `model`.
    pub fn from_outcome(model: &str, outcome: &Result<ModelBuildingResult, ModelBuildingError>) -> Self {
        let (accepted, error_code, result) = match outcome {
            Ok(result) => (true, None, Some(result)),
            Err(err) => (false, Some(err.code().to_string()), err.result()),
        };
        let problems = match outcome {
            Ok(result) => result.problems.clone(),
            Err(err) => err.problems().to_vec(),
        };

        let mut report = Self {
            model: result
                .map(|r| r.effective_model.display_id())
                .unwrap_or_else(|| model.to_string()),
            accepted,
            error_code,
            chain: result.map(|r| r.chain.clone()).unwrap_or_default(),
            active_profiles: result.map(|r| r.active_profile_ids.clone()).unwrap_or_default(),
            counts: ProblemCounts::of(&problems),
            problems,
            fingerprint: result.map(|r| r.fingerprint.clone()),
            explanation: String::new(),
        };
        report.explanation = report.generate_explanation();
        report
    }

    fn generate_explanation(&self) -> String {
        let mut lines = vec![format!("Project: {}", self.model), String::new()];

        match (&self.error_code, self.accepted) {
            (_, true) => lines.push("Decision: VALID".to_string()),
            (Some(code), false) if code == "ABORTED" => lines.push("Decision: ABORTED".to_string()),
            _ => lines.push("Decision: INVALID".to_string()),
        }
        lines.push(format!(
            "Problems: {} fatal, {} error(s), {} warning(s)",
            self.counts.fatal, self.counts.error, self.counts.warning
        ));

        if !self.chain.is_empty() {
            lines.push(String::new());
            lines.push("Chain (root first):".to_string());
            for entry in &self.chain {
                let profiles = if entry.active_profiles.is_empty() {
                    String::new()
                } else {
                    format!(" [profiles: {}]", entry.active_profiles.join(", "))
                };
                let origin = entry
                    .origin
                    .path()
                    .map(|p| format!(" ({})", p.display()))
                    .unwrap_or_default();
                lines.push(format!("  - {}{}{}", entry.display_id, origin, profiles));
            }
        }

        if !self.problems.is_empty() {
            lines.push(String::new());
            lines.push("Problems:".to_string());
            for problem in &self.problems {
                lines.push(format!("  - {}", problem));
            }
        }

        lines.join("\n")
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_human(&self) -> String {
        let mut output = self.explanation.clone();
        if let Some(fingerprint) = &self.fingerprint {
            output.push_str(&format!("\n\nFingerprint: {}", fingerprint));
        }
        output.push('\n');
        output
    }
}
