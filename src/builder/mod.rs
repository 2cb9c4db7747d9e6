//! Effective model building pipeline
//!
//! One build turns a leaf descriptor into its effective model:
//! 1. Resolve the parent chain (root-first, rooted in the super default)
//! 2. Validate every declared level and activate its profiles
//! 3. Overlay active profiles and inherit, level by level from the root
//! 4. Interpolate, import `scope=import` management, inject management,
//!    run finalizers
//! 5. Validate the effective model and gate on the collected problems
//!
//! Stages never raise: they record problems and carry on. The gate at the
//! end fails the build on any FATAL problem, or on an ERROR when the
//! validation level fails on errors. Abort requests are honoured between
//! chain levels and between stages.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use pom_model::{Model, ModelId};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use crate::context::ActivationContext;
use crate::finalize::{self, Finalizer};
use crate::interpolate::Interpolator;
use crate::lineage::{ChainLevel, ParentCache, ParentResolver};
use crate::management;
use crate::merge;
use crate::problem::{ModelProblem, ProblemCollector, ProblemKind, Severity, ValidationLevel};
use crate::profile;
use crate::signal::AbortSignal;
use crate::source::{ModelOrigin, ModelSource, RepositorySystem};
use crate::validate;

mod import;

/// Input of one build.
#[derive(Debug, Clone)]
pub struct ModelBuildingRequest {
    /// Raw leaf descriptor
    pub model: Model,
    /// Where the leaf was read from; anchors `relativePath` and `basedir`
    pub path: Option<PathBuf>,
    pub context: ActivationContext,
    pub validation: ValidationLevel,
}

impl ModelBuildingRequest {
    pub fn new(model: Model) -> Self {
        Self {
            model,
            path: None,
            context: ActivationContext::default(),
            validation: ValidationLevel::default(),
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_context(mut self, context: ActivationContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_validation(mut self, level: ValidationLevel) -> Self {
        self.validation = level;
        self
    }
}

/// One level of the resolved chain as reported to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainEntry {
    pub display_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<ModelId>,
    pub origin: ModelOrigin,
    pub active_profiles: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelBuildingResult {
    pub effective_model: Model,
    /// Raw descriptors as declared, root (super default) to leaf
    pub raw_models: Vec<Model>,
    /// Active profile ids across the chain, root to leaf, without repeats
    pub active_profile_ids: Vec<String>,
    pub chain: Vec<ChainEntry>,
    pub problems: Vec<ModelProblem>,
    /// SHA-256 of the canonical JSON of the effective model
    pub fingerprint: String,
}

impl ModelBuildingResult {
    pub fn has_problems(&self, severity: Severity) -> bool {
        self.problems.iter().any(|p| p.severity == severity)
    }
}

/// Composite failure raised once, after every stage has run.
#[derive(Debug, thiserror::Error)]
pub enum ModelBuildingError {
    #[error("{} problem(s) were encountered while building the effective model for {}", .0.problems.len(), .0.effective_model.display_id())]
    Problems(Box<ModelBuildingResult>),

    #[error("model building aborted ({} problem(s) recorded)", .problems.len())]
    Aborted { problems: Vec<ModelProblem> },
}

impl ModelBuildingError {
    pub fn code(&self) -> &'static str {
        match self {
            ModelBuildingError::Problems(_) => "MODEL_BUILDING_FAILED",
            ModelBuildingError::Aborted { .. } => "ABORTED",
        }
    }

    pub fn problems(&self) -> &[ModelProblem] {
        match self {
            ModelBuildingError::Problems(result) => &result.problems,
            ModelBuildingError::Aborted { problems } => problems,
        }
    }

    /// The best-effort result, unless the build was aborted.
    pub fn result(&self) -> Option<&ModelBuildingResult> {
        match self {
            ModelBuildingError::Problems(result) => Some(result),
            ModelBuildingError::Aborted { .. } => None,
        }
    }
}

/// Runs the pipeline against a session's collaborators.
pub struct ModelBuilder<'a> {
    source: &'a dyn ModelSource,
    repository: &'a dyn RepositorySystem,
    cache: &'a ParentCache,
    abort: &'a AbortSignal,
    finalizers: &'a [Finalizer],
    build_started: DateTime<Utc>,
}

impl<'a> ModelBuilder<'a> {
    pub fn new(
        source: &'a dyn ModelSource,
        repository: &'a dyn RepositorySystem,
        cache: &'a ParentCache,
        abort: &'a AbortSignal,
    ) -> Self {
        Self {
            source,
            repository,
            cache,
            abort,
            finalizers: &[],
            build_started: Utc::now(),
        }
    }

    pub fn with_finalizers(mut self, finalizers: &'a [Finalizer]) -> Self {
        self.finalizers = finalizers;
        self
    }

    /// Time fed to `${maven.build.timestamp}`.
    pub fn with_build_started(mut self, started: DateTime<Utc>) -> Self {
        self.build_started = started;
        self
    }

    pub fn build(&self, request: ModelBuildingRequest) -> Result<ModelBuildingResult, ModelBuildingError> {
        self.build_importing(request, &mut Vec::new())
    }

    /// `imports` holds the descriptors whose management is being imported
    /// further up, outermost first.
    #[instrument(skip_all, fields(leaf = %request.model.display_id(), validation = %request.validation.as_str()))]
    fn build_importing(
        &self,
        request: ModelBuildingRequest,
        imports: &mut Vec<ModelId>,
    ) -> Result<ModelBuildingResult, ModelBuildingError> {
        let ModelBuildingRequest {
            model,
            path,
            mut context,
            validation,
        } = request;
        if context.project_base_dir.is_none() {
            context.project_base_dir = path.as_deref().and_then(Path::parent).map(Path::to_path_buf);
        }
        let mut problems = ProblemCollector::new();

        // chain
        let resolver = ParentResolver::new(self.source, self.repository, self.cache, self.abort);
        let chain = match resolver.resolve(ChainLevel::provided(model, path), &mut problems) {
            Ok(chain) => chain,
            Err(_) => return Err(aborted(&mut problems)),
        };
        let raw_models: Vec<Model> = chain.models().cloned().collect();
        let levels: Vec<ChainLevel> = chain
            .into_levels()
            .into_iter()
            .map(|level| {
                if level.is_super_default() {
                    level
                } else {
                    ChainLevel {
                        model: validate::validate_raw(level.model, validation, &mut problems),
                        origin: level.origin,
                    }
                }
            })
            .collect();
        self.checkpoint(&mut problems)?;

        // profiles + inheritance, root first
        let mut effective: Option<Model> = None;
        let mut parent_dir: Option<PathBuf> = None;
        let mut entries = Vec::with_capacity(levels.len());
        let mut active_ids: Vec<String> = Vec::new();
        for level in &levels {
            self.checkpoint(&mut problems)?;

            let level_context = level_context(&context, level);
            let active = profile::active_profiles(&level.model, &level_context, &mut problems);
            let level_ids: Vec<String> = active.iter().map(|p| p.id.clone()).collect();
            let overlaid = merge::overlay_profiles(level.model.clone(), active.iter().copied());

            effective = Some(match effective.take() {
                None => overlaid,
                Some(parent) => {
                    let artifact_id = overlaid.artifact_id.clone().unwrap_or_default();
                    let module = merge::module_path(parent_dir.as_deref(), module_dir(level), &artifact_id);
                    merge::inherit(overlaid, &parent, &module)
                }
            });
            parent_dir = module_dir(level).map(Path::to_path_buf);

            for id in &level_ids {
                if !active_ids.contains(id) {
                    active_ids.push(id.clone());
                }
            }
            entries.push(ChainEntry {
                display_id: level.display_id(),
                model_id: if level.is_super_default() { None } else { level.model.id() },
                origin: level.origin.clone(),
                active_profiles: level_ids,
            });
        }
        let effective = effective.unwrap_or_default();
        let model_id = effective.display_id();

        let unknown: BTreeSet<String> = profile::unknown_profile_ids(levels.iter().map(|l| &l.model), &context)
            .into_iter()
            .collect();
        for id in unknown {
            problems.add(ModelProblem::new(
                Severity::Warning,
                ProblemKind::UnknownProfile,
                &model_id,
                format!(
                    "The requested profile \"{}\" could not be activated because it does not exist.",
                    id
                ),
            ));
        }

        // interpolation
        self.checkpoint(&mut problems)?;
        let effective =
            Interpolator::new(&context, self.build_started, validation).interpolate(effective, &mut problems);

        // management
        self.checkpoint(&mut problems)?;
        let effective = self.import_management(effective, &context, imports, &mut problems)?;
        self.checkpoint(&mut problems)?;
        let effective = management::inject(effective);

        // finalizers
        self.checkpoint(&mut problems)?;
        let effective = finalize::run_all(self.finalizers, effective, &mut problems);

        validate::validate_effective(&effective, validation, &mut problems);

        let failed = problems.is_failure(validation);
        let result = ModelBuildingResult {
            fingerprint: fingerprint(&effective),
            effective_model: effective,
            raw_models,
            active_profile_ids: active_ids,
            chain: entries,
            problems: problems.into_problems(),
        };

        if failed {
            warn!(
                model = %model_id,
                problems = result.problems.len(),
                "effective model is invalid"
            );
            return Err(ModelBuildingError::Problems(Box::new(result)));
        }
        info!(
            model = %model_id,
            levels = result.chain.len(),
            profiles = result.active_profile_ids.len(),
            problems = result.problems.len(),
            "built effective model"
        );
        Ok(result)
    }

    fn checkpoint(&self, problems: &mut ProblemCollector) -> Result<(), ModelBuildingError> {
        if self.abort.check().is_err() {
            debug!("abort requested, stopping build");
            return Err(aborted(problems));
        }
        Ok(())
    }
}

fn aborted(problems: &mut ProblemCollector) -> ModelBuildingError {
    ModelBuildingError::Aborted {
        problems: std::mem::take(problems).into_problems(),
    }
}

/// Directory a level contributes to module path computation. Repository
/// descriptors sit outside any project tree, so only provided and
/// relative-path levels have one.
fn module_dir(level: &ChainLevel) -> Option<&Path> {
    match level.origin {
        ModelOrigin::Provided(_) | ModelOrigin::RelativePath(_) => level.base_dir(),
        ModelOrigin::Repository(_) | ModelOrigin::SuperDefault => None,
    }
}

/// Activation for a level is evaluated against that level's own directory.
fn level_context<'c>(context: &'c ActivationContext, level: &ChainLevel) -> Cow<'c, ActivationContext> {
    match level.base_dir() {
        Some(dir) if context.project_base_dir.as_deref() != Some(dir) => {
            Cow::Owned(context.clone().with_base_dir(dir))
        }
        _ => Cow::Borrowed(context),
    }
}

/// Hex SHA-256 of the model's canonical (RFC 8785) JSON.
pub fn fingerprint(model: &Model) -> String {
    match serde_json_canonicalizer::to_vec(model) {
        Ok(bytes) => {
            let mut hasher = Sha256::new();
            hasher.update(&bytes);
            hex::encode(hasher.finalize())
        }
        Err(e) => {
            warn!(error = %e, "could not canonicalize effective model");
            String::new()
        }
    }
}
