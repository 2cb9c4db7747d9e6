//! Parent chain resolution
//!
//! Walks from the leaf descriptor up through its declared parents:
//! 1. `parent.relativePath` (default `..`) against the child's directory,
//!    accepted only when the descriptor found there has the declared identity
//! 2. Otherwise a repository lookup by coordinates
//!
//! Both reads are memoized in the session's parent cache, relative-path reads
//! by normalized path and repository lookups by identity.
//!
//! The walk keeps the set of identities already on the chain; meeting one
//! again is a FATAL `CYCLIC_INHERITANCE`. A parent found nowhere is a FATAL
//! `MISSING_PARENT`. Either way the walk stops, and the chain is always
//! rooted in the super default.

mod cache;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use pom_model::{Model, ModelId, Parent};
use tracing::{debug, instrument};

use crate::problem::{ModelProblem, ProblemCollector, ProblemKind, Severity};
use crate::signal::{AbortSignal, Aborted};
use crate::source::{normalize, ModelOrigin, ModelSource, RepositorySystem};
use crate::superpom::{super_default, SUPER_DEFAULT_ID};

pub use cache::{CacheStats, ParentCache, ParentOutcome, ResolvedParent};

/// `relativePath` used when a parent reference does not declare one.
pub const DEFAULT_RELATIVE_PATH: &str = "..";

/// One raw descriptor on the chain and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainLevel {
    pub model: Model,
    pub origin: ModelOrigin,
}

impl ChainLevel {
    /// The leaf descriptor as handed in by the caller.
    pub fn provided(model: Model, path: Option<PathBuf>) -> Self {
        Self {
            model,
            origin: ModelOrigin::Provided(path),
        }
    }

    pub fn super_default() -> Self {
        Self {
            model: super_default(),
            origin: ModelOrigin::SuperDefault,
        }
    }

    pub fn base_dir(&self) -> Option<&Path> {
        self.origin.base_dir()
    }

    pub fn is_super_default(&self) -> bool {
        self.origin == ModelOrigin::SuperDefault
    }

    /// Identity for listings; the super default has its own label.
    pub fn display_id(&self) -> String {
        if self.is_super_default() {
            SUPER_DEFAULT_ID.to_string()
        } else {
            self.model.display_id()
        }
    }
}

/// Raw descriptors ordered root (super default) to leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct ParentChain {
    levels: Vec<ChainLevel>,
}

impl ParentChain {
    pub fn levels(&self) -> &[ChainLevel] {
        &self.levels
    }

    pub fn into_levels(self) -> Vec<ChainLevel> {
        self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn leaf(&self) -> Option<&ChainLevel> {
        self.levels.last()
    }

    pub fn models(&self) -> impl Iterator<Item = &Model> {
        self.levels.iter().map(|l| &l.model)
    }
}

/// Walks parent references using a model source, a repository and the
/// session's parent cache.
pub struct ParentResolver<'a> {
    source: &'a dyn ModelSource,
    repository: &'a dyn RepositorySystem,
    cache: &'a ParentCache,
    abort: &'a AbortSignal,
}

impl<'a> ParentResolver<'a> {
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
        }
    }

    /// Resolve the chain above `leaf`. Problems are recorded, never raised;
    /// only an abort request ends the walk with an error.
    #[instrument(skip_all, fields(leaf = %leaf.model.display_id()))]
    pub fn resolve(&self, leaf: ChainLevel, problems: &mut ProblemCollector) -> Result<ParentChain, Aborted> {
        let mut visited: HashSet<ModelId> = HashSet::new();
        let mut path: Vec<String> = vec![leaf.model.display_id()];
        if let Some(id) = leaf.model.id() {
            visited.insert(id);
        }
        let mut levels = vec![leaf];

        loop {
            self.abort.check()?;

            let Some(current) = levels.last() else { break };
            let Some(parent_ref) = current.model.parent.clone() else {
                break;
            };
            let Some(parent_id) = parent_ref.id() else {
                // incomplete coordinates are reported by structural validation
                break;
            };

            if visited.contains(&parent_id) {
                path.push(parent_id.to_string());
                problems.add(
                    ModelProblem::new(
                        Severity::Fatal,
                        ProblemKind::CyclicInheritance,
                        current.model.display_id(),
                        format!("The parents form a cycle: {}", path.join(" -> ")),
                    )
                    .at("parent"),
                );
                break;
            }

            match self.locate(current, &parent_ref, &parent_id, problems) {
                Ok(level) => {
                    debug!(parent = %parent_id, origin = ?level.origin, "located parent");
                    visited.insert(parent_id.clone());
                    if let Some(actual) = level.model.id() {
                        visited.insert(actual);
                    }
                    path.push(parent_id.to_string());
                    levels.push(level);
                }
                Err(reason) => {
                    problems.add(
                        ModelProblem::new(
                            Severity::Fatal,
                            ProblemKind::MissingParent,
                            current.model.display_id(),
                            format!("Non-resolvable parent {}: {}", parent_id, reason),
                        )
                        .at("parent"),
                    );
                    break;
                }
            }
        }

        levels.push(ChainLevel::super_default());
        levels.reverse();
        Ok(ParentChain { levels })
    }

    fn locate(
        &self,
        child: &ChainLevel,
        parent_ref: &Parent,
        parent_id: &ModelId,
        problems: &mut ProblemCollector,
    ) -> Result<ChainLevel, String> {
        if let Some(level) = self.locate_relative(child, parent_ref, parent_id, problems) {
            return Ok(level);
        }

        let outcome = self.cache.get_or_resolve(parent_id, || {
            let path = self.repository.locate_parent(parent_id)?;
            let model = self.source.read(&path)?;
            Ok(ResolvedParent { model, path })
        });
        outcome
            .map(|resolved| ChainLevel {
                model: resolved.model,
                origin: ModelOrigin::Repository(resolved.path),
            })
            .map_err(|e| e.to_string())
    }

    fn locate_relative(
        &self,
        child: &ChainLevel,
        parent_ref: &Parent,
        parent_id: &ModelId,
        problems: &mut ProblemCollector,
    ) -> Option<ChainLevel> {
        let relative = parent_ref
            .relative_path
            .as_deref()
            .unwrap_or(DEFAULT_RELATIVE_PATH);
        if relative.trim().is_empty() {
            return None;
        }
        let base = child.base_dir()?;
        let path = self.source.locate(&normalize(&base.join(relative)))?;
        let outcome = self.cache.get_or_read(&path, || {
            let model = self.source.read(&path)?;
            Ok(ResolvedParent {
                model,
                path: path.clone(),
            })
        });

        match outcome.map(|resolved| resolved.model) {
            Ok(model) if model.id().as_ref() == Some(parent_id) => Some(ChainLevel {
                model,
                origin: ModelOrigin::RelativePath(path),
            }),
            Ok(model) => {
                problems.add(
                    ModelProblem::new(
                        Severity::Warning,
                        ProblemKind::ValidationViolation,
                        child.model.display_id(),
                        format!(
                            "'parent.relativePath' points at {} instead of {}, falling back to the repository",
                            model.display_id(),
                            parent_id
                        ),
                    )
                    .at("parent.relativePath"),
                );
                None
            }
            Err(e) => {
                problems.add(
                    ModelProblem::new(
                        Severity::Warning,
                        ProblemKind::ValidationViolation,
                        child.model.display_id(),
                        format!("Cannot read parent at '{}': {}", path.display(), e),
                    )
                    .at("parent.relativePath"),
                );
                None
            }
        }
    }
}
