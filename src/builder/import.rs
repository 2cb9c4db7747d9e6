//! Dependency management import
//!
//! Managed entries with `type=pom` and `scope=import` stand for another
//! descriptor's management. Each named descriptor is located in the
//! repository, built to its effective model at `minimal` validation and its
//! `dependencyManagement` merged in recessively. The import entries
//! themselves never reach the effective model.

use std::collections::BTreeSet;

use pom_model::{Dependency, Model, ModelId};
use tracing::{debug, warn};

use super::{aborted, ModelBuilder, ModelBuildingError, ModelBuildingRequest};
use crate::context::ActivationContext;
use crate::lineage::ResolvedParent;
use crate::management;
use crate::problem::{ModelProblem, ProblemCollector, ProblemKind, Severity, ValidationLevel};

impl<'a> ModelBuilder<'a> {
    /// Replace the import entries of `model`'s dependency management with
    /// the management they name.
    pub(super) fn import_management(
        &self,
        mut model: Model,
        context: &ActivationContext,
        imports: &mut Vec<ModelId>,
        problems: &mut ProblemCollector,
    ) -> Result<Model, ModelBuildingError> {
        if !model.dependency_management.iter().any(management::is_import) {
            return Ok(model);
        }
        let model_id = model.display_id();

        let mut managed = Vec::with_capacity(model.dependency_management.len());
        let mut requested = Vec::new();
        for (i, dependency) in std::mem::take(&mut model.dependency_management).into_iter().enumerate() {
            if management::is_import(&dependency) {
                requested.push((i, dependency));
            } else {
                managed.push(dependency);
            }
        }

        let importing = model.id();
        if let Some(id) = &importing {
            imports.push(id.clone());
        }
        let loaded = self.load_imports(&requested, &model_id, context, imports, problems);
        if importing.is_some() {
            imports.pop();
        }

        let added = management::import_dependencies(&mut managed, loaded?);
        debug!(model = %model_id, imports = requested.len(), added, "imported dependency management");
        model.dependency_management = managed;
        Ok(model)
    }

    fn load_imports(
        &self,
        requested: &[(usize, Dependency)],
        model_id: &str,
        context: &ActivationContext,
        imports: &mut Vec<ModelId>,
        problems: &mut ProblemCollector,
    ) -> Result<Vec<Vec<Dependency>>, ModelBuildingError> {
        let mut loaded = Vec::with_capacity(requested.len());
        for (i, dependency) in requested {
            self.checkpoint(problems)?;
            let location = format!("dependencyManagement[{}]", i);
            if let Some(entries) = self.load_import(dependency, &location, model_id, context, imports, problems)? {
                loaded.push(management::exclude_imported(entries, &dependency.exclusions));
            }
        }
        Ok(loaded)
    }

    /// Effective management of the descriptor one import entry names.
    /// `None` when it could not be obtained; the reason is recorded.
    fn load_import(
        &self,
        dependency: &Dependency,
        location: &str,
        model_id: &str,
        context: &ActivationContext,
        imports: &mut Vec<ModelId>,
        problems: &mut ProblemCollector,
    ) -> Result<Option<Vec<Dependency>>, ModelBuildingError> {
        let coordinates = [
            ("groupId", dependency.group_id.as_str()),
            ("artifactId", dependency.artifact_id.as_str()),
            ("version", dependency.version.as_deref().unwrap_or_default()),
        ];
        for (field, value) in coordinates {
            if value.trim().is_empty() {
                problems.add(
                    ModelProblem::new(
                        Severity::Error,
                        ProblemKind::ValidationViolation,
                        model_id,
                        format!(
                            "'dependencyManagement.dependencies.dependency.{}' for {} is missing.",
                            field,
                            dependency.management_key()
                        ),
                    )
                    .at(location),
                );
                return Ok(None);
            }
        }
        let [(_, group_id), (_, artifact_id), (_, version)] = coordinates;
        let id = ModelId::new(group_id, artifact_id, version);

        if imports.contains(&id) {
            let cycle: Vec<String> = imports.iter().chain(Some(&id)).map(ModelId::to_string).collect();
            problems.add(
                ModelProblem::new(
                    Severity::Error,
                    ProblemKind::CyclicImport,
                    model_id,
                    format!(
                        "The dependencies of type=pom and with scope=import form a cycle: {}",
                        cycle.join(" -> ")
                    ),
                )
                .at(location),
            );
            return Ok(None);
        }

        let outcome = self.cache.get_or_resolve(&id, || {
            let path = self.repository.locate_parent(&id)?;
            let model = self.source.read(&path)?;
            Ok(ResolvedParent { model, path })
        });
        let resolved = match outcome {
            Ok(resolved) if resolved.model.id().as_ref() == Some(&id) => resolved,
            Ok(resolved) => {
                let message = format!(
                    "Non-resolvable import POM {}: {} declares {}",
                    id,
                    resolved.path.display(),
                    resolved.model.display_id()
                );
                problems.add(
                    ModelProblem::new(Severity::Error, ProblemKind::UnresolvableImport, model_id, message).at(location),
                );
                return Ok(None);
            }
            Err(e) => {
                problems.add(
                    ModelProblem::new(
                        Severity::Error,
                        ProblemKind::UnresolvableImport,
                        model_id,
                        format!("Non-resolvable import POM {}: {}", id, e),
                    )
                    .at(location),
                );
                return Ok(None);
            }
        };

        debug!(import = %id, path = %resolved.path.display(), "building imported descriptor");
        let request = ModelBuildingRequest::new(resolved.model)
            .with_path(resolved.path)
            .with_context(import_context(context))
            .with_validation(ValidationLevel::Minimal);
        match self.build_importing(request, imports) {
            Ok(result) => {
                problems.extend(result.problems);
                Ok(Some(result.effective_model.dependency_management))
            }
            Err(ModelBuildingError::Problems(result)) => {
                warn!(import = %id, problems = result.problems.len(), "imported descriptor is invalid, skipping it");
                problems.extend(result.problems);
                Ok(None)
            }
            Err(ModelBuildingError::Aborted { problems: recorded }) => {
                problems.extend(recorded);
                Err(aborted(problems))
            }
        }
    }
}

/// Imported descriptors see the caller's properties and platform but none of
/// its profile requests or project directory.
fn import_context(context: &ActivationContext) -> ActivationContext {
    ActivationContext {
        project_base_dir: None,
        explicitly_activated: BTreeSet::new(),
        explicitly_deactivated: BTreeSet::new(),
        ..context.clone()
    }
}
