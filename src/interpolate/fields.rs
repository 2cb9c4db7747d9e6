//! `project.*` expressions addressing the model's own fields.

use pom_model::Model;

/// Raw (uninterpolated) value of the model field at `path`, where `path` is
/// the part after `project.`, e.g. `version` or `build.directory`.
pub(crate) fn model_field(model: &Model, path: &str) -> Option<String> {
    let value = match path {
        "groupId" => model.group_id.as_deref(),
        "artifactId" => model.artifact_id.as_deref(),
        "version" => model.version.as_deref(),
        "packaging" => model.packaging.as_deref(),
        "name" => model.name.as_deref(),
        "description" => model.description.as_deref(),
        "url" => model.url.as_deref(),
        "scm.url" => model.scm.url.as_deref(),
        "scm.connection" => model.scm.connection.as_deref(),
        "scm.developerConnection" => model.scm.developer_connection.as_deref(),
        "scm.tag" => model.scm.tag.as_deref(),
        "distributionManagement.url" => model.distribution_management.url.as_deref(),
        "build.defaultGoal" => model.build.default_goal.as_deref(),
        "build.directory" => model.build.directory.as_deref(),
        "build.finalName" => model.build.final_name.as_deref(),
        "build.outputDirectory" => model.build.output_directory.as_deref(),
        "build.sourceDirectory" => model.build.source_directory.as_deref(),
        "parent.groupId" => model.parent.as_ref().and_then(|p| p.group_id.as_deref()),
        "parent.artifactId" => model.parent.as_ref().and_then(|p| p.artifact_id.as_deref()),
        "parent.version" => model.parent.as_ref().and_then(|p| p.version.as_deref()),
        other => {
            return other
                .strip_prefix("properties.")
                .and_then(|key| model.properties.get(key))
                .cloned()
        }
    };
    value.map(str::to_string)
}
