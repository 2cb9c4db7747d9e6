//! A build assembled the way the CLI does it: project config on disk,
//! context from the config layers, built-in finalizers.

mod fixtures;

use std::sync::Arc;

use fixtures::ProjectTree;
use pom_builder::config::{EffectiveConfig, PROJECT_CONFIG_NAME};
use pom_builder::finalize::{classifier_management, plugin_configuration_expansion};
use pom_builder::{
    ActivationContext, BuildSession, FileModelSource, LocalRepository, ModelBuildingRequest, ValidationLevel,
};
use pom_model::{ConfigNode, Dependency, Execution, Model, Plugin, Profile};

fn descriptor() -> Model {
    Model::new("org.acme", "app", "1.0")
        .with_managed_dependency(Dependency::new("org.acme", "native").with_version("4.2"))
        .with_dependency(Dependency::new("org.acme", "native").with_classifier("linux"))
        .with_dependency(Dependency::new("org.acme", "unmanaged"))
        .with_plugin(
            Plugin::new("org.acme.plugins", "packager")
                .with_version("1.0")
                .with_configuration(ConfigNode::new("configuration").with_child(ConfigNode::leaf("format", "zip")))
                .with_execution(Execution::new("bundle").with_goal("package")),
        )
        .with_profile(Profile::new("release").with_property("channel", "${release.channel}"))
}

#[test]
fn test_project_config_drives_the_build() {
    let tree = ProjectTree::new();
    let leaf = tree.write("", &descriptor());
    let project_config = tree.write_file(
        PROJECT_CONFIG_NAME,
        r#"
validation = "lenient"
managed_classifiers = ["linux"]

[profiles]
active = ["release"]

[properties]
"release.channel" = "stable"
"#,
    );

    let config = EffectiveConfig::build(None, Some(&project_config), None).unwrap();
    assert_eq!(config.validation_level(), ValidationLevel::Lenient);

    let session = BuildSession::new(
        Arc::new(FileModelSource::with_descriptor_name(config.descriptor_name())),
        Arc::new(LocalRepository::new(tree.repository_root())),
    )
    .with_finalizer(plugin_configuration_expansion())
    .with_finalizer(classifier_management(config.managed_classifiers()));

    let context = config
        .apply(ActivationContext::new())
        .with_base_dir(tree.root());
    let request = ModelBuildingRequest::new(session.read(&leaf).unwrap())
        .with_path(&leaf)
        .with_context(context)
        .with_validation(config.validation_level());

    // the unmanaged dependency has no version: an error at lenient
    let err = session.build(request).unwrap_err();
    let result = err.result().unwrap();
    let effective = &result.effective_model;

    assert_eq!(result.active_profile_ids, vec!["release".to_string()]);
    assert_eq!(effective.properties["channel"], "stable");

    let native = effective
        .dependencies
        .iter()
        .find(|d| d.artifact_id == "native")
        .unwrap();
    assert_eq!(native.version.as_deref(), Some("4.2"));

    let execution = &effective.plugins[0].executions[0];
    let format = execution
        .configuration
        .as_ref()
        .and_then(|c| c.child("format"))
        .and_then(|n| n.value.as_deref());
    assert_eq!(format, Some("zip"));
}

#[test]
fn test_minimal_validation_from_cli_layer_accepts() {
    let tree = ProjectTree::new();
    let leaf = tree.write("", &descriptor());

    let cli = serde_json::json!({ "validation": "minimal", "profiles": { "inactive": ["release"] } });
    let config = EffectiveConfig::build(None, None, Some(cli)).unwrap();

    let session = BuildSession::new(
        Arc::new(FileModelSource::new()),
        Arc::new(LocalRepository::new(tree.repository_root())),
    );
    let context = config.apply(ActivationContext::new().activate("release"));
    let result = session
        .build(
            ModelBuildingRequest::new(session.read(&leaf).unwrap())
                .with_path(&leaf)
                .with_context(context)
                .with_validation(config.validation_level()),
        )
        .unwrap();

    assert!(result.active_profile_ids.is_empty());
    assert!(!result.effective_model.properties.contains_key("channel"));
    // without the classifier finalizer the classified dependency stays unmanaged
    let native = result
        .effective_model
        .dependencies
        .iter()
        .find(|d| d.artifact_id == "native")
        .unwrap();
    assert!(native.version.is_none());
}
