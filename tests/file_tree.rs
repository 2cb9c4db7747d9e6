//! Builds over descriptors on disk: relative-path parents, the local
//! repository layout and file-based profile activation.

mod fixtures;

use std::sync::Arc;

use fixtures::{child_of, parent_of, ProjectTree};
use pom_builder::source::ModelOrigin;
use pom_builder::{ActivationContext, BuildSession, FileModelSource, ModelBuildingRequest};
use pom_model::{Activation, Dependency, Model, Profile};

fn session(tree: &ProjectTree) -> BuildSession {
    BuildSession::new(Arc::new(FileModelSource::new()), Arc::new(tree.repository()))
}

#[test]
fn test_parent_found_through_default_relative_path() {
    let tree = ProjectTree::new();
    let parent = Model::new("org.acme", "parent", "1.0")
        .with_property("java.release", "17")
        .with_managed_dependency(Dependency::new("org.acme", "lib").with_version("2.0"));
    let parent_path = tree.write("", &parent);
    let child_path = tree.write(
        "core",
        &child_of("core", &parent)
            .with_property("release", "${java.release}")
            .with_dependency(Dependency::new("org.acme", "lib")),
    );

    let session = session(&tree);
    let child = session.read(&child_path).unwrap();
    let result = session
        .build(ModelBuildingRequest::new(child).with_path(&child_path))
        .unwrap();

    let effective = &result.effective_model;
    assert_eq!(effective.version.as_deref(), Some("1.0"));
    assert_eq!(effective.properties["release"], "17");
    assert_eq!(effective.dependencies[0].version.as_deref(), Some("2.0"));
    assert_eq!(result.chain[1].origin, ModelOrigin::RelativePath(parent_path));
}

#[test]
fn test_parent_found_in_local_repository() {
    let tree = ProjectTree::new();
    let parent = Model::new("org.acme", "parent", "1.0").with_property("from", "repository");
    let installed = tree.install(&parent);
    let child = Model {
        parent: Some(parent_of(&parent).with_relative_path("")),
        ..child_of("app", &parent)
    };
    let child_path = tree.write("app", &child);

    let session = session(&tree);
    let result = session
        .build(ModelBuildingRequest::new(session.read(&child_path).unwrap()).with_path(&child_path))
        .unwrap();

    assert_eq!(result.effective_model.properties["from"], "repository");
    assert_eq!(result.chain[1].origin, ModelOrigin::Repository(installed));
    let stats = session.close();
    assert_eq!(stats.misses, 1);
}

#[test]
fn test_mismatched_relative_path_falls_back_to_repository() {
    let tree = ProjectTree::new();
    let parent = Model::new("org.acme", "parent", "1.0").with_property("from", "repository");
    tree.install(&parent);
    tree.write("", &Model::new("org.acme", "unrelated", "9"));
    let child_path = tree.write("app", &child_of("app", &parent));

    let session = session(&tree);
    let result = session
        .build(ModelBuildingRequest::new(session.read(&child_path).unwrap()).with_path(&child_path))
        .unwrap();

    assert_eq!(result.effective_model.properties["from"], "repository");
    assert!(matches!(result.chain[1].origin, ModelOrigin::Repository(_)));
    assert!(result
        .problems
        .iter()
        .any(|p| p.location.as_deref() == Some("parent.relativePath")));
}

#[test]
fn test_file_activation_uses_each_levels_directory() {
    let tree = ProjectTree::new();
    let parent = Model::new("org.acme", "parent", "1.0").with_profile(
        Profile::new("has-marker")
            .with_activation(Activation::File {
                exists: Some("${basedir}/marker.txt".to_string()),
                missing: None,
            })
            .with_property("marker", "parent"),
    );
    tree.write("", &parent);
    tree.write_file("marker.txt", "");
    let child_path = tree.write("app", &child_of("app", &parent));

    let session = session(&tree);
    let result = session
        .build(
            ModelBuildingRequest::new(session.read(&child_path).unwrap())
                .with_path(&child_path)
                .with_context(ActivationContext::new()),
        )
        .unwrap();

    assert_eq!(result.active_profile_ids, vec!["has-marker".to_string()]);
    assert_eq!(result.effective_model.properties["marker"], "parent");
}

#[test]
fn test_unreadable_descriptor_is_reported() {
    let tree = ProjectTree::new();
    let path = tree.write_file("broken/pom.json", "{ not json");

    let session = session(&tree);
    let err = session.read(&path).unwrap_err();
    assert_eq!(err.code(), "PARSE_ERROR");
}
