//! Concurrent builds sharing one session.

mod fixtures;

use std::sync::Arc;
use std::thread;

use fixtures::model_id;
use pom_builder::source::{MemoryRepository, MemorySource};
use pom_builder::{BuildSession, ModelBuildingRequest};
use pom_model::{Model, Parent};

const BUILDS: usize = 8;

fn published() -> (Arc<MemorySource>, Arc<MemoryRepository>) {
    let root = Model::new("org.acme", "root", "1").with_property("origin", "root");
    let parent = Model::new("org.acme", "parent", "1")
        .with_parent(Parent::new("org.acme", "root", "1").with_relative_path(""))
        .with_property("tier", "parent");

    let source = MemorySource::new()
        .with("/repo/root.pom.json", root)
        .with("/repo/parent.pom.json", parent);
    let repository = MemoryRepository::new()
        .with(model_id("org.acme", "root", "1"), "/repo/root.pom.json")
        .with(model_id("org.acme", "parent", "1"), "/repo/parent.pom.json");
    (Arc::new(source), Arc::new(repository))
}

fn module(index: usize) -> Model {
    Model::new("org.acme", format!("module-{}", index), "1")
        .with_parent(Parent::new("org.acme", "parent", "1").with_relative_path(""))
}

#[test]
fn test_shared_parents_resolve_once() {
    let (source, repository) = published();
    let session = Arc::new(BuildSession::new(source.clone(), repository.clone()));

    let handles: Vec<_> = (0..BUILDS)
        .map(|i| {
            let session = Arc::clone(&session);
            thread::spawn(move || session.build(ModelBuildingRequest::new(module(i))))
        })
        .collect();
    for handle in handles {
        let result = handle.join().unwrap().unwrap();
        assert_eq!(result.effective_model.properties["origin"], "root");
        assert_eq!(result.effective_model.properties["tier"], "parent");
        assert_eq!(result.chain.len(), 4);
    }

    assert_eq!(repository.lookups(), 2);
    assert_eq!(source.reads(), 2);
    let stats = session.cache_stats();
    assert_eq!(stats.entries, 2);
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.hits, 2 * (BUILDS - 1));
}

#[test]
fn test_identical_builds_share_a_fingerprint() {
    let (source, repository) = published();
    let session = BuildSession::new(source, repository);

    let first = session.build(ModelBuildingRequest::new(module(0))).unwrap();
    let second = session.build(ModelBuildingRequest::new(module(0))).unwrap();
    let other = session.build(ModelBuildingRequest::new(module(1))).unwrap();

    assert_eq!(first.fingerprint, second.fingerprint);
    assert_ne!(first.fingerprint, other.fingerprint);
}

#[test]
fn test_sibling_modules_read_their_parent_once() {
    let parent = Model::new("org.acme", "aggregator", "1").with_property("shared", "yes");
    let source = Arc::new(MemorySource::new().with("/w/pom.json", parent));
    let repository = Arc::new(MemoryRepository::new());
    let session = Arc::new(BuildSession::new(source.clone(), repository.clone()));

    let handles: Vec<_> = ["a", "b", "c", "d"]
        .into_iter()
        .map(|name| {
            let session = Arc::clone(&session);
            thread::spawn(move || {
                let model = Model::new("org.acme", name, "1")
                    .with_parent(Parent::new("org.acme", "aggregator", "1"));
                session.build(ModelBuildingRequest::new(model).with_path(format!("/w/{}/pom.json", name)))
            })
        })
        .collect();
    for handle in handles {
        let result = handle.join().unwrap().unwrap();
        assert_eq!(result.effective_model.properties["shared"], "yes");
    }

    assert_eq!(source.reads(), 1);
    assert_eq!(repository.lookups(), 0);
    assert_eq!(session.cache_stats().misses, 1);
}
