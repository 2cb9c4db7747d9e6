//! Shared fixtures for the integration tests
//!
//! - golden expectations under `tests/fixtures/golden/`
//! - project trees written to a temporary directory as JSON descriptors
//! - small model helpers

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use pom_builder::LocalRepository;
use pom_model::{Model, ModelId, Parent};
use tempfile::TempDir;

/// Path to a golden expectation file
pub fn golden_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/golden")
        .join(name)
}

/// Load and parse a golden expectation file
pub fn load_golden(name: &str) -> serde_json::Value {
    let path = golden_path(name);
    let content = fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read {}: {}", path.display(), e));
    serde_json::from_str(&content).unwrap_or_else(|e| panic!("failed to parse {}: {}", path.display(), e))
}

/// A project tree on disk, removed when dropped.
pub struct ProjectTree {
    dir: TempDir,
}

impl ProjectTree {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write `model` as `<rel>/pom.json` and return the descriptor path.
    pub fn write(&self, rel: &str, model: &Model) -> PathBuf {
        let dir = if rel.is_empty() {
            self.root().to_path_buf()
        } else {
            self.root().join(rel)
        };
        fs::create_dir_all(&dir).expect("failed to create project dir");
        let path = dir.join("pom.json");
        let json = serde_json::to_vec_pretty(model).expect("failed to serialize model");
        fs::write(&path, json).expect("failed to write descriptor");
        path
    }

    /// Write an arbitrary file relative to the root.
    pub fn write_file(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.root().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create dir");
        }
        fs::write(&path, content).expect("failed to write file");
        path
    }

    pub fn repository_root(&self) -> PathBuf {
        self.root().join("repository")
    }

    pub fn repository(&self) -> LocalRepository {
        LocalRepository::new(self.repository_root())
    }

    /// Install `model` into the tree's local repository.
    pub fn install(&self, model: &Model) -> PathBuf {
        let id = model.id().expect("installed models need full coordinates");
        let path = self.repository().path_of(&id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create repository dir");
        }
        let json = serde_json::to_vec_pretty(model).expect("failed to serialize model");
        fs::write(&path, json).expect("failed to write descriptor");
        path
    }
}

/// Parent reference pointing at `parent`'s coordinates.
pub fn parent_of(parent: &Model) -> Parent {
    let id = parent.id().expect("parent needs full coordinates");
    Parent::new(id.group_id, id.artifact_id, id.version)
}

/// A child that inherits its groupId and version.
pub fn child_of(artifact_id: &str, parent: &Model) -> Model {
    Model {
        artifact_id: Some(artifact_id.to_string()),
        parent: Some(parent_of(parent)),
        ..Model::default()
    }
}

pub fn model_id(group_id: &str, artifact_id: &str, version: &str) -> ModelId {
    ModelId::new(group_id, artifact_id, version)
}
