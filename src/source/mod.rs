//! Descriptor sources
//!
//! Abstracts where raw descriptors come from. Provides:
//! - `ModelSource`: reads a raw descriptor from a location
//! - `RepositorySystem`: maps parent coordinates to a descriptor location
//! - `FileModelSource` / `LocalRepository`: JSON descriptors on disk
//! - `MemorySource` / `MemoryRepository`: in-process doubles for tests and
//!   embedding tools

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use pom_model::{Model, ModelId};
use serde::Serialize;

/// Default descriptor file name inside a project directory.
pub const DEFAULT_DESCRIPTOR_NAME: &str = "pom.json";

/// Reads raw descriptors.
pub trait ModelSource: Send + Sync {
    /// Map a path naming either a descriptor or a project directory to the
    /// descriptor location. `None` when nothing is there.
    fn locate(&self, path: &Path) -> Option<PathBuf>;

    /// Read the raw descriptor at a location returned by `locate` or by a
    /// repository lookup.
    fn read(&self, path: &Path) -> Result<Model, SourceError>;
}

/// Locates parent and imported descriptors by coordinates.
pub trait RepositorySystem: Send + Sync {
    fn locate_parent(&self, id: &ModelId) -> Result<PathBuf, SourceError>;
}

/// Source lookup errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("Descriptor not found: {0}")]
    NotFound(String),

    #[error("I/O error reading {path}: {message}")]
    Io { path: String, message: String },

    #[error("Invalid descriptor {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Cannot resolve {0} in the repository")]
    Unresolvable(ModelId),
}

impl SourceError {
    pub fn code(&self) -> &'static str {
        match self {
            SourceError::NotFound(_) => "NOT_FOUND",
            SourceError::Io { .. } => "IO_ERROR",
            SourceError::Parse { .. } => "PARSE_ERROR",
            SourceError::Unresolvable(_) => "UNRESOLVABLE",
        }
    }
}

/// Where a chain level was read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "path", rename_all = "snake_case")]
pub enum ModelOrigin {
    /// Handed in by the caller, optionally with the path it was read from
    Provided(Option<PathBuf>),
    /// Found through `parent.relativePath`
    RelativePath(PathBuf),
    /// Found through a repository lookup
    Repository(PathBuf),
    /// The implicit root
    SuperDefault,
}

impl ModelOrigin {
    /// Descriptor path, when the level came from one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            ModelOrigin::Provided(path) => path.as_deref(),
            ModelOrigin::RelativePath(path) | ModelOrigin::Repository(path) => Some(path),
            ModelOrigin::SuperDefault => None,
        }
    }

    /// Project directory of the level: the directory holding its descriptor.
    pub fn base_dir(&self) -> Option<&Path> {
        self.path().and_then(Path::parent)
    }
}

/// JSON descriptors on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileModelSource {
    descriptor_name: String,
}

impl FileModelSource {
    pub fn new() -> Self {
        Self::with_descriptor_name(DEFAULT_DESCRIPTOR_NAME)
    }

    pub fn with_descriptor_name(name: impl Into<String>) -> Self {
        Self {
            descriptor_name: name.into(),
        }
    }

    pub fn descriptor_name(&self) -> &str {
        &self.descriptor_name
    }
}

impl Default for FileModelSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelSource for FileModelSource {
    fn locate(&self, path: &Path) -> Option<PathBuf> {
        if path.is_dir() {
            let candidate = path.join(&self.descriptor_name);
            candidate.is_file().then_some(candidate)
        } else if path.is_file() {
            Some(path.to_path_buf())
        } else {
            None
        }
    }

    fn read(&self, path: &Path) -> Result<Model, SourceError> {
        let bytes = fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SourceError::NotFound(path.display().to_string())
            } else {
                SourceError::Io {
                    path: path.display().to_string(),
                    message: e.to_string(),
                }
            }
        })?;
        serde_json::from_slice(&bytes).map_err(|e| SourceError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

/// Local repository laid out as
/// `<root>/<group/path>/<artifactId>/<version>/<artifactId>-<version>.pom.json`.
#[derive(Debug, Clone)]
pub struct LocalRepository {
    root: PathBuf,
}

impl LocalRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path a descriptor with `id` occupies, whether or not it exists.
    pub fn path_of(&self, id: &ModelId) -> PathBuf {
        let mut path = self.root.clone();
        for segment in id.group_id.split('.') {
            path.push(segment);
        }
        path.push(&id.artifact_id);
        path.push(&id.version);
        path.push(format!("{}-{}.pom.json", id.artifact_id, id.version));
        path
    }
}

impl RepositorySystem for LocalRepository {
    fn locate_parent(&self, id: &ModelId) -> Result<PathBuf, SourceError> {
        let path = self.path_of(id);
        if path.is_file() {
            Ok(path)
        } else {
            Err(SourceError::Unresolvable(id.clone()))
        }
    }
}

/// Repository that never finds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRepository;

impl RepositorySystem for NoRepository {
    fn locate_parent(&self, id: &ModelId) -> Result<PathBuf, SourceError> {
        Err(SourceError::Unresolvable(id.clone()))
    }
}

/// In-memory descriptors keyed by path.
#[derive(Debug, Default)]
pub struct MemorySource {
    models: Mutex<HashMap<PathBuf, Model>>,
    reads: AtomicUsize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `model` at `path` (a descriptor path, e.g. `/p/child/pom.json`).
    pub fn insert(&self, path: impl Into<PathBuf>, model: Model) {
        if let Ok(mut models) = self.models.lock() {
            models.insert(path.into(), model);
        }
    }

    pub fn with(self, path: impl Into<PathBuf>, model: Model) -> Self {
        self.insert(path, model);
        self
    }

    /// Number of successful and failed `read` calls.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl ModelSource for MemorySource {
    fn locate(&self, path: &Path) -> Option<PathBuf> {
        let models = self.models.lock().ok()?;
        let path = normalize(path);
        if models.contains_key(&path) {
            return Some(path);
        }
        let candidate = path.join(DEFAULT_DESCRIPTOR_NAME);
        models.contains_key(&candidate).then_some(candidate)
    }

    fn read(&self, path: &Path) -> Result<Model, SourceError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.models
            .lock()
            .ok()
            .and_then(|models| models.get(&normalize(path)).cloned())
            .ok_or_else(|| SourceError::NotFound(path.display().to_string()))
    }
}

/// In-memory coordinate index that counts lookups.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    index: Mutex<HashMap<ModelId, PathBuf>>,
    lookups: AtomicUsize,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: ModelId, path: impl Into<PathBuf>) {
        if let Ok(mut index) = self.index.lock() {
            index.insert(id, path.into());
        }
    }

    pub fn with(self, id: ModelId, path: impl Into<PathBuf>) -> Self {
        self.insert(id, path);
        self
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl RepositorySystem for MemoryRepository {
    fn locate_parent(&self, id: &ModelId) -> Result<PathBuf, SourceError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.index
            .lock()
            .ok()
            .and_then(|index| index.get(id).cloned())
            .ok_or_else(|| SourceError::Unresolvable(id.clone()))
    }
}

/// Lexically collapse `.` and `..` segments without touching the
/// filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    use std::path::Component;

    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
