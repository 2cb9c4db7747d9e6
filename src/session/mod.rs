//! Build session: the owner of everything shared between builds.
//!
//! A session is created once per invocation (or per multi-module build),
//! handed to every build, and closed at the end. It holds the parent cache,
//! so concurrent builds asking for the same parent trigger one lookup.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use pom_model::Model;
use tracing::info;
use ulid::Ulid;

use crate::builder::{ModelBuilder, ModelBuildingError, ModelBuildingRequest, ModelBuildingResult};
use crate::finalize::Finalizer;
use crate::lineage::{CacheStats, ParentCache};
use crate::signal::AbortSignal;
use crate::source::{ModelSource, RepositorySystem, SourceError};

pub struct BuildSession {
    id: String,
    started: DateTime<Utc>,
    source: Arc<dyn ModelSource>,
    repository: Arc<dyn RepositorySystem>,
    cache: ParentCache,
    abort: AbortSignal,
    finalizers: Vec<Finalizer>,
}

impl BuildSession {
    pub fn new(source: Arc<dyn ModelSource>, repository: Arc<dyn RepositorySystem>) -> Self {
        let session = Self {
            id: Ulid::new().to_string().to_lowercase(),
            started: Utc::now(),
            source,
            repository,
            cache: ParentCache::new(),
            abort: AbortSignal::new(),
            finalizers: Vec::new(),
        };
        info!(session = %session.id, "build session opened");
        session
    }

    pub fn with_finalizer(mut self, finalizer: Finalizer) -> Self {
        self.finalizers.push(finalizer);
        self
    }

    /// Share an externally owned abort flag, e.g. one wired to a signal
    /// handler.
    pub fn with_abort_signal(mut self, abort: AbortSignal) -> Self {
        self.abort = abort;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn started(&self) -> DateTime<Utc> {
        self.started
    }

    pub fn abort_signal(&self) -> &AbortSignal {
        &self.abort
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Read a leaf descriptor through the session's model source.
    pub fn read(&self, path: &Path) -> Result<Model, SourceError> {
        let located = self
            .source
            .locate(path)
            .ok_or_else(|| SourceError::NotFound(path.display().to_string()))?;
        self.source.read(&located)
    }

    pub fn build(&self, request: ModelBuildingRequest) -> Result<ModelBuildingResult, ModelBuildingError> {
        ModelBuilder::new(
            self.source.as_ref(),
            self.repository.as_ref(),
            &self.cache,
            &self.abort,
        )
        .with_finalizers(&self.finalizers)
        .with_build_started(self.started)
        .build(request)
    }

    /// Tear down the parent cache, returning its final counters.
    pub fn close(self) -> CacheStats {
        let stats = self.cache.clear();
        info!(
            session = %self.id,
            entries = stats.entries,
            hits = stats.hits,
            misses = stats.misses,
            "build session closed"
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{MemoryRepository, MemorySource};
    use pom_model::{ModelId, Parent};
    use std::thread;

    fn child(artifact_id: &str) -> Model {
        Model::new("org.acme", artifact_id, "1").with_parent(
            Parent::new("org.acme", "parent", "1").with_relative_path(""),
        )
    }

    #[test]
    fn test_session_id_is_lowercase_ulid() {
        let session = BuildSession::new(Arc::new(MemorySource::new()), Arc::new(MemoryRepository::new()));
        assert_eq!(session.id().len(), 26);
        assert_eq!(session.id(), session.id().to_lowercase());
    }

    #[test]
    fn test_parent_resolved_once_across_builds() {
        let source = Arc::new(MemorySource::new().with("/repo/parent.pom.json", Model::new("org.acme", "parent", "1")));
        let repository = Arc::new(
            MemoryRepository::new().with(ModelId::new("org.acme", "parent", "1"), "/repo/parent.pom.json"),
        );
        let session = Arc::new(BuildSession::new(source.clone(), repository.clone()));

        let handles: Vec<_> = ["a", "b", "c", "d"]
            .into_iter()
            .map(|name| {
                let session = Arc::clone(&session);
                thread::spawn(move || session.build(ModelBuildingRequest::new(child(name))))
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap().is_ok());
        }

        assert_eq!(repository.lookups(), 1);
        assert_eq!(source.reads(), 1);
        let session = Arc::try_unwrap(session).ok().unwrap();
        let stats = session.close();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 3);
    }

    #[test]
    fn test_read_missing_descriptor() {
        let session = BuildSession::new(Arc::new(MemorySource::new()), Arc::new(MemoryRepository::new()));
        let err = session.read(Path::new("/none/pom.json")).unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }
}
