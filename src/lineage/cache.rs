//! Session-scoped memo of parent descriptor reads.
//!
//! Entries are keyed by identity (repository lookups, imports) or by the
//! normalized descriptor path (`relativePath` reads). At most one read runs
//! per key: concurrent requesters for the same key block on the in-flight
//! read and share its outcome. The map lock is never held while a read runs.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use pom_model::{Model, ModelId};
use serde::Serialize;

use crate::source::SourceError;

/// A parent descriptor and the path it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedParent {
    pub model: Model,
    pub path: PathBuf,
}

pub type ParentOutcome = Result<ResolvedParent, SourceError>;

type Slot = Arc<OnceLock<ParentOutcome>>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CacheKey {
    Id(ModelId),
    Path(PathBuf),
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Id(id) => write!(f, "{}", id),
            CacheKey::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Counters reported when a session closes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: usize,
    pub misses: usize,
}

#[derive(Debug, Default)]
pub struct ParentCache {
    slots: Mutex<HashMap<CacheKey, Slot>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl ParentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Outcome for `id`, running `resolve` only if no other caller has.
    /// Failures are memoized too.
    pub fn get_or_resolve(&self, id: &ModelId, resolve: impl FnOnce() -> ParentOutcome) -> ParentOutcome {
        self.memoize(CacheKey::Id(id.clone()), resolve)
    }

    /// Outcome of reading the descriptor at `path`, read at most once.
    /// Callers still check the identity of what they get back.
    pub fn get_or_read(&self, path: &Path, read: impl FnOnce() -> ParentOutcome) -> ParentOutcome {
        self.memoize(CacheKey::Path(path.to_path_buf()), read)
    }

    fn memoize(&self, key: CacheKey, resolve: impl FnOnce() -> ParentOutcome) -> ParentOutcome {
        let slot = match self.slots.lock() {
            Ok(mut slots) => Arc::clone(slots.entry(key.clone()).or_default()),
            Err(_) => {
                tracing::warn!(parent = %key, "parent cache lock poisoned, resolving uncached");
                return resolve();
            }
        };

        let mut resolved_here = false;
        let outcome = slot.get_or_init(|| {
            resolved_here = true;
            resolve()
        });
        if resolved_here {
            self.misses.fetch_add(1, Ordering::SeqCst);
            tracing::debug!(parent = %key, ok = outcome.is_ok(), "resolved parent");
        } else {
            self.hits.fetch_add(1, Ordering::SeqCst);
        }
        outcome.clone()
    }

    pub fn len(&self) -> usize {
        self.slots.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::SeqCst),
            misses: self.misses.load(Ordering::SeqCst),
        }
    }

    /// Drop every entry, returning the final counters.
    pub fn clear(&self) -> CacheStats {
        let stats = self.stats();
        if let Ok(mut slots) = self.slots.lock() {
            slots.clear();
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    fn resolved(id: &ModelId) -> ParentOutcome {
        Ok(ResolvedParent {
            model: Model::new(&id.group_id, &id.artifact_id, &id.version),
            path: PathBuf::from("/repo/parent.json"),
        })
    }

    #[test]
    fn test_second_request_hits() {
        let cache = ParentCache::new();
        let id = ModelId::new("g", "p", "1");
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let outcome = cache.get_or_resolve(&id, || {
                calls.fetch_add(1, Ordering::SeqCst);
                resolved(&id)
            });
            assert!(outcome.is_ok());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            cache.stats(),
            CacheStats {
                entries: 1,
                hits: 2,
                misses: 1
            }
        );
    }

    #[test]
    fn test_failures_are_memoized() {
        let cache = ParentCache::new();
        let id = ModelId::new("g", "missing", "1");

        let first = cache.get_or_resolve(&id, || Err(SourceError::Unresolvable(id.clone())));
        let second = cache.get_or_resolve(&id, || resolved(&id));
        assert!(first.is_err());
        assert_eq!(first, second);
    }

    #[test]
    fn test_concurrent_requests_coalesce() {
        let cache = Arc::new(ParentCache::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));
        let id = ModelId::new("g", "p", "1");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                let barrier = Arc::clone(&barrier);
                let id = id.clone();
                thread::spawn(move || {
                    barrier.wait();
                    cache.get_or_resolve(&id, || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(50));
                        resolved(&id)
                    })
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap().is_ok());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_paths_and_ids_are_separate_entries() {
        let cache = ParentCache::new();
        let id = ModelId::new("g", "p", "1");
        let path = Path::new("/work/pom.json");
        let reads = AtomicUsize::new(0);

        for _ in 0..2 {
            cache
                .get_or_read(path, || {
                    reads.fetch_add(1, Ordering::SeqCst);
                    resolved(&id)
                })
                .unwrap();
        }
        cache.get_or_resolve(&id, || resolved(&id)).unwrap();

        assert_eq!(reads.load(Ordering::SeqCst), 1);
        assert_eq!(
            cache.stats(),
            CacheStats {
                entries: 2,
                hits: 1,
                misses: 2
            }
        );
    }

    #[test]
    fn test_clear_returns_stats() {
        let cache = ParentCache::new();
        let id = ModelId::new("g", "p", "1");
        cache.get_or_resolve(&id, || resolved(&id)).unwrap();

        let stats = cache.clear();
        assert_eq!(stats.entries, 1);
        assert!(cache.is_empty());
    }
}
