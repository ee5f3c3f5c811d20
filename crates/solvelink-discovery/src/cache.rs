//! Per-connection memo of advertised feature lists.
//!
//! Keyed by `(connection url, kind)`. Only successful answers are stored, so
//! a connection that failed once is asked again next time.

use std::collections::HashMap;
use std::sync::Mutex;

use solvelink_core::protocol::{Feature, FeatureKind};

#[derive(Debug, Default)]
pub struct FeatureCache {
    entries: Mutex<HashMap<(String, FeatureKind), Vec<Feature>>>,
}

impl FeatureCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &str, kind: FeatureKind) -> Option<Vec<Feature>> {
        self.lock().get(&(url.to_string(), kind)).cloned()
    }

    pub fn put(&self, url: &str, kind: FeatureKind, features: Vec<Feature>) {
        self.lock().insert((url.to_string(), kind), features);
    }

    /// Drop every list cached for `url`.
    pub fn invalidate(&self, url: &str) {
        self.lock().retain(|(u, _), _| u != url);
    }

    pub fn invalidate_kind(&self, url: &str, kind: FeatureKind) {
        self.lock().remove(&(url.to_string(), kind));
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(String, FeatureKind), Vec<Feature>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalidate_is_per_connection() {
        let cache = FeatureCache::new();
        cache.put("a", FeatureKind::Algorithm, vec![Feature::new("bfs", "BFS")]);
        cache.put("a", FeatureKind::Format, vec![]);
        cache.put("b", FeatureKind::Algorithm, vec![]);
        assert_eq!(cache.len(), 3);

        cache.invalidate_kind("a", FeatureKind::Format);
        assert!(cache.get("a", FeatureKind::Format).is_none());
        assert_eq!(cache.get("a", FeatureKind::Algorithm).unwrap()[0].id, "bfs");

        cache.invalidate("a");
        assert!(cache.get("a", FeatureKind::Algorithm).is_none());
        assert!(cache.get("b", FeatureKind::Algorithm).is_some());

        cache.clear();
        assert!(cache.is_empty());
    }
}
