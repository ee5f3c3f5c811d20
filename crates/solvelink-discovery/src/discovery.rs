//! Federated feature discovery.
//!
//! Every connection is asked on its own. A query that fails means "this
//! connection does not offer it": the failure is logged and never merged into
//! another connection's answer.

use futures_util::future::join_all;
use serde::Serialize;
use solvelink_core::protocol::{
    FeatureKind, FeaturesChanged, Feature, GetMap, GetTrace, ListAlgorithms, ListFormats, ListMaps,
    ListProblemTypes, ListTraces, MapDescriptor, MapFilter, TraceDescriptor,
};
use solvelink_transport::TransportError;

use crate::cache::FeatureCache;
use crate::connection::Connection;
use crate::store::ConnectionStore;

/// Everything one connection advertises. `None` marks a list the connection
/// failed to answer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionFeatures {
    pub url: String,
    pub name: String,
    pub algorithms: Option<Vec<Feature>>,
    pub formats: Option<Vec<Feature>>,
    pub problem_types: Option<Vec<Feature>>,
    pub maps: Option<Vec<MapDescriptor>>,
    pub traces: Option<Vec<TraceDescriptor>>,
}

impl ConnectionFeatures {
    pub fn list(&self, kind: FeatureKind) -> Option<&[Feature]> {
        match kind {
            FeatureKind::Algorithm => self.algorithms.as_deref(),
            FeatureKind::Format => self.formats.as_deref(),
            FeatureKind::ProblemType => self.problem_types.as_deref(),
        }
    }
}

/// Queries connections for their capabilities, optionally through a cache.
#[derive(Debug)]
pub struct FeatureDiscovery {
    cache: Option<FeatureCache>,
}

impl Default for FeatureDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureDiscovery {
    /// Discovery with a [`FeatureCache`] for the three capability lists.
    pub fn new() -> Self {
        Self {
            cache: Some(FeatureCache::new()),
        }
    }

    /// Discovery that asks the backend every time.
    pub fn uncached() -> Self {
        Self { cache: None }
    }

    pub fn cache(&self) -> Option<&FeatureCache> {
        self.cache.as_ref()
    }

    /// One capability list, stamped with the connection as source.
    pub async fn features(&self, conn: &Connection, kind: FeatureKind) -> Option<Vec<Feature>> {
        if let Some(hit) = self.cache.as_ref().and_then(|c| c.get(conn.url(), kind)) {
            return Some(hit);
        }
        let result = match kind {
            FeatureKind::Algorithm => conn.call::<ListAlgorithms>(()).await,
            FeatureKind::Format => conn.call::<ListFormats>(()).await,
            FeatureKind::ProblemType => conn.call::<ListProblemTypes>(()).await,
        };
        let mut list = absent_on_error(conn, kind.method_name(), result)?;
        for f in &mut list {
            f.source = conn.url().to_string();
        }
        if let Some(cache) = &self.cache {
            cache.put(conn.url(), kind, list.clone());
        }
        Some(list)
    }

    pub async fn maps(&self, conn: &Connection, filter: Option<MapFilter>) -> Option<Vec<MapDescriptor>> {
        let result = conn.call::<ListMaps>(filter).await;
        let mut maps = absent_on_error(conn, "features/maps", result)?;
        for m in &mut maps {
            m.source = conn.url().to_string();
        }
        Some(maps)
    }

    pub async fn map(&self, conn: &Connection, id: &str) -> Option<MapDescriptor> {
        let result = conn.call::<GetMap>(id.to_string()).await;
        let mut map = absent_on_error(conn, "features/map", result)?;
        map.source = conn.url().to_string();
        Some(map)
    }

    pub async fn traces(&self, conn: &Connection) -> Option<Vec<TraceDescriptor>> {
        let result = conn.call::<ListTraces>(()).await;
        let mut traces = absent_on_error(conn, "features/traces", result)?;
        for t in &mut traces {
            t.source = conn.url().to_string();
        }
        Some(traces)
    }

    pub async fn trace(&self, conn: &Connection, id: &str) -> Option<TraceDescriptor> {
        let result = conn.call::<GetTrace>(id.to_string()).await;
        let mut trace = absent_on_error(conn, "features/trace", result)?;
        trace.source = conn.url().to_string();
        Some(trace)
    }

    /// All lists of one connection, queried in series.
    pub async fn describe(&self, conn: &Connection) -> ConnectionFeatures {
        ConnectionFeatures {
            url: conn.url().to_string(),
            name: conn.name().to_string(),
            algorithms: self.features(conn, FeatureKind::Algorithm).await,
            formats: self.features(conn, FeatureKind::Format).await,
            problem_types: self.features(conn, FeatureKind::ProblemType).await,
            maps: self.maps(conn, None).await,
            traces: self.traces(conn).await,
        }
    }

    /// Federated listing: every connection is described concurrently; results
    /// keep store order.
    pub async fn describe_all(&self, store: &ConnectionStore) -> Vec<ConnectionFeatures> {
        let conns = store.list();
        join_all(conns.iter().map(|c| self.describe(c))).await
    }

    /// Poll `features/changed` and drop stale cache entries. Returns true
    /// when anything was invalidated.
    pub async fn refresh_if_changed(&self, conn: &Connection) -> bool {
        let Some(cache) = &self.cache else {
            return false;
        };
        let note = match conn.call::<FeaturesChanged>(()).await {
            Ok(note) => note,
            Err(e) => {
                tracing::debug!(connection = %conn.url(), error = %e, "features/changed unavailable");
                return false;
            }
        };
        if !note.changed {
            return false;
        }
        if note.features.is_empty() {
            cache.invalidate(conn.url());
        } else {
            for kind in [FeatureKind::Algorithm, FeatureKind::Format, FeatureKind::ProblemType] {
                if note.features.iter().any(|m| m == kind.method_name()) {
                    cache.invalidate_kind(conn.url(), kind);
                }
            }
        }
        tracing::info!(connection = %conn.url(), features = ?note.features, "Feature lists changed");
        true
    }
}

fn absent_on_error<T>(conn: &Connection, method: &str, result: Result<T, TransportError>) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(connection = %conn.url(), method, error = %e, "Treating feature as not offered");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solvelink_core::protocol::ChangeNotification;
    use solvelink_transport::{LocalBackend, LocalTransport};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    fn conn(url: &str, backend: LocalBackend) -> Connection {
        Connection::new(url, url, Box::new(LocalTransport::new(Arc::new(backend))))
    }

    #[tokio::test]
    async fn test_features_stamped_with_source() {
        let c = conn(
            "local://a",
            LocalBackend::new().route::<ListAlgorithms, _, _>(|()| async {
                let mut f = Feature::new("bfs", "BFS");
                f.source = "somewhere-else".into();
                Ok(vec![f])
            }),
        );
        let d = FeatureDiscovery::uncached();
        let algos = d.features(&c, FeatureKind::Algorithm).await.unwrap();
        assert_eq!(algos[0].source, "local://a");
        assert!(d.features(&c, FeatureKind::Format).await.is_none());
    }

    #[tokio::test]
    async fn test_describe_all_keeps_connections_separate() {
        let store = ConnectionStore::new();
        store
            .add(conn(
                "local://a",
                LocalBackend::new()
                    .route::<ListAlgorithms, _, _>(|()| async { Ok(vec![Feature::new("bfs", "BFS")]) })
                    .route::<ListMaps, _, _>(|filter: Option<MapFilter>| async move {
                        assert!(filter.is_none());
                        Ok(vec![MapDescriptor {
                            id: "m1".into(),
                            name: "Maze".into(),
                            source: String::new(),
                            format: Some("grid".into()),
                            content: None,
                        }])
                    }),
            ))
            .unwrap();
        store
            .add(conn(
                "local://b",
                LocalBackend::new().route::<ListFormats, _, _>(|()| async { Ok(vec![Feature::new("grid", "Grid")]) }),
            ))
            .unwrap();

        let all = FeatureDiscovery::uncached().describe_all(&store).await;
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].url, "local://a");
        assert_eq!(all[0].list(FeatureKind::Algorithm).unwrap().len(), 1);
        assert!(all[0].formats.is_none());
        assert_eq!(all[0].maps.as_ref().unwrap()[0].source, "local://a");
        assert!(all[1].algorithms.is_none());
        assert_eq!(all[1].formats.as_ref().unwrap()[0].source, "local://b");
        assert!(all[1].traces.is_none());
    }

    #[tokio::test]
    async fn test_cache_and_refresh_if_changed() {
        let calls = Arc::new(AtomicUsize::new(0));
        let changed = Arc::new(AtomicBool::new(false));
        let (calls2, changed2) = (calls.clone(), changed.clone());
        let c = conn(
            "local://a",
            LocalBackend::new()
                .route::<ListAlgorithms, _, _>(move |()| {
                    calls2.fetch_add(1, Ordering::SeqCst);
                    async { Ok(vec![Feature::new("bfs", "BFS")]) }
                })
                .route::<FeaturesChanged, _, _>(move |()| {
                    let changed = changed2.swap(false, Ordering::SeqCst);
                    async move {
                        Ok(ChangeNotification {
                            changed,
                            features: vec!["features/algorithms".into()],
                        })
                    }
                }),
        );
        let d = FeatureDiscovery::new();
        d.features(&c, FeatureKind::Algorithm).await.unwrap();
        d.features(&c, FeatureKind::Algorithm).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert!(!d.refresh_if_changed(&c).await);
        changed.store(true, Ordering::SeqCst);
        assert!(d.refresh_if_changed(&c).await);
        d.features(&c, FeatureKind::Algorithm).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_single_lookups() {
        let c = conn(
            "local://a",
            LocalBackend::new().route::<GetTrace, _, _>(|id: String| async move {
                Ok(TraceDescriptor {
                    id,
                    name: "run".into(),
                    source: String::new(),
                    content: None,
                })
            }),
        );
        let d = FeatureDiscovery::uncached();
        let t = d.trace(&c, "t7").await.unwrap();
        assert_eq!((t.id.as_str(), t.source.as_str()), ("t7", "local://a"));
        assert!(d.map(&c, "m1").await.is_none());
    }
}
