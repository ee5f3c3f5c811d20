//! Federated search: pick the connection that can run a given task.
//!
//! Connections are tried in store order and lists are queried in series.
//! The first connection advertising every required id wins and later
//! connections are never asked.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use solvelink_core::protocol::{Feature, FeatureKind, MapDescriptor, TraceDescriptor, DEFAULT_PROBLEM_TYPE};

use crate::connection::Connection;
use crate::discovery::FeatureDiscovery;
use crate::store::ConnectionStore;

/// Check if `available` features include all `required` ids.
/// Empty required = no constraint, always matches.
pub fn capabilities_match(required: &[&str], available: &[Feature]) -> bool {
    if required.is_empty() {
        return true;
    }
    let avail: HashSet<_> = available.iter().map(|f| f.id.as_str()).collect();
    required.iter().all(|r| avail.contains(r))
}

/// What a task needs from a connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirements {
    pub algorithm: String,
    pub format: String,
    /// `None` means the legacy single-problem case, `"pathfinding"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problem_type: Option<String>,
}

impl Requirements {
    pub fn new(algorithm: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            algorithm: algorithm.into(),
            format: format.into(),
            problem_type: None,
        }
    }

    pub fn with_problem_type(mut self, problem_type: impl Into<String>) -> Self {
        self.problem_type = Some(problem_type.into());
        self
    }

    pub fn problem_type(&self) -> &str {
        self.problem_type.as_deref().unwrap_or(DEFAULT_PROBLEM_TYPE)
    }

    /// Required ids in query order.
    pub fn required(&self) -> [(FeatureKind, &str); 3] {
        [
            (FeatureKind::Algorithm, self.algorithm.as_str()),
            (FeatureKind::Format, self.format.as_str()),
            (FeatureKind::ProblemType, self.problem_type()),
        ]
    }
}

/// Why a connection was passed over.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub url: String,
    pub kind: FeatureKind,
    pub id: String,
    /// False when the list itself could not be fetched.
    pub list_available: bool,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.list_available {
            write!(f, "{}: {} '{}' not offered", self.url, self.kind.label(), self.id)
        } else {
            write!(f, "{}: could not list {}s", self.url, self.kind.label())
        }
    }
}

/// Search result.
#[derive(Debug, Clone)]
pub enum SearchOutcome {
    /// First connection satisfying every requirement.
    Found(Arc<Connection>),
    /// No connection matched; one rejection per connection asked.
    NoMatch(Vec<Rejection>),
}

impl SearchOutcome {
    pub fn connection(self) -> Option<Arc<Connection>> {
        match self {
            SearchOutcome::Found(conn) => Some(conn),
            SearchOutcome::NoMatch(_) => None,
        }
    }
}

impl FeatureDiscovery {
    /// First connection offering the requested algorithm, format and problem
    /// type. `None` is a normal outcome.
    pub async fn find_connection(&self, store: &ConnectionStore, req: &Requirements) -> Option<Arc<Connection>> {
        self.search(store, req).await.connection()
    }

    /// Like [`find_connection`](Self::find_connection), explaining misses.
    pub async fn search(&self, store: &ConnectionStore, req: &Requirements) -> SearchOutcome {
        let mut rejections = Vec::new();
        for conn in store.list() {
            match self.first_unmet(&conn, req).await {
                None => {
                    tracing::info!(
                        connection = %conn.url(),
                        algorithm = %req.algorithm,
                        format = %req.format,
                        problem_type = %req.problem_type(),
                        "Connection selected"
                    );
                    return SearchOutcome::Found(conn);
                }
                Some(rejection) => {
                    tracing::debug!(reason = %rejection, "Connection rejected");
                    rejections.push(rejection);
                }
            }
        }
        SearchOutcome::NoMatch(rejections)
    }

    /// First connection that can return map `id`.
    pub async fn find_map(&self, store: &ConnectionStore, id: &str) -> Option<(Arc<Connection>, MapDescriptor)> {
        for conn in store.list() {
            if let Some(map) = self.map(&conn, id).await {
                return Some((conn, map));
            }
        }
        None
    }

    /// First connection that can return trace `id`.
    pub async fn find_trace(&self, store: &ConnectionStore, id: &str) -> Option<(Arc<Connection>, TraceDescriptor)> {
        for conn in store.list() {
            if let Some(trace) = self.trace(&conn, id).await {
                return Some((conn, trace));
            }
        }
        None
    }

    async fn first_unmet(&self, conn: &Connection, req: &Requirements) -> Option<Rejection> {
        for (kind, id) in req.required() {
            let rejection = |list_available| Rejection {
                url: conn.url().to_string(),
                kind,
                id: id.to_string(),
                list_available,
            };
            match self.features(conn, kind).await {
                None => return Some(rejection(false)),
                Some(list) if !capabilities_match(&[id], &list) => return Some(rejection(true)),
                Some(_) => {}
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solvelink_core::protocol::{GetMap, ListAlgorithms, ListFormats, ListProblemTypes};
    use solvelink_transport::{LocalBackend, LocalTransport};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn feats(ids: &[&str]) -> Vec<Feature> {
        ids.iter().map(|id| Feature::new(*id, id.to_uppercase())).collect()
    }

    /// Backend advertising the given lists; `None` leaves the method unrouted.
    fn backend(
        algos: &[&str],
        formats: &[&str],
        problems: Option<&[&str]>,
        calls: Arc<AtomicUsize>,
    ) -> LocalBackend {
        let (a, f) = (feats(algos), feats(formats));
        let (c1, c2, c3) = (calls.clone(), calls.clone(), calls);
        let mut b = LocalBackend::new()
            .route::<ListAlgorithms, _, _>(move |()| {
                c1.fetch_add(1, Ordering::SeqCst);
                let a = a.clone();
                async move { Ok(a) }
            })
            .route::<ListFormats, _, _>(move |()| {
                c2.fetch_add(1, Ordering::SeqCst);
                let f = f.clone();
                async move { Ok(f) }
            });
        if let Some(p) = problems {
            let p = feats(p);
            b = b.route::<ListProblemTypes, _, _>(move |()| {
                c3.fetch_add(1, Ordering::SeqCst);
                let p = p.clone();
                async move { Ok(p) }
            });
        }
        b
    }

    fn add(store: &ConnectionStore, url: &str, b: LocalBackend) {
        store
            .add(Connection::new(url, url, Box::new(LocalTransport::new(Arc::new(b)))))
            .unwrap();
    }

    #[test]
    fn test_capabilities_match_empty_required() {
        assert!(capabilities_match(&[], &feats(&["bfs"])));
    }

    #[test]
    fn test_capabilities_match_missing() {
        assert!(capabilities_match(&["bfs"], &feats(&["bfs", "dfs"])));
        assert!(!capabilities_match(&["bfs", "astar"], &feats(&["bfs"])));
    }

    #[test]
    fn test_requirements_default_problem_type() {
        let req = Requirements::new("bfs", "grid");
        assert_eq!(req.problem_type(), "pathfinding");
        assert_eq!(req.required()[2], (FeatureKind::ProblemType, "pathfinding"));
        let req = req.with_problem_type("irrigation");
        assert_eq!(req.problem_type(), "irrigation");
    }

    #[tokio::test]
    async fn test_second_connection_selected_when_first_lacks_problem_type() {
        let store = ConnectionStore::new();
        let calls = Arc::new(AtomicUsize::new(0));
        // A has the algorithm and format but cannot list problem types.
        add(&store, "local://a", backend(&["x"], &["y"], None, calls.clone()));
        add(&store, "local://b", backend(&["x"], &["y"], Some(&["z"]), calls));

        let req = Requirements::new("x", "y").with_problem_type("z");
        let d = FeatureDiscovery::uncached();
        match d.search(&store, &req).await {
            SearchOutcome::Found(conn) => assert_eq!(conn.url(), "local://b"),
            other => panic!("expected B, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_match_is_absence_with_reasons() {
        let store = ConnectionStore::new();
        let calls = Arc::new(AtomicUsize::new(0));
        add(&store, "local://a", backend(&["bfs"], &["grid"], None, calls.clone()));
        add(&store, "local://b", backend(&["dfs"], &["grid"], Some(&["pathfinding"]), calls));

        let req = Requirements::new("bfs", "grid");
        let d = FeatureDiscovery::uncached();
        assert!(d.find_connection(&store, &req).await.is_none());
        match d.search(&store, &req).await {
            SearchOutcome::NoMatch(rejections) => {
                assert_eq!(rejections.len(), 2);
                assert_eq!(rejections[0].kind, FeatureKind::ProblemType);
                assert!(!rejections[0].list_available);
                assert_eq!(rejections[1].kind, FeatureKind::Algorithm);
                assert!(rejections[1].list_available);
            }
            other => panic!("expected no match, got {:?}", other),
        }
        assert!(d.find_connection(&ConnectionStore::new(), &req).await.is_none());
    }

    #[tokio::test]
    async fn test_later_connections_not_queried() {
        let store = ConnectionStore::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        add(&store, "local://a", backend(&["bfs"], &["grid"], Some(&["pathfinding"]), first.clone()));
        add(&store, "local://b", backend(&["bfs"], &["grid"], Some(&["pathfinding"]), second.clone()));

        let d = FeatureDiscovery::uncached();
        let conn = d.find_connection(&store, &Requirements::new("bfs", "grid")).await.unwrap();
        assert_eq!(conn.url(), "local://a");
        assert_eq!(first.load(Ordering::SeqCst), 3);
        assert_eq!(second.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_find_map_skips_connections_without_it() {
        let store = ConnectionStore::new();
        add(&store, "local://a", LocalBackend::new());
        add(
            &store,
            "local://b",
            LocalBackend::new().route::<GetMap, _, _>(|id: String| async move {
                Ok(MapDescriptor {
                    id,
                    name: "Maze".into(),
                    source: String::new(),
                    format: Some("grid".into()),
                    content: Some("@..".into()),
                })
            }),
        );
        let (conn, map) = FeatureDiscovery::uncached().find_map(&store, "maze").await.unwrap();
        assert_eq!(conn.url(), "local://b");
        assert_eq!(map.source, "local://b");
        assert!(FeatureDiscovery::uncached().find_trace(&store, "t").await.is_none());
    }
}
