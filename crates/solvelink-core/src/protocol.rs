//! Method registry and wire types shared by every solver backend.
//!
//! Each backend method is a zero-sized type implementing [`Method`], which
//! fixes its name together with its request and response shapes. Callers go
//! through `Connection::call::<M>(request)`, so passing the wrong shape for a
//! method is a compile error rather than a runtime rejection.
//!
//! New capabilities are added by implementing [`Method`] for a new type, in
//! this crate or downstream. Existing entries are never modified.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A backend method: its wire name plus request/response shapes.
pub trait Method {
    /// Wire name, e.g. `"features/algorithms"`.
    const NAME: &'static str;
    /// Serialized as the JSON-RPC `params`. Methods without arguments use `()`.
    type Request: Serialize + DeserializeOwned + Send + Sync;
    /// Deserialized from the JSON-RPC `result`.
    type Response: Serialize + DeserializeOwned + Send;
}

macro_rules! methods {
    ($( $(#[$meta:meta])* $ty:ident => $name:literal : $req:ty => $resp:ty; )*) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, Default)]
            pub struct $ty;

            impl Method for $ty {
                const NAME: &'static str = $name;
                type Request = $req;
                type Response = $resp;
            }
        )*

        /// Wire names of every built-in method, in declaration order.
        pub const METHOD_NAMES: &[&str] = &[$($name),*];
    };
}

methods! {
    /// Liveness probe; returns the backend's identity.
    CheckConnection => "checkConnection": () => ConnectionInfo;
    /// Algorithms the backend can run.
    ListAlgorithms => "features/algorithms": () => Vec<Feature>;
    /// Map formats the backend can parse.
    ListFormats => "features/formats": () => Vec<Feature>;
    /// Problem types the backend can solve.
    ListProblemTypes => "features/problemTypes": () => Vec<Feature>;
    /// Maps hosted by the backend, optionally filtered.
    ListMaps => "features/maps": Option<MapFilter> => Vec<MapDescriptor>;
    /// A single hosted map, by id.
    GetMap => "features/map": String => MapDescriptor;
    /// A single stored trace, by id.
    GetTrace => "features/trace": String => TraceDescriptor;
    /// Traces stored by the backend.
    ListTraces => "features/traces": () => Vec<TraceDescriptor>;
    /// Whether the advertised feature lists changed since the last poll.
    FeaturesChanged => "features/changed": () => ChangeNotification;
    /// Run a solver; the response is opaque trace content.
    SolvePathfinding => "solve/pathfinding": SolveArgs => Value;
}

/// Problem type assumed when none is selected (older single-problem backends).
pub const DEFAULT_PROBLEM_TYPE: &str = "pathfinding";

// ─── Capability types ───────────────────────────────────────────────────────

/// Identity reported by `checkConnection`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// An advertised capability. Identity is `(source, id)`: the same id from two
/// connections names two different features.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Feature {
    pub id: String,
    pub name: String,
    /// Owning connection (its URL). Backends may leave it empty; discovery
    /// stamps it with the answering connection.
    #[serde(default)]
    pub source: String,
}

impl Feature {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            source: String::new(),
        }
    }
}

/// Filter accepted by `features/maps`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// A map hosted by a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapDescriptor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Map text, present on single-map lookups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// A trace stored by a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceDescriptor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
}

/// Payload of `features/changed`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeNotification {
    #[serde(default)]
    pub changed: bool,
    /// Which feature lists changed (method names); empty means "all".
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
}

/// The feature lists a connection can be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureKind {
    Algorithm,
    Format,
    ProblemType,
}

impl FeatureKind {
    /// Method that lists features of this kind.
    pub fn method_name(self) -> &'static str {
        match self {
            FeatureKind::Algorithm => ListAlgorithms::NAME,
            FeatureKind::Format => ListFormats::NAME,
            FeatureKind::ProblemType => ListProblemTypes::NAME,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FeatureKind::Algorithm => "algorithm",
            FeatureKind::Format => "format",
            FeatureKind::ProblemType => "problem type",
        }
    }
}

// ─── Solve request ──────────────────────────────────────────────────────────

/// A node on the map: an index, or a coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeRef {
    Index(u64),
    Point { x: i64, y: i64 },
}

impl std::fmt::Display for NodeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeRef::Index(i) => write!(f, "{}", i),
            NodeRef::Point { x, y } => write!(f, "{},{}", x, y),
        }
    }
}

impl std::str::FromStr for NodeRef {
    type Err = String;

    /// Parses `"42"` as an index and `"3,7"` as a point.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.split_once(',') {
            Some((x, y)) => {
                let x = x.trim().parse().map_err(|_| format!("invalid x in '{}'", s))?;
                let y = y.trim().parse().map_err(|_| format!("invalid y in '{}'", s))?;
                Ok(NodeRef::Point { x, y })
            }
            None => s
                .parse()
                .map(NodeRef::Index)
                .map_err(|_| format!("invalid node '{}': expected N or X,Y", s)),
        }
    }
}

/// One concrete problem. `pour_amounts[i]` belongs to `plants[i]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskInstance {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<NodeRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<NodeRef>,
    pub plants: Vec<NodeRef>,
    pub taps: Vec<NodeRef>,
    pub pour_amounts: Vec<f64>,
}

impl TaskInstance {
    /// Append a plant together with a zero pour amount.
    pub fn add_plant(&mut self, plant: NodeRef) {
        self.pad_pour_amounts();
        self.plants.push(plant);
        self.pour_amounts.push(0.0);
    }

    /// Remove the plant at `index` and its pour amount.
    pub fn remove_plant(&mut self, index: usize) -> Option<NodeRef> {
        if index >= self.plants.len() {
            return None;
        }
        self.pad_pour_amounts();
        self.pour_amounts.remove(index);
        Some(self.plants.remove(index))
    }

    /// Set the pour amount of plant `index`. Returns false when out of range.
    pub fn set_pour_amount(&mut self, index: usize, amount: f64) -> bool {
        if index >= self.plants.len() {
            return false;
        }
        self.pad_pour_amounts();
        self.pour_amounts[index] = amount;
        true
    }

    pub fn clear_plants(&mut self) {
        self.plants.clear();
        self.pour_amounts.clear();
    }

    /// Copy with `pour_amounts` padded with zeros / truncated to `plants.len()`.
    pub fn normalized(&self) -> Self {
        let mut out = self.clone();
        out.pad_pour_amounts();
        out
    }

    fn pad_pour_amounts(&mut self) {
        self.pour_amounts.resize(self.plants.len(), 0.0);
    }
}

/// Full `solve/pathfinding` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveArgs {
    pub format: String,
    pub instances: Vec<TaskInstance>,
    /// Self-contained map reference (see [`crate::map_uri`]).
    #[serde(rename = "mapURI")]
    pub map_uri: String,
    pub algorithm: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_method_names_unique() {
        let mut seen = HashSet::new();
        for name in METHOD_NAMES {
            assert!(seen.insert(*name), "duplicate method name: {}", name);
        }
        assert_eq!(METHOD_NAMES.len(), 10);
    }

    #[test]
    fn test_method_names_match_types() {
        assert_eq!(CheckConnection::NAME, "checkConnection");
        assert_eq!(ListProblemTypes::NAME, "features/problemTypes");
        assert_eq!(SolvePathfinding::NAME, "solve/pathfinding");
        assert!(METHOD_NAMES.contains(&FeatureKind::Format.method_name()));
    }

    #[test]
    fn test_unit_request_serializes_as_null() {
        let params = serde_json::to_value(()).unwrap();
        assert!(params.is_null());
        let _: <ListAlgorithms as Method>::Request = serde_json::from_value(Value::Null).unwrap();
    }

    #[test]
    fn test_node_ref_wire_forms() {
        let idx: NodeRef = serde_json::from_str("42").unwrap();
        assert_eq!(idx, NodeRef::Index(42));
        let pt: NodeRef = serde_json::from_str(r#"{"x":3,"y":-7}"#).unwrap();
        assert_eq!(pt, NodeRef::Point { x: 3, y: -7 });
        assert_eq!("3, -7".parse::<NodeRef>().unwrap(), pt);
        assert_eq!("42".parse::<NodeRef>().unwrap(), idx);
        assert!("a,b".parse::<NodeRef>().is_err());
    }

    #[test]
    fn test_task_instance_defaults_when_absent() {
        let inst: TaskInstance = serde_json::from_str(r#"{"start":1}"#).unwrap();
        assert_eq!(inst.start, Some(NodeRef::Index(1)));
        assert!(inst.end.is_none());
        assert!(inst.plants.is_empty());
        assert!(inst.pour_amounts.is_empty());
    }

    #[test]
    fn test_pour_amounts_track_plants_under_edits() {
        let mut inst = TaskInstance::default();
        // Deterministic pseudo-random sequence of adds and removes.
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        for step in 0..500u64 {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            if seed % 3 == 0 && !inst.plants.is_empty() {
                let idx = (seed as usize / 3) % inst.plants.len();
                inst.remove_plant(idx);
            } else {
                inst.add_plant(NodeRef::Index(step));
                let last = inst.plants.len() - 1;
                assert_eq!(inst.pour_amounts[last], 0.0);
            }
            assert_eq!(inst.pour_amounts.len(), inst.plants.len());
        }
    }

    #[test]
    fn test_add_plant_repairs_short_amounts() {
        let mut inst: TaskInstance =
            serde_json::from_str(r#"{"plants":[1,2],"pourAmounts":[5]}"#).unwrap();
        inst.add_plant(NodeRef::Index(3));
        assert_eq!(inst.pour_amounts, vec![5.0, 0.0, 0.0]);
        assert!(inst.set_pour_amount(2, 1.5));
        assert!(!inst.set_pour_amount(3, 1.0));
        assert_eq!(inst.remove_plant(0), Some(NodeRef::Index(1)));
        assert_eq!(inst.pour_amounts, vec![0.0, 1.5]);
    }

    #[test]
    fn test_solve_args_wire_field_names() {
        let args = SolveArgs {
            format: "grid".into(),
            instances: vec![TaskInstance {
                start: Some(NodeRef::Index(0)),
                end: Some(NodeRef::Point { x: 4, y: 2 }),
                plants: vec![NodeRef::Index(9)],
                taps: vec![],
                pour_amounts: vec![2.5],
            }],
            map_uri: "data:text/plain;charset=utf-8,x".into(),
            algorithm: "dijkstra".into(),
        };
        let v = serde_json::to_value(&args).unwrap();
        assert_eq!(v["mapURI"], "data:text/plain;charset=utf-8,x");
        assert_eq!(v["instances"][0]["pourAmounts"][0], 2.5);
        assert_eq!(v["instances"][0]["end"]["x"], 4);
    }
}
