//! Tagged value tree with a recursive leaf transform.
//!
//! Queries and traces are shown to humans after their long strings (inline
//! map URIs, encoded payloads) are shortened. The transform runs over
//! [`Tree`], which is independent of any serialization format; conversions
//! to and from `serde_json::Value` are provided.

use serde_json::{Map, Number, Value};

/// A leaf value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
}

/// Scalar | sequence | mapping. Mapping entries keep their order.
#[derive(Debug, Clone, PartialEq)]
pub enum Tree {
    Scalar(Scalar),
    Sequence(Vec<Tree>),
    Mapping(Vec<(String, Tree)>),
}

impl Tree {
    /// Rebuild the tree with every leaf replaced by `f(leaf)`.
    /// Shape (sequence lengths, mapping keys and order) is preserved.
    pub fn map_leaves<F>(self, f: &mut F) -> Tree
    where
        F: FnMut(Scalar) -> Scalar,
    {
        match self {
            Tree::Scalar(s) => Tree::Scalar(f(s)),
            Tree::Sequence(items) => {
                Tree::Sequence(items.into_iter().map(|t| t.map_leaves(f)).collect())
            }
            Tree::Mapping(entries) => Tree::Mapping(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, v.map_leaves(f)))
                    .collect(),
            ),
        }
    }

    /// Shorten every string leaf longer than `limit` characters.
    pub fn redact_long_strings(self, limit: usize) -> Tree {
        self.map_leaves(&mut |leaf| match leaf {
            Scalar::String(s) => Scalar::String(redact(&s, limit)),
            other => other,
        })
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        match self {
            Tree::Scalar(_) => 1,
            Tree::Sequence(items) => items.iter().map(Tree::leaf_count).sum(),
            Tree::Mapping(entries) => entries.iter().map(|(_, v)| v.leaf_count()).sum(),
        }
    }
}

/// Shorten `s` to `limit` characters plus a length marker, on a char boundary.
pub fn redact(s: &str, limit: usize) -> String {
    let total = s.chars().count();
    if total <= limit {
        return s.to_string();
    }
    let prefix: String = s.chars().take(limit).collect();
    format!("{}... [{} chars]", prefix, total)
}

/// Convenience: redact long strings inside a JSON value.
pub fn redact_value(value: &Value, limit: usize) -> Value {
    Tree::from(value.clone()).redact_long_strings(limit).into()
}

impl From<Value> for Tree {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Tree::Scalar(Scalar::Null),
            Value::Bool(b) => Tree::Scalar(Scalar::Bool(b)),
            Value::Number(n) => Tree::Scalar(Scalar::Number(n)),
            Value::String(s) => Tree::Scalar(Scalar::String(s)),
            Value::Array(items) => Tree::Sequence(items.into_iter().map(Tree::from).collect()),
            Value::Object(map) => {
                Tree::Mapping(map.into_iter().map(|(k, v)| (k, Tree::from(v))).collect())
            }
        }
    }
}

impl From<Tree> for Value {
    fn from(tree: Tree) -> Self {
        match tree {
            Tree::Scalar(Scalar::Null) => Value::Null,
            Tree::Scalar(Scalar::Bool(b)) => Value::Bool(b),
            Tree::Scalar(Scalar::Number(n)) => Value::Number(n),
            Tree::Scalar(Scalar::String(s)) => Value::String(s),
            Tree::Sequence(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            Tree::Mapping(entries) => {
                let mut map = Map::new();
                for (k, v) in entries {
                    map.insert(k, Value::from(v));
                }
                Value::Object(map)
            }
        }
    }
}
