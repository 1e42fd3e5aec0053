//! Tagged map entities.
//!
//! A deliberately small model of OSM primitives: nodes, ways (ordered node
//! references) and relations (role-labelled members), each carrying a tag
//! set. `DataSet` owns primitives and keeps a reverse "who refers to me"
//! index so child selectors (`way > node`) can walk upwards cheaply.

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Marker key placed on the synthetic relation used to evaluate `canvas` rules.
pub const CANVAS_MARKER: &str = "#canvas";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    Node,
    Way,
    Relation,
}

impl PrimitiveType {
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveType::Node => "node",
            PrimitiveType::Way => "way",
            PrimitiveType::Relation => "relation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
pub struct PrimitiveId {
    pub kind: PrimitiveType,
    pub id: i64,
}

impl PrimitiveId {
    pub fn node(id: i64) -> Self {
        PrimitiveId { kind: PrimitiveType::Node, id }
    }

    pub fn way(id: i64) -> Self {
        PrimitiveId { kind: PrimitiveType::Way, id }
    }

    pub fn relation(id: i64) -> Self {
        PrimitiveId { kind: PrimitiveType::Relation, id }
    }
}

impl fmt::Display for PrimitiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind.name(), self.id)
    }
}

/// Tag set of a primitive.
///
/// Iteration order is by key, which keeps candidate streams and debug output
/// deterministic; nothing in the engine relies on it for correctness.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Tags(BTreeMap<String, String>);

impl Tags {
    pub fn new() -> Self {
        Tags(BTreeMap::new())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `yes`, `true`, `1` and `on` count as true.
    pub fn is_true(&self, key: &str) -> bool {
        self.get(key).is_some_and(is_true_value)
    }

    /// `no`, `false`, `0` and `off` count as false. An absent key is neither.
    pub fn is_false(&self, key: &str) -> bool {
        self.get(key).is_some_and(is_false_value)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Tags {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Tags(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

pub(crate) fn is_true_value(v: &str) -> bool {
    matches!(v, "yes" | "true" | "1" | "on")
}

pub(crate) fn is_false_value(v: &str) -> bool {
    matches!(v, "no" | "false" | "0" | "off")
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Member {
    #[serde(default)]
    pub role: String,
    #[serde(rename = "ref")]
    pub id: PrimitiveId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimitiveData {
    Node,
    Way { nodes: Vec<i64> },
    Relation { members: Vec<Member> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Primitive {
    pub id: PrimitiveId,
    pub tags: Tags,
    pub data: PrimitiveData,
}

impl Primitive {
    pub fn node(id: i64, tags: Tags) -> Self {
        Primitive { id: PrimitiveId::node(id), tags, data: PrimitiveData::Node }
    }

    pub fn way(id: i64, tags: Tags, nodes: Vec<i64>) -> Self {
        Primitive { id: PrimitiveId::way(id), tags, data: PrimitiveData::Way { nodes } }
    }

    pub fn relation(id: i64, tags: Tags, members: Vec<Member>) -> Self {
        Primitive { id: PrimitiveId::relation(id), tags, data: PrimitiveData::Relation { members } }
    }

    pub fn kind(&self) -> PrimitiveType {
        self.id.kind
    }

    /// A way with at least three node references whose first and last match.
    pub fn is_closed(&self) -> bool {
        match &self.data {
            PrimitiveData::Way { nodes } => nodes.len() >= 3 && nodes.first() == nodes.last(),
            _ => false,
        }
    }

    pub fn is_multipolygon(&self) -> bool {
        self.kind() == PrimitiveType::Relation && matches!(self.tags.get("type"), Some("multipolygon" | "boundary"))
    }

    /// Carries at least one tag that is not an internal `#` marker.
    pub fn is_tagged(&self) -> bool {
        self.tags.keys().any(|k| !k.starts_with('#'))
    }
}

/// A reference from a parent primitive to one of its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub parent: PrimitiveId,
    pub child: PrimitiveId,
    /// Position of the child in the parent's node or member list.
    pub index: usize,
    /// Member role; empty for way nodes.
    pub role: String,
}

/// Arena of primitives plus a reverse referrer index.
#[derive(Debug, Default, Clone)]
pub struct DataSet {
    primitives: BTreeMap<PrimitiveId, Primitive>,
    referrers: HashMap<PrimitiveId, Vec<Link>>,
}

impl DataSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) a primitive and index its outgoing references.
    pub fn insert(&mut self, primitive: Primitive) {
        if let Some(old) = self.primitives.remove(&primitive.id) {
            for link in links_of(&old) {
                if let Some(refs) = self.referrers.get_mut(&link.child) {
                    refs.retain(|l| l.parent != old.id);
                }
            }
        }
        for link in links_of(&primitive) {
            self.referrers.entry(link.child).or_default().push(link);
        }
        self.primitives.insert(primitive.id, primitive);
    }

    pub fn get(&self, id: PrimitiveId) -> Option<&Primitive> {
        self.primitives.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Primitive> {
        self.primitives.values()
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// Ways and relations that reference `id` and exist in this set.
    pub fn parents(&self, id: PrimitiveId) -> impl Iterator<Item = (&Link, &Primitive)> {
        self.referrers
            .get(&id)
            .into_iter()
            .flatten()
            .filter_map(|link| self.primitives.get(&link.parent).map(|p| (link, p)))
    }

    /// Way nodes or relation members of `id` that exist in this set.
    pub fn children(&self, id: PrimitiveId) -> Vec<(Link, &Primitive)> {
        let Some(parent) = self.primitives.get(&id) else {
            return Vec::new();
        };
        links_of(parent)
            .into_iter()
            .filter_map(|link| self.primitives.get(&link.child).map(|p| (link, p)))
            .collect()
    }
}

fn links_of(p: &Primitive) -> Vec<Link> {
    match &p.data {
        PrimitiveData::Node => Vec::new(),
        PrimitiveData::Way { nodes } => nodes
            .iter()
            .enumerate()
            .map(|(index, &n)| Link { parent: p.id, child: PrimitiveId::node(n), index, role: String::new() })
            .collect(),
        PrimitiveData::Relation { members } => members
            .iter()
            .enumerate()
            .map(|(index, m)| Link { parent: p.id, child: m.id, index, role: m.role.clone() })
            .collect(),
    }
}
