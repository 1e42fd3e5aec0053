//! Per-category rule index.
//!
//! This module holds the *static* side of the engine: structures derived once
//! per stylesheet load that let a style evaluation look only at rules which
//! can plausibly match a primitive.
//!
//! Every rule of a category lands in exactly one partition:
//!
//! - **key-value index** (`key_value_index[k][v]`): the right-most selector has a
//!   plain `[k=v]` condition; the last one found wins.
//! - **key index** (`key_index[k]`): no plain equality, but some positive
//!   condition requires key `k`; again the last one found wins.
//! - **remaining**: no conditions at all, or nothing that pins down a key
//!   (only negations, regexes, pseudo classes...). Always a candidate.
//!
//! Retrieval for a primitive walks its tags, collects the matching buckets
//! plus `remaining`, and merges them in rule order (see `merge.rs`). The index
//! is a superset filter: it never drops a rule that can match, and full
//! selector matching afterwards removes the ones that do not.
//!
//! ## Invariants
//!
//! - `RuleId` is an index into the stylesheet's rule vector.
//! - Every bucket and `remaining` is sorted by [`RuleOrder`] after
//!   `init_index` and is not touched again until `clear`.

use super::merge::Candidates;
use crate::error::{Result, StyleError};
use crate::osm::Tags;
use crate::rule::{Rule, RuleOrder};
use crate::selector::Condition;
use std::collections::HashMap;

/// Rule identifier (index into the rules vector).
pub type RuleId = usize;

/// A bucket entry: the rule's order key next to its id, so merging never has
/// to look the rule up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndexedRule {
    pub order: RuleOrder,
    pub id: RuleId,
}

/// Where `init_index` filed a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement<'r> {
    KeyValue(&'r str, &'r str),
    Key(&'r str),
    Remaining,
}

/// Pick the partition for a rule from the conditions of its right-most selector.
pub fn placement(conditions: &[Condition]) -> Placement<'_> {
    if conditions.is_empty() {
        return Placement::Remaining;
    }
    if let Some((k, v)) = conditions.iter().rev().find_map(Condition::index_key_value) {
        return Placement::KeyValue(k, v);
    }
    match conditions.iter().rev().find_map(Condition::required_key) {
        Some(k) => Placement::Key(k),
        None => Placement::Remaining,
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IndexStats {
    pub rules: usize,
    pub key_value_buckets: usize,
    pub key_value_rules: usize,
    pub key_buckets: usize,
    pub key_rules: usize,
    pub remaining: usize,
}

#[derive(Debug, Default, Clone)]
pub struct RuleIndex {
    /// Rules added since the last `clear`, in insertion order.
    staged: Vec<RuleId>,
    built: bool,
    key_value_index: HashMap<String, HashMap<String, Vec<IndexedRule>>>,
    key_index: HashMap<String, Vec<IndexedRule>>,
    remaining: Vec<IndexedRule>,
}

impl RuleIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a rule for the next `init_index`.
    pub fn add(&mut self, id: RuleId) {
        self.staged.push(id);
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Build the partitions from the staged ids. `rules` is the stylesheet's
    /// rule vector the ids point into.
    ///
    /// Calling this twice without `clear` in between is an error.
    pub fn init_index(&mut self, rules: &[Rule]) -> Result<()> {
        if self.built {
            return Err(StyleError::IndexAlreadyBuilt);
        }
        for &id in &self.staged {
            let Some(rule) = rules.get(id) else {
                log::warn!("rule index: staged id {id} is out of bounds ({} rules)", rules.len());
                continue;
            };
            let entry = IndexedRule { order: rule.order(), id };
            match placement(&rule.selector.rightmost().conditions) {
                Placement::KeyValue(k, v) => self
                    .key_value_index
                    .entry(k.to_string())
                    .or_default()
                    .entry(v.to_string())
                    .or_default()
                    .push(entry),
                Placement::Key(k) => self.key_index.entry(k.to_string()).or_default().push(entry),
                Placement::Remaining => {
                    log::trace!("rule index: {rule} has no indexable key");
                    self.remaining.push(entry);
                }
            }
        }

        self.remaining.sort_unstable();
        for by_value in self.key_value_index.values_mut() {
            for bucket in by_value.values_mut() {
                bucket.sort_unstable();
            }
        }
        for bucket in self.key_index.values_mut() {
            bucket.sort_unstable();
        }
        self.built = true;
        Ok(())
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Drop staged rules and every partition.
    pub fn clear(&mut self) {
        self.staged.clear();
        self.key_value_index.clear();
        self.key_index.clear();
        self.remaining.clear();
        self.built = false;
    }

    /// Rules that might match a primitive carrying `tags`, in rule order.
    pub fn rule_candidates<'a>(&'a self, tags: &Tags) -> Candidates<'a> {
        let mut streams: Vec<&'a [IndexedRule]> = Vec::with_capacity(1 + tags.len());
        streams.push(&self.remaining);
        for (k, v) in tags.iter() {
            if let Some(bucket) = self.key_value_index.get(k).and_then(|by_value| by_value.get(v)) {
                streams.push(bucket);
            }
            if let Some(bucket) = self.key_index.get(k) {
                streams.push(bucket);
            }
        }
        Candidates::new(streams)
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            rules: self.staged.len(),
            key_value_buckets: self.key_value_index.values().map(HashMap::len).sum(),
            key_value_rules: self.key_value_index.values().flat_map(|m| m.values()).map(Vec::len).sum(),
            key_buckets: self.key_index.len(),
            key_rules: self.key_index.values().map(Vec::len).sum(),
            remaining: self.remaining.len(),
        }
    }
}
