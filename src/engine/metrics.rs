//! Evaluation metrics.
//!
//! Small structs used to observe what the engine did for one primitive or one
//! stylesheet load. Collection is opt-in:
//!
//! - `StyleSource::apply` for normal operation.
//! - `StyleSource::apply_with_metrics` when profiling or debugging why a
//!   property did or did not end up in a cascade.
//!
//! Counters are per call; nothing here is global.

use super::category::Category;
use super::rule_index::IndexStats;
use std::time::Duration;

/// Counters for one `apply` call.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ApplyMetrics {
    /// Index the primitive was routed to.
    pub category: Option<Category>,
    /// Rules produced by the candidate iterator.
    pub candidates: usize,
    /// Candidates that passed full selector matching.
    pub matched: usize,
    /// Matches skipped because the scale was outside the selector's range.
    pub out_of_range: usize,
    /// Matches skipped because their declaration had just run.
    pub deduplicated: usize,
    /// Declarations executed.
    pub executed: usize,
    pub duration: Duration,
}

impl ApplyMetrics {
    /// Accumulate another call's counters (category is kept from `self`).
    pub fn add(&mut self, other: &ApplyMetrics) {
        self.candidates += other.candidates;
        self.matched += other.matched;
        self.out_of_range += other.out_of_range;
        self.deduplicated += other.deduplicated;
        self.executed += other.executed;
        self.duration += other.duration;
    }
}

/// Outcome of building one stylesheet snapshot.
#[derive(Debug, Default, Clone)]
pub struct LoadMetrics {
    pub total: Duration,
    /// Rules accepted into the snapshot.
    pub rules: usize,
    pub per_category: Vec<(Category, IndexStats)>,
}
