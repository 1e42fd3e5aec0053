//! Rule indexing and cascade evaluation.
//!
//! This module is the *public entry point* for styling. It is split into
//! focused submodules under `src/engine/` while keeping public paths stable
//! (for example `crate::engine::StyleSource` and `crate::engine::Category`).
//!
//! ## How the parts work together
//!
//! Styling a primitive is a pipeline:
//!
//! ```text
//! rules (all) ──┐
//!               │  resolve_rule                 (category.rs)
//!               └──────┬──────── file into 0..6 category indexes
//!                      │
//!                      v
//!          RuleIndex::init_index (rule_index.rs)
//!            - key-value / key / remaining partitions
//!            - every bucket sorted by RuleOrder
//!                      │
//! primitive ── Category::for_primitive ── pick one index
//!                      │
//!                      v
//!          RuleIndex::rule_candidates ── Candidates (merge.rs)
//!                      │                   heap merge of sorted buckets
//!                      v
//!          StyleSource::apply (source.rs)
//!            - full selector match
//!            - narrow MultiCascade::range
//!            - skip repeated declarations (dedup.rs)
//!            - execute into sub-layers, `*` into every layer
//!                      │
//!                      v
//!                 MultiCascade
//! ```
//!
//! The index is only a filter. Correctness rests on two properties: every
//! rule that can match a primitive is among its candidates, and candidates
//! come out in `RuleOrder`, so later declarations overwrite earlier ones just
//! as a full scan of the stylesheet would.
//!
//! ## Responsibilities by module
//!
//! - `category.rs`: the six entity categories and which ones a base selector
//!   feeds.
//! - `rule_index.rs`: partitions of one category, built once per load.
//! - `merge.rs`: lazy ordered union of candidate buckets.
//! - `dedup.rs`: skips a declaration shared by several matching selectors.
//! - `source.rs`: snapshot building, publication and the cascade loop.
//! - `metrics.rs`: optional counters for loads and `apply` calls.
//!
//! ## Debugging
//!
//! Run with `RUST_LOG=mapcascade=trace` to see every executed rule.

#[path = "engine/category.rs"]
mod category;
#[path = "engine/dedup.rs"]
mod dedup;
#[path = "engine/merge.rs"]
mod merge;
#[path = "engine/metrics.rs"]
mod metrics;
#[path = "engine/rule_index.rs"]
mod rule_index;
#[path = "engine/source.rs"]
mod source;


pub use category::{CATEGORY_COUNT, Category, CategorySet, categories_of, resolve_rule};
pub use merge::Candidates;
pub use metrics::{ApplyMetrics, LoadMetrics};
pub use rule_index::{IndexStats, IndexedRule, Placement, RuleId, RuleIndex, placement};
pub use source::{CompiledStyle, LoadReport, StyleMeta, StyleSetting, StyleSource};
