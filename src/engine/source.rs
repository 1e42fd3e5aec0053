//! Style source: the cascade driver.
//!
//! `StyleSource` owns the rules of one stylesheet and the six category
//! indexes built from them, and evaluates primitives against them.
//!
//! ## Snapshots
//!
//! Everything derived from a stylesheet load lives in an immutable
//! [`CompiledStyle`]. A reload builds a fresh snapshot without holding any
//! lock, then swaps it in under a short write hold. `apply` clones the
//! current `Arc` under a read hold and evaluates lock-free, so readers always
//! see a fully built set of indexes and never wait for a build to finish,
//! only for the pointer swap.
//!
//! ```text
//! load(rules) ── sort by RuleOrder ── file by category ── init_index x6
//!                                                              │
//!                                  meta / canvas / settings ───┤
//!                                                              v
//!                                         RwLock<Arc<Published>> (swap)
//!
//! apply(p) ── pick index ── rule_candidates ── full match ── scale range
//!                                                               │
//!                                          dedup ── execute into MultiCascade
//! ```

use super::category::{CATEGORY_COUNT, Category, resolve_rule};
use super::dedup::LastDeclaration;
use super::metrics::{ApplyMetrics, LoadMetrics};
use super::rule_index::{IndexStats, RuleIndex};
use crate::cascade::{Cascade, DEFAULT_LAYER, MultiCascade, WILDCARD_LAYER};
use crate::environment::Environment;
use crate::error::{Result, StyleError};
use crate::osm::{DataSet, Primitive, Tags};
use crate::range::Range;
use crate::rule::Rule;
use crate::selector::{Base, Selector};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Values read from `meta { ... }` blocks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleMeta {
    pub title: Option<String>,
    pub icon: Option<String>,
}

/// A user-facing switch declared with `setting::id { type: boolean; ... }`.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleSetting {
    pub id: String,
    pub label: String,
    pub default: bool,
}

/// What a load accepted and what it rejected.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub errors: Vec<StyleError>,
    pub metrics: LoadMetrics,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Immutable product of one stylesheet load.
#[derive(Debug, Default)]
pub struct CompiledStyle {
    /// Sorted by `RuleOrder`; `RuleId`s index into this.
    rules: Vec<Rule>,
    indexes: [RuleIndex; CATEGORY_COUNT],
    meta: StyleMeta,
    background: Option<String>,
    settings: Vec<StyleSetting>,
}

impl CompiledStyle {
    /// Sort, file and index `rules`. Rules with an unknown base are reported
    /// and left out of every index.
    pub fn build(mut rules: Vec<Rule>) -> Result<(CompiledStyle, Vec<StyleError>)> {
        rules.sort();
        let mut errors = Vec::new();
        let mut indexes: [RuleIndex; CATEGORY_COUNT] = Default::default();

        for (id, rule) in rules.iter().enumerate() {
            let categories = match resolve_rule(rule) {
                Ok(c) => c,
                Err(err) => {
                    log::warn!("{err}");
                    errors.push(err);
                    continue;
                }
            };
            for category in Category::ALL {
                if categories.contains(category.flag()) {
                    indexes[category.slot()].add(id);
                }
            }
        }
        for index in &mut indexes {
            index.init_index(&rules)?;
        }

        let mut style = CompiledStyle { rules, indexes, ..Default::default() };
        style.meta = style.load_meta();
        style.background = style.load_canvas();
        style.settings = style.load_settings();
        Ok((style, errors))
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn index(&self, category: Category) -> &RuleIndex {
        &self.indexes[category.slot()]
    }

    /// Run every plain `base` block against an untagged synthetic node and
    /// collect its writes.
    fn construct_special(&self, base: Base) -> Cascade {
        let anchor = Primitive::node(0, Tags::new());
        let data = DataSet::new();
        let settings = BTreeMap::new();
        let env = Environment::new(&anchor, &data, &settings, false);
        let mut mc = MultiCascade::new();
        for rule in &self.rules {
            let Selector::General(g) = &rule.selector else { continue };
            if g.base == base && g.matches_conditions(&env, &mc) {
                rule.declaration.execute(&mut mc, DEFAULT_LAYER);
            }
        }
        mc.get(DEFAULT_LAYER).cloned().unwrap_or_default()
    }

    fn load_meta(&self) -> StyleMeta {
        let c = self.construct_special(Base::Meta);
        StyleMeta { title: c.get_text("title").map(str::to_string), icon: c.get_text("icon").map(str::to_string) }
    }

    fn load_canvas(&self) -> Option<String> {
        let c = self.construct_special(Base::Canvas);
        if let Some(fill) = c.get("fill-color") {
            return Some(fill.to_string());
        }
        let background = c.get("background-color")?;
        log::warn!("'canvas{{background-color}}' is deprecated and will be removed; use 'fill-color' instead");
        Some(background.to_string())
    }

    fn load_settings(&self) -> Vec<StyleSetting> {
        let anchor = Primitive::node(0, Tags::new());
        let data = DataSet::new();
        let no_settings = BTreeMap::new();
        let mut env = Environment::new(&anchor, &data, &no_settings, false);
        let mut mc = MultiCascade::new();
        for rule in &self.rules {
            let Selector::General(g) = &rule.selector else { continue };
            if g.base != Base::Setting {
                continue;
            }
            env.layer = g.subpart.id();
            if g.matches_conditions(&env, &mc) {
                rule.declaration.execute(&mut mc, env.layer);
            }
        }

        let mut settings = Vec::new();
        for (id, c) in mc.layers() {
            if id == DEFAULT_LAYER || id == WILDCARD_LAYER {
                log::warn!("setting requires a layer identifier, e.g. 'setting::my_setting {{...}}'");
                continue;
            }
            match c.get_text("type") {
                Some("boolean") => settings.push(StyleSetting {
                    id: id.to_string(),
                    label: c.get_text("label").unwrap_or(id).to_string(),
                    default: c.get_bool("default").unwrap_or(false),
                }),
                other => log::warn!("unknown setting type {other:?} for setting '{id}'"),
            }
        }
        settings
    }
}

/// Snapshot plus the current setting values, swapped together.
#[derive(Debug, Default)]
struct Published {
    style: Arc<CompiledStyle>,
    settings: Arc<BTreeMap<String, bool>>,
}

/// A stylesheet ready to style primitives.
///
/// Cheap to share across threads: `apply` only takes a read hold long enough
/// to clone two `Arc`s.
#[derive(Debug, Default)]
pub struct StyleSource {
    pub name: String,
    published: RwLock<Published>,
    generation: AtomicU64,
}

impl StyleSource {
    pub fn new(name: impl Into<String>) -> Self {
        StyleSource { name: name.into(), ..Default::default() }
    }

    /// Replace the stylesheet with `rules`.
    ///
    /// The new snapshot is built off-lock and published atomically; readers
    /// keep using the previous one until the swap. Setting values reset to
    /// their declared defaults.
    pub fn load(&self, rules: Vec<Rule>) -> Result<LoadReport> {
        let start = Instant::now();
        let (style, errors) = CompiledStyle::build(rules)?;
        let settings: BTreeMap<String, bool> = style.settings.iter().map(|s| (s.id.clone(), s.default)).collect();

        let metrics = LoadMetrics {
            total: start.elapsed(),
            rules: style.rules.len() - errors.len(),
            per_category: Category::ALL.iter().map(|&c| (c, style.index(c).stats())).collect(),
        };
        log::debug!(
            "style '{}': {} rules indexed in {:?} ({} rejected)",
            self.name,
            metrics.rules,
            metrics.total,
            errors.len()
        );

        {
            let mut published = self.published.write();
            published.style = Arc::new(style);
            published.settings = Arc::new(settings);
        }
        self.generation.fetch_add(1, Ordering::AcqRel);
        Ok(LoadReport { errors, metrics })
    }

    /// Incremented on every successful `load`.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<CompiledStyle> {
        self.published.read().style.clone()
    }

    fn current(&self) -> (Arc<CompiledStyle>, Arc<BTreeMap<String, bool>>) {
        let published = self.published.read();
        (published.style.clone(), published.settings.clone())
    }

    pub fn meta(&self) -> StyleMeta {
        self.snapshot().meta.clone()
    }

    /// `canvas { fill-color: ... }`, if the sheet sets one.
    pub fn background_color_override(&self) -> Option<String> {
        self.snapshot().background.clone()
    }

    pub fn settings(&self) -> Vec<StyleSetting> {
        self.snapshot().settings.clone()
    }

    pub fn setting_value(&self, id: &str) -> Option<bool> {
        self.published.read().settings.get(id).copied()
    }

    /// Switch a declared setting. Returns `false` if no such setting exists.
    pub fn set_setting(&self, id: &str, value: bool) -> bool {
        let mut published = self.published.write();
        if !published.settings.contains_key(id) {
            return false;
        }
        let mut next = (*published.settings).clone();
        next.insert(id.to_string(), value);
        published.settings = Arc::new(next);
        true
    }

    pub fn index_stats(&self) -> Vec<(Category, IndexStats)> {
        let style = self.snapshot();
        Category::ALL.iter().map(|&c| (c, style.index(c).stats())).collect()
    }

    /// Style `primitive` at `scale`, writing into `mc`.
    ///
    /// `pretend_way_closed` makes open ways match `area` and `:closed`.
    pub fn apply(&self, mc: &mut MultiCascade, data: &DataSet, primitive: &Primitive, scale: f64, pretend_way_closed: bool) {
        self.apply_with_metrics(mc, data, primitive, scale, pretend_way_closed);
    }

    /// Same as [`apply`](Self::apply), returning what happened along the way.
    pub fn apply_with_metrics(
        &self,
        mc: &mut MultiCascade,
        data: &DataSet,
        primitive: &Primitive,
        scale: f64,
        pretend_way_closed: bool,
    ) -> ApplyMetrics {
        let start = Instant::now();
        let (style, settings) = self.current();
        let category = Category::for_primitive(primitive);
        let mut metrics = ApplyMetrics { category: Some(category), ..Default::default() };

        let mut env = Environment::new(primitive, data, &settings, pretend_way_closed);
        let mut last_declaration = LastDeclaration::default();

        for id in style.index(category).rule_candidates(&primitive.tags) {
            metrics.candidates += 1;
            let rule = &style.rules[id];
            env.clear_selector_matching_information();
            let sub = rule.selector.subpart().id();
            env.layer = sub;

            if !rule.selector.matches(&mut env, mc) {
                continue;
            }
            metrics.matched += 1;

            let range = rule.selector.range();
            if range.contains(scale) {
                mc.range = Range::cut(mc.range, range);
            } else {
                mc.range = mc.range.reduce_around(scale, range);
                metrics.out_of_range += 1;
                continue;
            }

            if !last_declaration.first_use(rule.declaration.idx) {
                metrics.deduplicated += 1;
                continue;
            }

            if sub == WILDCARD_LAYER {
                for layer in mc.layer_names() {
                    if layer != WILDCARD_LAYER {
                        rule.declaration.execute(mc, &layer);
                    }
                }
            }
            rule.declaration.execute(mc, sub);
            metrics.executed += 1;
            log::trace!("{}: executed {rule} into '{sub}'", primitive.id);
        }

        metrics.duration = start.elapsed();
        metrics
    }
}
