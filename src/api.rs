use crate::cascade::MultiCascade;
use crate::engine::{ApplyMetrics, Category, IndexStats, StyleSource};
use crate::osm::{DataSet, Primitive, PrimitiveId};
use crate::range::{Range, zoom_to_scale};
use std::time::{Duration, Instant};

/// Zoom level whose scale [`Options::default`] styles at.
pub const DEFAULT_ZOOM: u32 = 17;

/// Options that affect styling.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    /// Render scale in meters per pixel.
    pub scale: f64,
    /// Treat open ways as closed (`area` and `:closed` match them).
    pub pretend_way_closed: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options { scale: zoom_to_scale(DEFAULT_ZOOM), pretend_way_closed: false }
    }
}

impl Options {
    pub fn at_zoom(zoom: u32) -> Self {
        Options { scale: zoom_to_scale(zoom), ..Options::default() }
    }
}

/// The flattened style of one primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct StyledPrimitive {
    pub id: PrimitiveId,
    /// `(layer, [(property, value)])`, layers and properties sorted by name.
    pub layers: Vec<(String, Vec<(String, String)>)>,
    /// Scale window over which this style stays valid.
    pub range: Range,
}

impl StyledPrimitive {
    fn from_cascade(id: PrimitiveId, mc: &MultiCascade) -> Self {
        let layers = mc
            .layers()
            .map(|(name, c)| (name.to_string(), c.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()))
            .collect();
        StyledPrimitive { id, layers, range: mc.range }
    }

    pub fn layer(&self, name: &str) -> Option<&[(String, String)]> {
        self.layers.iter().find(|(n, _)| n == name).map(|(_, props)| props.as_slice())
    }

    pub fn property(&self, layer: &str, key: &str) -> Option<&str> {
        self.layer(layer)?.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

/// Result from [`style_with`].
#[derive(Debug, Clone)]
pub struct StyleResult {
    pub styled: Vec<StyledPrimitive>,
    /// Total elapsed time spent styling.
    pub elapsed: Duration,
}

/// Additional details returned by [`style_verbose_with`].
///
/// Compact on purpose: counters and index shape, not the rules themselves.
#[derive(Debug, Clone)]
pub struct StyleDetails {
    pub total: Duration,
    pub per_primitive: Vec<(PrimitiveId, ApplyMetrics)>,
    /// Sum over all primitives.
    pub totals: ApplyMetrics,
    pub index: Vec<(Category, IndexStats)>,
    /// Load generation the run was evaluated against.
    pub generation: u64,
}

#[derive(Debug, Clone)]
pub struct StyleResultVerbose {
    pub styled: Vec<StyledPrimitive>,
    pub elapsed: Duration,
    pub details: StyleDetails,
}

/// Style a single primitive into a fresh cascade.
pub fn style_primitive(source: &StyleSource, data: &DataSet, primitive: &Primitive, options: &Options) -> MultiCascade {
    let mut mc = MultiCascade::new();
    source.apply(&mut mc, data, primitive, options.scale, options.pretend_way_closed);
    mc
}

/// Style every primitive of `data`.
pub fn style_with(source: &StyleSource, data: &DataSet, options: &Options) -> StyleResult {
    let start = Instant::now();
    let styled = data
        .iter()
        .map(|p| StyledPrimitive::from_cascade(p.id, &style_primitive(source, data, p, options)))
        .collect();
    StyleResult { styled, elapsed: start.elapsed() }
}

/// Like [`style_with`], also collecting per-primitive metrics.
///
/// This is useful for profiling and stylesheet debugging. The default
/// [`style_with`] path does not keep these counters.
pub fn style_verbose_with(source: &StyleSource, data: &DataSet, options: &Options) -> StyleResultVerbose {
    let start = Instant::now();
    let generation = source.generation();
    let mut styled = Vec::with_capacity(data.len());
    let mut per_primitive = Vec::with_capacity(data.len());
    let mut totals = ApplyMetrics::default();

    for p in data.iter() {
        let mut mc = MultiCascade::new();
        let metrics = source.apply_with_metrics(&mut mc, data, p, options.scale, options.pretend_way_closed);
        totals.add(&metrics);
        styled.push(StyledPrimitive::from_cascade(p.id, &mc));
        per_primitive.push((p.id, metrics));
    }

    let total = start.elapsed();
    let details = StyleDetails { total, per_primitive, totals, index: source.index_stats(), generation };
    StyleResultVerbose { styled, elapsed: total, details }
}
