use crate::cascade::DEFAULT_LAYER;
use crate::osm::{DataSet, Primitive, PrimitiveId};
use std::collections::BTreeMap;

/// Evaluation state for matching one rule against one primitive.
///
/// The first group of fields is fixed for a whole `apply` call; the second
/// group is scratch written by chain selectors as a side effect of a
/// successful match and reset before each candidate.
#[derive(Debug, Clone)]
pub struct Environment<'a> {
    pub primitive: &'a Primitive,
    pub data: &'a DataSet,
    pub settings: &'a BTreeMap<String, bool>,
    /// Treat an unclosed way as closed for `:closed` and `area` matching.
    pub pretend_way_closed: bool,
    /// Sub-layer the current rule writes to; class conditions read it.
    pub layer: &'a str,

    /// Parent bound by a `left > right` chain.
    pub parent: Option<PrimitiveId>,
    /// Child bound by a `left < right` chain.
    pub child: Option<PrimitiveId>,
    /// Position of the bound child within its parent.
    pub index: Option<usize>,
}

impl<'a> Environment<'a> {
    pub fn new(
        primitive: &'a Primitive,
        data: &'a DataSet,
        settings: &'a BTreeMap<String, bool>,
        pretend_way_closed: bool,
    ) -> Self {
        Environment {
            primitive,
            data,
            settings,
            pretend_way_closed,
            layer: DEFAULT_LAYER,
            parent: None,
            child: None,
            index: None,
        }
    }

    pub fn clear_selector_matching_information(&mut self) {
        self.parent = None;
        self.child = None;
        self.index = None;
    }

    /// Same context, focused on another primitive (used to test the left side
    /// of a chain against a parent or child).
    pub fn with_primitive(&self, primitive: &'a Primitive) -> Environment<'a> {
        Environment {
            primitive,
            data: self.data,
            settings: self.settings,
            pretend_way_closed: false,
            layer: self.layer,
            parent: None,
            child: None,
            index: None,
        }
    }
}
