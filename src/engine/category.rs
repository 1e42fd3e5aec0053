//! Entity categories.
//!
//! A stylesheet is split into six independent rule indexes, one per entity
//! category. Each rule is filed into every category its base selector can
//! match, and each primitive is evaluated against exactly one category.
//!
//! ```text
//! base      node  way  way(area=no)  relation  multipolygon  canvas
//! node       x
//! way              x        x
//! area             x                              x
//! relation                             x          x
//! *          x     x        x          x          x
//! canvas                                                       x
//! ```
//!
//! `meta` and `setting` blocks are not indexed; they are evaluated once at
//! load time against a synthetic primitive.

use crate::error::{Result, StyleError};
use crate::osm::{CANVAS_MARKER, Primitive, PrimitiveType};
use crate::rule::Rule;
use crate::selector::Base;
use std::fmt;

bitflags::bitflags! {
    /// Set of categories a rule is filed under.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CategorySet: u8 {
        const NODE         = 1 << 0;
        const WAY          = 1 << 1;
        const WAY_NO_AREA  = 1 << 2;
        const RELATION     = 1 << 3;
        const MULTIPOLYGON = 1 << 4;
        const CANVAS       = 1 << 5;
    }
}

pub const CATEGORY_COUNT: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Node,
    /// Ways without `area=no`.
    Way,
    /// Ways tagged `area=no`.
    WayNoArea,
    /// Relations that are not multipolygons.
    Relation,
    Multipolygon,
    Canvas,
}

impl Category {
    pub const ALL: [Category; CATEGORY_COUNT] = [
        Category::Node,
        Category::Way,
        Category::WayNoArea,
        Category::Relation,
        Category::Multipolygon,
        Category::Canvas,
    ];

    /// Position in fixed-size per-category arrays.
    pub fn slot(self) -> usize {
        self as usize
    }

    pub fn flag(self) -> CategorySet {
        match self {
            Category::Node => CategorySet::NODE,
            Category::Way => CategorySet::WAY,
            Category::WayNoArea => CategorySet::WAY_NO_AREA,
            Category::Relation => CategorySet::RELATION,
            Category::Multipolygon => CategorySet::MULTIPOLYGON,
            Category::Canvas => CategorySet::CANVAS,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Category::Node => "node",
            Category::Way => "way",
            Category::WayNoArea => "way(area=no)",
            Category::Relation => "relation",
            Category::Multipolygon => "multipolygon",
            Category::Canvas => "canvas",
        }
    }

    /// The index a primitive is evaluated against.
    pub fn for_primitive(p: &Primitive) -> Category {
        match p.kind() {
            PrimitiveType::Node => Category::Node,
            PrimitiveType::Way if p.tags.is_false("area") => Category::WayNoArea,
            PrimitiveType::Way => Category::Way,
            PrimitiveType::Relation if p.is_multipolygon() => Category::Multipolygon,
            PrimitiveType::Relation if p.tags.has_key(CANVAS_MARKER) => Category::Canvas,
            PrimitiveType::Relation => Category::Relation,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Categories a base selector feeds. `None` for an unknown base.
pub fn categories_of(base: &Base) -> Option<CategorySet> {
    let set = match base {
        Base::Node => CategorySet::NODE,
        Base::Way => CategorySet::WAY | CategorySet::WAY_NO_AREA,
        Base::Area => CategorySet::WAY | CategorySet::MULTIPOLYGON,
        Base::Relation => CategorySet::RELATION | CategorySet::MULTIPOLYGON,
        Base::Any => CategorySet::all() - CategorySet::CANVAS,
        Base::Canvas => CategorySet::CANVAS,
        Base::Meta | Base::Setting => CategorySet::empty(),
        Base::Other(_) => return None,
    };
    Some(set)
}

/// Resolve the categories of a rule, reporting an unknown base with enough
/// context to find the rule in the sheet.
pub fn resolve_rule(rule: &Rule) -> Result<CategorySet> {
    let base = &rule.selector.rightmost().base;
    categories_of(base).ok_or_else(|| StyleError::UnknownBase {
        base: base.name().to_string(),
        seq: rule.seq,
        selector: rule.selector.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::osm::Tags;

    #[test]
    fn primitive_dispatch() {
        assert_eq!(Category::for_primitive(&Primitive::node(1, Tags::new())), Category::Node);
        assert_eq!(Category::for_primitive(&Primitive::way(1, Tags::new(), vec![1, 2])), Category::Way);
        assert_eq!(
            Category::for_primitive(&Primitive::way(1, tags! { "area" => "no" }, vec![1, 2])),
            Category::WayNoArea
        );
        assert_eq!(
            Category::for_primitive(&Primitive::relation(1, tags! { "type" => "multipolygon" }, Vec::new())),
            Category::Multipolygon
        );
        assert_eq!(
            Category::for_primitive(&Primitive::relation(1, tags! { CANVAS_MARKER => "yes" }, Vec::new())),
            Category::Canvas
        );
        assert_eq!(
            Category::for_primitive(&Primitive::relation(1, tags! { "type" => "route" }, Vec::new())),
            Category::Relation
        );
    }

    #[test]
    fn base_fan_out() {
        let any = categories_of(&Base::Any).unwrap();
        assert!(any.contains(CategorySet::NODE | CategorySet::MULTIPOLYGON));
        assert!(!any.contains(CategorySet::CANVAS));
        assert_eq!(categories_of(&Base::Meta), Some(CategorySet::empty()));
        assert_eq!(categories_of(&Base::from("lines")), None);
    }

    #[test]
    fn slots_are_dense() {
        for (i, c) in Category::ALL.iter().enumerate() {
            assert_eq!(c.slot(), i);
        }
    }
}
