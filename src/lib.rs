//! MapCSS-style cascade engine for tagged map entities.
//!
//! A stylesheet is a list of rules: a selector plus a declaration block.
//! Styling an entity means running, in stylesheet order, the declarations of
//! every rule whose selector matches it, and collecting the writes into a
//! [`MultiCascade`] with one property map per sub-layer.
//!
//! Doing that naively costs a full scan of the stylesheet per entity. The
//! engine instead files rules into six per-category indexes keyed by the tag
//! each selector requires, and for each entity merges only the buckets its
//! tags reach, in the same order a full scan would visit them.
//!
//! ```
//! use mapcascade::{DataSet, Primitive, SheetDocument, StyleSource, tags};
//!
//! let sheet = SheetDocument::from_json(r#"{
//!     "name": "demo",
//!     "rules": [{ "selectors": [{ "base": "node", "conditions": ["amenity=bench"] }],
//!                 "declarations": { "icon": "bench.svg" } }]
//! }"#).unwrap();
//! let source = StyleSource::new("demo");
//! sheet.load_into(&source).unwrap();
//!
//! let bench = Primitive::node(1, tags! { "amenity" => "bench" });
//! let mut mc = mapcascade::MultiCascade::new();
//! source.apply(&mut mc, &DataSet::new(), &bench, 1.0, false);
//! assert_eq!(mc.get("default").unwrap().get_text("icon"), Some("bench.svg"));
//! ```

#[macro_use]
mod macros;

pub mod api;
pub mod cascade;
pub mod engine;
mod environment;
mod error;
pub mod osm;
pub mod range;
pub mod rule;
pub mod selector;
pub mod sheet;

pub use api::{
    Options, StyleDetails, StyleResult, StyleResultVerbose, StyledPrimitive, style_primitive, style_verbose_with,
    style_with,
};
pub use cascade::{Cascade, DEFAULT_LAYER, Declaration, Instruction, MultiCascade, Value, WILDCARD_LAYER};
pub use engine::{ApplyMetrics, Category, IndexStats, LoadReport, StyleMeta, StyleSetting, StyleSource};
pub use environment::Environment;
pub use error::{Result, StyleError};
pub use osm::{DataSet, Member, Primitive, PrimitiveId, PrimitiveType, Tags};
pub use range::Range;
pub use rule::{Rule, RuleOrder};
pub use selector::{Condition, GeneralSelector, Selector};
pub use sheet::{DataDocument, SheetDocument};
