//! Stylesheet and data documents.
//!
//! The engine consumes already-parsed selectors. This module is the thin
//! configuration layer that gets them there from JSON: a [`SheetDocument`]
//! lists rule groups (a comma-separated selector list sharing one declaration
//! block) and a [`DataDocument`] lists primitives.
//!
//! ```json
//! {
//!   "name": "streets",
//!   "rules": [
//!     { "selectors": [{ "base": "way", "conditions": ["highway=primary"], "zoom": "12-" }],
//!       "declarations": { "color": "#f00", "width": 3 } }
//!   ]
//! }
//! ```
//!
//! Conditions use a compact string form:
//!
//! | form            | meaning                         |
//! |-----------------|---------------------------------|
//! | `k=v`           | plain equality (indexed)        |
//! | `k`, `!k`       | key present / absent            |
//! | `k?`, `k?!`     | value is true / false           |
//! | `k>=3`, `k!=v`  | comparisons, see [`Op`]         |
//! | `k=~/re/`       | value regex                     |
//! | `/re/`          | some key matches                |
//! | `:closed`       | pseudo class                    |
//! | `.casing`       | class set on the current layer  |
//! | `setting:hide`  | boolean style setting           |
//!
//! Any condition except `k=v` forms may be negated with a leading `!`.

use crate::cascade::{Declaration, Instruction, Value};
use crate::engine::{LoadReport, StyleSource};
use crate::error::{Result, StyleError};
use crate::osm::{DataSet, Member, Primitive, Tags};
use crate::range::Range;
use crate::rule::Rule;
use crate::selector::{Condition, GeneralSelector, KeyCondition, KeyMatchType, LinkType, Op, PseudoClass, Selector, Subpart};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Deserialize)]
pub struct SheetDocument {
    pub name: String,
    /// Shorthand for a leading `meta { title: ... }` block.
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub rules: Vec<RuleGroup>,
}

/// Selectors sharing one declaration block.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleGroup {
    pub selectors: Vec<SelectorSpec>,
    #[serde(default)]
    pub declarations: BTreeMap<String, Value>,
    /// Classes to mark the layer with (`set .name`).
    #[serde(default)]
    pub set: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectorSpec {
    pub base: String,
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub zoom: Option<String>,
    #[serde(default)]
    pub subpart: Option<String>,
    /// Left-hand side of a chain (`left > this` or `left < this`).
    #[serde(default)]
    pub left: Option<Box<LinkSpec>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkSpec {
    pub selector: SelectorSpec,
    #[serde(default)]
    pub link: LinkKind,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    /// `left > right`
    #[default]
    Child,
    /// `left < right`
    Parent,
}

impl From<LinkKind> for LinkType {
    fn from(kind: LinkKind) -> Self {
        match kind {
            LinkKind::Child => LinkType::Child,
            LinkKind::Parent => LinkType::Parent,
        }
    }
}

impl SheetDocument {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Convert to engine rules.
    ///
    /// Declaration indices follow group order and selector sequence numbers
    /// follow document order. A group with any invalid selector is dropped
    /// whole and its error returned alongside the accepted rules.
    pub fn to_rules(&self) -> (Vec<Rule>, Vec<StyleError>) {
        let mut rules = Vec::new();
        let mut errors = Vec::new();
        let mut seq = 0u32;
        let mut idx = 0u32;

        if let Some(title) = &self.title {
            let meta = Arc::new(Declaration::new(idx, vec![Instruction::assign("title", title.as_str())]));
            rules.push(Rule::new(GeneralSelector::new("meta", Vec::new()), meta, seq));
            idx += 1;
            seq += 1;
        }

        for (n, group) in self.rules.iter().enumerate() {
            let declaration = Arc::new(Declaration::new(idx, group.instructions()));
            idx += 1;
            match group.selectors() {
                Ok(selectors) => {
                    for selector in selectors {
                        rules.push(Rule::new(selector, declaration.clone(), seq));
                        seq += 1;
                    }
                }
                Err(err) => {
                    log::warn!("{}: dropping rule group {n}: {err}", self.name);
                    errors.push(err);
                }
            }
        }
        (rules, errors)
    }

    /// Convert and load into `source`, merging conversion and load errors.
    pub fn load_into(&self, source: &StyleSource) -> Result<LoadReport> {
        let (rules, mut errors) = self.to_rules();
        let mut report = source.load(rules)?;
        errors.append(&mut report.errors);
        report.errors = errors;
        Ok(report)
    }
}

impl RuleGroup {
    fn instructions(&self) -> Vec<Instruction> {
        let assigns = self.declarations.iter().map(|(k, v)| Instruction::Assign { key: k.clone(), value: v.clone() });
        let classes = self.set.iter().map(|c| Instruction::SetClass(c.trim_start_matches('.').to_string()));
        assigns.chain(classes).collect()
    }

    fn selectors(&self) -> Result<Vec<Selector>> {
        if self.selectors.is_empty() {
            return Err(StyleError::InvalidSelector("rule group without selectors".into()));
        }
        self.selectors.iter().map(SelectorSpec::to_selector).collect()
    }
}

impl SelectorSpec {
    pub fn to_selector(&self) -> Result<Selector> {
        let right = self.general()?;
        match &self.left {
            None => Ok(right.into()),
            Some(link) => {
                Ok(Selector::chain(link.selector.to_selector()?, link.link.into(), link.role.clone(), right))
            }
        }
    }

    fn general(&self) -> Result<GeneralSelector> {
        let base = self.base.trim();
        if base.is_empty() {
            return Err(StyleError::InvalidSelector("empty base".into()));
        }
        let conditions = self.conditions.iter().map(|c| parse_condition(c)).collect::<Result<Vec<_>>>()?;
        let mut selector = GeneralSelector::new(base, conditions);
        if let Some(zoom) = &self.zoom {
            selector = selector.with_range(parse_zoom(zoom)?);
        }
        if let Some(subpart) = &self.subpart {
            selector = selector.with_subpart(Subpart::named(subpart.trim_start_matches("::")));
        }
        Ok(selector)
    }
}

/// Parse the compact condition form described in the module docs.
pub fn parse_condition(text: &str) -> Result<Condition> {
    let invalid = || StyleError::InvalidCondition(text.to_string());
    let s = text.trim();
    let (negate, body) = match s.strip_prefix('!') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, s),
    };
    if body.is_empty() {
        return Err(invalid());
    }

    if let Some(id) = body.strip_prefix("setting:") {
        if id.is_empty() {
            return Err(invalid());
        }
        return Ok(Condition::Setting { id: id.to_string(), negate });
    }
    if let Some(name) = body.strip_prefix(':') {
        let class = PseudoClass::from_name(name).ok_or_else(invalid)?;
        return Ok(Condition::Pseudo { class, negate });
    }
    if let Some(id) = body.strip_prefix('.') {
        if id.is_empty() {
            return Err(invalid());
        }
        return Ok(Condition::Class { id: id.to_string(), negate });
    }
    if let Some(pattern) = body.strip_prefix('/').and_then(|r| r.strip_suffix('/')) {
        return Condition::key_regex(pattern, negate);
    }

    let kv = regex!(r"^([^!=<>~^$*/?]+?)\s*(=~|!~|!=|>=|<=|~=|\^=|\$=|\*=|=|>|<)\s*(.*)$");
    if let Some(caps) = kv.captures(body) {
        // `!k=v` reads ambiguously; `k!=v` says it.
        if negate {
            return Err(invalid());
        }
        let op = parse_op(&caps[2]).ok_or_else(invalid)?;
        let mut value = unquote(caps[3].trim());
        if matches!(op, Op::Regex | Op::NRegex) {
            value = value.strip_prefix('/').and_then(|v| v.strip_suffix('/')).unwrap_or(value);
        }
        return Condition::key_value(caps[1].trim(), value, op);
    }

    let (key, match_type) = if let Some(k) = body.strip_suffix("?!") {
        (k, KeyMatchType::False)
    } else if let Some(k) = body.strip_suffix('?') {
        (k, KeyMatchType::True)
    } else {
        (body, KeyMatchType::Present)
    };
    if !regex!(r"^[^\s!=<>~^$*/?]+$").is_match(key) {
        return Err(invalid());
    }
    Ok(Condition::Key(KeyCondition { key: unquote(key).to_string(), negate, match_type }))
}

fn parse_op(symbol: &str) -> Option<Op> {
    let op = match symbol {
        "=" => Op::Eq,
        "!=" => Op::Neq,
        ">" => Op::Greater,
        ">=" => Op::GreaterOrEqual,
        "<" => Op::Less,
        "<=" => Op::LessOrEqual,
        "=~" => Op::Regex,
        "!~" => Op::NRegex,
        "~=" => Op::OneOf,
        "^=" => Op::BeginsWith,
        "$=" => Op::EndsWith,
        "*=" => Op::Contains,
        _ => return None,
    };
    Some(op)
}

fn unquote(s: &str) -> &str {
    s.strip_prefix('"').and_then(|r| r.strip_suffix('"')).unwrap_or(s)
}

/// Parse a zoom range: `"12-"`, `"-15"`, `"12-15"` or `"14"`.
pub fn parse_zoom(text: &str) -> Result<Range> {
    let invalid = || StyleError::InvalidZoom(text.to_string());
    let caps = regex!(r"^\s*(\d+)?\s*(-)?\s*(\d+)?\s*$").captures(text).ok_or_else(invalid)?;
    let level = |i: usize| -> Result<Option<u32>> {
        caps.get(i).map(|m| m.as_str().parse::<u32>().map_err(|_| invalid())).transpose()
    };
    let (min, max) = (level(1)?, level(3)?);
    let (min, max) = match (caps.get(2).is_some(), min, max) {
        (_, None, None) => return Err(invalid()),
        (false, Some(z), None) => (Some(z), Some(z)),
        (false, _, Some(_)) => return Err(invalid()),
        (true, min, max) => (min, max),
    };
    Range::from_zoom(min, max).ok_or_else(invalid)
}

// --- Data documents ----------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct DataDocument {
    pub primitives: Vec<PrimitiveSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PrimitiveSpec {
    Node {
        id: i64,
        #[serde(default)]
        tags: Tags,
    },
    Way {
        id: i64,
        #[serde(default)]
        tags: Tags,
        #[serde(default)]
        nodes: Vec<i64>,
    },
    Relation {
        id: i64,
        #[serde(default)]
        tags: Tags,
        #[serde(default)]
        members: Vec<Member>,
    },
}

impl From<PrimitiveSpec> for Primitive {
    fn from(spec: PrimitiveSpec) -> Self {
        match spec {
            PrimitiveSpec::Node { id, tags } => Primitive::node(id, tags),
            PrimitiveSpec::Way { id, tags, nodes } => Primitive::way(id, tags, nodes),
            PrimitiveSpec::Relation { id, tags, members } => Primitive::relation(id, tags, members),
        }
    }
}

impl DataDocument {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn into_data_set(self) -> DataSet {
        let mut data = DataSet::new();
        for spec in self.primitives {
            data.insert(spec.into());
        }
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::osm::PrimitiveId;
    use crate::range::zoom_to_scale;

    #[test]
    fn condition_forms() {
        assert!(matches!(parse_condition("highway=primary").unwrap(), Condition::SimpleKeyValue { .. }));
        assert_eq!(parse_condition("highway=primary").unwrap().index_key_value(), Some(("highway", "primary")));
        assert_eq!(parse_condition("name").unwrap().required_key(), Some("name"));
        assert_eq!(parse_condition("!oneway").unwrap().required_key(), None);
        assert_eq!(parse_condition("width>=3").unwrap().to_string(), "[width>=3]");
        assert_eq!(parse_condition("name=~/^A/").unwrap().to_string(), "[name=~/^A/]");
        assert_eq!(parse_condition("access != no").unwrap().to_string(), "[access!=no]");
        assert_eq!(parse_condition("oneway?").unwrap().to_string(), "[oneway?]");
        assert_eq!(parse_condition("!area?!").unwrap().to_string(), "[!area?!]");
        assert_eq!(parse_condition("/^addr:/").unwrap().to_string(), "[/^addr:/]");
        assert_eq!(parse_condition(":closed").unwrap().to_string(), ":closed");
        assert_eq!(parse_condition("!.casing").unwrap().to_string(), "!.casing");
        assert!(matches!(
            parse_condition("setting:hide").unwrap(),
            Condition::Setting { ref id, negate: false } if id == "hide"
        ));
        assert_eq!(parse_condition("name=\"Main St\"").unwrap().index_key_value(), Some(("name", "Main St")));
    }

    #[test]
    fn bad_conditions_are_rejected() {
        for text in ["", "!", ":round", ".", "setting:", "!k=v", "a b"] {
            assert_eq!(parse_condition(text).unwrap_err(), StyleError::InvalidCondition(text.to_string()), "{text:?}");
        }
        assert!(matches!(parse_condition("name=~/(/"), Err(StyleError::InvalidRegex { .. })));
    }

    #[test]
    fn zoom_forms() {
        assert_eq!(parse_zoom("12-").unwrap(), Range::from_zoom(Some(12), None).unwrap());
        assert_eq!(parse_zoom("-15").unwrap(), Range::from_zoom(None, Some(15)).unwrap());
        assert_eq!(parse_zoom("12-15").unwrap(), Range::from_zoom(Some(12), Some(15)).unwrap());

        let single = parse_zoom("14").unwrap();
        assert!(single.contains(zoom_to_scale(14)));
        assert!(!single.contains(zoom_to_scale(13)));
        assert!(!single.contains(zoom_to_scale(15)));

        for text in ["", "-", "15-12", "a-b", "3 4"] {
            assert_eq!(parse_zoom(text).unwrap_err(), StyleError::InvalidZoom(text.to_string()), "{text:?}");
        }
    }

    #[test]
    fn groups_share_declarations_and_bad_groups_are_dropped() {
        let doc = SheetDocument::from_json(
            r#"{
              "name": "t",
              "title": "Test",
              "rules": [
                { "selectors": [{ "base": "node" }, { "base": "way", "conditions": ["name"] }],
                  "declarations": { "color": "red", "width": 2 }, "set": [".named"] },
                { "selectors": [{ "base": "node", "conditions": ["x=~/(/"] }],
                  "declarations": { "color": "blue" } },
                { "selectors": [{ "base": "way", "subpart": "casing", "zoom": "14-",
                                  "left": { "selector": { "base": "relation" }, "role": "outer" } }],
                  "declarations": { "dashes": [2, 4] } }
              ]
            }"#,
        )
        .unwrap();

        let (rules, errors) = doc.to_rules();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], StyleError::InvalidRegex { .. }));

        let decls: Vec<_> = rules.iter().map(|r| (r.seq, r.declaration.idx)).collect();
        assert_eq!(decls, vec![(0, 0), (1, 1), (2, 1), (3, 3)]);
        assert!(Arc::ptr_eq(&rules[1].declaration, &rules[2].declaration));
        assert_eq!(rules[1].declaration.instructions.last(), Some(&Instruction::SetClass("named".into())));
        let zoom = parse_zoom("14-").unwrap();
        assert_eq!(rules[3].selector.to_string(), format!("relation >[role=outer] way|s{zoom}::casing"));
    }

    #[test]
    fn data_document_builds_links() {
        let data = DataDocument::from_json(
            r#"{ "primitives": [
                 { "type": "node", "id": 1, "tags": { "amenity": "bench" } },
                 { "type": "way", "id": 2, "nodes": [1, 3, 1] },
                 { "type": "relation", "id": 3, "tags": { "type": "route" },
                   "members": [{ "role": "stop", "ref": { "kind": "node", "id": 1 } }] }
               ] }"#,
        )
        .unwrap()
        .into_data_set();

        assert_eq!(data.len(), 3);
        let parents: Vec<_> = data.parents(PrimitiveId::node(1)).map(|(_, p)| p.id).collect();
        assert!(parents.contains(&PrimitiveId::way(2)));
        assert!(parents.contains(&PrimitiveId::relation(3)));
    }

    #[test]
    fn malformed_json_is_a_document_error() {
        assert!(matches!(SheetDocument::from_json("{"), Err(StyleError::Document(_))));
    }
}
