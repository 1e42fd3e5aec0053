//! Selectors and conditions.
//!
//! These are the parsed form of stylesheet selectors. The engine only needs
//! two things from them beyond full matching: the right-most general selector
//! of a chain (what is tested against the leaf entity) and, per condition,
//! whether it is indexable and which tag key it requires. Both questions are
//! answered by pure functions over [`Condition`] rather than dynamic dispatch.
//!
//! ```text
//! relation[type=route] > way[highway=primary][!oneway]::casing|z12-
//! └──── left ─────────┘   └──────────── right (GeneralSelector) ────┘
//!                          base   conditions...        subpart range
//! ```

use crate::cascade::{DEFAULT_LAYER, MultiCascade, WILDCARD_LAYER};
use crate::environment::Environment;
use crate::error::{Result, StyleError};
use crate::osm::PrimitiveType;
use crate::range::Range;
use regex::Regex;
use std::fmt;

// --- Conditions --------------------------------------------------------------

/// How a key-only condition tests its key.
#[derive(Debug, Clone)]
pub enum KeyMatchType {
    /// `[key]`
    Present,
    /// `[key?]`: value is a true value (`yes`, `true`, ...).
    True,
    /// `[key?!]`: value is a false value (`no`, `false`, ...).
    False,
    /// `[/regex/]`: any key matches the expression.
    Regex(Regex),
}

#[derive(Debug, Clone)]
pub struct KeyCondition {
    pub key: String,
    pub negate: bool,
    pub match_type: KeyMatchType,
}

impl KeyCondition {
    fn applies(&self, env: &Environment<'_>) -> bool {
        let tags = &env.primitive.tags;
        let hit = match &self.match_type {
            KeyMatchType::Present => tags.has_key(&self.key),
            KeyMatchType::True => tags.is_true(&self.key),
            KeyMatchType::False => tags.is_false(&self.key),
            KeyMatchType::Regex(re) => tags.keys().any(|k| re.is_match(k)),
        };
        hit != self.negate
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Eq,
    Neq,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
    Regex,
    NRegex,
    /// Tag value is a `;`-separated list containing the operand.
    OneOf,
    BeginsWith,
    EndsWith,
    Contains,
}

impl Op {
    pub fn symbol(self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Neq => "!=",
            Op::Greater => ">",
            Op::GreaterOrEqual => ">=",
            Op::Less => "<",
            Op::LessOrEqual => "<=",
            Op::Regex => "=~",
            Op::NRegex => "!~",
            Op::OneOf => "~=",
            Op::BeginsWith => "^=",
            Op::EndsWith => "$=",
            Op::Contains => "*=",
        }
    }

    /// Ops that also match when the key is absent.
    pub fn is_negated(self) -> bool {
        matches!(self, Op::Neq | Op::NRegex)
    }
}

#[derive(Debug, Clone)]
pub struct KeyValueCondition {
    pub key: String,
    pub value: String,
    pub op: Op,
    regex: Option<Regex>,
}

impl KeyValueCondition {
    pub fn new(key: impl Into<String>, value: impl Into<String>, op: Op) -> Result<Self> {
        let value = value.into();
        let regex = match op {
            Op::Regex | Op::NRegex => Some(compile_regex(&value)?),
            _ => None,
        };
        Ok(KeyValueCondition { key: key.into(), value, op, regex })
    }

    fn applies(&self, env: &Environment<'_>) -> bool {
        let test = env.primitive.tags.get(&self.key);
        match self.op {
            Op::Eq => test == Some(self.value.as_str()),
            Op::Neq => test != Some(self.value.as_str()),
            Op::Greater | Op::GreaterOrEqual | Op::Less | Op::LessOrEqual => {
                let (Some(a), Ok(b)) = (test.and_then(|t| t.trim().parse::<f64>().ok()), self.value.parse::<f64>())
                else {
                    return false;
                };
                match self.op {
                    Op::Greater => a > b,
                    Op::GreaterOrEqual => a >= b,
                    Op::Less => a < b,
                    _ => a <= b,
                }
            }
            Op::Regex => test.is_some_and(|t| self.regex.as_ref().is_some_and(|re| re.is_match(t))),
            Op::NRegex => !test.is_some_and(|t| self.regex.as_ref().is_some_and(|re| re.is_match(t))),
            Op::OneOf => test.is_some_and(|t| t.split(';').any(|part| part.trim() == self.value)),
            Op::BeginsWith => test.is_some_and(|t| t.starts_with(&self.value)),
            Op::EndsWith => test.is_some_and(|t| t.ends_with(&self.value)),
            Op::Contains => test.is_some_and(|t| t.contains(&self.value)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PseudoClass {
    /// Closed way, multipolygon, or any way when the caller pretends it is closed.
    Closed,
    Tagged,
    Untagged,
    Multipolygon,
}

impl PseudoClass {
    pub fn name(self) -> &'static str {
        match self {
            PseudoClass::Closed => "closed",
            PseudoClass::Tagged => "tagged",
            PseudoClass::Untagged => "untagged",
            PseudoClass::Multipolygon => "multipolygon",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "closed" => Some(PseudoClass::Closed),
            "tagged" => Some(PseudoClass::Tagged),
            "untagged" => Some(PseudoClass::Untagged),
            "multipolygon" => Some(PseudoClass::Multipolygon),
            _ => None,
        }
    }

    fn applies(self, env: &Environment<'_>) -> bool {
        let p = env.primitive;
        match self {
            PseudoClass::Closed => {
                p.is_closed() || p.is_multipolygon() || (env.pretend_way_closed && p.kind() == PrimitiveType::Way)
            }
            PseudoClass::Tagged => p.is_tagged(),
            PseudoClass::Untagged => !p.is_tagged(),
            PseudoClass::Multipolygon => p.is_multipolygon(),
        }
    }
}

/// A single selector condition.
#[derive(Debug, Clone)]
pub enum Condition {
    /// Tests a key only.
    Key(KeyCondition),
    /// Plain `[key=value]`. The only form stored in the key-value index.
    SimpleKeyValue { key: String, value: String },
    /// Any other key/value comparison.
    KeyValue(KeyValueCondition),
    Pseudo { class: PseudoClass, negate: bool },
    /// `.class`: the current sub-layer was marked by `set .class`.
    Class { id: String, negate: bool },
    /// `setting:id`: a boolean style setting is switched on.
    Setting { id: String, negate: bool },
}

impl Condition {
    pub fn key(key: impl Into<String>) -> Self {
        Condition::Key(KeyCondition { key: key.into(), negate: false, match_type: KeyMatchType::Present })
    }

    pub fn not_key(key: impl Into<String>) -> Self {
        Condition::Key(KeyCondition { key: key.into(), negate: true, match_type: KeyMatchType::Present })
    }

    pub fn key_regex(pattern: &str, negate: bool) -> Result<Self> {
        let re = compile_regex(pattern)?;
        Ok(Condition::Key(KeyCondition { key: pattern.to_string(), negate, match_type: KeyMatchType::Regex(re) }))
    }

    pub fn eq(key: impl Into<String>, value: impl Into<String>) -> Self {
        Condition::SimpleKeyValue { key: key.into(), value: value.into() }
    }

    /// Build a key/value condition; plain equality becomes `SimpleKeyValue`.
    pub fn key_value(key: impl Into<String>, value: impl Into<String>, op: Op) -> Result<Self> {
        if op == Op::Eq {
            return Ok(Condition::eq(key, value));
        }
        Ok(Condition::KeyValue(KeyValueCondition::new(key, value, op)?))
    }

    pub fn pseudo(class: PseudoClass) -> Self {
        Condition::Pseudo { class, negate: false }
    }

    /// `(key, value)` if this condition can file a rule in the key-value index.
    pub fn index_key_value(&self) -> Option<(&str, &str)> {
        match self {
            Condition::SimpleKeyValue { key, value } => Some((key.as_str(), value.as_str())),
            _ => None,
        }
    }

    /// The tag key an entity must carry for this condition to hold, if any.
    pub fn required_key(&self) -> Option<&str> {
        match self {
            Condition::Key(KeyCondition { key, negate: false, match_type }) => match match_type {
                KeyMatchType::Present | KeyMatchType::True | KeyMatchType::False => Some(key.as_str()),
                KeyMatchType::Regex(_) => None,
            },
            Condition::SimpleKeyValue { key, .. } => Some(key.as_str()),
            Condition::KeyValue(kv) if !kv.op.is_negated() => Some(kv.key.as_str()),
            _ => None,
        }
    }

    pub fn applies(&self, env: &Environment<'_>, mc: &MultiCascade) -> bool {
        match self {
            Condition::Key(c) => c.applies(env),
            Condition::SimpleKeyValue { key, value } => env.primitive.tags.get(key) == Some(value.as_str()),
            Condition::KeyValue(c) => c.applies(env),
            Condition::Pseudo { class, negate } => class.applies(env) != *negate,
            Condition::Class { id, negate } => {
                let set = mc.get(env.layer).and_then(|c| c.get_bool(id)).unwrap_or(false);
                set != *negate
            }
            Condition::Setting { id, negate } => env.settings.get(id).copied().unwrap_or(false) != *negate,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bang = |negate: bool| if negate { "!" } else { "" };
        match self {
            Condition::Key(c) => match &c.match_type {
                KeyMatchType::Present => write!(f, "[{}{}]", bang(c.negate), c.key),
                KeyMatchType::True => write!(f, "[{}{}?]", bang(c.negate), c.key),
                KeyMatchType::False => write!(f, "[{}{}?!]", bang(c.negate), c.key),
                KeyMatchType::Regex(_) => write!(f, "[{}/{}/]", bang(c.negate), c.key),
            },
            Condition::SimpleKeyValue { key, value } => write!(f, "[{key}={value}]"),
            Condition::KeyValue(c) => match c.op {
                Op::Regex | Op::NRegex => write!(f, "[{}{}/{}/]", c.key, c.op.symbol(), c.value),
                _ => write!(f, "[{}{}{}]", c.key, c.op.symbol(), c.value),
            },
            Condition::Pseudo { class, negate } => write!(f, "{}:{}", bang(*negate), class.name()),
            Condition::Class { id, negate } => write!(f, "{}.{}", bang(*negate), id),
            Condition::Setting { id, negate } => write!(f, "[{}setting({})]", bang(*negate), id),
        }
    }
}

fn compile_regex(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| StyleError::InvalidRegex { pattern: pattern.to_string(), message: e.to_string() })
}

// --- Selectors ---------------------------------------------------------------

/// Base category of a general selector, as written in the stylesheet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Base {
    Node,
    Way,
    Area,
    Relation,
    Canvas,
    Meta,
    Setting,
    /// `*`
    Any,
    /// Anything else; rejected when the sheet is loaded.
    Other(String),
}

impl Base {
    pub fn name(&self) -> &str {
        match self {
            Base::Node => "node",
            Base::Way => "way",
            Base::Area => "area",
            Base::Relation => "relation",
            Base::Canvas => "canvas",
            Base::Meta => "meta",
            Base::Setting => "setting",
            Base::Any => "*",
            Base::Other(s) => s,
        }
    }
}

impl From<&str> for Base {
    fn from(s: &str) -> Self {
        match s {
            "node" => Base::Node,
            "way" => Base::Way,
            "area" => Base::Area,
            "relation" => Base::Relation,
            "canvas" => Base::Canvas,
            "meta" => Base::Meta,
            "setting" => Base::Setting,
            "*" => Base::Any,
            other => Base::Other(other.to_string()),
        }
    }
}

/// Sub-layer a selector's declaration writes into (`::name`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Subpart {
    #[default]
    Default,
    Named(String),
    /// `::*`
    Wildcard,
}

impl Subpart {
    pub fn named(name: &str) -> Self {
        match name {
            WILDCARD_LAYER => Subpart::Wildcard,
            DEFAULT_LAYER => Subpart::Default,
            other => Subpart::Named(other.to_string()),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Subpart::Default => DEFAULT_LAYER,
            Subpart::Named(name) => name,
            Subpart::Wildcard => WILDCARD_LAYER,
        }
    }
}

/// A single compound selector: base, conditions, sub-layer and scale range.
#[derive(Debug, Clone)]
pub struct GeneralSelector {
    pub base: Base,
    pub conditions: Vec<Condition>,
    pub subpart: Subpart,
    pub range: Range,
}

impl GeneralSelector {
    pub fn new(base: impl Into<Base>, conditions: Vec<Condition>) -> Self {
        GeneralSelector { base: base.into(), conditions, subpart: Subpart::Default, range: Range::ZERO_TO_INFINITY }
    }

    pub fn with_subpart(mut self, subpart: Subpart) -> Self {
        self.subpart = subpart;
        self
    }

    pub fn with_range(mut self, range: Range) -> Self {
        self.range = range;
        self
    }

    pub fn matches_base(&self, env: &Environment<'_>) -> bool {
        let p = env.primitive;
        match self.base {
            Base::Any => true,
            Base::Node => p.kind() == PrimitiveType::Node,
            Base::Way => p.kind() == PrimitiveType::Way,
            Base::Relation | Base::Canvas => p.kind() == PrimitiveType::Relation,
            Base::Area => match p.kind() {
                PrimitiveType::Way => p.is_closed() || env.pretend_way_closed,
                PrimitiveType::Relation => p.is_multipolygon(),
                PrimitiveType::Node => false,
            },
            Base::Meta | Base::Setting | Base::Other(_) => false,
        }
    }

    /// Conditions only, ignoring the base. Used for `meta`, `canvas` and
    /// `setting` blocks evaluated against a synthetic primitive.
    pub fn matches_conditions(&self, env: &Environment<'_>, mc: &MultiCascade) -> bool {
        self.conditions.iter().all(|c| c.applies(env, mc))
    }

    pub fn matches(&self, env: &Environment<'_>, mc: &MultiCascade) -> bool {
        self.matches_base(env) && self.matches_conditions(env, mc)
    }
}

impl fmt::Display for GeneralSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.base.name())?;
        for c in &self.conditions {
            write!(f, "{c}")?;
        }
        if self.range != Range::ZERO_TO_INFINITY {
            write!(f, "|s{}", self.range)?;
        }
        if self.subpart != Subpart::Default {
            write!(f, "::{}", self.subpart.id())?;
        }
        Ok(())
    }
}

/// Direction of a chain link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkType {
    /// `left > right`: right is a child (way node, relation member) of left.
    Child,
    /// `left < right`: right is a parent of left.
    Parent,
}

#[derive(Debug, Clone)]
pub struct ChainSelector {
    pub left: Selector,
    pub link: LinkType,
    /// Restrict the link to relation members with this role.
    pub role: Option<String>,
    pub right: GeneralSelector,
}

impl ChainSelector {
    fn matches(&self, env: &mut Environment<'_>, mc: &MultiCascade) -> bool {
        if !self.right.matches(env, mc) {
            return false;
        }
        let role_ok = |role: &str| self.role.as_deref().is_none_or(|r| r == role);
        let data = env.data;
        match self.link {
            LinkType::Child => {
                for (link, parent) in data.parents(env.primitive.id) {
                    if !role_ok(&link.role) {
                        continue;
                    }
                    let mut left_env = env.with_primitive(parent);
                    if self.left.matches(&mut left_env, mc) {
                        env.parent = Some(parent.id);
                        env.index = Some(link.index);
                        return true;
                    }
                }
                false
            }
            LinkType::Parent => {
                for (link, child) in data.children(env.primitive.id) {
                    if !role_ok(&link.role) {
                        continue;
                    }
                    let mut left_env = env.with_primitive(child);
                    if self.left.matches(&mut left_env, mc) {
                        env.child = Some(child.id);
                        env.index = Some(link.index);
                        return true;
                    }
                }
                false
            }
        }
    }
}

/// A selector: either a general selector or a parent/child chain ending in one.
#[derive(Debug, Clone)]
pub enum Selector {
    General(GeneralSelector),
    Chain(Box<ChainSelector>),
}

impl Selector {
    pub fn chain(left: Selector, link: LinkType, role: Option<String>, right: GeneralSelector) -> Self {
        Selector::Chain(Box::new(ChainSelector { left, link, role, right }))
    }

    /// The general selector tested against the leaf entity.
    pub fn rightmost(&self) -> &GeneralSelector {
        match self {
            Selector::General(g) => g,
            Selector::Chain(c) => &c.right,
        }
    }

    pub fn range(&self) -> Range {
        self.rightmost().range
    }

    pub fn subpart(&self) -> &Subpart {
        &self.rightmost().subpart
    }

    /// Full match. As a side effect chain selectors bind `env.parent` /
    /// `env.child`.
    pub fn matches(&self, env: &mut Environment<'_>, mc: &MultiCascade) -> bool {
        match self {
            Selector::General(g) => g.matches(env, mc),
            Selector::Chain(c) => c.matches(env, mc),
        }
    }
}

impl From<GeneralSelector> for Selector {
    fn from(g: GeneralSelector) -> Self {
        Selector::General(g)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::General(g) => write!(f, "{g}"),
            Selector::Chain(c) => {
                let op = match c.link {
                    LinkType::Child => ">",
                    LinkType::Parent => "<",
                };
                match &c.role {
                    Some(role) => write!(f, "{} {}[role={}] {}", c.left, op, role, c.right),
                    None => write!(f, "{} {} {}", c.left, op, c.right),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::osm::{DataSet, Member, Primitive, PrimitiveId, Tags};
    use std::collections::BTreeMap;

    fn check(selector: &Selector, p: &Primitive, data: &DataSet) -> bool {
        let settings = BTreeMap::new();
        let mut env = Environment::new(p, data, &settings, false);
        selector.matches(&mut env, &MultiCascade::new())
    }

    #[test]
    fn required_key_skips_negations_and_regexes() {
        assert_eq!(Condition::key("name").required_key(), Some("name"));
        assert_eq!(Condition::not_key("name").required_key(), None);
        assert_eq!(Condition::key_regex("^addr:", false).unwrap().required_key(), None);
        assert_eq!(Condition::key_value("width", "2", Op::Greater).unwrap().required_key(), Some("width"));
        assert_eq!(Condition::key_value("access", "no", Op::Neq).unwrap().required_key(), None);
        assert_eq!(Condition::key_value("name", "^A", Op::NRegex).unwrap().required_key(), None);
        assert_eq!(Condition::pseudo(PseudoClass::Closed).required_key(), None);
    }

    #[test]
    fn only_plain_equality_is_indexable() {
        assert_eq!(Condition::eq("highway", "primary").index_key_value(), Some(("highway", "primary")));
        assert!(matches!(
            Condition::key_value("highway", "primary", Op::Eq).unwrap(),
            Condition::SimpleKeyValue { .. }
        ));
        assert!(Condition::key_value("highway", "primary", Op::Neq).unwrap().index_key_value().is_none());
    }

    #[test]
    fn key_value_ops() {
        let p = Primitive::node(1, tags! { "width" => "3.5", "name" => "Avenue A", "sport" => "soccer;tennis" });
        let data = DataSet::new();
        let sel = |c: Condition| Selector::from(GeneralSelector::new("node", vec![c]));

        assert!(check(&sel(Condition::key_value("width", "3", Op::Greater).unwrap()), &p, &data));
        assert!(!check(&sel(Condition::key_value("width", "3.5", Op::Less).unwrap()), &p, &data));
        assert!(check(&sel(Condition::key_value("name", "^Ave", Op::Regex).unwrap()), &p, &data));
        assert!(check(&sel(Condition::key_value("missing", "x", Op::NRegex).unwrap()), &p, &data));
        assert!(check(&sel(Condition::key_value("sport", "tennis", Op::OneOf).unwrap()), &p, &data));
        assert!(check(&sel(Condition::key_value("name", " A", Op::EndsWith).unwrap()), &p, &data));
        assert!(check(&sel(Condition::key_value("name", "nue", Op::Contains).unwrap()), &p, &data));
        assert!(!check(&sel(Condition::key_value("name", "x", Op::Greater).unwrap()), &p, &data));
    }

    #[test]
    fn invalid_regex_is_reported() {
        let err = Condition::key_value("name", "(", Op::Regex).unwrap_err();
        assert!(matches!(err, StyleError::InvalidRegex { .. }));
    }

    #[test]
    fn area_base_honours_closed_hint() {
        let open = Primitive::way(1, Tags::default(), vec![1, 2, 3]);
        let data = DataSet::new();
        let settings = BTreeMap::new();
        let area = GeneralSelector::new("area", Vec::new());

        let env = Environment::new(&open, &data, &settings, false);
        assert!(!area.matches_base(&env));
        let env = Environment::new(&open, &data, &settings, true);
        assert!(area.matches_base(&env));
    }

    #[test]
    fn child_chain_binds_parent() {
        let mut data = DataSet::new();
        data.insert(Primitive::node(1, tags! { "highway" => "crossing" }));
        data.insert(Primitive::way(10, tags! { "highway" => "primary" }, vec![1, 2]));
        data.insert(Primitive::relation(
            20,
            tags! { "type" => "route" },
            vec![Member { role: "forward".into(), id: PrimitiveId::way(10) }],
        ));

        let node = data.get(PrimitiveId::node(1)).unwrap().clone();
        let selector = Selector::chain(
            GeneralSelector::new("way", vec![Condition::eq("highway", "primary")]).into(),
            LinkType::Child,
            None,
            GeneralSelector::new("node", vec![Condition::key("highway")]),
        );
        let settings = BTreeMap::new();
        let mut env = Environment::new(&node, &data, &settings, false);
        assert!(selector.matches(&mut env, &MultiCascade::new()));
        assert_eq!(env.parent, Some(PrimitiveId::way(10)));
        assert_eq!(env.index, Some(0));

        let way = data.get(PrimitiveId::way(10)).unwrap().clone();
        let by_role = |role: &str| {
            Selector::chain(
                GeneralSelector::new("relation", vec![Condition::eq("type", "route")]).into(),
                LinkType::Child,
                Some(role.to_string()),
                GeneralSelector::new("way", Vec::new()),
            )
        };
        assert!(check(&by_role("forward"), &way, &data));
        assert!(!check(&by_role("backward"), &way, &data));
    }

    #[test]
    fn parent_chain_binds_child() {
        let mut data = DataSet::new();
        data.insert(Primitive::node(1, tags! { "barrier" => "gate" }));
        data.insert(Primitive::way(10, tags! { "highway" => "track" }, vec![1, 2]));
        let way = data.get(PrimitiveId::way(10)).unwrap().clone();

        let selector = Selector::chain(
            GeneralSelector::new("node", vec![Condition::key("barrier")]).into(),
            LinkType::Parent,
            None,
            GeneralSelector::new("way", Vec::new()),
        );
        let settings = BTreeMap::new();
        let mut env = Environment::new(&way, &data, &settings, false);
        assert!(selector.matches(&mut env, &MultiCascade::new()));
        assert_eq!(env.child, Some(PrimitiveId::node(1)));
    }

    #[test]
    fn display_round_trips_common_forms() {
        let g = GeneralSelector::new(
            "way",
            vec![Condition::eq("highway", "primary"), Condition::not_key("oneway"), Condition::pseudo(PseudoClass::Closed)],
        )
        .with_subpart(Subpart::named("casing"));
        assert_eq!(g.to_string(), "way[highway=primary][!oneway]:closed::casing");
    }
}
