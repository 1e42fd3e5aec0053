//! Declarations and the cascade they write into.
//!
//! A `MultiCascade` is the output sink of one style evaluation: one `Cascade`
//! (property map) per sub-layer, plus the scale range over which the result
//! stays valid. Declarations are executed in rule order and later writes to
//! the same property overwrite earlier ones, so traversal order *is* the
//! cascade priority.

use crate::range::Range;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

/// Name of the implicit sub-layer.
pub const DEFAULT_LAYER: &str = "default";
/// Sub-layer that applies to every other sub-layer.
pub const WILDCARD_LAYER: &str = "*";

/// A resolved property value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<Value>),
}

impl Value {
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Text(s) => !s.is_empty() && !crate::osm::is_false_value(s),
            Value::List(items) => !items.is_empty(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("none"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(s) => f.write_str(s),
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Resolved properties of one sub-layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cascade {
    props: BTreeMap<String, Value>,
}

impl Cascade {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.props.get(key)
    }

    pub fn get_text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_text)
    }

    pub fn get_number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_number)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).map(Value::is_truthy)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.props.contains_key(key)
    }

    /// Set `key`, or remove it when `value` is `Null`.
    pub fn put(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if value == Value::Null {
            self.props.remove(&key);
        } else {
            self.props.insert(key, value);
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.props.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.props.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.props.len()
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }
}

/// Per-sub-layer cascades for one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiCascade {
    layers: BTreeMap<String, Cascade>,
    /// Scale window over which the current content is valid.
    pub range: Range,
}

impl Default for MultiCascade {
    fn default() -> Self {
        MultiCascade { layers: BTreeMap::new(), range: Range::ZERO_TO_INFINITY }
    }
}

impl MultiCascade {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, layer: &str) -> Option<&Cascade> {
        self.layers.get(layer)
    }

    /// Fetch `layer`, creating it if needed. A new non-wildcard layer starts
    /// as a copy of the `*` layer so earlier wildcard declarations carry over.
    pub fn get_or_create(&mut self, layer: &str) -> &mut Cascade {
        if !self.layers.contains_key(layer) {
            let seed = if layer == WILDCARD_LAYER {
                Cascade::default()
            } else {
                self.layers.get(WILDCARD_LAYER).cloned().unwrap_or_default()
            };
            self.layers.insert(layer.to_string(), seed);
        }
        self.layers.entry(layer.to_string()).or_default()
    }

    pub fn layers(&self) -> impl Iterator<Item = (&str, &Cascade)> {
        self.layers.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn layer_names(&self) -> Vec<String> {
        self.layers.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

/// One step of a declaration block.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// `key: value;` Assigning `Value::Null` clears the property.
    Assign { key: String, value: Value },
    /// `set .class;` marks the sub-layer with a class usable by later conditions.
    SetClass(String),
}

impl Instruction {
    pub fn assign(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Instruction::Assign { key: key.into(), value: value.into() }
    }
}

/// A declaration block, shared by every selector of a comma-separated group.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    /// Creation index; strictly increasing in stylesheet order.
    pub idx: u32,
    pub instructions: Vec<Instruction>,
}

impl Declaration {
    pub fn new(idx: u32, instructions: Vec<Instruction>) -> Self {
        Declaration { idx, instructions }
    }

    /// Run every instruction against `layer` of `mc`.
    pub fn execute(&self, mc: &mut MultiCascade, layer: &str) {
        let cascade = mc.get_or_create(layer);
        for instruction in &self.instructions {
            match instruction {
                Instruction::Assign { key, value } => cascade.put(key.clone(), value.clone()),
                Instruction::SetClass(class) => cascade.put(class.clone(), Value::Bool(true)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_assignment_wins_and_null_clears() {
        let mut mc = MultiCascade::new();
        Declaration::new(0, vec![Instruction::assign("color", "red"), Instruction::assign("width", 2.0)])
            .execute(&mut mc, DEFAULT_LAYER);
        Declaration::new(1, vec![Instruction::assign("color", "blue"), Instruction::assign("width", Value::Null)])
            .execute(&mut mc, DEFAULT_LAYER);

        let c = mc.get(DEFAULT_LAYER).unwrap();
        assert_eq!(c.get_text("color"), Some("blue"));
        assert!(!c.contains("width"));
    }

    #[test]
    fn new_layers_inherit_wildcard() {
        let mut mc = MultiCascade::new();
        Declaration::new(0, vec![Instruction::assign("z-index", 3.0)]).execute(&mut mc, WILDCARD_LAYER);
        Declaration::new(1, vec![Instruction::assign("color", "red")]).execute(&mut mc, "casing");

        let casing = mc.get("casing").unwrap();
        assert_eq!(casing.get_number("z-index"), Some(3.0));
        assert_eq!(casing.get_text("color"), Some("red"));
        assert!(!mc.get(WILDCARD_LAYER).unwrap().contains("color"));
    }

    #[test]
    fn set_class_is_truthy() {
        let mut mc = MultiCascade::new();
        Declaration::new(0, vec![Instruction::SetClass("major".into())]).execute(&mut mc, DEFAULT_LAYER);
        assert_eq!(mc.get(DEFAULT_LAYER).unwrap().get_bool("major"), Some(true));
    }

    #[test]
    fn value_display_and_truthiness() {
        assert_eq!(Value::List(vec![Value::from(1.0), Value::from(2.5)]).to_string(), "1,2.5");
        assert!(!Value::from("no").is_truthy());
        assert!(Value::from("casing").is_truthy());
        assert_eq!(Value::from(" 4 ").as_number(), Some(4.0));
    }
}
