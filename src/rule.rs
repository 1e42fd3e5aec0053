//! Rules and their canonical order.
//!
//! One `Rule` exists per selector; a comma-separated selector group yields
//! several rules sharing one `Arc<Declaration>`.
//!
//! ## Order
//!
//! Every place that sorts or compares rules goes through [`RuleOrder`]:
//! bucket sorting when an index is built and head comparison while merging
//! candidate streams. The key is `(declaration index, selector position)`.
//! Declaration index is major, so all selectors of a group are adjacent in
//! the order; that is what lets the cascade driver skip repeated executions
//! by remembering only the last declaration index it ran.

use crate::cascade::Declaration;
use crate::selector::Selector;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Sort key shared by index build and candidate merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleOrder {
    pub declaration: u32,
    pub seq: u32,
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub selector: Selector,
    pub declaration: Arc<Declaration>,
    /// Position of this selector in the stylesheet.
    pub seq: u32,
}

impl Rule {
    pub fn new(selector: impl Into<Selector>, declaration: Arc<Declaration>, seq: u32) -> Self {
        Rule { selector: selector.into(), declaration, seq }
    }

    pub fn order(&self) -> RuleOrder {
        RuleOrder { declaration: self.declaration.idx, seq: self.seq }
    }
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.order() == other.order()
    }
}

impl Eq for Rule {}

impl PartialOrd for Rule {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rule {
    fn cmp(&self, other: &Self) -> Ordering {
        self.order().cmp(&other.order())
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {} {{decl {}}}", self.seq, self.selector, self.declaration.idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::GeneralSelector;

    #[test]
    fn declaration_index_dominates_position() {
        let d0 = Arc::new(Declaration::new(0, Vec::new()));
        let d1 = Arc::new(Declaration::new(1, Vec::new()));
        let a = Rule::new(GeneralSelector::new("node", Vec::new()), d1, 0);
        let b = Rule::new(GeneralSelector::new("way", Vec::new()), d0.clone(), 1);
        let c = Rule::new(GeneralSelector::new("area", Vec::new()), d0, 2);

        let mut rules = vec![a, c, b];
        rules.sort();
        let seqs: Vec<u32> = rules.iter().map(|r| r.seq).collect();
        assert_eq!(seqs, vec![1, 2, 0]);
    }
}
