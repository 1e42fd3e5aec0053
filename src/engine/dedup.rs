//! Declaration deduplication.
//!
//! A comma-separated selector group produces several rules that share one
//! declaration block. When more than one of them matches the same primitive,
//! the block must still run only once.
//!
//! Candidates arrive in ascending [`RuleOrder`](crate::rule::RuleOrder), whose
//! major key is the declaration index, so all rules of a group are adjacent.
//! Remembering the last executed index is therefore enough; no set is needed.

/// Tracks the declaration most recently executed for one primitive.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct LastDeclaration {
    last: Option<u32>,
}

impl LastDeclaration {
    /// Record `idx` and return `true` if it differs from the previous one.
    pub(crate) fn first_use(&mut self, idx: u32) -> bool {
        if self.last == Some(idx) {
            return false;
        }
        self.last = Some(idx);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeats_are_rejected_until_index_changes() {
        let mut d = LastDeclaration::default();
        assert!(d.first_use(0));
        assert!(!d.first_use(0));
        assert!(d.first_use(2));
        assert!(!d.first_use(2));
        assert!(d.first_use(0));
    }
}
