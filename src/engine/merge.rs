//! Ordered merge of candidate streams.
//!
//! Every bucket of a [`RuleIndex`](super::RuleIndex) is sorted at build time,
//! so the candidates for one primitive are the union of a handful of sorted
//! streams. Rather than concatenating and re-sorting, the streams are merged
//! lazily through a min-heap holding the current head of each stream:
//!
//! ```text
//! remaining        [r0 r7 r9]
//! kv[highway=bus]  [r3 r8]        heap(heads) --pop r0--> push r7
//! key[name]        [r5]                       --pop r3--> push r8 ...
//! ```
//!
//! Cost is O(n log k) for n candidates spread over k streams, and k is at
//! most one more than twice the primitive's tag count. A single stream is
//! returned as-is.

use super::rule_index::{IndexedRule, RuleId};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::iter::FusedIterator;
use std::slice;

/// Candidate rule ids for one primitive, in ascending rule order.
///
/// The same rule may appear more than once when it is reachable from several
/// streams; the cascade driver deduplicates by declaration index.
#[derive(Debug, Clone)]
pub struct Candidates<'a> {
    inner: Inner<'a>,
}

#[derive(Debug, Clone)]
enum Inner<'a> {
    Single(slice::Iter<'a, IndexedRule>),
    Merged(MergedRules<'a>),
}

impl<'a> Candidates<'a> {
    /// Combine already-sorted streams. Empty streams are dropped up front.
    pub(crate) fn new(mut streams: Vec<&'a [IndexedRule]>) -> Self {
        streams.retain(|s| !s.is_empty());
        let inner = match streams.len() {
            0 => Inner::Single(slice::Iter::default()),
            1 => Inner::Single(streams[0].iter()),
            _ => Inner::Merged(MergedRules::new(streams)),
        };
        Candidates { inner }
    }

    pub(crate) fn is_merged(&self) -> bool {
        matches!(self.inner, Inner::Merged(_))
    }
}

impl Iterator for Candidates<'_> {
    type Item = RuleId;

    fn next(&mut self) -> Option<RuleId> {
        match &mut self.inner {
            Inner::Single(it) => it.next().map(|r| r.id),
            Inner::Merged(m) => m.next().map(|r| r.id),
        }
    }
}

impl FusedIterator for Candidates<'_> {}

/// k-way merge over sorted slices.
#[derive(Debug, Clone)]
struct MergedRules<'a> {
    streams: Vec<slice::Iter<'a, IndexedRule>>,
    /// Head of every non-exhausted stream, tagged with its stream number.
    heap: BinaryHeap<Reverse<(IndexedRule, usize)>>,
}

impl<'a> MergedRules<'a> {
    fn new(streams: Vec<&'a [IndexedRule]>) -> Self {
        let mut streams: Vec<_> = streams.into_iter().map(|s| s.iter()).collect();
        let mut heap = BinaryHeap::with_capacity(streams.len());
        for (i, it) in streams.iter_mut().enumerate() {
            if let Some(&head) = it.next() {
                heap.push(Reverse((head, i)));
            }
        }
        MergedRules { streams, heap }
    }
}

impl Iterator for MergedRules<'_> {
    type Item = IndexedRule;

    fn next(&mut self) -> Option<IndexedRule> {
        let Reverse((head, stream)) = self.heap.pop()?;
        if let Some(&next) = self.streams[stream].next() {
            self.heap.push(Reverse((next, stream)));
        }
        Some(head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::RuleOrder;

    fn entry(declaration: u32) -> IndexedRule {
        IndexedRule { order: RuleOrder { declaration, seq: declaration }, id: declaration as usize }
    }

    fn stream(decls: &[u32]) -> Vec<IndexedRule> {
        decls.iter().copied().map(entry).collect()
    }

    #[test]
    fn single_stream_is_passed_through() {
        let a = stream(&[1, 4, 6]);
        let empty = stream(&[]);
        let c = Candidates::new(vec![&a[..], &empty[..]]);
        assert!(!c.is_merged());
        assert_eq!(c.collect::<Vec<_>>(), vec![1, 4, 6]);
    }

    #[test]
    fn no_streams_yield_nothing() {
        assert_eq!(Candidates::new(Vec::new()).count(), 0);
    }

    #[test]
    fn merge_is_non_decreasing_and_complete() {
        let a = stream(&[0, 5, 9, 12]);
        let b = stream(&[1, 2, 3]);
        let c = stream(&[4, 9, 20]);
        let d = stream(&[7]);
        let merged: Vec<_> = Candidates::new(vec![&a[..], &b[..], &c[..], &d[..]]).collect();
        assert_eq!(merged, vec![0, 1, 2, 3, 4, 5, 7, 9, 9, 12, 20]);
    }

    #[test]
    fn merged_output_is_independent_of_stream_order() {
        let a = stream(&[2, 8]);
        let b = stream(&[0, 3, 11]);
        let c = stream(&[5]);
        let one: Vec<_> = Candidates::new(vec![&a[..], &b[..], &c[..]]).collect();
        let two: Vec<_> = Candidates::new(vec![&c[..], &a[..], &b[..]]).collect();
        assert_eq!(one, two);
        assert!(one.windows(2).all(|w| w[0] <= w[1]));
    }
}
