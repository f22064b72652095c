//! Per-sequence interval tree of disjoint ranges.
//!
//! Ranges are kept in a `BTreeMap` keyed by start. Every insertion coalesces
//! the new range with everything it overlaps or abuts, so the stored ranges
//! are always pairwise disjoint and non-adjacent. Because of that, ends (and
//! midpoints) increase with starts, which is what makes the ordered-map
//! searches below correct.

use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// A half-open `[start, end)` range carrying a value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Range<V = ()> {
    pub start: u32,
    pub end: u32,
    pub value: V,
}

impl<V> Range<V> {
    #[inline]
    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Number of bases shared with `[start, end)`.
    #[inline]
    pub fn overlap_len(&self, start: u32, end: u32) -> u32 {
        let s = self.start.max(start);
        let e = self.end.min(end);
        e.saturating_sub(s)
    }

    #[inline]
    pub fn midpoint(&self) -> u32 {
        midpoint(self.start, self.end)
    }
}

#[inline]
pub(crate) fn midpoint(start: u32, end: u32) -> u32 {
    start + (end - start) / 2
}

/// Value merge functions for [`IntervalTree::add_with`].
///
/// Each takes the value already stored and the incoming value.
pub mod merge {
    /// Keep the value that was stored first.
    pub fn keep_first<V>(existing: V, _incoming: V) -> V {
        existing
    }

    /// Replace with the incoming value.
    pub fn keep_last<V>(_existing: V, incoming: V) -> V {
        incoming
    }

    /// Add the values, e.g. to count how many inputs a range absorbed.
    pub fn sum<V: std::ops::Add<Output = V>>(existing: V, incoming: V) -> V {
        existing + incoming
    }

    /// Concatenate list values.
    pub fn concat<T>(mut existing: Vec<T>, incoming: Vec<T>) -> Vec<T> {
        existing.extend(incoming);
        existing
    }
}

/// Ordered set of disjoint ranges on one sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalTree<V = ()> {
    ranges: BTreeMap<u32, Range<V>>,
}

impl<V> Default for IntervalTree<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl IntervalTree<()> {
    /// Insert `[start, end)` with no attached value.
    pub fn add(&mut self, start: u32, end: u32) -> Result<&Range<()>> {
        self.add_with(start, end, (), merge::keep_first)
    }
}

impl<V> IntervalTree<V> {
    /// Create a new empty tree.
    pub fn new() -> Self {
        Self {
            ranges: BTreeMap::new(),
        }
    }

    /// Insert `[start, end)` carrying `value`, keeping the stored value when
    /// the new range merges with existing ones.
    pub fn add_value(&mut self, start: u32, end: u32, value: V) -> Result<&Range<V>> {
        self.add_with(start, end, value, merge::keep_first)
    }

    /// Insert `[start, end)`, merging with every stored range it overlaps or
    /// abuts. Values of merged ranges are folded left-to-right (ascending
    /// start, with the incoming value folded last) through `merge`.
    pub fn add_with<F>(&mut self, start: u32, end: u32, value: V, mut merge: F) -> Result<&Range<V>>
    where
        F: FnMut(V, V) -> V,
    {
        if start > end {
            return Err(Error::InvalidRange { start, end });
        }

        // Walk left from the last range starting at or before `end`; ends are
        // increasing, so stop at the first one that ends before `start`.
        let touching: Vec<u32> = self
            .ranges
            .range(..=end)
            .rev()
            .take_while(|(_, r)| r.end >= start)
            .map(|(&key, _)| key)
            .collect();

        let mut new_start = start;
        let mut new_end = end;
        let mut merged: Option<V> = None;

        // `touching` is in descending order
        for key in touching.into_iter().rev() {
            if let Some(old) = self.ranges.remove(&key) {
                new_start = new_start.min(old.start);
                new_end = new_end.max(old.end);
                merged = Some(match merged {
                    Some(acc) => merge(acc, old.value),
                    None => old.value,
                });
            }
        }

        let value = match merged {
            Some(acc) => merge(acc, value),
            None => value,
        };

        let slot = self.ranges.entry(new_start).or_insert(Range {
            start: new_start,
            end: new_end,
            value,
        });
        Ok(&*slot)
    }

    /// Number of stored ranges.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Iterate stored ranges in ascending start order.
    pub fn ranges(&self) -> impl DoubleEndedIterator<Item = &Range<V>> + '_ {
        self.ranges.values()
    }

    /// Consume the tree, yielding ranges in ascending start order.
    pub fn into_ranges(self) -> impl Iterator<Item = Range<V>> {
        self.ranges.into_values()
    }

    /// Iterate ranges overlapping `[start, end)` in ascending start order.
    pub fn overlapping(&self, start: u32, end: u32) -> impl Iterator<Item = &Range<V>> + '_ {
        // The last range starting at or before `start` may reach into the query.
        let first = self
            .ranges
            .range(..=start)
            .next_back()
            .filter(|(_, r)| r.end > start)
            .map(|(&key, _)| key)
            .unwrap_or(start);

        // An empty query covers no bases and overlaps nothing.
        let upper = if start < end { end.max(first) } else { first };
        self.ranges
            .range(first..upper)
            .map(|(_, r)| r)
            .filter(move |r| r.start < end && r.end > start)
    }

    /// True if any stored range shares at least one base with `[start, end)`.
    pub fn overlaps(&self, start: u32, end: u32) -> bool {
        self.overlapping(start, end).next().is_some()
    }

    /// Total bases of `[start, end)` covered by stored ranges.
    pub fn overlap_size(&self, start: u32, end: u32) -> u32 {
        self.overlapping(start, end)
            .map(|r| r.overlap_len(start, end))
            .sum()
    }

    /// All ranges overlapping `[start, end)`, in ascending start order.
    pub fn all_overlapping(&self, start: u32, end: u32) -> Vec<&Range<V>> {
        self.overlapping(start, end).collect()
    }

    /// The stored range that contains all of `[start, end)`, if any.
    pub fn find_enclosing(&self, start: u32, end: u32) -> Option<&Range<V>> {
        self.ranges
            .range(..=start)
            .next_back()
            .map(|(_, r)| r)
            .filter(|r| r.start <= start && r.end >= end)
    }

    /// The overlapping range with the largest intersection.
    ///
    /// Ties are not ordered by any meaningful criterion; this returns the
    /// first one encountered in ascending start order.
    pub fn max_overlapping(&self, start: u32, end: u32) -> Option<&Range<V>> {
        let mut best: Option<(&Range<V>, u32)> = None;
        for r in self.overlapping(start, end) {
            let size = r.overlap_len(start, end);
            match best {
                Some((_, best_size)) if best_size >= size => {}
                _ => best = Some((r, size)),
            }
        }
        best.map(|(r, _)| r)
    }

    /// The range whose midpoint is nearest the midpoint of `[start, end)`.
    /// On equal distance the range with the lower start wins.
    pub fn closest_to(&self, start: u32, end: u32) -> Option<&Range<V>> {
        let query_mid = midpoint(start, end.max(start));

        // Midpoints are monotonic in start order, and only the last range
        // starting at or before the query midpoint can have its midpoint past
        // it, so the answer is one of these three neighbours.
        let mut candidates: Vec<&Range<V>> = self
            .ranges
            .range(..=query_mid)
            .rev()
            .take(2)
            .map(|(_, r)| r)
            .collect();
        candidates.reverse();
        if let Some((_, r)) = self.ranges.range(query_mid.saturating_add(1)..).next() {
            candidates.push(r);
        }

        let mut best: Option<(&Range<V>, u32)> = None;
        for r in candidates {
            let distance = r.midpoint().abs_diff(query_mid);
            match best {
                Some((_, best_distance)) if best_distance <= distance => {}
                _ => best = Some((r, distance)),
            }
        }
        best.map(|(r, _)| r)
    }

    /// Copy of every stored range in ascending start order.
    pub fn to_sorted_list(&self) -> Vec<Range<V>>
    where
        V: Clone,
    {
        self.ranges.values().cloned().collect()
    }

    /// Sum of the lengths of all stored ranges.
    pub fn total_covered_length(&self) -> u64 {
        self.ranges.values().map(|r| r.len() as u64).sum()
    }
}
