//! Genome-wide collection of interval trees, one per sequence name.

use crate::bed::BedReader;
use crate::error::Result;
use crate::interval::{natural_compare, Interval};
use crate::parallel::{par_sum_chromosomes, PARALLEL_THRESHOLD};
use crate::range_tree::{merge, midpoint, IntervalTree, Range};
use rustc_hash::FxHashMap;
use std::path::Path;

/// Mapping from chromosome/scaffold name to its [`IntervalTree`].
///
/// Trees are created on the first insert into a name. Iteration through
/// [`GenomeRangeTree::chromosomes`] is in natural name order so output built
/// from it is deterministic.
#[derive(Debug, Clone)]
pub struct GenomeRangeTree<V = ()> {
    trees: FxHashMap<String, IntervalTree<V>>,
}

impl<V> Default for GenomeRangeTree<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl GenomeRangeTree<()> {
    /// Insert `chrom:[start, end)` with no value.
    pub fn add(&mut self, chrom: &str, start: u32, end: u32) -> Result<&Range<()>> {
        self.find_or_create(chrom).add(start, end)
    }

    /// Build a tree from BED intervals.
    pub fn from_intervals<'a, I>(intervals: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Interval>,
    {
        let mut tree = Self::new();
        for iv in intervals {
            tree.add(&iv.chrom, iv.start, iv.end)?;
        }
        Ok(tree)
    }

    /// Build a tree from the first three columns of a BED file.
    pub fn from_bed_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut tree = Self::new();
        for iv in BedReader::from_path(path)?.intervals() {
            let iv = iv?;
            tree.add(&iv.chrom, iv.start, iv.end)?;
        }
        Ok(tree)
    }
}

impl<V> GenomeRangeTree<V> {
    /// Create an empty genome range tree.
    pub fn new() -> Self {
        Self {
            trees: FxHashMap::default(),
        }
    }

    pub(crate) fn from_trees(trees: FxHashMap<String, IntervalTree<V>>) -> Self {
        Self { trees }
    }

    /// Insert `chrom:[start, end)` with `value`, combining values of merged
    /// ranges with `merge`.
    pub fn add_with<F>(
        &mut self,
        chrom: &str,
        start: u32,
        end: u32,
        value: V,
        merge: F,
    ) -> Result<&Range<V>>
    where
        F: FnMut(V, V) -> V,
    {
        self.find_or_create(chrom).add_with(start, end, value, merge)
    }

    /// Insert `chrom:[start, end)` with `value`, keeping the first value on merge.
    pub fn add_value(&mut self, chrom: &str, start: u32, end: u32, value: V) -> Result<&Range<V>> {
        self.add_with(chrom, start, end, value, merge::keep_first)
    }

    /// The tree for `chrom`, if anything was ever added to it.
    pub fn find(&self, chrom: &str) -> Option<&IntervalTree<V>> {
        self.trees.get(chrom)
    }

    /// The tree for `chrom`, created empty if missing.
    pub fn find_or_create(&mut self, chrom: &str) -> &mut IntervalTree<V> {
        self.trees.entry(chrom.to_string()).or_default()
    }

    pub fn overlaps(&self, chrom: &str, start: u32, end: u32) -> bool {
        self.find(chrom).is_some_and(|t| t.overlaps(start, end))
    }

    pub fn overlap_size(&self, chrom: &str, start: u32, end: u32) -> u32 {
        self.find(chrom).map_or(0, |t| t.overlap_size(start, end))
    }

    pub fn all_overlapping(&self, chrom: &str, start: u32, end: u32) -> Vec<&Range<V>> {
        self.find(chrom)
            .map(|t| t.all_overlapping(start, end))
            .unwrap_or_default()
    }

    pub fn find_enclosing(&self, chrom: &str, start: u32, end: u32) -> Option<&Range<V>> {
        self.find(chrom)?.find_enclosing(start, end)
    }

    pub fn max_overlapping(&self, chrom: &str, start: u32, end: u32) -> Option<&Range<V>> {
        self.find(chrom)?.max_overlapping(start, end)
    }

    /// Closest range by midpoint, with the signed distance between midpoints.
    /// The distance is negative when the query lies upstream (left) of the range.
    pub fn closest_to(&self, chrom: &str, start: u32, end: u32) -> Option<(&Range<V>, i64)> {
        let range = self.find(chrom)?.closest_to(start, end)?;
        let query_mid = midpoint(start, end.max(start)) as i64;
        Some((range, query_mid - range.midpoint() as i64))
    }

    /// Sequence names in natural order.
    pub fn chromosomes(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.trees.keys().map(String::as_str).collect();
        names.sort_by(|a, b| natural_compare(a, b));
        names
    }

    /// `(name, tree)` pairs in natural name order.
    pub fn iter_sorted(&self) -> impl Iterator<Item = (&str, &IntervalTree<V>)> + '_ {
        self.chromosomes()
            .into_iter()
            .filter_map(move |name| self.trees.get_key_value(name))
            .map(|(name, tree)| (name.as_str(), tree))
    }

    /// Number of sequences with a tree.
    pub fn num_chromosomes(&self) -> usize {
        self.trees.len()
    }

    /// Number of stored ranges over all sequences.
    pub fn num_ranges(&self) -> usize {
        self.trees.values().map(IntervalTree::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.values().all(IntervalTree::is_empty)
    }

    pub(crate) fn trees(&self) -> &FxHashMap<String, IntervalTree<V>> {
        &self.trees
    }

    /// Sum of covered bases over all sequences.
    pub fn total_covered_length(&self) -> u64
    where
        V: Sync,
    {
        if self.num_ranges() >= PARALLEL_THRESHOLD {
            par_sum_chromosomes(&self.trees, |_, tree| tree.total_covered_length())
        } else {
            self.trees
                .values()
                .map(IntervalTree::total_covered_length)
                .sum()
        }
    }

    /// Bases covered by both `self` and `other`.
    ///
    /// Walks the ranges of whichever side has fewer and queries the other
    /// side, so the result does not depend on argument order.
    pub fn intersection_size<U>(&self, other: &GenomeRangeTree<U>) -> u64
    where
        V: Sync,
        U: Sync,
    {
        if other.num_ranges() < self.num_ranges() {
            return other.intersection_size(self);
        }

        let per_chrom = |chrom: &str, tree: &IntervalTree<V>| -> u64 {
            match other.find(chrom) {
                Some(other_tree) => tree
                    .ranges()
                    .map(|r| other_tree.overlap_size(r.start, r.end) as u64)
                    .sum(),
                None => 0,
            }
        };

        if self.num_ranges() >= PARALLEL_THRESHOLD {
            par_sum_chromosomes(&self.trees, per_chrom)
        } else {
            self.trees
                .iter()
                .map(|(chrom, tree)| per_chrom(chrom.as_str(), tree))
                .sum()
        }
    }

    /// Add every range of `other` into `self`.
    pub fn union_with<F>(&mut self, other: GenomeRangeTree<V>, mut merge: F) -> Result<()>
    where
        F: FnMut(V, V) -> V,
    {
        for (chrom, tree) in other.trees {
            let target = self.find_or_create(&chrom);
            for r in tree.into_ranges() {
                target.add_with(r.start, r.end, r.value, &mut merge)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_or_create() {
        let mut g: GenomeRangeTree = GenomeRangeTree::new();
        assert!(g.find("chr1").is_none());
        g.find_or_create("chr1");
        assert!(g.find("chr1").is_some_and(|t| t.is_empty()));
        assert_eq!(g.num_chromosomes(), 1);
    }

    #[test]
    fn test_missing_chrom_is_empty() {
        let mut g: GenomeRangeTree = GenomeRangeTree::new();
        g.add("chr1", 0, 100).unwrap();
        assert!(!g.overlaps("chr2", 0, 100));
        assert_eq!(g.overlap_size("chr2", 0, 100), 0);
        assert!(g.closest_to("chr2", 0, 100).is_none());
        assert!(g.all_overlapping("chr2", 0, 100).is_empty());
    }

    #[test]
    fn test_closest_signed_distance() {
        let mut g: GenomeRangeTree = GenomeRangeTree::new();
        g.add("chr2", 1, 10).unwrap();
        g.add("chr2", 20, 30).unwrap();

        let (r, d) = g.closest_to("chr2", 12, 14).unwrap();
        assert_eq!((r.start, r.end), (1, 10));
        assert_eq!(d, 8);

        let (r, d) = g.closest_to("chr2", 18, 20).unwrap();
        assert_eq!(r.start, 20);
        assert_eq!(d, -6);
    }

    #[test]
    fn test_total_covered_length() {
        let mut g: GenomeRangeTree = GenomeRangeTree::new();
        g.add("chr1", 0, 100).unwrap();
        g.add("chr1", 50, 150).unwrap();
        g.add("chr2", 0, 10).unwrap();
        assert_eq!(g.total_covered_length(), 160);
        assert_eq!(g.num_ranges(), 2);
    }

    #[test]
    fn test_intersection_size() {
        let mut a: GenomeRangeTree = GenomeRangeTree::new();
        a.add("chr1", 0, 10).unwrap();
        a.add("chr1", 20, 30).unwrap();
        a.add("chr3", 0, 1000).unwrap();

        let mut b: GenomeRangeTree = GenomeRangeTree::new();
        b.add("chr1", 5, 25).unwrap();
        b.add("chr2", 0, 1000).unwrap();

        assert_eq!(a.intersection_size(&b), 10);
        assert_eq!(b.intersection_size(&a), 10);
    }

    #[test]
    fn test_chromosomes_natural_order() {
        let mut g: GenomeRangeTree = GenomeRangeTree::new();
        for chrom in ["chr10", "chrX", "chr2", "chr1"] {
            g.add(chrom, 0, 1).unwrap();
        }
        assert_eq!(g.chromosomes(), vec!["chr1", "chr2", "chr10", "chrX"]);
    }

    #[test]
    fn test_union_with_counts() {
        let mut a: GenomeRangeTree<u32> = GenomeRangeTree::new();
        a.add_value("chr1", 0, 10, 1).unwrap();
        let mut b: GenomeRangeTree<u32> = GenomeRangeTree::new();
        b.add_value("chr1", 5, 20, 1).unwrap();
        b.add_value("chr2", 0, 5, 1).unwrap();

        a.union_with(b, merge::sum).unwrap();
        let r = a.find("chr1").unwrap().to_sorted_list();
        assert_eq!(r.len(), 1);
        assert_eq!((r[0].start, r[0].end, r[0].value), (0, 20, 2));
        assert_eq!(a.num_chromosomes(), 2);
    }
}
