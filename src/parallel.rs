//! Chromosome-sharded parallel processing using Rayon.
//!
//! Interval trees are not internally synchronized, so parallel work always
//! gives each worker a disjoint set of chromosome keys and merges the
//! per-chromosome results afterwards.

use crate::error::Result;
use crate::genome_tree::GenomeRangeTree;
use crate::interval::Interval;
use crate::range_tree::IntervalTree;
use rayon::prelude::*;
use rustc_hash::FxHashMap;

/// Minimum number of intervals before enabling parallelization.
/// Below this threshold, sequential processing is faster due to
/// thread spawn overhead.
pub const PARALLEL_THRESHOLD: usize = 10_000;

/// Group intervals by chromosome for parallel processing.
pub fn group_by_chromosome(intervals: Vec<Interval>) -> FxHashMap<String, Vec<Interval>> {
    let mut groups: FxHashMap<String, Vec<Interval>> = FxHashMap::default();

    for interval in intervals {
        groups
            .entry(interval.chrom.clone())
            .or_default()
            .push(interval);
    }

    groups
}

/// Build a [`GenomeRangeTree`] with one Rayon task per chromosome.
pub fn build_genome_tree(intervals: Vec<Interval>) -> Result<GenomeRangeTree> {
    if intervals.len() < PARALLEL_THRESHOLD {
        return GenomeRangeTree::from_intervals(&intervals);
    }

    let groups = group_by_chromosome(intervals);
    let trees = groups
        .into_par_iter()
        .map(|(chrom, intervals)| {
            let mut tree = IntervalTree::new();
            for iv in &intervals {
                tree.add(iv.start, iv.end)?;
            }
            Ok((chrom, tree))
        })
        .collect::<Result<FxHashMap<String, IntervalTree>>>()?;

    Ok(GenomeRangeTree::from_trees(trees))
}

/// Build a valued [`GenomeRangeTree`] with one Rayon task per chromosome,
/// combining values of merged ranges with `merge`.
pub fn build_genome_tree_with<V, F>(
    records: Vec<(Interval, V)>,
    merge: F,
) -> Result<GenomeRangeTree<V>>
where
    V: Send,
    F: Fn(V, V) -> V + Sync + Send,
{
    let mut groups: FxHashMap<String, Vec<(u32, u32, V)>> = FxHashMap::default();
    for (iv, value) in records {
        groups.entry(iv.chrom).or_default().push((iv.start, iv.end, value));
    }

    let trees = groups
        .into_par_iter()
        .map(|(chrom, ranges)| {
            let mut tree = IntervalTree::new();
            for (start, end, value) in ranges {
                tree.add_with(start, end, value, &merge)?;
            }
            Ok((chrom, tree))
        })
        .collect::<Result<FxHashMap<String, IntervalTree<V>>>>()?;

    Ok(GenomeRangeTree::from_trees(trees))
}

/// Sum `f` over every chromosome tree in parallel.
pub(crate) fn par_sum_chromosomes<V, F>(trees: &FxHashMap<String, IntervalTree<V>>, f: F) -> u64
where
    V: Sync,
    F: Fn(&str, &IntervalTree<V>) -> u64 + Sync + Send,
{
    trees
        .par_iter()
        .map(|(chrom, tree)| f(chrom.as_str(), tree))
        .sum()
}

/// Apply `f` to each chromosome tree in parallel, returning results in
/// natural chromosome order.
pub fn map_chromosomes<V, T, F>(tree: &GenomeRangeTree<V>, f: F) -> Vec<(String, T)>
where
    V: Sync,
    T: Send,
    F: Fn(&str, &IntervalTree<V>) -> T + Sync + Send,
{
    let mut results: Vec<(String, T)> = tree
        .trees()
        .par_iter()
        .map(|(chrom, t)| (chrom.clone(), f(chrom.as_str(), t)))
        .collect();
    results.sort_by(|a, b| crate::interval::natural_compare(&a.0, &b.0));
    results
}
