//! Transcript-relative positions of genomic coordinates.

use crate::alignment::Psl;
use std::fmt;

/// One side of an intron: the transcript offset of the adjoining exon edge
/// and the genomic distance from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntronSide {
    pub tx_offset: u32,
    pub distance: u32,
}

/// Where a genomic coordinate falls relative to a transcript.
///
/// Upstream and downstream carry the transcript offset of the nearest
/// aligned end and the genomic distance from it. Intron positions carry both
/// sides, in transcript orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxRegion {
    Upstream { tx_offset: u32, distance: u32 },
    Exon { tx_offset: u32 },
    Intron { five_prime: IntronSide, three_prime: IntronSide },
    Downstream { tx_offset: u32, distance: u32 },
}

/// A genomic coordinate projected onto a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxPosition {
    pub region: TxRegion,
    /// The genomic coordinate that was projected.
    pub g_offset: u32,
    /// Alignment block the coordinate fell in (or after, for introns), in
    /// genomic order.
    pub block_index: usize,
}

impl TxPosition {
    pub fn is_exon(&self) -> bool {
        matches!(self.region, TxRegion::Exon { .. })
    }

    /// Transcript offset if the position is exonic.
    pub fn exon_offset(&self) -> Option<u32> {
        match self.region {
            TxRegion::Exon { tx_offset } => Some(tx_offset),
            _ => None,
        }
    }

    /// Transcript offset at which a range starting here begins covering
    /// transcript bases.
    pub fn tx_offset_as_start(&self) -> u32 {
        match self.region {
            TxRegion::Upstream { tx_offset, .. }
            | TxRegion::Exon { tx_offset }
            | TxRegion::Downstream { tx_offset, .. } => tx_offset,
            TxRegion::Intron { three_prime, .. } => three_prime.tx_offset,
        }
    }

    /// Transcript offset at which a range ending here stops covering
    /// transcript bases.
    pub fn tx_offset_as_end(&self) -> u32 {
        match self.region {
            TxRegion::Upstream { tx_offset, .. }
            | TxRegion::Exon { tx_offset }
            | TxRegion::Downstream { tx_offset, .. } => tx_offset,
            TxRegion::Intron { five_prime, .. } => five_prime.tx_offset,
        }
    }

    /// Whether both positions lie in the same upstream, downstream or
    /// intron region.
    pub fn same_non_exon_region(&self, other: &TxPosition) -> bool {
        match (&self.region, &other.region) {
            (TxRegion::Upstream { .. }, TxRegion::Upstream { .. })
            | (TxRegion::Downstream { .. }, TxRegion::Downstream { .. }) => true,
            (TxRegion::Intron { .. }, TxRegion::Intron { .. }) => {
                self.block_index == other.block_index
            }
            _ => false,
        }
    }
}

impl fmt::Display for TxPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.region {
            TxRegion::Upstream { distance, .. } => write!(f, "-{}", distance),
            TxRegion::Exon { tx_offset } => write!(f, "{}", tx_offset),
            TxRegion::Intron {
                five_prime,
                three_prime,
            } => {
                if five_prime.distance <= three_prime.distance {
                    write!(f, "{}+{}", five_prime.tx_offset, five_prime.distance)
                } else {
                    write!(f, "{}-{}", three_prime.tx_offset, three_prime.distance)
                }
            }
            TxRegion::Downstream { tx_offset, distance } => {
                write!(f, "{}+*{}", tx_offset, distance)
            }
        }
    }
}

/// How a coordinate bounds the genomic range it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Coord {
    /// Inclusive start of a non-empty range.
    Start,
    /// Exclusive end of a non-empty range.
    End,
    /// Both ends of an empty range (an insertion point).
    Point,
}

/// A position in alignment orientation: genome ascending, query offsets on
/// the aligned strand. Converted to a [`TxPosition`] exactly once, by
/// [`AlnPoint::into_tx`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AlnRegion {
    Before { q: u32, distance: u32 },
    Block { q: u32 },
    Gap { left: IntronSide, right: IntronSide },
    After { q: u32, distance: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AlnPoint {
    pub region: AlnRegion,
    pub g: u32,
    pub block_index: usize,
}

/// Classify genomic coordinate `g` against `psl`, which must be valid.
///
/// Points inside a gap shorter than an intron are pulled into the adjoining
/// exon: a range start to the end of the block before the gap, a range end
/// to the start of the block after it.
pub(crate) fn classify(psl: &Psl, g: u32, coord: Coord, min_intron: u32) -> AlnPoint {
    let n = psl.block_count();
    let first = psl.t_starts[0];
    let last = psl.t_block_end(n - 1);

    let before = match coord {
        Coord::Start | Coord::Point => g < first,
        Coord::End => g <= first,
    };
    if before {
        let distance = match coord {
            Coord::End => first + 1 - g,
            _ => first - g,
        };
        return AlnPoint {
            region: AlnRegion::Before {
                q: psl.q_starts[0],
                distance,
            },
            g,
            block_index: 0,
        };
    }

    let after = match coord {
        Coord::Start => g >= last,
        Coord::End | Coord::Point => g > last,
    };
    if after {
        let distance = match coord {
            Coord::Start => g - last + 1,
            _ => g - last,
        };
        return AlnPoint {
            region: AlnRegion::After {
                q: psl.q_block_end(n - 1),
                distance,
            },
            g,
            block_index: n - 1,
        };
    }

    for i in 0..n {
        let (bs, be) = (psl.t_starts[i], psl.t_block_end(i));
        let inside = match coord {
            Coord::Start => bs <= g && g < be,
            Coord::End => bs < g && g <= be,
            Coord::Point => bs <= g && g <= be,
        };
        if inside {
            return AlnPoint {
                region: AlnRegion::Block {
                    q: psl.q_starts[i] + (g - bs),
                },
                g,
                block_index: i,
            };
        }
    }

    // Not before, after or in a block, so between blocks i and i + 1.
    let i = (0..n - 1)
        .find(|&i| psl.t_block_end(i) <= g && g <= psl.t_starts[i + 1])
        .unwrap_or(n - 1);
    let (gap_start, gap_end) = (psl.t_block_end(i), psl.t_starts[i + 1]);

    if psl.gap_is_intron(i, min_intron) {
        let (left_distance, right_distance) = match coord {
            Coord::Start => (g - gap_start + 1, gap_end - g),
            Coord::End => (g - gap_start, gap_end - g + 1),
            Coord::Point => (g - gap_start, gap_end - g),
        };
        return AlnPoint {
            region: AlnRegion::Gap {
                left: IntronSide {
                    tx_offset: psl.q_block_end(i),
                    distance: left_distance,
                },
                right: IntronSide {
                    tx_offset: psl.q_starts[i + 1],
                    distance: right_distance,
                },
            },
            g,
            block_index: i,
        };
    }

    let (q, block_index) = match coord {
        Coord::End => (psl.q_starts[i + 1], i + 1),
        Coord::Start | Coord::Point => (psl.q_block_end(i), i),
    };
    AlnPoint {
        region: AlnRegion::Block { q },
        g,
        block_index,
    }
}

impl AlnPoint {
    /// Convert to transcript orientation. On the minus strand query offsets
    /// are flipped, upstream and downstream swap, and the intron sides swap.
    pub(crate) fn into_tx(self, psl: &Psl) -> TxPosition {
        let minus = psl.strand.is_minus();
        let flip = |q: u32| if minus { psl.q_size - q } else { q };

        let region = match (self.region, minus) {
            (AlnRegion::Block { q }, _) => TxRegion::Exon { tx_offset: flip(q) },
            (AlnRegion::Before { q, distance }, false) => TxRegion::Upstream {
                tx_offset: q,
                distance,
            },
            (AlnRegion::Before { q, distance }, true) => TxRegion::Downstream {
                tx_offset: flip(q),
                distance,
            },
            (AlnRegion::After { q, distance }, false) => TxRegion::Downstream {
                tx_offset: q,
                distance,
            },
            (AlnRegion::After { q, distance }, true) => TxRegion::Upstream {
                tx_offset: flip(q),
                distance,
            },
            (AlnRegion::Gap { left, right }, false) => TxRegion::Intron {
                five_prime: left,
                three_prime: right,
            },
            (AlnRegion::Gap { left, right }, true) => TxRegion::Intron {
                five_prime: IntronSide {
                    tx_offset: flip(right.tx_offset),
                    distance: right.distance,
                },
                three_prime: IntronSide {
                    tx_offset: flip(left.tx_offset),
                    distance: left.distance,
                },
            },
        };
        TxPosition {
            region,
            g_offset: self.g,
            block_index: self.block_index,
        }
    }
}

/// Project the genomic range `[g_start, g_end)` onto the transcript, returning
/// `(start, end)` in transcript orientation.
pub(crate) fn project_range(
    psl: &Psl,
    g_start: u32,
    g_end: u32,
    min_intron: u32,
) -> (TxPosition, TxPosition) {
    let (first, last) = if g_start == g_end {
        let p = classify(psl, g_start, Coord::Point, min_intron);
        (p, p)
    } else {
        (
            classify(psl, g_start, Coord::Start, min_intron),
            classify(psl, g_end, Coord::End, min_intron),
        )
    };
    if psl.strand.is_minus() {
        (last.into_tx(psl), first.into_tx(psl))
    } else {
        (first.into_tx(psl), last.into_tx(psl))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MIN_INTRON;
    use crate::interval::Strand;

    fn two_exon(strand: Strand) -> Psl {
        Psl::from_blocks(
            "tx",
            200,
            "chr1",
            1000,
            strand,
            &[(0, 100, 100), (100, 300, 100)],
        )
    }

    fn region(psl: &Psl, g: u32, coord: Coord) -> TxRegion {
        classify(psl, g, coord, MIN_INTRON).into_tx(psl).region
    }

    #[test]
    fn test_block_edges_plus() {
        let psl = two_exon(Strand::Plus);
        assert_eq!(region(&psl, 100, Coord::Start), TxRegion::Exon { tx_offset: 0 });
        assert_eq!(region(&psl, 199, Coord::Start), TxRegion::Exon { tx_offset: 99 });
        assert_eq!(region(&psl, 200, Coord::End), TxRegion::Exon { tx_offset: 100 });
        assert_eq!(region(&psl, 400, Coord::End), TxRegion::Exon { tx_offset: 200 });
        assert_eq!(
            region(&psl, 99, Coord::Start),
            TxRegion::Upstream { tx_offset: 0, distance: 1 }
        );
        assert_eq!(
            region(&psl, 100, Coord::End),
            TxRegion::Upstream { tx_offset: 0, distance: 1 }
        );
        assert_eq!(
            region(&psl, 400, Coord::Start),
            TxRegion::Downstream { tx_offset: 200, distance: 1 }
        );
    }

    #[test]
    fn test_intron_sides_plus() {
        let psl = two_exon(Strand::Plus);
        assert_eq!(
            region(&psl, 200, Coord::Start),
            TxRegion::Intron {
                five_prime: IntronSide { tx_offset: 100, distance: 1 },
                three_prime: IntronSide { tx_offset: 100, distance: 100 },
            }
        );
        assert_eq!(
            region(&psl, 300, Coord::End),
            TxRegion::Intron {
                five_prime: IntronSide { tx_offset: 100, distance: 100 },
                three_prime: IntronSide { tx_offset: 100, distance: 1 },
            }
        );
    }

    #[test]
    fn test_minus_strand_flips() {
        let psl = two_exon(Strand::Minus);
        // Genomic base 100 is the last transcript base.
        assert_eq!(region(&psl, 100, Coord::Start), TxRegion::Exon { tx_offset: 200 });
        assert_eq!(
            region(&psl, 99, Coord::Start),
            TxRegion::Downstream { tx_offset: 200, distance: 1 }
        );
        assert_eq!(
            region(&psl, 210, Coord::Start),
            TxRegion::Intron {
                five_prime: IntronSide { tx_offset: 100, distance: 90 },
                three_prime: IntronSide { tx_offset: 100, distance: 11 },
            }
        );

        let (start, end) = project_range(&psl, 390, 400, MIN_INTRON);
        assert_eq!(start.region, TxRegion::Exon { tx_offset: 0 });
        assert_eq!(end.region, TxRegion::Exon { tx_offset: 10 });
        assert_eq!((start.g_offset, end.g_offset), (400, 390));
    }

    #[test]
    fn test_insertion_at_exon_edge() {
        let psl = two_exon(Strand::Plus);
        let (start, end) = project_range(&psl, 200, 200, MIN_INTRON);
        assert_eq!(start, end);
        assert_eq!(start.region, TxRegion::Exon { tx_offset: 100 });
        assert_eq!(start.block_index, 0);
    }

    #[test]
    fn test_anomalous_gap_snaps() {
        let psl = Psl::from_blocks(
            "tx",
            200,
            "chr1",
            1000,
            Strand::Plus,
            &[(0, 100, 100), (100, 203, 100)],
        );
        let (start, end) = project_range(&psl, 200, 203, MIN_INTRON);
        assert_eq!(start.region, TxRegion::Exon { tx_offset: 100 });
        assert_eq!(end.region, TxRegion::Exon { tx_offset: 100 });
        assert_eq!((start.block_index, end.block_index), (0, 1));
    }

    #[test]
    fn test_display() {
        let psl = two_exon(Strand::Plus);
        let (start, end) = project_range(&psl, 205, 295, MIN_INTRON);
        assert_eq!(start.to_string(), "100+6");
        assert_eq!(end.to_string(), "100-6");
    }
}
