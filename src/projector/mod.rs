//! Projection of genomic variants onto transcripts and proteins.
//!
//! A variant is given as a genomic range plus alternate bases. It is trimmed,
//! shifted to its most 3' equivalent placement within the exon, intron or
//! flank that holds it, and then classified at both ends against a spliced
//! alignment. Positions are computed in alignment orientation and converted
//! to transcript orientation once, at the end.

mod position;
mod protein;
mod split;

pub use position::{IntronSide, TxPosition, TxRegion};
pub use protein::{Cds, VariantPeptide};

use crate::alignment::Psl;
use crate::config::{ProjectorConfig, INDEL_SHIFT_NO_MAX};
use crate::error::{Error, Result};
use crate::indel_shift::{indel_shift, is_applicable, ShiftDirection};
use crate::interval::Interval;
use crate::seq_window::SeqWindow;
use crate::sequence::{reverse_complement, trim_prefix_then_suffix, trim_suffix_then_prefix};
use log::{debug, warn};
use position::{classify, project_range, Coord};

/// Alternate allele meaning "the reference is asserted unchanged".
pub const NO_CHANGE_ALLELE: &str = "=";

/// A genomic edit projected onto one transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantProjection {
    pub tx_name: String,
    pub start: TxPosition,
    pub end: TxPosition,
    /// Transcript bases replaced by the edit, when the edit touches the
    /// transcript at all.
    pub tx_ref: Option<String>,
    /// Inserted bases in transcript orientation.
    pub tx_alt: String,
    /// Genomic reference bases (forward strand) after trimming and shifting.
    pub g_ref: String,
    /// Genomic alternate bases (forward strand) after trimming and shifting.
    pub g_alt: String,
    /// Bases the edit was moved in the direction of transcription.
    pub bases_shifted: u32,
    /// The genome and transcript disagree over the edited region.
    pub genome_mismatch: bool,
}

/// How far an indel may move in one direction without leaving its region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShiftLimit {
    Blocked,
    Bounded(u32),
    Unbounded,
}

impl ShiftLimit {
    fn from_bound(bound: Option<u32>) -> Self {
        match bound {
            None => ShiftLimit::Unbounded,
            Some(0) => ShiftLimit::Blocked,
            Some(n) => ShiftLimit::Bounded(n),
        }
    }
}

/// Projects genomic variants through spliced alignments.
#[derive(Debug, Clone, Copy, Default)]
pub struct VariantProjector {
    config: ProjectorConfig,
}

impl VariantProjector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ProjectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProjectorConfig {
        &self.config
    }

    /// Classify one genomic coordinate against `psl`. `is_end` selects
    /// exclusive-end semantics at block boundaries.
    pub fn genomic_to_transcript(
        &self,
        g_offset: u32,
        psl: &Psl,
        is_end: bool,
    ) -> Result<TxPosition> {
        psl.validate()?;
        let coord = if is_end { Coord::End } else { Coord::Start };
        Ok(classify(psl, g_offset, coord, self.config.min_intron).into_tx(psl))
    }

    /// Limits on shifting `[start, end)` left and right without leaving the
    /// exon, intron or flank that contains it. Insertions must stay strictly
    /// inside introns and flanks, since a point on an exon edge is exonic.
    fn shift_limits(&self, psl: &Psl, start: u32, end: u32) -> (ShiftLimit, ShiftLimit) {
        let spans = psl.exon_spans(self.config.min_intron);
        let inner = u32::from(start == end);

        let mut regions: Vec<(Option<u32>, Option<u32>)> = Vec::with_capacity(2 * spans.len() + 1);
        if let Some(hi) = spans.first().and_then(|s| s.t_start.checked_sub(inner)) {
            regions.push((None, Some(hi)));
        }
        for (i, span) in spans.iter().enumerate() {
            regions.push((Some(span.t_start), Some(span.t_end)));
            if let Some(hi) = spans.get(i + 1).and_then(|s| s.t_start.checked_sub(inner)) {
                regions.push((Some(span.t_end + inner), Some(hi)));
            }
        }
        if let Some(last) = spans.last() {
            regions.push((Some(last.t_end + inner), None));
        }

        for (lo, hi) in regions {
            let lo_ok = lo.map_or(true, |lo| lo <= start);
            let hi_ok = hi.map_or(true, |hi| end <= hi);
            if lo_ok && hi_ok {
                return (
                    ShiftLimit::from_bound(lo.map(|lo| start - lo)),
                    ShiftLimit::from_bound(hi.map(|hi| hi - end)),
                );
            }
        }
        (ShiftLimit::Blocked, ShiftLimit::Blocked)
    }

    fn shift_within<W: SeqWindow + ?Sized>(
        window: &mut W,
        start: &mut u32,
        end: &mut u32,
        alt: &mut Vec<u8>,
        limit: ShiftLimit,
        direction: ShiftDirection,
    ) -> Result<u32> {
        let max_shift = match limit {
            ShiftLimit::Blocked => return Ok(0),
            ShiftLimit::Bounded(n) => n,
            ShiftLimit::Unbounded => INDEL_SHIFT_NO_MAX,
        };
        indel_shift(window, start, end, alt, max_shift, direction)
    }

    /// Project the genomic edit `variant -> alt` onto the transcript aligned
    /// by `psl`, whose sequence (in transcript orientation) is `tx_seq`.
    ///
    /// `alt` of [`NO_CHANGE_ALLELE`] or equal to the reference asserts no
    /// change and is not trimmed.
    pub fn project_variant<W: SeqWindow + ?Sized>(
        &self,
        window: &mut W,
        variant: &Interval,
        alt: &str,
        psl: &Psl,
        tx_seq: &[u8],
    ) -> Result<VariantProjection> {
        psl.validate()?;
        if variant.start > variant.end {
            return Err(Error::InvalidRange {
                start: variant.start,
                end: variant.end,
            });
        }
        let chrom = variant.chrom.as_str();
        let minus = psl.strand.is_minus();

        let (mut start, mut end) = (variant.start, variant.end);
        if !window.covers(chrom, start, end) {
            window.fetch(chrom, start, end)?;
        }
        if end > window.end() {
            return Err(Error::RangeOutOfBounds {
                name: chrom.to_string(),
                start,
                end,
                size: window.end(),
            });
        }
        let mut g_ref = window.slice(start, end)?.to_vec();
        let mut g_alt = if alt == NO_CHANGE_ALLELE {
            g_ref.clone()
        } else {
            alt.as_bytes().to_ascii_uppercase()
        };

        let no_change = g_alt == g_ref;
        if !no_change {
            let (prefix, suffix) = trim_suffix_then_prefix(&mut g_ref, &mut g_alt);
            start += prefix as u32;
            end -= suffix as u32;
        }

        // Shift to the 3' end in transcript orientation, then measure how far
        // the edit could go the other way to find the ambiguous region.
        let is_indel = !no_change && is_applicable(g_ref.len() as u32, g_alt.len() as u32);
        let mut bases_shifted = 0;
        let (mut amb_start, mut amb_end) = (start, end);
        if is_indel {
            let (three_prime, five_prime) = if minus {
                (ShiftDirection::Left, ShiftDirection::Right)
            } else {
                (ShiftDirection::Right, ShiftDirection::Left)
            };
            let limit_for = |limits: (ShiftLimit, ShiftLimit), dir: ShiftDirection| match dir {
                ShiftDirection::Left => limits.0,
                ShiftDirection::Right => limits.1,
            };

            let limits = self.shift_limits(psl, start, end);
            bases_shifted = Self::shift_within(
                window,
                &mut start,
                &mut end,
                &mut g_alt,
                limit_for(limits, three_prime),
                three_prime,
            )?;
            if bases_shifted > 0 && g_alt.is_empty() {
                g_ref = window.slice(start, end)?.to_vec();
            }

            let (mut s, mut e, mut a) = (start, end, g_alt.clone());
            let limits = self.shift_limits(psl, start, end);
            Self::shift_within(
                window,
                &mut s,
                &mut e,
                &mut a,
                limit_for(limits, five_prime),
                five_prime,
            )?;
            amb_start = start.min(s);
            amb_end = end.max(e);
            debug!(
                "{}:{}-{} shifted {} toward 3' of {}, ambiguous {}-{}",
                chrom, start, end, bases_shifted, psl.q_name, amb_start, amb_end
            );
        }

        let tx_aln: Vec<u8> = if minus {
            reverse_complement(tx_seq)
        } else {
            tx_seq.to_vec()
        };

        let min_intron = self.config.min_intron;
        // Only a pure insertion or deletion can have been absorbed by an
        // alignment indel; substitutions project directly.
        let gap_in_ambiguity = if is_indel {
            psl.indel_gaps(min_intron)
                .into_iter()
                .filter(|&(_, gap_start, gap_end)| gap_start <= amb_end && amb_start <= gap_end)
                .fold(None, |acc: Option<(u32, u32)>, (_, gs, ge)| match acc {
                    Some((a, b)) => Some((a.min(gs), b.max(ge))),
                    None => Some((gs, ge)),
                })
        } else {
            None
        };

        if let Some((gap_start, gap_end)) = gap_in_ambiguity {
            let careful = self.splice_and_compare(
                window,
                psl,
                &tx_aln,
                (amb_start.min(gap_start), amb_end.max(gap_end)),
                (start, end),
                &g_alt,
            )?;
            if let Some((tx_start, tx_end, tx_ref, tx_alt, genome_mismatch)) = careful {
                return Ok(VariantProjection {
                    tx_name: psl.q_name.clone(),
                    start: tx_start,
                    end: tx_end,
                    tx_ref: Some(tx_ref),
                    tx_alt,
                    g_ref: String::from_utf8_lossy(&g_ref).into_owned(),
                    g_alt: String::from_utf8_lossy(&g_alt).into_owned(),
                    bases_shifted,
                    genome_mismatch,
                });
            }
        }

        let (tx_start, tx_end) = project_range(psl, start, end, min_intron);
        let in_one_non_exon = !tx_start.is_exon()
            && !tx_end.is_exon()
            && tx_start.same_non_exon_region(&tx_end);
        let touches_tx = !(in_one_non_exon
            || matches!(tx_start.region, TxRegion::Downstream { .. })
            || matches!(tx_end.region, TxRegion::Upstream { .. }));

        let tx_ref = touches_tx.then(|| {
            let from = (tx_start.tx_offset_as_start() as usize).min(tx_seq.len());
            let to = (tx_end.tx_offset_as_end() as usize).clamp(from, tx_seq.len());
            String::from_utf8_lossy(&tx_seq[from..to]).into_owned()
        });

        let genome_mismatch = match &tx_ref {
            Some(tx_ref) => {
                let mut spliced = spliced_bases(window, psl, start, end)?;
                if minus {
                    spliced = reverse_complement(&spliced);
                }
                spliced.len() == tx_ref.len() && !spliced.eq_ignore_ascii_case(tx_ref.as_bytes())
            }
            None => false,
        };
        if genome_mismatch {
            warn!(
                "Genome and {} differ at {}:{}-{}",
                psl.q_name, chrom, start, end
            );
        }

        let tx_alt = if minus {
            reverse_complement(&g_alt)
        } else {
            g_alt.clone()
        };

        Ok(VariantProjection {
            tx_name: psl.q_name.clone(),
            start: tx_start,
            end: tx_end,
            tx_ref,
            tx_alt: String::from_utf8_lossy(&tx_alt).into_owned(),
            g_ref: String::from_utf8_lossy(&g_ref).into_owned(),
            g_alt: String::from_utf8_lossy(&g_alt).into_owned(),
            bases_shifted,
            genome_mismatch,
        })
    }

    /// Compare the edited genome with the transcript over `[a, b)`, a region
    /// containing an alignment indel. Returns `None` when the region does not
    /// sit inside one exon.
    ///
    /// If the edit makes the genome match the transcript, the transcript is
    /// unchanged and the whole region is reported with equal ref and alt.
    /// Otherwise the transcript and edited genome are trimmed against each
    /// other to find the change as the transcript sees it.
    fn splice_and_compare<W: SeqWindow + ?Sized>(
        &self,
        window: &mut W,
        psl: &Psl,
        tx_aln: &[u8],
        (a, b): (u32, u32),
        (start, end): (u32, u32),
        g_alt: &[u8],
    ) -> Result<Option<(TxPosition, TxPosition, String, String, bool)>> {
        let min_intron = self.config.min_intron;
        let first = classify(psl, a, Coord::Start, min_intron);
        let last = classify(psl, b, Coord::End, min_intron);
        let (position::AlnRegion::Block { q: qa }, position::AlnRegion::Block { q: qb }) =
            (first.region, last.region)
        else {
            return Ok(None);
        };
        if qa > qb || qb as usize > tx_aln.len() {
            return Ok(None);
        }

        let chrom = window.seq_name().map(str::to_string).unwrap_or_default();
        if !window.covers(&chrom, a, b) {
            window.fetch(&chrom, a, b)?;
        }
        let genome = window.slice(a, b)?;
        let mut edited = Vec::with_capacity(genome.len() + g_alt.len());
        edited.extend_from_slice(&genome[..(start - a) as usize]);
        edited.extend_from_slice(g_alt);
        edited.extend_from_slice(&genome[(end - a) as usize..]);
        let tx_segment = &tx_aln[qa as usize..qb as usize];
        let genome_mismatch = !genome.eq_ignore_ascii_case(tx_segment);

        let orient = |bases: &[u8]| -> String {
            let bases = if psl.strand.is_minus() {
                reverse_complement(bases)
            } else {
                bases.to_vec()
            };
            String::from_utf8_lossy(&bases).into_owned()
        };

        if edited.eq_ignore_ascii_case(tx_segment) {
            debug!("{}: edit restores transcript sequence at {}-{}", psl.q_name, a, b);
            let (tx_start, tx_end) = ordered(first.into_tx(psl), last.into_tx(psl), psl);
            let seq = orient(tx_segment);
            return Ok(Some((tx_start, tx_end, seq.clone(), seq, true)));
        }

        let mut tx_ref = tx_segment.to_vec();
        let mut tx_alt = edited;
        let (prefix, suffix) = trim_prefix_then_suffix(&mut tx_ref, &mut tx_alt);
        let (qa, qb) = (qa + prefix as u32, qb - suffix as u32);

        let exon_at = |q: u32, fallback: position::AlnPoint| -> TxPosition {
            let g = psl.q_to_t(q).unwrap_or(fallback.g);
            position::AlnPoint {
                region: position::AlnRegion::Block { q },
                g,
                block_index: psl.block_containing(g).unwrap_or(fallback.block_index),
            }
            .into_tx(psl)
        };
        let (tx_start, tx_end) = ordered(exon_at(qa, first), exon_at(qb, last), psl);
        Ok(Some((
            tx_start,
            tx_end,
            orient(&tx_ref),
            orient(&tx_alt),
            genome_mismatch,
        )))
    }
}

/// Put alignment-order endpoints into transcript order.
fn ordered(first: TxPosition, last: TxPosition, psl: &Psl) -> (TxPosition, TxPosition) {
    if psl.strand.is_minus() {
        (last, first)
    } else {
        (first, last)
    }
}

/// Genomic bases of `[start, end)` that fall inside alignment blocks, in
/// genomic order.
fn spliced_bases<W: SeqWindow + ?Sized>(
    window: &W,
    psl: &Psl,
    start: u32,
    end: u32,
) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for i in 0..psl.block_count() {
        let from = start.max(psl.t_starts[i]);
        let to = end.min(psl.t_block_end(i));
        if from < to {
            out.extend_from_slice(window.slice(from, to)?);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::Strand;
    use crate::seq_window::MemoryWindow;
    use crate::sequence::reverse_complement;

    /// Genome of 500 bases with exons at [100, 200) and [300, 400).
    fn fixture() -> (Vec<u8>, Vec<u8>) {
        let unit = b"ACGTTGCAAGCT";
        let genome: Vec<u8> = unit.iter().copied().cycle().take(500).collect();
        let mut tx = genome[100..200].to_vec();
        tx.extend_from_slice(&genome[300..400]);
        (genome, tx)
    }

    fn psl(strand: Strand) -> Psl {
        Psl::from_blocks("tx1", 200, "chr1", 500, strand, &[(0, 100, 100), (100, 300, 100)])
    }

    /// Like [`psl`], but the genome has 3 extra bases at [200, 203).
    fn genome_only_gap_psl() -> Psl {
        Psl::from_blocks(
            "tx1",
            200,
            "chr1",
            500,
            Strand::Plus,
            &[(0, 100, 100), (100, 203, 100)],
        )
    }

    #[test]
    fn test_substitution_in_exon() {
        let (genome, tx) = fixture();
        let mut window = MemoryWindow::new("chr1", &genome);
        let alt = if genome[150] == b'A' { "C" } else { "A" };

        let vp = VariantProjector::new()
            .project_variant(
                &mut window,
                &Interval::new("chr1", 150, 151),
                alt,
                &psl(Strand::Plus),
                &tx,
            )
            .unwrap();
        assert_eq!(vp.start.region, TxRegion::Exon { tx_offset: 50 });
        assert_eq!(vp.end.region, TxRegion::Exon { tx_offset: 51 });
        assert_eq!(vp.tx_ref.as_deref(), Some(&*String::from_utf8_lossy(&tx[50..51])));
        assert_eq!(vp.tx_alt, alt);
        assert_eq!(vp.bases_shifted, 0);
        assert!(!vp.genome_mismatch);
    }

    #[test]
    fn test_minus_strand_orientation() {
        let (genome, _) = fixture();
        let mut tx = genome[100..200].to_vec();
        tx.extend_from_slice(&genome[300..400]);
        let tx = reverse_complement(&tx);
        let mut window = MemoryWindow::new("chr1", &genome);
        let alt = if genome[399] == b'A' { "C" } else { "A" };

        let vp = VariantProjector::new()
            .project_variant(
                &mut window,
                &Interval::new("chr1", 399, 400),
                alt,
                &psl(Strand::Minus),
                &tx,
            )
            .unwrap();
        assert_eq!(vp.start.region, TxRegion::Exon { tx_offset: 0 });
        assert_eq!(vp.end.region, TxRegion::Exon { tx_offset: 1 });
        assert_eq!(vp.tx_ref.as_deref(), Some(&*String::from_utf8_lossy(&tx[0..1])));
        assert_eq!(vp.tx_alt.as_bytes(), reverse_complement(alt.as_bytes()).as_slice());
    }

    #[test]
    fn test_intronic_variant_has_no_tx_ref() {
        let (genome, tx) = fixture();
        let mut window = MemoryWindow::new("chr1", &genome);
        let alt = if genome[250] == b'A' { "C" } else { "A" };
        let vp = VariantProjector::new()
            .project_variant(
                &mut window,
                &Interval::new("chr1", 250, 251),
                alt,
                &psl(Strand::Plus),
                &tx,
            )
            .unwrap();
        assert!(matches!(vp.start.region, TxRegion::Intron { .. }));
        assert!(vp.tx_ref.is_none());
    }

    #[test]
    fn test_no_change_assertion() {
        let (genome, tx) = fixture();
        let mut window = MemoryWindow::new("chr1", &genome);
        let vp = VariantProjector::new()
            .project_variant(
                &mut window,
                &Interval::new("chr1", 120, 123),
                NO_CHANGE_ALLELE,
                &psl(Strand::Plus),
                &tx,
            )
            .unwrap();
        assert_eq!(vp.g_ref, vp.g_alt);
        assert_eq!(vp.g_ref.len(), 3);
        assert_eq!(vp.tx_ref.as_deref(), Some(vp.tx_alt.as_str()));
    }

    #[test]
    fn test_genome_mismatch_detected() {
        let (genome, mut tx) = fixture();
        tx[10] = if tx[10] == b'A' { b'C' } else { b'A' };
        let mut window = MemoryWindow::new("chr1", &genome);
        let alt = if genome[110] == b'G' { "T" } else { "G" };
        let vp = VariantProjector::new()
            .project_variant(
                &mut window,
                &Interval::new("chr1", 110, 111),
                alt,
                &psl(Strand::Plus),
                &tx,
            )
            .unwrap();
        assert!(vp.genome_mismatch);
    }

    #[test]
    fn test_deletion_shift_stops_at_exon_end() {
        // Exon 1 ends in a run of As that continues into the intron.
        let mut genome = vec![b'C'; 500];
        genome[190..210].fill(b'A');
        let mut tx = genome[100..200].to_vec();
        tx.extend_from_slice(&genome[300..400]);
        let mut window = MemoryWindow::new("chr1", &genome);

        let vp = VariantProjector::new()
            .project_variant(
                &mut window,
                &Interval::new("chr1", 192, 193),
                "",
                &psl(Strand::Plus),
                &tx,
            )
            .unwrap();
        assert_eq!(vp.bases_shifted, 7);
        assert_eq!(vp.start.region, TxRegion::Exon { tx_offset: 99 });
        assert_eq!(vp.end.region, TxRegion::Exon { tx_offset: 100 });
        assert_eq!(vp.tx_ref.as_deref(), Some("A"));
        assert_eq!(vp.g_ref, "A");
    }

    #[test]
    fn test_deletion_of_genome_only_bases_restores_transcript() {
        // The genome has 3 extra bases between the two blocks.
        let genome: Vec<u8> = b"ACGTTGCAAGCTTAGGCA".iter().copied().cycle().take(500).collect();
        let mut tx = genome[100..200].to_vec();
        tx.extend_from_slice(&genome[203..303]);
        let psl = genome_only_gap_psl();
        let mut window = MemoryWindow::new("chr1", &genome);

        let vp = VariantProjector::new()
            .project_variant(&mut window, &Interval::new("chr1", 200, 203), "", &psl, &tx)
            .unwrap();
        assert!(vp.genome_mismatch);
        assert_eq!(vp.tx_ref.as_deref(), Some(vp.tx_alt.as_str()));
        assert!(vp.start.is_exon() && vp.end.is_exon());
    }

    #[test]
    fn test_substitution_beside_genome_only_bases() {
        let genome: Vec<u8> = b"ACGTTGCAAGCTTAGGCA".iter().copied().cycle().take(500).collect();
        let mut tx = genome[100..200].to_vec();
        tx.extend_from_slice(&genome[203..303]);
        let psl = genome_only_gap_psl();
        let mut window = MemoryWindow::new("chr1", &genome);
        let projector = VariantProjector::new();

        // Last base before the gap and first base after it.
        for (pos, tx_offset) in [(199u32, 99u32), (203, 100)] {
            let alt = if genome[pos as usize] == b'A' { "C" } else { "A" };
            let vp = projector
                .project_variant(&mut window, &Interval::new("chr1", pos, pos + 1), alt, &psl, &tx)
                .unwrap();
            assert_eq!(vp.start.region, TxRegion::Exon { tx_offset });
            assert_eq!(vp.end.region, TxRegion::Exon { tx_offset: tx_offset + 1 });
            assert_eq!(
                vp.tx_ref.as_deref(),
                Some(&*String::from_utf8_lossy(&tx[tx_offset as usize..tx_offset as usize + 1]))
            );
            assert_eq!(vp.tx_alt, alt);
            assert_eq!(vp.bases_shifted, 0);
            assert!(!vp.genome_mismatch);
        }
    }

    #[test]
    fn test_invalid_alignment() {
        let (genome, tx) = fixture();
        let mut window = MemoryWindow::new("chr1", &genome);
        let mut bad = psl(Strand::Plus);
        bad.t_starts[1] = 150;
        assert!(matches!(
            VariantProjector::new().project_variant(
                &mut window,
                &Interval::new("chr1", 150, 151),
                "A",
                &bad,
                &tx,
            ),
            Err(Error::InvalidAlignment { .. })
        ));
    }

    #[test]
    fn test_genomic_to_transcript() {
        let projector = VariantProjector::new();
        let p = projector.genomic_to_transcript(200, &psl(Strand::Plus), true).unwrap();
        assert_eq!(p.region, TxRegion::Exon { tx_offset: 100 });
        let p = projector.genomic_to_transcript(200, &psl(Strand::Plus), false).unwrap();
        assert!(matches!(p.region, TxRegion::Intron { .. }));
    }
}
