use super::position::project_range;
use super::{VariantProjection, VariantProjector};
use crate::alignment::Psl;
use crate::sequence::reverse_complement;

impl VariantProjector {
    /// Split a projection whose edit spans more than one region (flank,
    /// exon, intron) into one projection per region, in transcript order.
    ///
    /// Only deletions and equal-length substitutions can be apportioned
    /// between regions; any other multi-region edit returns `None`. An edit
    /// inside a single region comes back unchanged.
    pub fn split_by_region(
        &self,
        vp: &VariantProjection,
        psl: &Psl,
    ) -> Option<Vec<VariantProjection>> {
        let min_intron = self.config.min_intron;
        let g_start = vp.start.g_offset.min(vp.end.g_offset);
        let g_end = vp.start.g_offset.max(vp.end.g_offset);

        let mut cuts: Vec<u32> = psl
            .exon_spans(min_intron)
            .iter()
            .flat_map(|span| [span.t_start, span.t_end])
            .filter(|&b| g_start < b && b < g_end)
            .collect();
        if cuts.is_empty() {
            return Some(vec![vp.clone()]);
        }
        cuts.dedup();

        let is_deletion = vp.g_alt.is_empty();
        let is_substitution = vp.g_alt.len() == vp.g_ref.len();
        if !(is_deletion || is_substitution) || vp.g_ref.len() != (g_end - g_start) as usize {
            return None;
        }

        let minus = psl.strand.is_minus();
        let tx_ref_base = vp.start.tx_offset_as_start();
        let mut bounds = Vec::with_capacity(cuts.len() + 2);
        bounds.push(g_start);
        bounds.extend(cuts);
        bounds.push(g_end);

        let mut pieces = Vec::with_capacity(bounds.len() - 1);
        for pair in bounds.windows(2) {
            let (ps, pe) = (pair[0], pair[1]);
            let (start, end) = project_range(psl, ps, pe, min_intron);
            let local = (ps - g_start) as usize..(pe - g_start) as usize;

            let g_ref = vp.g_ref.get(local.clone())?.to_string();
            let g_alt = if is_deletion {
                String::new()
            } else {
                vp.g_alt.get(local)?.to_string()
            };
            let tx_alt = if minus {
                String::from_utf8_lossy(&reverse_complement(g_alt.as_bytes())).into_owned()
            } else {
                g_alt.clone()
            };
            let tx_ref = match &vp.tx_ref {
                Some(tx_ref) if start.is_exon() && end.is_exon() => {
                    let from = start.tx_offset_as_start().checked_sub(tx_ref_base)? as usize;
                    let to = end.tx_offset_as_end().checked_sub(tx_ref_base)? as usize;
                    Some(tx_ref.get(from..to)?.to_string())
                }
                _ => None,
            };

            pieces.push(VariantProjection {
                tx_name: vp.tx_name.clone(),
                start,
                end,
                tx_ref,
                tx_alt,
                g_ref,
                g_alt,
                bases_shifted: vp.bases_shifted,
                genome_mismatch: vp.genome_mismatch,
            });
        }

        if minus {
            pieces.reverse();
        }
        Some(pieces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::{Interval, Strand};
    use crate::projector::TxRegion;
    use crate::seq_window::MemoryWindow;
    use crate::sequence::complement;

    fn genome() -> Vec<u8> {
        b"ACGTTGCAAGCT".iter().copied().cycle().take(500).collect()
    }

    fn setup(strand: Strand) -> (Vec<u8>, Vec<u8>, Psl) {
        let genome = genome();
        let mut tx = genome[100..200].to_vec();
        tx.extend_from_slice(&genome[300..400]);
        if strand.is_minus() {
            tx = reverse_complement(&tx);
        }
        let psl = Psl::from_blocks(
            "tx1",
            200,
            "chr1",
            500,
            strand,
            &[(0, 100, 100), (100, 300, 100)],
        );
        (genome, tx, psl)
    }

    #[test]
    fn test_single_region_unchanged() {
        let (genome, tx, psl) = setup(Strand::Plus);
        let mut window = MemoryWindow::new("chr1", &genome);
        let projector = VariantProjector::new();
        let alt = if genome[150] == b'A' { "C" } else { "A" };
        let vp = projector
            .project_variant(&mut window, &Interval::new("chr1", 150, 151), alt, &psl, &tx)
            .unwrap();
        assert_eq!(projector.split_by_region(&vp, &psl), Some(vec![vp]));
    }

    #[test]
    fn test_deletion_across_exon_intron() {
        let (genome, tx, psl) = setup(Strand::Plus);
        let mut window = MemoryWindow::new("chr1", &genome);
        let projector = VariantProjector::new();
        let vp = projector
            .project_variant(&mut window, &Interval::new("chr1", 195, 205), "", &psl, &tx)
            .unwrap();
        assert_eq!(vp.bases_shifted, 0);

        let pieces = projector.split_by_region(&vp, &psl).unwrap();
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].start.region, TxRegion::Exon { tx_offset: 95 });
        assert_eq!(pieces[0].end.region, TxRegion::Exon { tx_offset: 100 });
        assert_eq!(pieces[0].tx_ref.as_deref(), Some(&*String::from_utf8_lossy(&tx[95..100])));
        assert!(matches!(pieces[1].start.region, TxRegion::Intron { .. }));
        assert!(pieces[1].tx_ref.is_none());
        assert_eq!(pieces[0].g_ref.len() + pieces[1].g_ref.len(), 10);
    }

    #[test]
    fn test_minus_strand_pieces_in_transcript_order() {
        let (genome, tx, psl) = setup(Strand::Minus);
        let mut window = MemoryWindow::new("chr1", &genome);
        let projector = VariantProjector::new();
        let vp = projector
            .project_variant(&mut window, &Interval::new("chr1", 195, 205), "", &psl, &tx)
            .unwrap();

        let pieces = projector.split_by_region(&vp, &psl).unwrap();
        assert_eq!(pieces.len(), 2);
        assert!(matches!(pieces[0].start.region, TxRegion::Intron { .. }));
        assert_eq!(pieces[1].start.region, TxRegion::Exon { tx_offset: 100 });
        assert_eq!(pieces[1].end.region, TxRegion::Exon { tx_offset: 105 });
        assert_eq!(pieces[1].tx_ref.as_deref(), Some(&*String::from_utf8_lossy(&tx[100..105])));
    }

    /// Every base of genome `[195, 205)` replaced by its complement.
    fn substitution(genome: &[u8]) -> (String, String) {
        let g_ref = String::from_utf8_lossy(&genome[195..205]).into_owned();
        let g_alt: String = genome[195..205].iter().map(|&b| complement(b) as char).collect();
        (g_ref, g_alt)
    }

    #[test]
    fn test_substitution_across_exon_intron() {
        let (genome, tx, psl) = setup(Strand::Plus);
        let mut window = MemoryWindow::new("chr1", &genome);
        let projector = VariantProjector::new();
        let (g_ref, g_alt) = substitution(&genome);
        let vp = projector
            .project_variant(&mut window, &Interval::new("chr1", 195, 205), &g_alt, &psl, &tx)
            .unwrap();
        assert_eq!(vp.g_ref, g_ref);

        let pieces = projector.split_by_region(&vp, &psl).unwrap();
        assert_eq!(pieces.len(), 2);

        let exon = &pieces[0];
        assert_eq!(exon.start.region, TxRegion::Exon { tx_offset: 95 });
        assert_eq!(exon.end.region, TxRegion::Exon { tx_offset: 100 });
        assert_eq!(exon.g_ref, g_ref[..5]);
        assert_eq!(exon.g_alt, g_alt[..5]);
        assert_eq!(exon.tx_alt, g_alt[..5]);
        assert_eq!(exon.tx_ref.as_deref(), Some(&*String::from_utf8_lossy(&tx[95..100])));

        let intron = &pieces[1];
        assert!(matches!(intron.start.region, TxRegion::Intron { .. }));
        assert_eq!(intron.g_ref, g_ref[5..]);
        assert_eq!(intron.g_alt, g_alt[5..]);
        assert_eq!(intron.tx_alt, g_alt[5..]);
        assert!(intron.tx_ref.is_none());
    }

    #[test]
    fn test_minus_strand_substitution_across_exon_intron() {
        let (genome, tx, psl) = setup(Strand::Minus);
        let mut window = MemoryWindow::new("chr1", &genome);
        let projector = VariantProjector::new();
        let (g_ref, g_alt) = substitution(&genome);
        let vp = projector
            .project_variant(&mut window, &Interval::new("chr1", 195, 205), &g_alt, &psl, &tx)
            .unwrap();

        let pieces = projector.split_by_region(&vp, &psl).unwrap();
        assert_eq!(pieces.len(), 2);
        let rc = |s: &str| String::from_utf8_lossy(&reverse_complement(s.as_bytes())).into_owned();

        let intron = &pieces[0];
        assert!(matches!(intron.start.region, TxRegion::Intron { .. }));
        assert_eq!(intron.g_ref, g_ref[5..]);
        assert_eq!(intron.g_alt, g_alt[5..]);
        assert_eq!(intron.tx_alt, rc(&g_alt[5..]));
        assert!(intron.tx_ref.is_none());

        let exon = &pieces[1];
        assert_eq!(exon.start.region, TxRegion::Exon { tx_offset: 100 });
        assert_eq!(exon.end.region, TxRegion::Exon { tx_offset: 105 });
        assert_eq!(exon.g_ref, g_ref[..5]);
        assert_eq!(exon.g_alt, g_alt[..5]);
        assert_eq!(exon.tx_alt, rc(&g_alt[..5]));
        assert_eq!(exon.tx_ref.as_deref(), Some(&*String::from_utf8_lossy(&tx[100..105])));
    }

    #[test]
    fn test_complex_multi_region_refused() {
        let (genome, tx, psl) = setup(Strand::Plus);
        let mut window = MemoryWindow::new("chr1", &genome);
        let projector = VariantProjector::new();
        let mut vp = projector
            .project_variant(&mut window, &Interval::new("chr1", 195, 205), "", &psl, &tx)
            .unwrap();
        vp.g_alt = "TT".to_string();
        assert_eq!(projector.split_by_region(&vp, &psl), None);
    }
}
