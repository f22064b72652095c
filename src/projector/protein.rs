use super::{VariantProjection, VariantProjector};
use crate::config::INDEL_SHIFT_NO_MAX;
use crate::error::Result;
use crate::indel_shift::{indel_shift, is_applicable, ShiftDirection};
use crate::seq_window::MemoryWindow;
use crate::sequence::{common_prefix_len, translate, translate_to_stop, trim_prefix_then_suffix};

/// Coding region of a transcript, in transcript coordinates.
///
/// `start == end == -1` or an incomplete start means there is no usable CDS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cds {
    pub start: i32,
    pub end: i32,
    pub start_complete: bool,
}

impl Cds {
    /// A complete CDS over `[start, end)`.
    pub fn new(start: i32, end: i32) -> Self {
        Self {
            start,
            end,
            start_complete: true,
        }
    }

    /// Marker for non-coding transcripts.
    pub fn none() -> Self {
        Self {
            start: -1,
            end: -1,
            start_complete: false,
        }
    }

    pub fn is_usable(&self) -> bool {
        self.start >= 0 && self.end > self.start && self.start_complete
    }
}

/// A transcript variant projected onto its protein.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantPeptide {
    pub protein_name: String,
    /// First affected residue (0-based).
    pub start_aa: u32,
    /// End (exclusive) of the reference residues.
    pub end_aa: u32,
    pub ref_aa: String,
    pub alt_aa: String,
    pub frameshift: bool,
    /// The edit leaves the CDS, so the effect on the protein is unknown.
    pub cant_predict: bool,
    /// Reference and alternate residues are identical.
    pub likely_no_change: bool,
    pub spans_utr_cds: bool,
    /// Residues a pure amino-acid insertion or deletion was moved toward
    /// the C-terminus.
    pub right_shifted_bases: u32,
}

fn to_string(residues: &[u8]) -> String {
    String::from_utf8_lossy(residues).into_owned()
}

impl VariantProjector {
    /// Map a transcript variant onto codons of `cds` and translate.
    ///
    /// Returns `None` when there is no usable CDS, when either end of the
    /// variant is outside an exon, or when the edit does not touch the CDS.
    /// `protein_seq` is used to place amino-acid indels; if empty, the CDS is
    /// translated instead.
    pub fn project_to_protein(
        &self,
        vp: &VariantProjection,
        cds: &Cds,
        tx_seq: &[u8],
        protein_name: &str,
        protein_seq: &[u8],
    ) -> Result<Option<VariantPeptide>> {
        if !cds.is_usable() {
            return Ok(None);
        }
        let (Some(mut ts), Some(mut te)) = (vp.start.exon_offset(), vp.end.exon_offset()) else {
            return Ok(None);
        };
        let tx_len = tx_seq.len() as u32;
        let cds_start = cds.start as u32;
        let cds_end = (cds.end as u32).min(tx_len);
        if cds_start >= cds_end || ts > te || te > tx_len {
            return Ok(None);
        }

        let coding = if ts == te {
            cds_start < ts && ts < cds_end
        } else {
            ts < cds_end && te > cds_start
        };
        if !coding {
            return Ok(None);
        }

        let spans_utr_cds = ts < cds_start || te > cds_end;
        if spans_utr_cds {
            ts = ts.max(cds_start);
            te = te.min(cds_end);
        }

        // Codon-aligned window around the edit, relative to the CDS start.
        let cs = ts - cds_start;
        let ce = te - cds_start;
        let window_start = cs / 3 * 3;
        let window_end = match (ts == te, cs % 3) {
            // Insertion between two codons.
            (true, 0) => window_start,
            (true, _) => window_start + 3,
            (false, _) => (ce + 2) / 3 * 3,
        };
        let window_end = window_end.min(cds_end - cds_start);
        let codons_from = (cds_start + window_start) as usize;
        let codons_to = (cds_start + window_end) as usize;
        let ref_codons = &tx_seq[codons_from..codons_to];
        let mut start_aa = window_start / 3;

        if spans_utr_cds {
            let ref_aa = translate(ref_codons);
            return Ok(Some(VariantPeptide {
                protein_name: protein_name.to_string(),
                start_aa,
                end_aa: start_aa + ref_aa.len() as u32,
                ref_aa: to_string(&ref_aa),
                alt_aa: String::new(),
                frameshift: false,
                cant_predict: true,
                likely_no_change: false,
                spans_utr_cds,
                right_shifted_bases: 0,
            }));
        }

        let alt = vp.tx_alt.as_bytes();
        let ref_len = te - ts;
        let frameshift = (alt.len() as i64 - ref_len as i64).rem_euclid(3) != 0;

        if frameshift {
            let mut alt_nt = tx_seq[codons_from..ts as usize].to_vec();
            alt_nt.extend_from_slice(alt);
            alt_nt.extend_from_slice(&tx_seq[te as usize..]);
            let alt_full = translate_to_stop(&alt_nt);
            let ref_full = translate(&tx_seq[codons_from..cds_end as usize]);

            let first_change = common_prefix_len(&ref_full, &alt_full)
                .min(ref_full.len().saturating_sub(1))
                .min(alt_full.len().saturating_sub(1));
            start_aa += first_change as u32;
            return Ok(Some(VariantPeptide {
                protein_name: protein_name.to_string(),
                start_aa,
                end_aa: start_aa + 1,
                ref_aa: to_string(ref_full.get(first_change..first_change + 1).unwrap_or_default()),
                alt_aa: to_string(alt_full.get(first_change..).unwrap_or_default()),
                frameshift: true,
                cant_predict: false,
                likely_no_change: false,
                spans_utr_cds,
                right_shifted_bases: 0,
            }));
        }

        let mut alt_codons = tx_seq[codons_from..ts as usize].to_vec();
        alt_codons.extend_from_slice(alt);
        alt_codons.extend_from_slice(&tx_seq[te as usize..codons_to]);

        let mut ref_aa = translate(ref_codons);
        let mut alt_aa = translate(&alt_codons);
        let likely_no_change = ref_aa == alt_aa;
        if !likely_no_change {
            let (prefix, _) = trim_prefix_then_suffix(&mut ref_aa, &mut alt_aa);
            start_aa += prefix as u32;
        }
        let mut end_aa = start_aa + ref_aa.len() as u32;

        let mut right_shifted_bases = 0;
        if is_applicable(ref_aa.len() as u32, alt_aa.len() as u32) {
            let protein = if protein_seq.is_empty() {
                translate(&tx_seq[cds_start as usize..cds_end as usize])
            } else {
                protein_seq.to_vec()
            };
            if end_aa as usize <= protein.len() {
                let mut window = MemoryWindow::new(protein_name, &protein);
                let (mut s, mut e) = (start_aa, end_aa);
                right_shifted_bases = indel_shift(
                    &mut window,
                    &mut s,
                    &mut e,
                    &mut alt_aa,
                    INDEL_SHIFT_NO_MAX,
                    ShiftDirection::Right,
                )?;
                if right_shifted_bases > 0 {
                    start_aa = s;
                    end_aa = e;
                    if !ref_aa.is_empty() {
                        ref_aa = protein[s as usize..e as usize].to_ascii_uppercase();
                    }
                }
            }
        }

        Ok(Some(VariantPeptide {
            protein_name: protein_name.to_string(),
            start_aa,
            end_aa,
            ref_aa: to_string(&ref_aa),
            alt_aa: to_string(&alt_aa),
            frameshift: false,
            cant_predict: false,
            likely_no_change,
            spans_utr_cds,
            right_shifted_bases,
        }))
    }
}
