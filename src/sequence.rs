//! Nucleotide and amino-acid helpers shared by the projector.

/// Complement of one IUPAC nucleotide code, preserving case. Unknown bytes
/// are returned unchanged.
#[inline]
pub fn complement(base: u8) -> u8 {
    match base {
        b'A' => b'T',
        b'C' => b'G',
        b'G' => b'C',
        b'T' | b'U' => b'A',
        b'a' => b't',
        b'c' => b'g',
        b'g' => b'c',
        b't' | b'u' => b'a',
        b'R' => b'Y',
        b'Y' => b'R',
        b'K' => b'M',
        b'M' => b'K',
        b'B' => b'V',
        b'V' => b'B',
        b'D' => b'H',
        b'H' => b'D',
        b'r' => b'y',
        b'y' => b'r',
        b'k' => b'm',
        b'm' => b'k',
        b'b' => b'v',
        b'v' => b'b',
        b'd' => b'h',
        b'h' => b'd',
        other => other,
    }
}

/// Reverse complement of `seq`.
pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().map(|&b| complement(b)).collect()
}

/// Reverse-complement `seq` in place.
pub fn reverse_complement_in_place(seq: &mut [u8]) {
    seq.reverse();
    for b in seq.iter_mut() {
        *b = complement(*b);
    }
}

fn base_index(base: u8) -> Option<usize> {
    match base.to_ascii_uppercase() {
        b'T' | b'U' => Some(0),
        b'C' => Some(1),
        b'A' => Some(2),
        b'G' => Some(3),
        _ => None,
    }
}

// Standard genetic code indexed by T=0 C=1 A=2 G=3, first base most significant.
const CODON_TABLE: &[u8; 64] =
    b"FFLLSSSSYY**CC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG";

/// Amino acid for one codon: `*` for stop, `X` for anything with a
/// non-ACGT base.
#[inline]
pub fn translate_codon(codon: &[u8]) -> u8 {
    match codon {
        [a, b, c] => match (base_index(*a), base_index(*b), base_index(*c)) {
            (Some(a), Some(b), Some(c)) => CODON_TABLE[a * 16 + b * 4 + c],
            _ => b'X',
        },
        _ => b'X',
    }
}

/// Translate whole codons of `seq`; a trailing partial codon becomes `X`.
pub fn translate(seq: &[u8]) -> Vec<u8> {
    seq.chunks(3).map(translate_codon).collect()
}

/// Translate codons until (and including) the first stop.
pub fn translate_to_stop(seq: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(seq.len() / 3 + 1);
    for codon in seq.chunks_exact(3) {
        let aa = translate_codon(codon);
        out.push(aa);
        if aa == b'*' {
            break;
        }
    }
    out
}

/// Length of the common prefix of `a` and `b`.
pub fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

/// Length of the common suffix of `a` and `b`.
pub fn common_suffix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().rev().zip(b.iter().rev()).take_while(|(x, y)| x == y).count()
}

/// Drop bases shared at the end and then at the start of `reference` and
/// `alt`. Returns `(prefix_trimmed, suffix_trimmed)`.
pub fn trim_suffix_then_prefix(reference: &mut Vec<u8>, alt: &mut Vec<u8>) -> (usize, usize) {
    let suffix = common_suffix_len(reference, alt);
    reference.truncate(reference.len() - suffix);
    alt.truncate(alt.len() - suffix);
    let prefix = common_prefix_len(reference, alt);
    reference.drain(..prefix);
    alt.drain(..prefix);
    (prefix, suffix)
}

/// Drop bases shared at the start and then at the end of `reference` and
/// `alt`. Returns `(prefix_trimmed, suffix_trimmed)`.
pub fn trim_prefix_then_suffix(reference: &mut Vec<u8>, alt: &mut Vec<u8>) -> (usize, usize) {
    let prefix = common_prefix_len(reference, alt);
    reference.drain(..prefix);
    alt.drain(..prefix);
    let suffix = common_suffix_len(reference, alt);
    reference.truncate(reference.len() - suffix);
    alt.truncate(alt.len() - suffix);
    (prefix, suffix)
}
