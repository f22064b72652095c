//! Core genomic interval types.

use std::cmp::Ordering;
use std::fmt;

/// A genomic interval with chromosome, start, and end positions.
/// Uses 0-based, half-open coordinates (BED format).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Interval {
    pub chrom: String,
    pub start: u32,
    pub end: u32,
}

impl Interval {
    /// Create a new interval.
    #[inline]
    pub fn new(chrom: impl Into<String>, start: u32, end: u32) -> Self {
        Self {
            chrom: chrom.into(),
            start,
            end,
        }
    }

    /// Returns the length of the interval.
    #[inline]
    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// Returns true if the interval has zero length.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// Strand orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strand {
    Plus,
    Minus,
    Unknown,
}

impl Strand {
    pub fn from_char(c: char) -> Self {
        match c {
            '+' => Strand::Plus,
            '-' => Strand::Minus,
            _ => Strand::Unknown,
        }
    }

    #[inline]
    pub fn is_minus(self) -> bool {
        self == Strand::Minus
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strand::Plus => write!(f, "+"),
            Strand::Minus => write!(f, "-"),
            Strand::Unknown => write!(f, "."),
        }
    }
}

/// Compare sequence names with embedded numbers compared numerically,
/// so `chr2` sorts before `chr10`.
pub fn natural_compare(a: &str, b: &str) -> Ordering {
    let a_parts = split_numeric(a);
    let b_parts = split_numeric(b);

    for (ap, bp) in a_parts.iter().zip(b_parts.iter()) {
        let cmp = match (ap, bp) {
            (Part::Text(at), Part::Text(bt)) => at.cmp(bt),
            (Part::Number(an), Part::Number(bn)) => an.cmp(bn),
            (Part::Text(_), Part::Number(_)) => Ordering::Less,
            (Part::Number(_), Part::Text(_)) => Ordering::Greater,
        };
        if cmp != Ordering::Equal {
            return cmp;
        }
    }

    // Equal numeric values can still differ textually ("chr01" vs "chr1")
    a_parts.len().cmp(&b_parts.len()).then_with(|| a.cmp(b))
}

#[derive(Debug, PartialEq, Eq)]
enum Part<'a> {
    Text(&'a str),
    Number(u64),
}

fn split_numeric(s: &str) -> Vec<Part<'_>> {
    let mut parts = Vec::new();
    let bytes = s.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        let run_start = i;
        let digits = bytes[i].is_ascii_digit();
        while i < bytes.len() && bytes[i].is_ascii_digit() == digits {
            i += 1;
        }
        let run = &s[run_start..i];
        if digits {
            match run.parse() {
                Ok(n) => parts.push(Part::Number(n)),
                Err(_) => parts.push(Part::Text(run)),
            }
        } else {
            parts.push(Part::Text(run));
        }
    }

    parts
}
