//! Spliced transcript-to-genome alignments (PSL records).
//!
//! Block `i` aligns genome `t_starts[i]..t_starts[i] + block_sizes[i]` to
//! transcript `q_starts[i]..q_starts[i] + block_sizes[i]`. As in PSL, the
//! query coordinates of a minus-strand alignment are on the reverse
//! complement of the transcript, so blocks always ascend on both sides.

use crate::error::{Error, Result};
use crate::interval::Strand;

/// One spliced alignment of a transcript (query) to a genome (target).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Psl {
    pub q_name: String,
    pub q_size: u32,
    pub q_start: u32,
    pub q_end: u32,
    pub t_name: String,
    pub t_size: u32,
    pub t_start: u32,
    pub t_end: u32,
    pub strand: Strand,
    pub block_sizes: Vec<u32>,
    pub q_starts: Vec<u32>,
    pub t_starts: Vec<u32>,
}

/// A run of alignment blocks joined by gaps too short to be introns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExonSpan {
    pub t_start: u32,
    pub t_end: u32,
    pub first_block: usize,
    pub last_block: usize,
}

fn parse_u32_list(field: &str) -> Option<Vec<u32>> {
    field
        .split(',')
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().ok())
        .collect()
}

impl Psl {
    /// Build an alignment from `(q_start, t_start, size)` blocks. Query
    /// starts are in alignment orientation (reverse-complemented transcript
    /// for the minus strand).
    pub fn from_blocks(
        q_name: impl Into<String>,
        q_size: u32,
        t_name: impl Into<String>,
        t_size: u32,
        strand: Strand,
        blocks: &[(u32, u32, u32)],
    ) -> Self {
        let block_sizes: Vec<u32> = blocks.iter().map(|b| b.2).collect();
        let q_starts: Vec<u32> = blocks.iter().map(|b| b.0).collect();
        let t_starts: Vec<u32> = blocks.iter().map(|b| b.1).collect();

        let (aln_q_start, aln_q_end) = match (blocks.first(), blocks.last()) {
            (Some(first), Some(last)) => (first.0, last.0 + last.2),
            _ => (0, 0),
        };
        let (q_start, q_end) = if strand.is_minus() {
            (
                q_size.saturating_sub(aln_q_end),
                q_size.saturating_sub(aln_q_start),
            )
        } else {
            (aln_q_start, aln_q_end)
        };
        let t_start = t_starts.first().copied().unwrap_or(0);
        let t_end = blocks.last().map_or(0, |b| b.1 + b.2);

        Self {
            q_name: q_name.into(),
            q_size,
            q_start,
            q_end,
            t_name: t_name.into(),
            t_size,
            t_start,
            t_end,
            strand,
            block_sizes,
            q_starts,
            t_starts,
        }
    }

    /// Parse one 21-column PSL line. `line_number` is used in errors.
    pub fn from_line(line: &str, line_number: usize) -> Result<Self> {
        let parse_err = |message: String| Error::Parse {
            line: line_number,
            message,
        };
        let fields: Vec<&str> = line.trim_end().split('\t').collect();
        if fields.len() < 21 {
            return Err(parse_err(format!(
                "expected 21 PSL columns, found {}",
                fields.len()
            )));
        }
        let num = |i: usize| -> Result<u32> {
            fields[i].parse().map_err(|_| {
                parse_err(format!("invalid number '{}' in column {}", fields[i], i + 1))
            })
        };
        let list = |i: usize| -> Result<Vec<u32>> {
            parse_u32_list(fields[i]).ok_or_else(|| {
                parse_err(format!("invalid list '{}' in column {}", fields[i], i + 1))
            })
        };

        let strand = match fields[8].chars().next() {
            Some(c @ ('+' | '-')) => Strand::from_char(c),
            _ => return Err(parse_err(format!("invalid strand '{}'", fields[8]))),
        };
        let block_count = num(17)? as usize;
        let psl = Self {
            q_name: fields[9].to_string(),
            q_size: num(10)?,
            q_start: num(11)?,
            q_end: num(12)?,
            t_name: fields[13].to_string(),
            t_size: num(14)?,
            t_start: num(15)?,
            t_end: num(16)?,
            strand,
            block_sizes: list(18)?,
            q_starts: list(19)?,
            t_starts: list(20)?,
        };
        if psl.block_sizes.len() != block_count {
            return Err(parse_err(format!(
                "blockCount {} does not match {} block sizes",
                block_count,
                psl.block_sizes.len()
            )));
        }
        Ok(psl)
    }

    fn invalid(&self, message: String) -> Error {
        Error::InvalidAlignment {
            name: self.q_name.clone(),
            message,
        }
    }

    /// Check block counts, ordering and bounds.
    pub fn validate(&self) -> Result<()> {
        let n = self.block_sizes.len();
        if n == 0 {
            return Err(self.invalid("no alignment blocks".to_string()));
        }
        if self.q_starts.len() != n || self.t_starts.len() != n {
            return Err(self.invalid(format!(
                "block count mismatch: {} sizes, {} qStarts, {} tStarts",
                n,
                self.q_starts.len(),
                self.t_starts.len()
            )));
        }
        for i in 0..n {
            let size = self.block_sizes[i];
            if self.t_starts[i].checked_add(size).is_none()
                || self.q_starts[i].checked_add(size).is_none()
            {
                return Err(self.invalid(format!("block {} end overflows", i)));
            }
        }
        for i in 1..n {
            if self.t_starts[i] < self.t_block_end(i - 1) {
                return Err(self.invalid(format!("negative target gap before block {}", i)));
            }
            if self.q_starts[i] < self.q_block_end(i - 1) {
                return Err(self.invalid(format!("negative query gap before block {}", i)));
            }
        }
        if self.t_block_end(n - 1) > self.t_size {
            return Err(self.invalid(format!(
                "target end {} past target size {}",
                self.t_block_end(n - 1),
                self.t_size
            )));
        }
        if self.q_block_end(n - 1) > self.q_size {
            return Err(self.invalid(format!(
                "query end {} past query size {}",
                self.q_block_end(n - 1),
                self.q_size
            )));
        }
        if self.t_start != self.t_starts[0] || self.t_end != self.t_block_end(n - 1) {
            return Err(self.invalid(format!(
                "target span {}-{} does not match blocks",
                self.t_start, self.t_end
            )));
        }
        Ok(())
    }

    #[inline]
    pub fn block_count(&self) -> usize {
        self.block_sizes.len()
    }

    #[inline]
    pub fn t_block_end(&self, i: usize) -> u32 {
        self.t_starts[i] + self.block_sizes[i]
    }

    #[inline]
    pub fn q_block_end(&self, i: usize) -> u32 {
        self.q_starts[i] + self.block_sizes[i]
    }

    /// Whether the gap after block `i` is an intron: its genomic length
    /// exceeds its transcript length by at least `min_intron`.
    pub fn gap_is_intron(&self, i: usize, min_intron: u32) -> bool {
        if i + 1 >= self.block_count() {
            return false;
        }
        let t_gap = self.t_starts[i + 1] - self.t_block_end(i);
        let q_gap = self.q_starts[i + 1] - self.q_block_end(i);
        t_gap.saturating_sub(q_gap) >= min_intron
    }

    /// Blocks merged across non-intron gaps, in genomic order.
    pub fn exon_spans(&self, min_intron: u32) -> Vec<ExonSpan> {
        let mut spans: Vec<ExonSpan> = Vec::new();
        for i in 0..self.block_count() {
            match spans.last_mut() {
                Some(span) if !self.gap_is_intron(i - 1, min_intron) => {
                    span.t_end = self.t_block_end(i);
                    span.last_block = i;
                }
                _ => spans.push(ExonSpan {
                    t_start: self.t_starts[i],
                    t_end: self.t_block_end(i),
                    first_block: i,
                    last_block: i,
                }),
            }
        }
        spans
    }

    /// Non-intron gaps as `(after_block, t_start, t_end)`, including
    /// transcript-only gaps of zero genomic length.
    pub fn indel_gaps(&self, min_intron: u32) -> Vec<(usize, u32, u32)> {
        (0..self.block_count().saturating_sub(1))
            .filter(|&i| !self.gap_is_intron(i, min_intron))
            .filter(|&i| {
                self.t_starts[i + 1] > self.t_block_end(i)
                    || self.q_starts[i + 1] > self.q_block_end(i)
            })
            .map(|i| (i, self.t_block_end(i), self.t_starts[i + 1]))
            .collect()
    }

    /// Genomic position of alignment-orientation query offset `q`, if it
    /// falls in (or on the edge of) a block.
    pub fn q_to_t(&self, q: u32) -> Option<u32> {
        (0..self.block_count())
            .find(|&i| self.q_starts[i] <= q && q <= self.q_block_end(i))
            .map(|i| self.t_starts[i] + (q - self.q_starts[i]))
    }

    /// Index of the block containing genomic position `t`.
    pub fn block_containing(&self, t: u32) -> Option<usize> {
        (0..self.block_count()).find(|&i| self.t_starts[i] <= t && t < self.t_block_end(i))
    }
}
