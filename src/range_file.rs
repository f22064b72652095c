//! Text serialization of genome range trees.
//!
//! One range per line, `chrom<TAB>start<TAB>end`, with a fourth column when
//! the range value has one. Lines starting with `#` before the first record
//! are header metadata and are carried through untouched. Records are written
//! in natural chromosome order and ascending start within a chromosome, so
//! two runs over the same input diff cleanly.

use crate::error::{Error, Result};
use crate::genome_tree::GenomeRangeTree;
use crate::range_tree::merge;
use log::info;
use memchr::memchr;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Buffer size for RangeWriter (256KB).
const DEFAULT_BUFFER_SIZE: usize = 256 * 1024;

/// A range value that can be written as (at most) one text column.
pub trait RangeValue: Sized {
    /// Whether records carry a fourth column for this value type.
    const HAS_COLUMN: bool;

    fn write_column<W: Write>(&self, out: &mut W) -> io::Result<()>;

    fn parse_column(field: &[u8]) -> Option<Self>;
}

impl RangeValue for () {
    const HAS_COLUMN: bool = false;

    fn write_column<W: Write>(&self, _out: &mut W) -> io::Result<()> {
        Ok(())
    }

    fn parse_column(_field: &[u8]) -> Option<Self> {
        Some(())
    }
}

impl RangeValue for u32 {
    const HAS_COLUMN: bool = true;

    fn write_column<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_all(itoa::Buffer::new().format(*self).as_bytes())
    }

    fn parse_column(field: &[u8]) -> Option<Self> {
        parse_u32_fast(field)
    }
}

impl RangeValue for u64 {
    const HAS_COLUMN: bool = true;

    fn write_column<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_all(itoa::Buffer::new().format(*self).as_bytes())
    }

    fn parse_column(field: &[u8]) -> Option<Self> {
        std::str::from_utf8(field).ok()?.parse().ok()
    }
}

impl RangeValue for String {
    const HAS_COLUMN: bool = true;

    fn write_column<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_all(self.as_bytes())
    }

    fn parse_column(field: &[u8]) -> Option<Self> {
        let s = std::str::from_utf8(field).ok()?;
        (!s.is_empty() && !s.contains('\t')).then(|| s.to_string())
    }
}

/// Fast u32 parsing without allocation. Rejects empty input, non-digits
/// and overflow.
#[inline(always)]
pub fn parse_u32_fast(bytes: &[u8]) -> Option<u32> {
    if bytes.is_empty() {
        return None;
    }
    let mut n: u32 = 0;
    for &b in bytes {
        let d = b.wrapping_sub(b'0');
        if d > 9 {
            return None;
        }
        n = n.checked_mul(10)?.checked_add(d as u32)?;
    }
    Some(n)
}

/// Buffered writer for range records, formatting integers with itoa.
pub struct RangeWriter<W: Write> {
    writer: BufWriter<W>,
    itoa_buf: itoa::Buffer,
}

impl<W: Write> RangeWriter<W> {
    pub fn new(output: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, output),
            itoa_buf: itoa::Buffer::new(),
        }
    }

    /// Write one header line; a leading `#` is added if missing.
    pub fn write_header_line(&mut self, line: &str) -> io::Result<()> {
        if !line.starts_with('#') {
            self.writer.write_all(b"#")?;
        }
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")
    }

    /// Write one record followed by newline.
    #[inline]
    pub fn write_range<V: RangeValue>(
        &mut self,
        chrom: &str,
        start: u32,
        end: u32,
        value: &V,
    ) -> io::Result<()> {
        self.writer.write_all(chrom.as_bytes())?;
        self.writer.write_all(b"\t")?;
        self.writer
            .write_all(self.itoa_buf.format(start).as_bytes())?;
        self.writer.write_all(b"\t")?;
        self.writer.write_all(self.itoa_buf.format(end).as_bytes())?;
        if V::HAS_COLUMN {
            self.writer.write_all(b"\t")?;
            value.write_column(&mut self.writer)?;
        }
        self.writer.write_all(b"\n")
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// A genome range tree together with the header lines it was read with.
#[derive(Debug, Clone, Default)]
pub struct RangeFile<V = ()> {
    pub header: Vec<String>,
    pub tree: GenomeRangeTree<V>,
}

impl<V: RangeValue> RangeFile<V> {
    pub fn new(tree: GenomeRangeTree<V>) -> Self {
        Self {
            header: Vec::new(),
            tree,
        }
    }

    /// Serialize header and records.
    pub fn write_to<W: Write>(&self, output: W) -> io::Result<()> {
        let mut writer = RangeWriter::new(output);
        for line in &self.header {
            writer.write_header_line(line)?;
        }
        for (chrom, tree) in self.tree.iter_sorted() {
            for r in tree.ranges() {
                writer.write_range(chrom, r.start, r.end, &r.value)?;
            }
        }
        writer.flush()
    }

    /// Write to `path` through a temporary file in the same directory, so the
    /// destination only appears once it is complete.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        self.write_to(tmp.as_file_mut())?;
        tmp.persist(path).map_err(|e| Error::Io(e.error))?;
        info!(
            "Wrote {} ranges on {} sequences to {}",
            self.tree.num_ranges(),
            self.tree.num_chromosomes(),
            path.display()
        );
        Ok(())
    }

    /// Parse a serialized tree. Any malformed line fails the whole read.
    ///
    /// Records are merged with keep-first semantics, so a file with
    /// overlapping records loads as their union.
    pub fn read_from<R: Read>(input: R) -> Result<Self> {
        let mut reader = BufReader::new(input);
        let mut header = Vec::new();
        let mut tree = GenomeRangeTree::new();
        let mut line_buf = Vec::with_capacity(1024);
        let mut line_number = 0;
        let mut seen_record = false;

        loop {
            line_buf.clear();
            if reader.read_until(b'\n', &mut line_buf)? == 0 {
                break;
            }
            line_number += 1;

            let mut line = line_buf.as_slice();
            while let Some((&last, rest)) = line.split_last() {
                if last == b'\n' || last == b'\r' {
                    line = rest;
                } else {
                    break;
                }
            }
            if line.is_empty() {
                continue;
            }

            if line[0] == b'#' {
                if seen_record {
                    return Err(Error::Parse {
                        line: line_number,
                        message: "header line after the first record".to_string(),
                    });
                }
                header.push(String::from_utf8_lossy(line).into_owned());
                continue;
            }

            seen_record = true;
            let (chrom, start, end, value) =
                parse_record::<V>(line).ok_or_else(|| Error::Parse {
                    line: line_number,
                    message: format!(
                        "expected chrom, start, end{}; got '{}'",
                        if V::HAS_COLUMN { ", value" } else { "" },
                        String::from_utf8_lossy(line)
                    ),
                })?;
            if start > end {
                return Err(Error::Parse {
                    line: line_number,
                    message: format!("Start ({}) > end ({})", start, end),
                });
            }
            tree.add_value(chrom, start, end, value)?;
        }

        Ok(Self { header, tree })
    }

    /// Read a serialized tree from `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let range_file = Self::read_from(file)?;
        info!(
            "Read {} ranges on {} sequences from {}",
            range_file.tree.num_ranges(),
            range_file.tree.num_chromosomes(),
            path.display()
        );
        Ok(range_file)
    }
}

fn parse_record<V: RangeValue>(line: &[u8]) -> Option<(&str, u32, u32, V)> {
    let tab1 = memchr(b'\t', line)?;
    let chrom = std::str::from_utf8(&line[..tab1]).ok()?;
    if chrom.is_empty() {
        return None;
    }

    let rest1 = &line[tab1 + 1..];
    let tab2 = memchr(b'\t', rest1)?;
    let start = parse_u32_fast(&rest1[..tab2])?;

    let rest2 = &rest1[tab2 + 1..];
    match memchr(b'\t', rest2) {
        Some(tab3) if V::HAS_COLUMN => {
            let end = parse_u32_fast(&rest2[..tab3])?;
            let value = V::parse_column(&rest2[tab3 + 1..])?;
            Some((chrom, start, end, value))
        }
        None if !V::HAS_COLUMN => {
            let end = parse_u32_fast(rest2)?;
            Some((chrom, start, end, V::parse_column(b"")?))
        }
        _ => None,
    }
}

/// Union two serialized trees into `output`. The header of the first input
/// is kept, followed by any header lines of the second not already present.
pub fn file_or<P, Q, O>(input1: P, input2: Q, output: O) -> Result<RangeFile>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    O: AsRef<Path>,
{
    let mut first: RangeFile = RangeFile::load(input1)?;
    let second: RangeFile = RangeFile::load(input2)?;

    for line in second.header {
        if !first.header.contains(&line) {
            first.header.push(line);
        }
    }
    first.tree.union_with(second.tree, merge::keep_first)?;

    first.save(output)?;
    Ok(first)
}

/// Intersect two serialized trees into `output`.
///
/// Not supported: only the in-memory
/// [`GenomeRangeTree::intersection_size`] is available.
pub fn file_and<P, Q, O>(_input1: P, _input2: Q, _output: O) -> Result<RangeFile>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    O: AsRef<Path>,
{
    Err(Error::Unimplemented(
        "intersection of two serialized range trees",
    ))
}
