//! Memory-mapped `.2bit` genome files.
//!
//! Layout: a 16-byte header (signature, version, sequence count, reserved),
//! an index of `(name, record offset)` pairs, then one record per sequence:
//! DNA size, N-block starts and sizes, mask-block starts and sizes, a reserved
//! word and the packed bases, four per byte, most significant pair first
//! (`T=0 C=1 A=2 G=3`). Version 1 files use 64-bit record offsets. Files
//! written on a machine of the other byte order have a byte-swapped
//! signature.

use super::provider::{ProviderWindow, SequenceProvider};
use crate::error::{Error, Result};
use log::debug;
use memmap2::Mmap;
use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

const SIGNATURE: u32 = 0x1A41_2743;
const HEADER_SIZE: usize = 16;
const BASES: [u8; 4] = [b'T', b'C', b'A', b'G'];

/// A window over a `.2bit` file.
pub type TwoBitWindow = ProviderWindow<TwoBitFile>;

#[derive(Debug, Clone)]
struct TwoBitRecord {
    dna_size: u32,
    n_blocks: Vec<(u32, u32)>,
    dna_offset: usize,
}

/// An open `.2bit` file with its sequence index.
#[derive(Debug)]
pub struct TwoBitFile {
    data: Mmap,
    names: Vec<String>,
    records: FxHashMap<String, TwoBitRecord>,
}

fn invalid(message: impl Into<String>) -> Error {
    Error::Io(io::Error::new(io::ErrorKind::InvalidData, message.into()))
}

struct ByteReader<'a> {
    data: &'a [u8],
    swapped: bool,
}

impl ByteReader<'_> {
    fn u32_at(&self, offset: usize) -> Result<u32> {
        let bytes = self
            .data
            .get(offset..offset + 4)
            .ok_or_else(|| invalid(format!("2bit file truncated at offset {}", offset)))?;
        let value = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        Ok(if self.swapped { value.swap_bytes() } else { value })
    }

    fn u64_at(&self, offset: usize) -> Result<u64> {
        let bytes = self
            .data
            .get(offset..offset + 8)
            .ok_or_else(|| invalid(format!("2bit file truncated at offset {}", offset)))?;
        let mut word = [0u8; 8];
        word.copy_from_slice(bytes);
        let value = u64::from_le_bytes(word);
        Ok(if self.swapped { value.swap_bytes() } else { value })
    }

    fn u32_array(&self, offset: usize, count: usize) -> Result<Vec<u32>> {
        (0..count).map(|i| self.u32_at(offset + 4 * i)).collect()
    }
}

impl TwoBitFile {
    /// Map `path` and read its index.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        if (file.metadata()?.len() as usize) < HEADER_SIZE {
            return Err(invalid(format!("{} is too small to be a 2bit file", path.display())));
        }
        let data = unsafe { Mmap::map(&file)? };
        let two_bit = Self::from_mmap(data)?;
        debug!(
            "Opened {} with {} sequences",
            path.display(),
            two_bit.names.len()
        );
        Ok(two_bit)
    }

    fn from_mmap(data: Mmap) -> Result<Self> {
        let mut reader = ByteReader {
            data: &data,
            swapped: false,
        };
        match reader.u32_at(0)? {
            SIGNATURE => {}
            sig if sig.swap_bytes() == SIGNATURE => reader.swapped = true,
            sig => return Err(invalid(format!("bad 2bit signature {:#x}", sig))),
        }
        let version = reader.u32_at(4)?;
        if version > 1 {
            return Err(invalid(format!("unsupported 2bit version {}", version)));
        }
        let seq_count = reader.u32_at(8)? as usize;

        let mut names = Vec::with_capacity(seq_count);
        let mut records = FxHashMap::default();
        let mut pos = HEADER_SIZE;
        for _ in 0..seq_count {
            let name_len = *data
                .get(pos)
                .ok_or_else(|| invalid("2bit index truncated"))? as usize;
            let name = data
                .get(pos + 1..pos + 1 + name_len)
                .ok_or_else(|| invalid("2bit index truncated"))?;
            let name = String::from_utf8_lossy(name).into_owned();
            pos += 1 + name_len;

            let offset = if version == 1 {
                let offset = reader.u64_at(pos)?;
                pos += 8;
                offset as usize
            } else {
                let offset = reader.u32_at(pos)?;
                pos += 4;
                offset as usize
            };

            let record = Self::read_record(&reader, offset)?;
            names.push(name.clone());
            records.insert(name, record);
        }

        Ok(Self {
            data,
            names,
            records,
        })
    }

    fn read_record(reader: &ByteReader<'_>, offset: usize) -> Result<TwoBitRecord> {
        let dna_size = reader.u32_at(offset)?;
        let n_count = reader.u32_at(offset + 4)? as usize;
        let n_starts = reader.u32_array(offset + 8, n_count)?;
        let n_sizes = reader.u32_array(offset + 8 + 4 * n_count, n_count)?;
        let mask_pos = offset + 8 + 8 * n_count;
        let mask_count = reader.u32_at(mask_pos)? as usize;
        // Soft-masking is skipped: windows are uppercase.
        let dna_offset = mask_pos + 4 + 8 * mask_count + 4;

        let packed_len = (dna_size as usize).div_ceil(4);
        if dna_offset + packed_len > reader.data.len() {
            return Err(invalid("2bit sequence data truncated"));
        }

        Ok(TwoBitRecord {
            dna_size,
            n_blocks: n_starts.into_iter().zip(n_sizes).collect(),
            dna_offset,
        })
    }

    /// Sequence names in file order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Open a window over this file.
    pub fn into_window(self) -> TwoBitWindow {
        ProviderWindow::new(self)
    }
}

impl SequenceProvider for TwoBitFile {
    fn seq_len(&self, name: &str) -> Option<u32> {
        self.records.get(name).map(|r| r.dna_size)
    }

    fn fetch_bases(&self, name: &str, start: u32, end: u32) -> Result<Vec<u8>> {
        let record = self
            .records
            .get(name)
            .ok_or_else(|| Error::SequenceNotFound(name.to_string()))?;
        if start > end || end > record.dna_size {
            return Err(Error::RangeOutOfBounds {
                name: name.to_string(),
                start,
                end,
                size: record.dna_size,
            });
        }

        let packed = &self.data[record.dna_offset..];
        let mut bases: Vec<u8> = (start..end)
            .map(|pos| {
                let byte = packed[(pos / 4) as usize];
                let shift = 6 - 2 * (pos % 4);
                BASES[((byte >> shift) & 0b11) as usize]
            })
            .collect();

        for &(n_start, n_size) in &record.n_blocks {
            let n_end = n_start.saturating_add(n_size);
            let from = n_start.max(start);
            let to = n_end.min(end);
            if from < to {
                bases[(from - start) as usize..(to - start) as usize].fill(b'N');
            }
        }
        Ok(bases)
    }
}

/// Runs of positions where `pred` holds, as `(start, size)` pairs.
fn blocks(seq: &[u8], pred: impl Fn(u8) -> bool) -> Vec<(u32, u32)> {
    let mut out = Vec::new();
    let mut run_start: Option<usize> = None;
    for (i, &b) in seq.iter().enumerate() {
        match (pred(b), run_start) {
            (true, None) => run_start = Some(i),
            (false, Some(s)) => {
                out.push((s as u32, (i - s) as u32));
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = run_start {
        out.push((s as u32, (seq.len() - s) as u32));
    }
    out
}

fn write_u32<W: Write>(out: &mut W, value: u32) -> io::Result<()> {
    out.write_all(&value.to_le_bytes())
}

/// Write `seqs` as a version 0, little-endian `.2bit` file. Anything other
/// than `ACGT` is stored as `N`; lowercase runs become mask blocks.
pub fn write_two_bit<W: Write>(out: &mut W, seqs: &[(&str, &[u8])]) -> io::Result<()> {
    let index_size: usize = seqs.iter().map(|(name, _)| 1 + name.len() + 4).sum();

    let mut layouts = Vec::with_capacity(seqs.len());
    let mut offset = HEADER_SIZE + index_size;
    for (name, seq) in seqs {
        if name.len() > u8::MAX as usize {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("sequence name too long: {}", name),
            ));
        }
        let n_blocks = blocks(seq, |b| {
            !matches!(b.to_ascii_uppercase(), b'A' | b'C' | b'G' | b'T')
        });
        let mask_blocks = blocks(seq, |b| b.is_ascii_lowercase());
        let size = 4
            + 4
            + 8 * n_blocks.len()
            + 4
            + 8 * mask_blocks.len()
            + 4
            + seq.len().div_ceil(4);
        layouts.push((offset, n_blocks, mask_blocks));
        offset += size;
    }
    if offset > u32::MAX as usize {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "sequences too large for a version 0 2bit file",
        ));
    }

    write_u32(out, SIGNATURE)?;
    write_u32(out, 0)?;
    write_u32(out, seqs.len() as u32)?;
    write_u32(out, 0)?;

    for ((name, _), (offset, _, _)) in seqs.iter().zip(&layouts) {
        out.write_all(&[name.len() as u8])?;
        out.write_all(name.as_bytes())?;
        write_u32(out, *offset as u32)?;
    }

    for ((_, seq), (_, n_blocks, mask_blocks)) in seqs.iter().zip(&layouts) {
        write_u32(out, seq.len() as u32)?;
        for list in [n_blocks, mask_blocks] {
            write_u32(out, list.len() as u32)?;
            for &(start, _) in list {
                write_u32(out, start)?;
            }
            for &(_, size) in list {
                write_u32(out, size)?;
            }
        }
        write_u32(out, 0)?;

        for chunk in seq.chunks(4) {
            let mut byte = 0u8;
            for (i, &b) in chunk.iter().enumerate() {
                let code = match b.to_ascii_uppercase() {
                    b'C' => 1,
                    b'A' => 2,
                    b'G' => 3,
                    _ => 0,
                };
                byte |= code << (6 - 2 * i);
            }
            out.write_all(&[byte])?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seq_window::SeqWindow;
    use tempfile::NamedTempFile;

    fn fixture(seqs: &[(&str, &[u8])]) -> NamedTempFile {
        let mut tmp = NamedTempFile::new().unwrap();
        write_two_bit(tmp.as_file_mut(), seqs).unwrap();
        tmp
    }

    #[test]
    fn test_read_back_with_n_and_mask() {
        let tmp = fixture(&[
            ("chr1", b"ACGTacgtNNNNGATTACA".as_slice()),
            ("chrM", b"ttag".as_slice()),
        ]);
        let two_bit = TwoBitFile::open(tmp.path()).unwrap();

        assert_eq!(two_bit.names(), &["chr1".to_string(), "chrM".to_string()]);
        assert_eq!(two_bit.seq_len("chr1"), Some(19));
        assert_eq!(
            two_bit.fetch_bases("chr1", 0, 19).unwrap(),
            b"ACGTACGTNNNNGATTACA"
        );
        assert_eq!(two_bit.fetch_bases("chr1", 6, 13).unwrap(), b"GTNNNNG");
        assert_eq!(two_bit.fetch_bases("chrM", 1, 4).unwrap(), b"TAG");
        assert!(two_bit.fetch_bases("chrM", 0, 5).is_err());
        assert!(two_bit.fetch_bases("chrX", 0, 1).is_err());
    }

    #[test]
    fn test_window_over_two_bit() {
        let tmp = fixture(&[("chr1", b"AAAACCCCGGGGTTTT".as_slice())]);
        let mut window = TwoBitFile::open(tmp.path()).unwrap().into_window();
        window.fetch("chr1", 4, 8).unwrap();
        assert_eq!((window.start(), window.end()), (0, 16));
        assert_eq!(window.slice(4, 8).unwrap(), b"CCCC");
    }

    #[test]
    fn test_rejects_bad_signature() {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(&[0u8; 32]).unwrap();
        assert!(TwoBitFile::open(tmp.path()).is_err());
    }

    #[test]
    fn test_blocks() {
        assert_eq!(blocks(b"aaCCaC", |b| b.is_ascii_lowercase()), vec![(0, 2), (4, 1)]);
        assert!(blocks(b"", |_| true).is_empty());
    }
}
