//! Sliding windows over named sequences.
//!
//! A window holds the uppercase bases of `[start, end)` of one sequence.
//! `fetch` replaces the whole window; backends may return more than was
//! asked for but never less, always clipped to the real sequence length.
//! Windows are single-owner: give each worker its own.

mod memory;
mod provider;
mod two_bit;

pub use memory::MemoryWindow;
pub use provider::{ProviderWindow, SequenceProvider};
pub use two_bit::{write_two_bit, TwoBitFile, TwoBitWindow};

use crate::error::{Error, Result};

/// A window of uppercase bases over one named sequence.
pub trait SeqWindow {
    /// Make the window cover at least `[start, end)` of `name` (clipped to
    /// the sequence length).
    fn fetch(&mut self, name: &str, start: u32, end: u32) -> Result<()>;

    /// Name of the sequence currently held, if any.
    fn seq_name(&self) -> Option<&str>;

    /// Start of the window on the sequence.
    fn start(&self) -> u32;

    /// End (exclusive) of the window on the sequence.
    fn end(&self) -> u32;

    /// The window's bases; `bases()[0]` is at `start()`.
    fn bases(&self) -> &[u8];

    /// Whether `[start, end)` of `name` is already materialized.
    fn covers(&self, name: &str, start: u32, end: u32) -> bool {
        self.seq_name() == Some(name) && start >= self.start() && end <= self.end()
    }

    /// Base at sequence position `pos`, if it lies in the window.
    #[inline]
    fn base_at(&self, pos: u32) -> Option<u8> {
        if pos < self.start() {
            return None;
        }
        self.bases().get((pos - self.start()) as usize).copied()
    }

    /// Bases of `[start, end)`, which must lie in the window.
    fn slice(&self, start: u32, end: u32) -> Result<&[u8]> {
        if start > end || start < self.start() || end > self.end() {
            return Err(Error::OutOfWindowBounds {
                start,
                end,
                window_start: self.start(),
                window_end: self.end(),
            });
        }
        let offset = (start - self.start()) as usize;
        Ok(&self.bases()[offset..offset + (end - start) as usize])
    }

    /// Replace `out` with the `len` bases starting at `start`.
    fn copy_into(&self, start: u32, len: u32, out: &mut Vec<u8>) -> Result<()> {
        let end = start.checked_add(len).ok_or(Error::OutOfWindowBounds {
            start,
            end: u32::MAX,
            window_start: self.start(),
            window_end: self.end(),
        })?;
        let bases = self.slice(start, end)?;
        out.clear();
        out.extend_from_slice(bases);
        Ok(())
    }
}
