use super::SeqWindow;
use crate::error::{Error, Result};

/// Window over a sequence held entirely in memory.
///
/// The window is always the whole sequence, so `fetch` only checks that the
/// request names this sequence and starts inside it.
#[derive(Debug, Clone)]
pub struct MemoryWindow {
    name: String,
    bases: Vec<u8>,
}

impl MemoryWindow {
    pub fn new(name: impl Into<String>, seq: impl AsRef<[u8]>) -> Self {
        Self {
            name: name.into(),
            bases: seq.as_ref().to_ascii_uppercase(),
        }
    }

    pub fn len(&self) -> u32 {
        self.bases.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }
}

impl SeqWindow for MemoryWindow {
    fn fetch(&mut self, name: &str, start: u32, end: u32) -> Result<()> {
        if name != self.name {
            return Err(Error::SequenceNotFound(name.to_string()));
        }
        if start > self.len() {
            return Err(Error::RangeOutOfBounds {
                name: name.to_string(),
                start,
                end,
                size: self.len(),
            });
        }
        Ok(())
    }

    fn seq_name(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn start(&self) -> u32 {
        0
    }

    fn end(&self) -> u32 {
        self.len()
    }

    fn bases(&self) -> &[u8] {
        &self.bases
    }
}
