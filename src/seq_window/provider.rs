use super::SeqWindow;
use crate::config::WindowConfig;
use crate::error::{Error, Result};
use log::debug;
use rustc_hash::FxHashMap;

/// Random access to the bases of named sequences, such as an indexed genome
/// file or a genome database.
pub trait SequenceProvider {
    /// Length of `name`, or `None` if the provider does not have it.
    fn seq_len(&self, name: &str) -> Option<u32>;

    /// Bases of `[start, end)` of `name`. `end` never exceeds `seq_len`.
    fn fetch_bases(&self, name: &str, start: u32, end: u32) -> Result<Vec<u8>>;
}

impl SequenceProvider for FxHashMap<String, Vec<u8>> {
    fn seq_len(&self, name: &str) -> Option<u32> {
        self.get(name).map(|s| s.len() as u32)
    }

    fn fetch_bases(&self, name: &str, start: u32, end: u32) -> Result<Vec<u8>> {
        let seq = self
            .get(name)
            .ok_or_else(|| Error::SequenceNotFound(name.to_string()))?;
        seq.get(start as usize..end as usize)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| Error::RangeOutOfBounds {
                name: name.to_string(),
                start,
                end,
                size: seq.len() as u32,
            })
    }
}

/// Window backed by a [`SequenceProvider`].
///
/// Every fetch goes back to the provider, padded on both sides by the cache
/// margin so that nearby follow-up requests can be answered from the buffer;
/// callers check [`SeqWindow::covers`] first.
#[derive(Debug)]
pub struct ProviderWindow<P> {
    provider: P,
    config: WindowConfig,
    name: Option<String>,
    start: u32,
    end: u32,
    bases: Vec<u8>,
}

impl<P: SequenceProvider> ProviderWindow<P> {
    /// An empty window, not yet bound to any sequence.
    pub fn new(provider: P) -> Self {
        Self::with_config(provider, WindowConfig::default())
    }

    pub fn with_config(provider: P, config: WindowConfig) -> Self {
        Self {
            provider,
            config,
            name: None,
            start: 0,
            end: 0,
            bases: Vec::new(),
        }
    }

    /// A window bound to `name`, holding an empty range at its start.
    pub fn bound(provider: P, name: &str) -> Result<Self> {
        let mut window = Self::new(provider);
        if window.provider.seq_len(name).is_none() {
            return Err(Error::SequenceNotFound(name.to_string()));
        }
        window.name = Some(name.to_string());
        Ok(window)
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}

impl<P: SequenceProvider> SeqWindow for ProviderWindow<P> {
    fn fetch(&mut self, name: &str, start: u32, end: u32) -> Result<()> {
        let size = self
            .provider
            .seq_len(name)
            .ok_or_else(|| Error::SequenceNotFound(name.to_string()))?;
        if start > size {
            return Err(Error::RangeOutOfBounds {
                name: name.to_string(),
                start,
                end,
                size,
            });
        }

        let (padded_start, padded_end) = self.config.padded(start, end, size);
        let mut bases = self.provider.fetch_bases(name, padded_start, padded_end)?;
        bases.make_ascii_uppercase();
        debug!(
            "Fetched {}:{}-{} for request {}-{}",
            name, padded_start, padded_end, start, end
        );

        self.bases = bases;
        self.start = padded_start;
        self.end = padded_end;
        if self.name.as_deref() != Some(name) {
            self.name = Some(name.to_string());
        }
        Ok(())
    }

    fn seq_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn start(&self) -> u32 {
        self.start
    }

    fn end(&self) -> u32 {
        self.end
    }

    fn bases(&self) -> &[u8] {
        &self.bases
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> FxHashMap<String, Vec<u8>> {
        let mut seqs = FxHashMap::default();
        seqs.insert("chr1".to_string(), b"acgtacgtac".to_vec());
        seqs
    }

    #[test]
    fn test_fetch_pads_and_clips() {
        let config = WindowConfig::new().with_cache_margin(2);
        let mut window = ProviderWindow::with_config(provider(), config);
        assert_eq!(window.seq_name(), None);

        window.fetch("chr1", 4, 6).unwrap();
        assert_eq!((window.start(), window.end()), (2, 8));
        assert_eq!(window.bases(), b"GTACGT");
        assert!(window.covers("chr1", 3, 7));

        window.fetch("chr1", 0, 20).unwrap();
        assert_eq!((window.start(), window.end()), (0, 10));
    }

    #[test]
    fn test_fetch_errors() {
        let mut window = ProviderWindow::new(provider());
        assert!(matches!(
            window.fetch("chrZ", 0, 1),
            Err(Error::SequenceNotFound(_))
        ));
        assert!(matches!(
            window.fetch("chr1", 11, 12),
            Err(Error::RangeOutOfBounds { size: 10, .. })
        ));
        assert!(ProviderWindow::bound(provider(), "chrZ").is_err());
    }

    #[test]
    fn test_bound_window() {
        let window = ProviderWindow::bound(provider(), "chr1").unwrap();
        assert_eq!(window.seq_name(), Some("chr1"));
        assert!(window.bases().is_empty());
    }
}
