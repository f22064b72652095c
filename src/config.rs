//! Tunable constants and option structs.
//!
//! Nothing here is process-global: every consumer receives its options
//! explicitly, so two projectors with different settings can coexist.

/// Minimum genomic-minus-transcript gap for an alignment gap to count as an intron.
/// Shorter gaps are indels between genome and transcript.
pub const MIN_INTRON: u32 = 45;

/// Bases fetched on either side of a request by the cached window backends.
pub const WINDOW_CACHE_MARGIN: u32 = 4096;

/// Minimum context fetched on each side of a variant before shifting it.
pub const MIN_SHIFT_PADDING: u32 = 128;

/// `max_shift` value meaning "shift as far as the sequence allows".
pub const INDEL_SHIFT_NO_MAX: u32 = 0;

/// Options for [`crate::projector::VariantProjector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectorConfig {
    /// Gaps whose genomic length exceeds the transcript length by at least
    /// this much are introns.
    pub min_intron: u32,
}

impl Default for ProjectorConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectorConfig {
    pub fn new() -> Self {
        Self {
            min_intron: MIN_INTRON,
        }
    }

    /// Set the minimum intron size.
    pub fn with_min_intron(mut self, min_intron: u32) -> Self {
        self.min_intron = min_intron;
        self
    }
}

/// Options for the cached (two-bit and provider-backed) sequence windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowConfig {
    /// Padding added to both sides of every fetch.
    pub cache_margin: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowConfig {
    pub fn new() -> Self {
        Self {
            cache_margin: WINDOW_CACHE_MARGIN,
        }
    }

    /// Set the fetch padding.
    pub fn with_cache_margin(mut self, cache_margin: u32) -> Self {
        self.cache_margin = cache_margin;
        self
    }

    /// Expand `[start, end)` by the cache margin, clipped to `[0, size)`.
    #[inline]
    pub fn padded(&self, start: u32, end: u32, size: u32) -> (u32, u32) {
        let padded_start = start.saturating_sub(self.cache_margin);
        let padded_end = end.saturating_add(self.cache_margin).min(size);
        (padded_start.min(padded_end), padded_end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_projector_config() {
        let config = ProjectorConfig::default();
        assert_eq!(config.min_intron, 45);
        assert_eq!(config.with_min_intron(30).min_intron, 30);
    }

    #[test]
    fn test_window_padding_clips() {
        let config = WindowConfig::default();
        assert_eq!(config.padded(100, 200, 1_000_000), (0, 4296));
        assert_eq!(config.padded(10_000, 10_010, 12_000), (5904, 12_000));
        assert_eq!(config.padded(500, 600, 550), (0, 550));
    }
}
