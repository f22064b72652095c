// Clippy allows for the whole crate
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]

//! genorange: genome range trees and variant projection
//!
//! This library provides per-chromosome interval trees with merge-on-insert
//! semantics, and the machinery to place indels and project genomic variants
//! onto transcripts and proteins.
//!
//! # Features
//!
//! - **Range trees**: disjoint, merged ranges per sequence with overlap,
//!   enclosing, closest and coverage queries
//! - **Parallel processing**: chromosome-sharded builds and reductions with Rayon
//! - **Sequence windows**: in-memory, `.2bit` and provider-backed sequence access
//! - **Variant projection**: 3'-shifted transcript and protein coordinates
//!
//! # Example
//!
//! ```rust,no_run
//! use genorange::{bed, parallel::build_genome_tree};
//!
//! let a = build_genome_tree(bed::read_intervals("a.bed").unwrap()).unwrap();
//! let b = build_genome_tree(bed::read_intervals("b.bed").unwrap()).unwrap();
//!
//! println!("{} bases in common", a.intersection_size(&b));
//! ```

pub mod alignment;
pub mod bed;
pub mod config;
pub mod error;
pub mod genome_tree;
pub mod indel_shift;
pub mod interval;
pub mod parallel;
pub mod projector;
pub mod range_file;
pub mod range_tree;
pub mod seq_window;
pub mod sequence;

// Re-export commonly used types
pub use alignment::Psl;
pub use bed::{read_intervals, BedReader};
pub use config::{ProjectorConfig, WindowConfig, INDEL_SHIFT_NO_MAX, MIN_INTRON};
pub use error::{Error, Result};
pub use genome_tree::GenomeRangeTree;
pub use interval::{Interval, Strand};
pub use projector::{Cds, TxPosition, TxRegion, VariantPeptide, VariantProjection, VariantProjector};
pub use range_file::RangeFile;
pub use range_tree::{IntervalTree, Range};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::alignment::Psl;
    pub use crate::bed::{read_intervals, BedReader};
    pub use crate::genome_tree::GenomeRangeTree;
    pub use crate::indel_shift::{indel_shift, ShiftDirection};
    pub use crate::interval::{Interval, Strand};
    pub use crate::projector::{Cds, VariantProjector};
    pub use crate::range_file::RangeFile;
    pub use crate::range_tree::{merge, IntervalTree, Range};
    pub use crate::seq_window::{MemoryWindow, SeqWindow, TwoBitFile, TwoBitWindow};
}
