//! Error type shared by the range trees, sequence windows and projector.

use std::io;
use thiserror::Error;

/// Errors that can occur in range-tree, sequence-window and projection operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid range: start ({start}) > end ({end})")]
    InvalidRange { start: u32, end: u32 },

    #[error("Sequence not found: {0}")]
    SequenceNotFound(String),

    #[error("Range {name}:{start}-{end} is out of bounds (sequence size {size})")]
    RangeOutOfBounds {
        name: String,
        start: u32,
        end: u32,
        size: u32,
    },

    #[error("Requested {start}-{end} is outside the current window {window_start}-{window_end}")]
    OutOfWindowBounds {
        start: u32,
        end: u32,
        window_start: u32,
        window_end: u32,
    },

    #[error("Invalid alignment {name}: {message}")]
    InvalidAlignment { name: String, message: String },

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Not implemented: {0}")]
    Unimplemented(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
