//! Shifting pure insertions and deletions along repeated sequence.
//!
//! An insertion or deletion inside a repeat can be placed at several
//! positions that all produce the same edited sequence. [`indel_shift`]
//! moves one to its leftmost or rightmost equivalent placement, rotating the
//! inserted bases so the edit still reads correctly at the new position.

use crate::config::{INDEL_SHIFT_NO_MAX, MIN_SHIFT_PADDING};
use crate::error::{Error, Result};
use crate::seq_window::SeqWindow;
use log::debug;

/// Direction in which to shift an indel, on the genomic (or protein) forward
/// strand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftDirection {
    Left,
    Right,
}

/// Only pure insertions and pure deletions can be shifted.
#[inline]
pub fn is_applicable(ref_len: u32, alt_len: u32) -> bool {
    (ref_len == 0) != (alt_len == 0)
}

/// Context to fetch around a variant before shifting it, clamped at zero on
/// the left. The caller clamps the right side to the sequence length.
pub fn shift_range_for_variant(start: u32, ref_len: u32, alt_len: u32) -> (u32, u32) {
    let padding = shift_padding(ref_len, alt_len);
    let range_start = start.saturating_sub(padding);
    let range_end = start
        .saturating_add(ref_len)
        .saturating_add(alt_len)
        .saturating_add(padding);
    (range_start, range_end)
}

fn shift_padding(ref_len: u32, alt_len: u32) -> u32 {
    MIN_SHIFT_PADDING.max(ref_len.saturating_mul(2).saturating_add(alt_len))
}

/// Shift the indel `[start, end)` -> `alt` on the sequence the window is
/// bound to, as far as it goes in `direction` but no more than `max_shift`
/// bases (unless `max_shift` is [`INDEL_SHIFT_NO_MAX`]).
///
/// On return `start` and `end` have moved by the shift and `alt` (upper-cased)
/// holds the inserted bases as they read at the new position. Returns the
/// number of bases shifted; substitutions and complex edits are left alone
/// and return 0.
pub fn indel_shift<W: SeqWindow + ?Sized>(
    window: &mut W,
    start: &mut u32,
    end: &mut u32,
    alt: &mut Vec<u8>,
    max_shift: u32,
    direction: ShiftDirection,
) -> Result<u32> {
    if *start > *end {
        return Err(Error::InvalidRange {
            start: *start,
            end: *end,
        });
    }
    let ref_len = *end - *start;
    let alt_len = alt.len() as u32;
    if !is_applicable(ref_len, alt_len) {
        return Ok(0);
    }

    let name = window
        .seq_name()
        .map(str::to_string)
        .ok_or_else(|| Error::SequenceNotFound(String::new()))?;
    alt.make_ascii_uppercase();

    let (range_start, range_end) = shift_range_for_variant(*start, ref_len, alt_len);
    if !window.covers(&name, range_start, range_end) {
        window.fetch(&name, range_start, range_end)?;
    }
    if *start < window.start() || *end > window.end() {
        return Err(Error::RangeOutOfBounds {
            name,
            start: *start,
            end: *end,
            size: window.end(),
        });
    }

    let padding = shift_padding(ref_len, alt_len);
    let shifted = match direction {
        ShiftDirection::Left => count_left(window, &name, *start, *end, alt, max_shift, padding)?,
        ShiftDirection::Right => {
            count_right(window, &name, *start, *end, alt, max_shift, padding)?
        }
    };
    if shifted == 0 {
        return Ok(0);
    }

    match direction {
        ShiftDirection::Left => {
            *start -= shifted;
            *end -= shifted;
            if alt_len > 0 {
                rotate_left_shifted(window, *start, alt, shifted)?;
            }
        }
        ShiftDirection::Right => {
            *start += shifted;
            *end += shifted;
            if alt_len > 0 {
                rotate_right_shifted(window, *start, alt, shifted)?;
            }
        }
    }
    debug!(
        "Shifted {}:{}-{} {:?} by {}",
        name, *start, *end, direction, shifted
    );
    Ok(shifted)
}

#[inline]
fn limit_reached(shifted: u32, max_shift: u32) -> bool {
    max_shift > INDEL_SHIFT_NO_MAX && shifted >= max_shift
}

fn count_left<W: SeqWindow + ?Sized>(
    window: &mut W,
    name: &str,
    start: u32,
    end: u32,
    alt: &[u8],
    max_shift: u32,
    mut pad: u32,
) -> Result<u32> {
    let alt_len = alt.len() as u32;
    let mut shifted = 0;
    while !limit_reached(shifted, max_shift) && shifted < start {
        let left_pos = start - 1 - shifted;
        if left_pos < window.start() {
            if window.start() == 0 {
                break;
            }
            pad = pad.saturating_mul(2);
            window.fetch(name, left_pos.saturating_sub(pad), end.saturating_add(pad))?;
            if left_pos < window.start() {
                break;
            }
            continue;
        }

        // The base that the shift would expose on the right side of the edit.
        let exposed = if alt_len == 0 {
            window.base_at(end - 1 - shifted)
        } else if shifted < alt_len {
            Some(alt[(alt_len - 1 - shifted) as usize])
        } else {
            window.base_at(left_pos + alt_len)
        };
        match (window.base_at(left_pos), exposed) {
            (Some(a), Some(b)) if a == b => shifted += 1,
            _ => break,
        }
    }
    Ok(shifted)
}

fn count_right<W: SeqWindow + ?Sized>(
    window: &mut W,
    name: &str,
    start: u32,
    end: u32,
    alt: &[u8],
    max_shift: u32,
    mut pad: u32,
) -> Result<u32> {
    let alt_len = alt.len() as u32;
    let mut shifted = 0;
    while !limit_reached(shifted, max_shift) {
        let Some(right_pos) = end.checked_add(shifted) else {
            break;
        };
        if right_pos >= window.end() {
            let old_end = window.end();
            pad = pad.saturating_mul(2);
            window.fetch(name, start, right_pos.saturating_add(pad))?;
            if window.end() <= old_end.max(right_pos) {
                break;
            }
            continue;
        }

        let exposed = if alt_len == 0 {
            window.base_at(start + shifted)
        } else if shifted < alt_len {
            Some(alt[shifted as usize])
        } else {
            window.base_at(start + shifted - alt_len)
        };
        match (window.base_at(right_pos), exposed) {
            (Some(a), Some(b)) if a == b => shifted += 1,
            _ => break,
        }
    }
    Ok(shifted)
}

/// Rewrite `alt` after a left shift by `shifted` to new position `start`.
fn rotate_left_shifted<W: SeqWindow + ?Sized>(
    window: &W,
    start: u32,
    alt: &mut [u8],
    shifted: u32,
) -> Result<()> {
    let alt_len = alt.len() as u32;
    if shifted >= alt_len {
        alt.copy_from_slice(window.slice(start, start + alt_len)?);
    } else {
        alt.rotate_right(shifted as usize);
        alt[..shifted as usize].copy_from_slice(window.slice(start, start + shifted)?);
    }
    Ok(())
}

/// Rewrite `alt` after a right shift by `shifted` to new position `start`.
fn rotate_right_shifted<W: SeqWindow + ?Sized>(
    window: &W,
    start: u32,
    alt: &mut [u8],
    shifted: u32,
) -> Result<()> {
    let alt_len = alt.len() as u32;
    if shifted >= alt_len {
        alt.copy_from_slice(window.slice(start - alt_len, start)?);
    } else {
        alt.rotate_left(shifted as usize);
        let tail = (alt_len - shifted) as usize;
        alt[tail..].copy_from_slice(window.slice(start - shifted, start)?);
    }
    Ok(())
}
