//! In-place edit primitives shared by every mutable storage.
//!
//! Observable lists, the filter bitmap and the sort stage's index arrays
//! all go through these four functions instead of shifting elements by hand.

use crate::error::{check_index, Result, ViewError};

/// Grow with `T::default()` or truncate from the tail to reach `len`.
pub fn resize<T: Default>(seq: &mut Vec<T>, len: usize) {
    seq.resize_with(len, T::default);
}

/// Relocate the element at `from` to `to`, shifting the run in between by one.
pub fn shift_move<T>(seq: &mut [T], from: usize, to: usize) -> Result<()> {
    check_index(from, seq.len())?;
    check_index(to, seq.len())?;
    if from == to {
        return Ok(());
    }

    if from < to {
        seq[from..=to].rotate_left(1);
    } else {
        seq[to..=from].rotate_right(1);
    }
    Ok(())
}

/// Remove `length` elements starting at `start`.
pub fn remove_range<T>(seq: &mut Vec<T>, start: usize, length: usize) -> Result<()> {
    let end = start.checked_add(length).ok_or_else(|| {
        ViewError::InvalidArgument(format!("range {start}+{length} overflows"))
    })?;
    if end > seq.len() {
        return Err(ViewError::IndexOutOfRange {
            index: end,
            len: seq.len(),
        });
    }
    if length == 0 {
        return Ok(());
    }

    seq.drain(start..end);
    Ok(())
}

/// Insert `items` so that the first of them ends up at `index`.
pub fn insert_range<T: Clone>(seq: &mut Vec<T>, items: &[T], index: usize) -> Result<()> {
    if index > seq.len() {
        return Err(ViewError::IndexOutOfRange {
            index,
            len: seq.len(),
        });
    }

    seq.splice(index..index, items.iter().cloned());
    Ok(())
}

//<<<<>>>><<>><><<>><<<*>>><<>><><<>><<<<>>>>
