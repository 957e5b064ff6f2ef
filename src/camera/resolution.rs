//! Preview resolution negotiation.

use crate::camera::error::{CameraError, Result};
use crate::camera::types::Extent;

/// Pick a supported preview size for `requested_width`.
///
/// `supported` must be sorted ascending by width (see [`sort_by_width`]).
/// Returns the narrowest entry whose width is at least `requested_width`;
/// among entries of equal width the earlier one wins. Falls back to
/// `current_default` when nothing is wide enough.
pub fn select(
    requested_width: u32,
    supported: &[Extent],
    current_default: Extent,
) -> Result<Extent> {
    if supported.is_empty() {
        return Err(CameraError::NoCandidate);
    }

    // Walk from the widest end; each qualifying size overwrites the choice.
    let mut chosen = None;
    for size in supported.iter().rev() {
        if size.width >= requested_width {
            chosen = Some(*size);
        }
    }

    Ok(chosen.unwrap_or(current_default))
}

/// Stable ascending sort by width, as required by [`select`].
pub fn sort_by_width(sizes: &mut [Extent]) {
    sizes.sort_by_key(|s| s.width);
}
