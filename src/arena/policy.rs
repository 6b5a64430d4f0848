//! Chunk sizing policy - pure growth/shrink math
//!
//! Design: `scale` and `descale` stay approximate inverses so an
//! allocate/release/allocate cycle with a stable working set converges on
//! one upstream chunk per cycle instead of perpetually growing or shrinking.

use super::header::{HEADER_ALIGN, HEADER_SIZE};

/// Smallest chunk ever requested from upstream.
pub(crate) const MIN_ALLOCATION: usize = 2 * HEADER_SIZE;

/// Largest representable chunk size, aligned down to the header alignment.
/// Used as a saturating ceiling for growth, never as a real request.
pub(crate) const MAX_ALLOCATION: usize = usize::MAX & !(HEADER_ALIGN - 1);

/// Smallest multiple of the header alignment that is >= `size`, clamped to
/// `[MIN_ALLOCATION, MAX_ALLOCATION]`.
pub(crate) const fn round(size: usize) -> usize {
    if size < MIN_ALLOCATION {
        return MIN_ALLOCATION;
    }

    if size >= MAX_ALLOCATION {
        return MAX_ALLOCATION;
    }

    // size < MAX_ALLOCATION, so adding (HEADER_ALIGN - 1) cannot overflow
    (size + HEADER_ALIGN - 1) & MAX_ALLOCATION
}

/// `size` scaled by 1.5, rounded up to the header alignment, saturating to
/// `MAX_ALLOCATION`. Keep synchronized with `descale`.
pub(crate) const fn scale(size: usize) -> usize {
    const SATURATION_POINT: usize = (MAX_ALLOCATION - HEADER_ALIGN + 1) / 3 * 2;

    if size >= SATURATION_POINT {
        return MAX_ALLOCATION;
    }

    (size + (size + 1) / 2 + HEADER_ALIGN - 1) & MAX_ALLOCATION
}

/// `size` scaled by 2/3, rounded up to the header alignment, floored at
/// `MIN_ALLOCATION`. Keep synchronized with `scale`.
pub(crate) const fn descale(size: usize) -> usize {
    let unscaled = (size / 3 * 2 + HEADER_ALIGN - 1) & MAX_ALLOCATION;
    if unscaled > MIN_ALLOCATION {
        unscaled
    } else {
        MIN_ALLOCATION
    }
}
