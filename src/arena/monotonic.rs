//! Monotonic arena - scope-guarded scratch allocation
//!
//! Design: intended for short-lived temporaries bracketed by a
//! [`ScratchScope`](crate::scope::ScratchScope). Nothing is freed per
//! allocation; the guard releases everything when the outermost scope ends.
//! `allocate_released` is the escape hatch for results the caller promotes
//! out of the arena's accounting; the bump mechanics are identical.

#[cfg(debug_assertions)]
use std::cell::Cell;
use std::mem::MaybeUninit;
use std::ptr::NonNull;

use super::raw::{ArenaStats, RawArena};
use crate::scope;
use crate::upstream::{default_upstream, UpstreamAllocator};

/// Thread-confined scratch arena, valid only under an active scope guard.
pub struct MonotonicArena<'up> {
    raw: RawArena<'up>,
    // accounting only; mirrors allocate/deallocate pairing in debug builds
    #[cfg(debug_assertions)]
    outstanding: Cell<u32>,
}

impl<'up> MonotonicArena<'up> {
    /// Empty arena drawing from the process default upstream.
    pub fn new() -> Self {
        Self::new_in(default_upstream())
    }

    pub fn new_in(upstream: &'up dyn UpstreamAllocator) -> Self {
        Self::from_raw(RawArena::new_in(upstream))
    }

    /// Empty arena whose first chunk will be sized near `initial` bytes.
    pub fn with_initial_size(initial: usize) -> Self {
        Self::with_initial_size_in(initial, default_upstream())
    }

    pub fn with_initial_size_in(initial: usize, upstream: &'up dyn UpstreamAllocator) -> Self {
        Self::from_raw(RawArena::with_initial_size_in(initial, upstream))
    }

    /// Arena seeded with a borrowed buffer. The buffer is carved first and
    /// is never handed back to upstream.
    pub fn with_buffer(buffer: &'up mut [MaybeUninit<u8>]) -> Self {
        Self::with_buffer_in(buffer, default_upstream())
    }

    pub fn with_buffer_in(
        buffer: &'up mut [MaybeUninit<u8>],
        upstream: &'up dyn UpstreamAllocator,
    ) -> Self {
        Self::from_raw(RawArena::with_buffer_in(buffer, upstream))
    }

    fn from_raw(raw: RawArena<'up>) -> Self {
        Self {
            raw,
            #[cfg(debug_assertions)]
            outstanding: Cell::new(0),
        }
    }

    /// Carve `size` bytes aligned to `align`, counted against the arena.
    ///
    /// Must be balanced by [`deallocate`](Self::deallocate) before the arena
    /// is released.
    #[inline]
    pub fn allocate(&self, size: usize, align: usize) -> NonNull<u8> {
        debug_assert!(
            scope::usage_depth() > 0,
            "monotonic arena used outside an active ScratchScope"
        );

        let ptr = self.raw.allocate(size, align);
        #[cfg(debug_assertions)]
        self.outstanding.set(self.outstanding.get() + 1);
        ptr
    }

    /// Carve outside the arena's accounting: same bump mechanics, but the
    /// allocation is deliberately let go of and needs no `deallocate`.
    #[inline]
    pub fn allocate_released(&self, size: usize, align: usize) -> NonNull<u8> {
        debug_assert!(
            scope::usage_depth() > 0,
            "monotonic arena used outside an active ScratchScope"
        );

        self.raw.allocate(size, align)
    }

    /// Accounting only; never returns memory.
    #[inline]
    pub fn deallocate(&self, ptr: NonNull<u8>) {
        self.raw.check_owner();
        let _ = ptr;

        #[cfg(debug_assertions)]
        {
            let outstanding = self.outstanding.get();
            debug_assert!(outstanding > 0, "deallocate without a matching allocate");
            self.outstanding.set(outstanding - 1);
        }
    }

    /// Hand every owned chunk back to upstream.
    ///
    /// Releasing while counted allocations are outstanding is a programming
    /// error, caught in debug builds.
    pub fn release(&self) {
        #[cfg(debug_assertions)]
        debug_assert_eq!(
            self.outstanding.get(),
            0,
            "released with outstanding allocations"
        );
        self.raw.release();
    }

    pub fn stats(&self) -> ArenaStats {
        self.raw.stats()
    }

    pub fn upstream(&self) -> &'up dyn UpstreamAllocator {
        self.raw.upstream()
    }
}

impl Default for MonotonicArena<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MonotonicArena<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        debug_assert_eq!(
            self.outstanding.get(),
            0,
            "arena dropped with outstanding allocations"
        );
        // the embedded RawArena returns all chunks on its own drop
    }
}
