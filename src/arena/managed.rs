//! Managed arena - live-allocation accounting with auto-release
//!
//! Design: pool-like semantics for a batch of allocations sharing one
//! lifetime. Every `allocate` bumps a live count, every `deallocate` drops
//! it, and the arena hands all chunks back to upstream exactly when the
//! count returns to zero. Individual allocations are never freed piecemeal;
//! `deallocate` is accounting only.

use std::cell::Cell;
use std::mem::MaybeUninit;
use std::ptr::NonNull;

use super::raw::{ArenaStats, RawArena};
use crate::upstream::{default_upstream, UpstreamAllocator};

/// Thread-confined bump arena that releases itself when its last
/// outstanding allocation is returned.
pub struct ManagedArena<'up> {
    raw: RawArena<'up>,
    live: Cell<u32>,
}

impl<'up> ManagedArena<'up> {
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
        Self { raw, live: Cell::new(0) }
    }

    /// Carve `size` bytes aligned to `align` and count it live.
    #[inline]
    pub fn allocate(&self, size: usize, align: usize) -> NonNull<u8> {
        let ptr = self.raw.allocate(size, align);
        self.live.set(self.live.get() + 1);
        ptr
    }

    /// Return one allocation's accounting. The pointer itself is not
    /// inspected; memory comes back only when the live count reaches zero,
    /// at which point every chunk is released in one sweep.
    #[inline]
    pub fn deallocate(&self, ptr: NonNull<u8>) {
        self.raw.check_owner();
        let _ = ptr;

        let live = self.live.get();
        debug_assert!(live > 0, "deallocate without a matching allocate");
        self.live.set(live - 1);

        if live == 1 {
            self.release_all();
        }
    }

    #[cold]
    fn release_all(&self) {
        self.raw.release();
    }

    /// Hand every owned chunk back to upstream.
    ///
    /// Releasing while allocations are still live is a programming error,
    /// caught in debug builds.
    pub fn release(&self) {
        debug_assert_eq!(self.live.get(), 0, "released with live allocations");
        self.raw.release();
    }

    /// Allocations not yet returned via `deallocate`.
    #[inline]
    pub fn live_allocations(&self) -> u32 {
        self.live.get()
    }

    pub fn stats(&self) -> ArenaStats {
        self.raw.stats()
    }

    pub fn upstream(&self) -> &'up dyn UpstreamAllocator {
        self.raw.upstream()
    }
}

impl Default for ManagedArena<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ManagedArena<'_> {
    fn drop(&mut self) {
        debug_assert_eq!(self.live.get(), 0, "arena dropped with live allocations");
        // the embedded RawArena returns all chunks on its own drop
    }
}
