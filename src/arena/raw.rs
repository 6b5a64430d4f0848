//! Shared arena engine - carve fast path, grow/release slow paths
//!
//! Design: both arena variants embed `RawArena` and differ only in their
//! bookkeeping around it. The carve path is branch-light pointer math; chunk
//! growth and release are cold. Interior mutability via `Cell` keeps every
//! operation `&self`; the type is `!Send`/`!Sync`, so the single-owner
//! discipline is enforced at compile time for safe callers.

use std::alloc::Layout;
use std::cell::Cell;
use std::marker::PhantomData;
use std::mem::MaybeUninit;
use std::ptr::{self, NonNull};
use std::thread::{self, ThreadId};

use super::header::{ChunkHeader, HEADER_ALIGN, HEADER_SIZE};
use super::policy::{descale, round, scale, MAX_ALLOCATION, MIN_ALLOCATION};
use super::stack::ChunkStack;
use crate::logging::{log_arena_released, log_chunk_acquired, log_chunk_released};
use crate::upstream::{debug_check_alignment, UpstreamAllocator};

/// Point-in-time view of an arena's chunk bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaStats {
    /// Chunks currently held from upstream.
    pub chunk_count: usize,
    /// Total bytes of those chunks, headers included.
    pub chunk_bytes: usize,
    /// Bytes still carvable from the current chunk.
    pub space_remaining: usize,
    /// Size the next growth will request, absent a larger demand.
    pub next_chunk_size: usize,
}

/// Thread-confined bump arena core.
pub(crate) struct RawArena<'up> {
    /// Next carve position; null when no active chunk.
    cursor: Cell<*mut u8>,
    space: Cell<usize>,
    next_size: Cell<usize>,
    chunks: ChunkStack,
    chunk_count: Cell<usize>,
    chunk_bytes: Cell<usize>,
    upstream: &'up dyn UpstreamAllocator,
    owner: ThreadId,
    _confined: PhantomData<*mut u8>,
}

impl<'up> RawArena<'up> {
    pub(crate) fn new_in(upstream: &'up dyn UpstreamAllocator) -> Self {
        Self::from_parts(ptr::null_mut(), 0, MIN_ALLOCATION, upstream)
    }

    pub(crate) fn with_initial_size_in(initial: usize, upstream: &'up dyn UpstreamAllocator) -> Self {
        Self::from_parts(ptr::null_mut(), 0, round(initial), upstream)
    }

    /// Seed the arena with a caller-supplied buffer. The buffer is borrowed:
    /// it is never pushed onto the chunk stack and never handed to upstream.
    pub(crate) fn with_buffer_in(
        buffer: &'up mut [MaybeUninit<u8>],
        upstream: &'up dyn UpstreamAllocator,
    ) -> Self {
        let next_size = if buffer.is_empty() {
            MIN_ALLOCATION
        } else {
            scale(buffer.len())
        };
        Self::from_parts(buffer.as_mut_ptr().cast(), buffer.len(), next_size, upstream)
    }

    fn from_parts(
        cursor: *mut u8,
        space: usize,
        next_size: usize,
        upstream: &'up dyn UpstreamAllocator,
    ) -> Self {
        Self {
            cursor: Cell::new(cursor),
            space: Cell::new(space),
            next_size: Cell::new(next_size),
            chunks: ChunkStack::new(),
            chunk_count: Cell::new(0),
            chunk_bytes: Cell::new(0),
            upstream,
            owner: thread::current().id(),
            _confined: PhantomData,
        }
    }

    #[inline]
    pub(crate) fn check_owner(&self) {
        debug_assert_eq!(
            thread::current().id(),
            self.owner,
            "arena accessed from a thread other than its owner"
        );
    }

    /// Carve `size` bytes aligned to `align`, growing from upstream on demand.
    ///
    /// The returned range is `align`-aligned and disjoint from every other
    /// live allocation and from chunk headers.
    #[inline]
    pub(crate) fn allocate(&self, size: usize, align: usize) -> NonNull<u8> {
        self.check_owner();
        debug_assert!(align.is_power_of_two(), "alignment must be a power of two");

        match self.try_carve(size, align) {
            Some(ptr) => ptr,
            None => self.grow_and_carve(size, align),
        }
    }

    /// Carve from the current chunk, or report failure for the grow path.
    #[inline]
    fn try_carve(&self, size: usize, align: usize) -> Option<NonNull<u8>> {
        let cursor = self.cursor.get();
        if cursor.is_null() {
            return None;
        }

        let addr = cursor as usize;
        let aligned = addr.checked_add(align - 1)? & !(align - 1);
        let consumed = (aligned - addr).checked_add(size)?;
        if consumed > self.space.get() {
            return None;
        }

        self.cursor.set((aligned + size) as *mut u8);
        self.space.set(self.space.get() - consumed);
        NonNull::new(aligned as *mut u8)
    }

    /// Obtain a fresh chunk from upstream and serve the request from it.
    #[cold]
    fn grow_and_carve(&self, size: usize, align: usize) -> NonNull<u8> {
        // a request this large is caller misuse, not a retryable condition
        assert!(
            size <= MAX_ALLOCATION - HEADER_SIZE,
            "requested {size} bytes exceeds the maximum arena allocation"
        );

        let mut new_size = self.next_size.get();
        if new_size < size + HEADER_SIZE {
            new_size = round(size + HEADER_SIZE);
        }

        let chunk_align = if align > HEADER_ALIGN { align } else { HEADER_ALIGN };
        let layout = match Layout::from_size_align(new_size, chunk_align) {
            Ok(layout) => layout,
            Err(_) => panic!("chunk of {new_size} bytes aligned to {chunk_align} is not representable"),
        };

        let base = self.upstream.allocate(layout);
        debug_check_alignment(base.as_ptr(), chunk_align);

        // Safety: the block is ours, new_size is header-aligned and at least
        // MIN_ALLOCATION, and the base honors HEADER_ALIGN
        unsafe {
            let header = ChunkHeader::write_at_tail(base.as_ptr(), new_size, chunk_align);
            self.chunks.push(header);
        }

        self.cursor.set(base.as_ptr());
        self.space.set(new_size - HEADER_SIZE);
        self.next_size.set(scale(new_size));
        self.chunk_count.set(self.chunk_count.get() + 1);
        self.chunk_bytes.set(self.chunk_bytes.get() + new_size);
        log_chunk_acquired(new_size, chunk_align, base.as_ptr());

        match self.try_carve(size, align) {
            Some(ptr) => ptr,
            None => unreachable!("freshly grown chunk cannot fail the carve"),
        }
    }

    /// Hand every owned chunk back to upstream and reset the cursor.
    ///
    /// The next-size estimate is descaled so the following growth matches the
    /// arena's recent high-water mark. A borrowed seed buffer is untouched
    /// and stays carvable when no chunk was ever acquired.
    pub(crate) fn release(&self) {
        self.check_owner();

        if self.chunks.is_empty() {
            // nothing owned; a construction-time buffer stays in use
            return;
        }

        self.cursor.set(ptr::null_mut());
        self.space.set(0);
        self.next_size.set(descale(self.next_size.get()));

        let released_chunks = self.chunk_count.replace(0);
        let released_bytes = self.chunk_bytes.replace(0);

        let detached = self.chunks.take();
        // Safety: every header on the stack was written by grow_and_carve and
        // is returned with the exact triple upstream handed out, exactly once
        unsafe {
            while let Some(header) = detached.pop() {
                let size = header.as_ref().size;
                let align = header.as_ref().align;
                let base = ChunkHeader::base_address(header);
                log_chunk_released(size, base);
                let layout = Layout::from_size_align_unchecked(size, align);
                self.upstream.deallocate(NonNull::new_unchecked(base), layout);
            }
        }

        log_arena_released(released_chunks, released_bytes);
    }

    pub(crate) fn upstream(&self) -> &'up dyn UpstreamAllocator {
        self.upstream
    }

    pub(crate) fn stats(&self) -> ArenaStats {
        ArenaStats {
            chunk_count: self.chunk_count.get(),
            chunk_bytes: self.chunk_bytes.get(),
            space_remaining: self.space.get(),
            next_chunk_size: self.next_size.get(),
        }
    }
}

impl Drop for RawArena<'_> {
    fn drop(&mut self) {
        self.release();
    }
}
