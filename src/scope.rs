//! Scratch scope - RAII guard over the thread's monotonic arena
//!
//! Design: a per-thread usage counter (init 0) brackets regions of code
//! during which scratch allocation is valid. Entering a scope increments it;
//! the guard's drop decrements unconditionally on every exit path and, at
//! zero, releases the thread's scratch arena in bulk. Scopes nest: recursion
//! is fine as long as the outermost scope outlives all allocations.

use std::alloc::Layout;
use std::cell::Cell;
use std::marker::PhantomData;
use std::mem;
use std::ptr::{self, NonNull};
use std::slice;
use std::str;

use crate::arena::{ArenaStats, MonotonicArena};

/// First-chunk reservation for each thread's scratch arena.
const SCRATCH_SEED_BYTES: usize = 2024;

thread_local! {
    static SCRATCH_USAGE: Cell<u32> = const { Cell::new(0) };

    static SCRATCH_ARENA: MonotonicArena<'static> =
        MonotonicArena::with_initial_size(SCRATCH_SEED_BYTES);
}

/// Depth of scratch-scope nesting on the calling thread.
#[inline]
pub fn usage_depth() -> u32 {
    SCRATCH_USAGE.with(Cell::get)
}

/// Chunk bookkeeping of the calling thread's scratch arena.
pub fn scratch_stats() -> ArenaStats {
    SCRATCH_ARENA.with(|arena| arena.stats())
}

/// Guard bracketing a region of scratch-arena usage.
///
/// Allocations made through a scope borrow from it, so they cannot outlive
/// the guard. The thread's scratch arena is released when the outermost
/// scope on the thread ends.
pub struct ScratchScope {
    _confined: PhantomData<*mut u8>,
}

impl ScratchScope {
    pub fn new() -> Self {
        SCRATCH_USAGE.with(|count| count.set(count.get() + 1));
        Self { _confined: PhantomData }
    }

    /// Move `value` into scratch memory.
    pub fn alloc_value<T>(&self, value: T) -> &mut T {
        let ptr = scratch_alloc(Layout::new::<T>()).cast::<T>();
        // Safety: freshly carved, properly aligned, sized for T
        unsafe {
            ptr.as_ptr().write(value);
            &mut *ptr.as_ptr()
        }
    }

    /// Build a slice of `len` elements in scratch memory, filling each slot
    /// with `fill(index)`.
    pub fn alloc_slice_with<T>(&self, len: usize, mut fill: impl FnMut(usize) -> T) -> &mut [T] {
        let bytes = match mem::size_of::<T>().checked_mul(len) {
            Some(bytes) => bytes,
            None => panic!("slice of {len} elements overflows the size type"),
        };

        let layout = match Layout::from_size_align(bytes, mem::align_of::<T>()) {
            Ok(layout) => layout,
            Err(_) => panic!("slice of {len} elements has no representable layout"),
        };

        let ptr = scratch_alloc(layout).cast::<T>();
        // Safety: the carved range holds exactly len elements of T
        unsafe {
            for index in 0..len {
                ptr.as_ptr().add(index).write(fill(index));
            }
            slice::from_raw_parts_mut(ptr.as_ptr(), len)
        }
    }

    /// Copy `source` into scratch memory.
    pub fn alloc_str(&self, source: &str) -> &mut str {
        let layout = match Layout::from_size_align(source.len(), 1) {
            Ok(layout) => layout,
            Err(_) => panic!("string of {} bytes has no representable layout", source.len()),
        };
        let ptr = scratch_alloc(layout);
        // Safety: byte-for-byte copy of valid UTF-8 into a fresh carve
        unsafe {
            ptr::copy_nonoverlapping(source.as_ptr(), ptr.as_ptr(), source.len());
            str::from_utf8_unchecked_mut(slice::from_raw_parts_mut(ptr.as_ptr(), source.len()))
        }
    }
}

impl Default for ScratchScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ScratchScope {
    fn drop(&mut self) {
        let depth = SCRATCH_USAGE.with(|count| {
            let depth = count.get();
            debug_assert!(depth > 0, "scratch usage counter underflow");
            count.set(depth - 1);
            depth - 1
        });

        if depth == 0 {
            // skipped during thread teardown once the TLS slot is gone; the
            // arena's own drop returns its chunks then
            let _ = SCRATCH_ARENA.try_with(|arena| arena.release());
        }
    }
}

fn scratch_alloc(layout: Layout) -> NonNull<u8> {
    SCRATCH_ARENA.with(|arena| arena.allocate_released(layout.size(), layout.align()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scopes_nest_and_unwind_depth() {
        assert_eq!(usage_depth(), 0);
        {
            let _outer = ScratchScope::new();
            assert_eq!(usage_depth(), 1);
            {
                let _inner = ScratchScope::new();
                assert_eq!(usage_depth(), 2);
            }
            assert_eq!(usage_depth(), 1);
        }
        assert_eq!(usage_depth(), 0);
    }

    #[test]
    fn outermost_exit_releases_the_scratch_arena() {
        {
            let scope = ScratchScope::new();
            let value = scope.alloc_value(0x5Au8);
            assert_eq!(*value, 0x5A);
            assert!(scratch_stats().chunk_count >= 1);

            {
                let inner = ScratchScope::new();
                let nested = inner.alloc_value(7u32);
                assert_eq!(*nested, 7);
            }
            // inner exit must not release while the outer scope is alive
            assert!(scratch_stats().chunk_count >= 1);
        }
        assert_eq!(scratch_stats().chunk_count, 0);
    }

    #[test]
    fn alloc_value_is_aligned_and_mutable() {
        let scope = ScratchScope::new();
        let value = scope.alloc_value([1u64, 2, 3]);
        assert_eq!(value.as_ptr() as usize % mem::align_of::<u64>(), 0);
        value[1] = 20;
        assert_eq!(*value, [1, 20, 3]);
    }

    #[test]
    fn alloc_slice_with_fills_every_slot() {
        let scope = ScratchScope::new();
        let squares = scope.alloc_slice_with(16, |i| (i * i) as u32);
        assert_eq!(squares.len(), 16);
        assert_eq!(squares[0], 0);
        assert_eq!(squares[15], 225);

        let empty = scope.alloc_slice_with(0, |_| 0u8);
        assert!(empty.is_empty());
    }

    #[test]
    fn alloc_str_copies_contents() {
        let scope = ScratchScope::new();
        let copied = scope.alloc_str("per-frame scratch");
        assert_eq!(copied, "per-frame scratch");
        copied.make_ascii_uppercase();
        assert_eq!(copied, "PER-FRAME SCRATCH");
    }

    #[test]
    fn recursive_scopes_keep_outer_allocations_valid() {
        fn descend(scope: &ScratchScope, depth: u32) -> u32 {
            if depth == 0 {
                return 0;
            }
            let stored = scope.alloc_value(depth);
            let nested = ScratchScope::new();
            let total = descend(&nested, depth - 1);
            *stored + total
        }

        let scope = ScratchScope::new();
        assert_eq!(descend(&scope, 5), 15);
    }
}
