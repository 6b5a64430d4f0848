//! Thread-local managed pool - owning boxes over the managed arena
//!
//! Design: one `ManagedArena` per thread, shared by every [`PoolBox`] built
//! on that thread. A box runs its value's destructor on drop and then
//! returns its accounting to the pool, so the pool hands all chunks back to
//! upstream exactly when the thread's last box dies.

use std::marker::PhantomData;
use std::mem;
use std::ops::{Deref, DerefMut};
use std::ptr::{self, NonNull};

use crate::arena::{ArenaStats, ManagedArena};

/// First-chunk reservation for each thread's pool.
const POOL_SEED_BYTES: usize = 2024;

thread_local! {
    static POOL: ManagedArena<'static> = ManagedArena::with_initial_size(POOL_SEED_BYTES);
}

/// Carve raw memory from the calling thread's pool.
pub fn allocate(size: usize, align: usize) -> NonNull<u8> {
    POOL.with(|pool| pool.allocate(size, align))
}

/// Return one pool allocation's accounting; the pool auto-releases at zero.
pub fn deallocate(ptr: NonNull<u8>) {
    // skipped during thread teardown; the pool's own drop returns its chunks
    let _ = POOL.try_with(|pool| pool.deallocate(ptr));
}

/// Chunk bookkeeping of the calling thread's pool.
pub fn pool_stats() -> ArenaStats {
    POOL.with(|pool| pool.stats())
}

/// Owning handle to a value placed in the calling thread's pool.
///
/// Thread-confined like the pool itself; the handle cannot move across
/// threads.
pub struct PoolBox<T> {
    ptr: NonNull<T>,
    _owned: PhantomData<T>,
}

impl<T> PoolBox<T> {
    /// Move `value` into the thread's pool.
    pub fn new(value: T) -> Self {
        let ptr = allocate(mem::size_of::<T>(), mem::align_of::<T>()).cast::<T>();
        // Safety: freshly carved, properly aligned, sized for T
        unsafe {
            ptr.as_ptr().write(value);
        }
        Self { ptr, _owned: PhantomData }
    }
}

impl<T> Deref for PoolBox<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        // Safety: ptr stays valid until this box's drop
        unsafe { self.ptr.as_ref() }
    }
}

impl<T> DerefMut for PoolBox<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        // Safety: exclusive access through &mut self
        unsafe { self.ptr.as_mut() }
    }
}

impl<T> Drop for PoolBox<T> {
    fn drop(&mut self) {
        // Safety: the value was initialized in new and not dropped since
        unsafe {
            ptr::drop_in_place(self.ptr.as_ptr());
        }
        deallocate(self.ptr.cast());
    }
}
