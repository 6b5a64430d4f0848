//! Upstream allocators - the raw-memory sources arenas draw chunks from
//!
//! Design: arenas never talk to the OS directly; they request whole chunks
//! through `UpstreamAllocator` and return them with the exact layout they
//! were given. Exhaustion is fatal by contract, so the trait surface has no
//! error type. A process-wide default upstream is captured at arena
//! construction and can be swapped for the whole process.

use std::alloc::{handle_alloc_error, Layout};
use std::mem;
use std::ptr::NonNull;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::logging::log_default_upstream_swap;

/// Source of raw chunks for an arena.
///
/// Contract: `allocate` either returns memory honoring `layout` or aborts
/// the process; `deallocate` must be handed back the exact `(ptr, layout)`
/// pair that `allocate` produced. Implementations must tolerate concurrent
/// calls from many threads' arenas.
pub trait UpstreamAllocator: Sync {
    /// Obtain a block honoring `layout`. Fatal on exhaustion.
    fn allocate(&self, layout: Layout) -> NonNull<u8>;

    /// Return a block previously obtained from `allocate`.
    ///
    /// # Safety
    /// `ptr` must have come from `allocate` on this same allocator with this
    /// exact `layout`, and must not be returned twice.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

impl<'a> dyn UpstreamAllocator + 'a {
    /// Identity comparison: two upstream handles are equal when they refer
    /// to the same allocator instance.
    pub fn is_equal(&self, other: &dyn UpstreamAllocator) -> bool {
        std::ptr::eq(self as *const _ as *const (), other as *const _ as *const ())
    }
}

/// Debug-only check that an upstream honored the alignment it promised.
#[inline]
pub(crate) fn debug_check_alignment(ptr: *const u8, align: usize) {
    debug_assert_eq!(
        ptr as usize & (align - 1),
        0,
        "upstream allocator did not honor the requested alignment"
    );
    let _ = (ptr, align);
}

/// Global-allocator-backed upstream; the process default.
pub struct SystemUpstream;

impl UpstreamAllocator for SystemUpstream {
    fn allocate(&self, layout: Layout) -> NonNull<u8> {
        // Safety: arena chunk layouts always have non-zero size
        let ptr = unsafe { std::alloc::alloc(layout) };
        match NonNull::new(ptr) {
            Some(ptr) => ptr,
            None => handle_alloc_error(layout),
        }
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        std::alloc::dealloc(ptr.as_ptr(), layout);
    }
}

/// Page-granular upstream backed by the platform virtual-memory API.
///
/// Suited to arenas with large steady-state working sets: chunks bypass the
/// global allocator entirely and go straight back to the OS on release.
pub struct PageUpstream {
    page_size: usize,
}

impl PageUpstream {
    pub fn new() -> Self {
        let page_size = os_page_size();
        debug_assert!(page_size.is_power_of_two());
        Self { page_size }
    }

    #[inline]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Whole pages backing a request of `size` bytes.
    fn span_for(&self, size: usize, layout: Layout) -> usize {
        match size.checked_add(self.page_size - 1) {
            Some(sum) => (sum & !(self.page_size - 1)).max(self.page_size),
            None => handle_alloc_error(layout),
        }
    }
}

impl Default for PageUpstream {
    fn default() -> Self {
        Self::new()
    }
}

impl UpstreamAllocator for PageUpstream {
    fn allocate(&self, layout: Layout) -> NonNull<u8> {
        // Page-aligned mappings satisfy every alignment an arena asks for;
        // anything beyond a page is caller misuse.
        debug_assert!(layout.align() <= self.page_size);

        let span = self.span_for(layout.size(), layout);
        match NonNull::new(os_map(span)) {
            Some(ptr) => ptr,
            None => handle_alloc_error(layout),
        }
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        let span = self.span_for(layout.size(), layout);
        os_unmap(ptr.as_ptr(), span);
    }
}

#[cfg(unix)]
fn os_page_size() -> usize {
    // Safety: sysconf is always safe to call
    unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize }
}

#[cfg(unix)]
fn os_map(span: usize) -> *mut u8 {
    // Safety: anonymous private mapping with no address hint
    let ptr = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            span,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
            -1,
            0,
        )
    };
    if ptr == libc::MAP_FAILED {
        std::ptr::null_mut()
    } else {
        ptr.cast()
    }
}

#[cfg(unix)]
fn os_unmap(ptr: *mut u8, span: usize) {
    // Safety: ptr/span come from a successful os_map of the same span
    unsafe {
        libc::munmap(ptr.cast(), span);
    }
}

#[cfg(windows)]
fn os_page_size() -> usize {
    use winapi::um::sysinfoapi::{GetSystemInfo, SYSTEM_INFO};

    // Safety: GetSystemInfo fills the struct and cannot fail
    unsafe {
        let mut info: SYSTEM_INFO = mem::zeroed();
        GetSystemInfo(&mut info);
        info.dwPageSize as usize
    }
}

#[cfg(windows)]
fn os_map(span: usize) -> *mut u8 {
    use winapi::um::memoryapi::VirtualAlloc;
    use winapi::um::winnt::{MEM_COMMIT, MEM_RESERVE, PAGE_READWRITE};

    // Safety: no address hint, committed read/write pages
    unsafe {
        VirtualAlloc(
            std::ptr::null_mut(),
            span,
            MEM_RESERVE | MEM_COMMIT,
            PAGE_READWRITE,
        )
        .cast()
    }
}

#[cfg(windows)]
fn os_unmap(ptr: *mut u8, _span: usize) {
    use winapi::um::memoryapi::VirtualFree;
    use winapi::um::winnt::MEM_RELEASE;

    // Safety: ptr is the base of a reservation made by os_map
    unsafe {
        VirtualFree(ptr.cast(), 0, MEM_RELEASE);
    }
}

static SYSTEM_UPSTREAM: SystemUpstream = SystemUpstream;

static DEFAULT_UPSTREAM: Lazy<Mutex<&'static dyn UpstreamAllocator>> =
    Lazy::new(|| Mutex::new(&SYSTEM_UPSTREAM));

/// The upstream new arenas capture when none is given explicitly.
pub fn default_upstream() -> &'static dyn UpstreamAllocator {
    *DEFAULT_UPSTREAM.lock()
}

/// Swap the process-wide default upstream, returning the previous one.
///
/// Arenas capture the default at construction; already-built arenas keep
/// the upstream they were born with.
pub fn set_default_upstream(
    upstream: &'static dyn UpstreamAllocator,
) -> &'static dyn UpstreamAllocator {
    let mut slot = DEFAULT_UPSTREAM.lock();
    let previous = mem::replace(&mut *slot, upstream);
    log_default_upstream_swap();
    previous
}
