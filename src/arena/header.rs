//! Chunk metadata - bookkeeping colocated with the memory it describes
//!
//! Every block obtained from upstream carries a `ChunkHeader` at its tail,
//! so the arena can hand the exact `(base, size, align)` triple back without
//! any side-table allocation. The base address is recomputed from the header
//! position: `header_end - size`.

use std::mem;
use std::ptr::NonNull;

/// Per-chunk record: intrusive link plus the upstream allocation triple.
///
/// The header is a plain value written into the chunk it describes; the
/// arena's stack holds non-owning pointers to it. Chunk sizes are always
/// multiples of `HEADER_ALIGN` and chunk bases are aligned at least that
/// much, so the tail slot is itself properly aligned.
#[repr(C)]
pub(crate) struct ChunkHeader {
    pub(crate) next: Option<NonNull<ChunkHeader>>,
    pub(crate) size: usize,
    pub(crate) align: usize,
}

pub(crate) const HEADER_SIZE: usize = mem::size_of::<ChunkHeader>();
pub(crate) const HEADER_ALIGN: usize = mem::align_of::<ChunkHeader>();

impl ChunkHeader {
    /// Write a header into the tail of the block at `base`.
    ///
    /// # Safety
    /// `base` must point to a writable block of at least `size` bytes,
    /// `size` must be a header-aligned value >= `HEADER_SIZE`, and `base`
    /// must be aligned to `HEADER_ALIGN`.
    pub(crate) unsafe fn write_at_tail(base: *mut u8, size: usize, align: usize) -> NonNull<ChunkHeader> {
        debug_assert!(size >= HEADER_SIZE);
        debug_assert_eq!(size % HEADER_ALIGN, 0);

        let slot = base.add(size - HEADER_SIZE).cast::<ChunkHeader>();
        debug_assert_eq!(slot as usize % HEADER_ALIGN, 0);

        slot.write(ChunkHeader { next: None, size, align });
        NonNull::new_unchecked(slot)
    }

    /// Recover the chunk's base address from its tail header.
    ///
    /// # Safety
    /// `header` must point to a header previously written by `write_at_tail`.
    pub(crate) unsafe fn base_address(header: NonNull<ChunkHeader>) -> *mut u8 {
        let end = header.as_ptr().cast::<u8>().add(HEADER_SIZE);
        end.sub(header.as_ref().size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_size_is_header_aligned() {
        assert_eq!(HEADER_SIZE % HEADER_ALIGN, 0);
    }

    #[test]
    fn tail_header_round_trips_base_address() {
        #[repr(align(64))]
        struct Block([u8; 256]);

        let mut block = Block([0; 256]);
        let base = block.0.as_mut_ptr();

        unsafe {
            let header = ChunkHeader::write_at_tail(base, 256, 64);
            assert_eq!(header.as_ref().size, 256);
            assert_eq!(header.as_ref().align, 64);
            assert!(header.as_ref().next.is_none());
            assert_eq!(ChunkHeader::base_address(header), base);
        }
    }
}
