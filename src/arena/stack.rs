//! Intrusive chunk stack - O(1) push/pop with zero allocation
//!
//! The stack threads its links through the chunk headers themselves, so
//! tracking an unbounded number of upstream chunks costs nothing beyond one
//! head pointer. The stack never owns the headers it links.

use std::cell::Cell;
use std::ptr::NonNull;

use super::header::ChunkHeader;

/// Singly-linked LIFO of chunk headers.
///
/// Interior mutability via `Cell` keeps the arena's whole hot path `&self`.
pub(crate) struct ChunkStack {
    head: Cell<Option<NonNull<ChunkHeader>>>,
}

impl ChunkStack {
    pub(crate) const fn new() -> Self {
        Self { head: Cell::new(None) }
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.head.get().is_none()
    }

    /// Link `item` in front of the current head.
    ///
    /// # Safety
    /// `item` must point to a live header not already linked into any stack.
    #[inline]
    pub(crate) unsafe fn push(&self, item: NonNull<ChunkHeader>) {
        (*item.as_ptr()).next = self.head.get();
        self.head.set(Some(item));
    }

    /// Unlink and return the head, if any.
    ///
    /// # Safety
    /// Every linked header must still be live.
    #[inline]
    pub(crate) unsafe fn pop(&self) -> Option<NonNull<ChunkHeader>> {
        let head = self.head.get()?;
        self.head.set(head.as_ref().next);
        Some(head)
    }

    /// Splice out a specific header; linear scan, no-op when absent.
    ///
    /// # Safety
    /// Every linked header must still be live.
    pub(crate) unsafe fn remove(&self, item: NonNull<ChunkHeader>) {
        let Some(head) = self.head.get() else {
            return;
        };

        if head == item {
            self.head.set(item.as_ref().next);
            return;
        }

        let mut node = head;
        while let Some(next) = node.as_ref().next {
            if next == item {
                (*node.as_ptr()).next = item.as_ref().next;
                return;
            }
            node = next;
        }
    }

    /// Detach the whole list, leaving this stack empty.
    pub(crate) fn take(&self) -> ChunkStack {
        ChunkStack {
            head: Cell::new(self.head.take()),
        }
    }
}
