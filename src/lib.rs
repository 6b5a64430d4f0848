//! scratchmem - thread-confined bump arenas with upstream chaining
//!
//! This crate provides growable bump-pointer memory arenas for ephemeral
//! allocation: per-frame, per-task, or per-request scratch memory that is
//! carved in O(1) and reclaimed in bulk.
//!
//! Design:
//! - Each arena is confined to the thread that built it (`!Send`/`!Sync`);
//!   no locks or atomics anywhere on the allocation path.
//! - Chunks come from a pluggable [`UpstreamAllocator`] and are tracked by
//!   an intrusive stack living inside the chunks themselves.
//! - Chunk sizes grow geometrically (x1.5) and shrink symmetrically on
//!   release, so steady workloads converge on one chunk per cycle.
//! - [`ManagedArena`] counts live allocations and releases itself when the
//!   last one is returned; [`MonotonicArena`] relies on a [`ScratchScope`]
//!   guard instead.

#![allow(dead_code)]

pub mod arena;
pub mod logging;
pub mod pool;
pub mod scope;
pub mod upstream;

// Re-export core types
pub use arena::{ArenaStats, ManagedArena, MonotonicArena};
pub use pool::PoolBox;
pub use scope::ScratchScope;
pub use upstream::{
    default_upstream, set_default_upstream, PageUpstream, SystemUpstream, UpstreamAllocator,
};
