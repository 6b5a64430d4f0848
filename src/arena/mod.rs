//! Bump arenas - thread-confined growable allocation
//!
//! Design: three-layer split shared by both variants:
//! 1. Carve (fast path, pointer bump against the current chunk)
//! 2. Growth (slow path, geometric chunk sizing from upstream)
//! 3. Release (bulk hand-back, descaled next-size estimate)
//!
//! One arena per thread; no locks, no atomics, no blocking anywhere.

mod header;
mod managed;
mod monotonic;
mod policy;
mod raw;
mod stack;


pub use managed::ManagedArena;
pub use monotonic::MonotonicArena;
pub use raw::ArenaStats;
