//! Logging utilities for the arena subsystem
//!
//! Uses `tracing` for structured logging with minimal overhead. The carve
//! fast path never logs; only chunk growth, release, and registry events do.

// Re-export tracing macros for use throughout the crate
pub use tracing::{debug, error, info, trace, warn, Level};

/// Initialize logging with sensible defaults
///
/// For production builds, logs at INFO level and above are enabled.
/// For debug builds, DEBUG and TRACE levels are also enabled.
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        #[cfg(debug_assertions)]
        {
            EnvFilter::new("scratchmem=debug")
        }
        #[cfg(not(debug_assertions))]
        {
            EnvFilter::new("scratchmem=info")
        }
    });

    fmt()
        .with_env_filter(filter)
        .compact()
        .try_init()
        .ok(); // Ignore error if already initialized
}

/// Log a chunk acquisition from upstream
#[inline]
pub fn log_chunk_acquired(size: usize, align: usize, ptr: *const u8) {
    trace!(
        target: "arena",
        size,
        align,
        ptr = ?ptr,
        "chunk acquired from upstream"
    );
}

/// Log a chunk handed back to upstream
#[inline]
pub fn log_chunk_released(size: usize, ptr: *const u8) {
    trace!(
        target: "arena",
        size,
        ptr = ?ptr,
        "chunk returned to upstream"
    );
}

/// Log a full arena release
#[inline]
pub fn log_arena_released(chunks: usize, bytes: usize) {
    debug!(
        target: "arena",
        chunks,
        bytes,
        "arena released"
    );
}

/// Log a default-upstream registry swap
#[inline]
pub fn log_default_upstream_swap() {
    info!(target: "upstream", "default upstream allocator replaced");
}
