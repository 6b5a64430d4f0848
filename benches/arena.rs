// Arena benchmarks
//
// Measures the carve fast path, the managed allocate/deallocate cycle,
// growth-and-release churn, scratch-scope overhead, and pool boxes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use scratchmem::{ManagedArena, MonotonicArena, PoolBox, ScratchScope};

/// Sequential carves of a fixed size, released in periodic batches so the
/// arena stays at its steady-state footprint.
fn bench_sequential_carve(c: &mut Criterion) {
    let mut group = c.benchmark_group("sequential_carve");

    for size in &[8usize, 32, 128, 1024] {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let _scope = ScratchScope::new();
            let arena = MonotonicArena::with_initial_size(64 * 1024);
            let mut served = 0u32;

            b.iter(|| {
                black_box(arena.allocate_released(black_box(size), 8));
                served += 1;
                if served == 4096 {
                    arena.release();
                    served = 0;
                }
            });
        });
    }

    group.finish();
}

/// One allocation returned immediately: every iteration runs the full
/// count-to-zero auto-release path.
fn bench_managed_cycle(c: &mut Criterion) {
    c.bench_function("managed_alloc_dealloc_cycle", |b| {
        let arena = ManagedArena::with_initial_size(4096);

        b.iter(|| {
            let ptr = arena.allocate(black_box(64), 8);
            arena.deallocate(black_box(ptr));
        });
    });
}

/// A batch large enough to force growth, then bulk reclamation.
fn bench_growth_release(c: &mut Criterion) {
    c.bench_function("growth_release_cycle", |b| {
        let arena = ManagedArena::new();

        b.iter(|| {
            let ptrs: Vec<_> = (0..64).map(|_| arena.allocate(1024, 8)).collect();
            for ptr in ptrs {
                arena.deallocate(ptr);
            }
        });
    });
}

fn bench_scope_guard(c: &mut Criterion) {
    c.bench_function("scratch_scope_enter_exit", |b| {
        b.iter(|| {
            let scope = ScratchScope::new();
            black_box(&scope);
        });
    });

    c.bench_function("scratch_alloc_value", |b| {
        b.iter(|| {
            let scope = ScratchScope::new();
            black_box(scope.alloc_value(black_box(0u64)));
        });
    });
}

fn bench_pool_box(c: &mut Criterion) {
    c.bench_function("pool_box_roundtrip", |b| {
        b.iter(|| {
            let boxed = PoolBox::new(black_box(42u64));
            black_box(*boxed);
        });
    });
}

criterion_group!(
    benches,
    bench_sequential_carve,
    bench_managed_cycle,
    bench_growth_release,
    bench_scope_guard,
    bench_pool_box
);
criterion_main!(benches);
