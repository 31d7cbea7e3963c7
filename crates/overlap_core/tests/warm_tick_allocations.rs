//! A warmed-up tick reuses every buffer it owns.
//!
//! Lives in its own test binary because it installs a counting global
//! allocator; any other test running alongside would skew the count.

use overlap_core::glam::Vec2;
use overlap_core::math::DeterministicRng;
use overlap_core::{Execution, StepConfig, StepDriver};
use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicUsize, Ordering};

struct CountingAlloc;

static ALLOCATIONS: AtomicUsize = AtomicUsize::new(0);
static ALLOCATED_BYTES: AtomicUsize = AtomicUsize::new(0);

unsafe impl GlobalAlloc for CountingAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        ALLOCATIONS.fetch_add(1, Ordering::Relaxed);
        ALLOCATED_BYTES.fetch_add(layout.size(), Ordering::Relaxed);
        System.alloc(layout)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout)
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        ALLOCATIONS.fetch_add(1, Ordering::Relaxed);
        ALLOCATED_BYTES.fetch_add(new_size, Ordering::Relaxed);
        System.realloc(ptr, layout, new_size)
    }
}

#[global_allocator]
static GLOBAL: CountingAlloc = CountingAlloc;

/// Allocation calls and bytes during one tick after three warm-up ticks.
fn warm_tick_allocations(execution: Execution, positions: &[Vec2]) -> (usize, usize) {
    let config = StepConfig::default().with_execution(execution);
    let mut driver = StepDriver::new(config).unwrap();
    for _ in 0..3 {
        driver.step(positions, 0.1).unwrap();
    }

    let calls = ALLOCATIONS.load(Ordering::SeqCst);
    let bytes = ALLOCATED_BYTES.load(Ordering::SeqCst);
    driver.step(positions, 0.1).unwrap();
    (
        ALLOCATIONS.load(Ordering::SeqCst) - calls,
        ALLOCATED_BYTES.load(Ordering::SeqCst) - bytes,
    )
}

#[test]
fn warm_ticks_do_not_allocate() {
    let mut rng = DeterministicRng::new(3);
    let positions = rng.scatter(10_000, Vec2::new(30.0, 30.0));

    // Run from inside the pool so no job is injected from outside it.
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(4)
        .build()
        .unwrap();
    let (seq, par) = pool.install(|| {
        (
            warm_tick_allocations(Execution::Sequential, &positions),
            warm_tick_allocations(Execution::Parallel, &positions),
        )
    });

    assert_eq!(seq, (0, 0), "sequential tick allocated (calls, bytes)");
    assert_eq!(par, (0, 0), "parallel tick allocated (calls, bytes)");
}
