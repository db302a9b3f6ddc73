//! Benchmark for AvlTree vs standard BTreeMap.
//!
//! Compares the persistent tree against Rust's standard BTreeMap for the
//! core operations. The persistent variants rebuild a root-to-leaf path on
//! every edit, so the interesting number is the constant factor.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use persistent_avl::persistent::{AvlTree, NaturalOrder};
use std::collections::BTreeMap;

fn build_tree(size: i32) -> AvlTree<i32, i32> {
    (0..size).fold(AvlTree::empty(), |tree, key| {
        tree.add(key, key * 2, &NaturalOrder, true).0
    })
}

// =============================================================================
// add Benchmark
// =============================================================================

fn benchmark_add(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("add");

    for size in [100, 1000, 10000] {
        group.bench_with_input(BenchmarkId::new("AvlTree", size), &size, |bencher, &size| {
            bencher.iter(|| black_box(build_tree(black_box(size))));
        });

        group.bench_with_input(BenchmarkId::new("BTreeMap", size), &size, |bencher, &size| {
            bencher.iter(|| {
                let mut map = BTreeMap::new();
                for key in 0..size {
                    map.insert(black_box(key), black_box(key * 2));
                }
                black_box(map)
            });
        });
    }

    group.finish();
}

// =============================================================================
// find Benchmark
// =============================================================================

fn benchmark_find(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("find");

    for size in [100, 1000, 10000] {
        let tree = build_tree(size);
        let standard_map: BTreeMap<i32, i32> = (0..size).map(|key| (key, key * 2)).collect();

        group.bench_with_input(BenchmarkId::new("AvlTree", size), &size, |bencher, &size| {
            bencher.iter(|| {
                let mut sum = 0;
                for key in 0..size {
                    if let Some(&value) = tree.find(&black_box(key), &NaturalOrder) {
                        sum += value;
                    }
                }
                black_box(sum)
            });
        });

        group.bench_with_input(BenchmarkId::new("BTreeMap", size), &size, |bencher, &size| {
            bencher.iter(|| {
                let mut sum = 0;
                for key in 0..size {
                    if let Some(&value) = standard_map.get(&black_box(key)) {
                        sum += value;
                    }
                }
                black_box(sum)
            });
        });
    }

    group.finish();
}

// =============================================================================
// remove Benchmark
// =============================================================================

fn benchmark_remove(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("remove");

    for size in [100, 1000, 10000] {
        let tree = build_tree(size);

        group.bench_with_input(BenchmarkId::new("AvlTree", size), &size, |bencher, &size| {
            bencher.iter(|| {
                let mut current = tree.clone();
                for key in 0..size {
                    current = current.remove(&black_box(key), &NaturalOrder).0;
                }
                black_box(current)
            });
        });
    }

    group.finish();
}

// =============================================================================
// Traversal Benchmark
// =============================================================================

fn benchmark_traversal(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("traversal");
    let tree = build_tree(10000);

    group.bench_function("iter", |bencher| {
        bencher.iter(|| black_box(tree.iter().map(|(_, value)| *value).sum::<i32>()));
    });

    group.bench_function("fold", |bencher| {
        bencher.iter(|| black_box(tree.fold(0, |_, value, sum| sum + value)));
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_add,
    benchmark_find,
    benchmark_remove,
    benchmark_traversal
);
criterion_main!(benches);
