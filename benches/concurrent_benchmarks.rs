//! Concurrent Store Benchmarks
//!
//! Benchmarks for measuring concurrent store performance across different
//! access patterns and segment configurations.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use datastore_rs::comparer::DefaultComparer;
use datastore_rs::config::ConcurrentDataStoreConfig;
use datastore_rs::{
    ConcurrentDataStore, DataStore, LazyLockingDataStoreAdapter, LockingDataStoreDecorator,
    SimpleDataStore,
};
use std::sync::Arc;
use std::thread;

const STORE_SIZE: usize = 10_000;
const OPS_PER_THREAD: usize = 1_000;
const NUM_THREADS: usize = 8;

type Locked = LockingDataStoreDecorator<SimpleDataStore<usize, usize>>;

fn populate<S: DataStore<usize, usize>>(store: &S) {
    for i in 0..STORE_SIZE {
        store.set(i, i);
    }
}

/// Benchmark concurrent read operations across all thread-safe stores
fn concurrent_reads(c: &mut Criterion) {
    let mut group = c.benchmark_group("Concurrent Reads");
    group.throughput(Throughput::Elements((NUM_THREADS * OPS_PER_THREAD) as u64));

    let concurrent: Arc<ConcurrentDataStore<usize, usize>> = Arc::new(ConcurrentDataStore::new());
    let lazy: Arc<LazyLockingDataStoreAdapter<usize, usize>> =
        Arc::new(LazyLockingDataStoreAdapter::new());
    let locked: Arc<Locked> = Arc::new(LockingDataStoreDecorator::new(SimpleDataStore::new()));

    populate(concurrent.as_ref());
    populate(lazy.as_ref());
    populate(locked.as_ref());

    group.bench_function("Concurrent", |b| {
        b.iter(|| run_concurrent(Arc::clone(&concurrent), NUM_THREADS, OPS_PER_THREAD, 0));
    });
    group.bench_function("LazyLocking", |b| {
        b.iter(|| run_concurrent(Arc::clone(&lazy), NUM_THREADS, OPS_PER_THREAD, 0));
    });
    group.bench_function("Locking", |b| {
        b.iter(|| run_concurrent(Arc::clone(&locked), NUM_THREADS, OPS_PER_THREAD, 0));
    });

    group.finish();
}

/// Benchmark a mixed workload: 80% reads, 20% get_or_create
fn concurrent_mixed(c: &mut Criterion) {
    let mut group = c.benchmark_group("Concurrent Mixed (80/20)");
    group.throughput(Throughput::Elements((NUM_THREADS * OPS_PER_THREAD) as u64));

    group.bench_function("Concurrent", |b| {
        let store: Arc<ConcurrentDataStore<usize, usize>> = Arc::new(ConcurrentDataStore::new());
        b.iter(|| {
            run_concurrent(Arc::clone(&store), NUM_THREADS, OPS_PER_THREAD, 5);
            store.clear();
        });
    });
    group.bench_function("LazyLocking", |b| {
        let store: Arc<LazyLockingDataStoreAdapter<usize, usize>> =
            Arc::new(LazyLockingDataStoreAdapter::new());
        b.iter(|| {
            run_concurrent(Arc::clone(&store), NUM_THREADS, OPS_PER_THREAD, 5);
            store.clear();
        });
    });
    group.bench_function("Locking", |b| {
        let store: Arc<Locked> = Arc::new(LockingDataStoreDecorator::new(SimpleDataStore::new()));
        b.iter(|| {
            run_concurrent(Arc::clone(&store), NUM_THREADS, OPS_PER_THREAD, 5);
            store.clear();
        });
    });

    group.finish();
}

/// Benchmark different segment counts for the concurrent store
fn segment_count_comparison(c: &mut Criterion) {
    let mut group = c.benchmark_group("Segment Count Comparison");
    group.throughput(Throughput::Elements((NUM_THREADS * OPS_PER_THREAD) as u64));

    for segments in [1, 4, 8, 16, 32, 64] {
        group.bench_with_input(
            BenchmarkId::new("segments", segments),
            &segments,
            |b, &seg_count| {
                let store: Arc<ConcurrentDataStore<usize, usize>> =
                    Arc::new(ConcurrentDataStore::init(
                        ConcurrentDataStoreConfig {
                            segments: seg_count,
                        },
                        DefaultComparer::new(),
                    ));
                populate(store.as_ref());
                b.iter(|| run_concurrent(Arc::clone(&store), NUM_THREADS, OPS_PER_THREAD, 5));
            },
        );
    }

    group.finish();
}

/// Runs `num_threads` workers against `store`. Every `create_every`-th
/// operation is a `get_or_create`; `0` means reads only.
fn run_concurrent<S>(store: Arc<S>, num_threads: usize, ops_per_thread: usize, create_every: usize)
where
    S: DataStore<usize, usize> + Send + Sync + 'static,
{
    let mut handles = Vec::with_capacity(num_threads);
    for t in 0..num_threads {
        let store = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            for i in 0..ops_per_thread {
                let key = (t * ops_per_thread + i) % STORE_SIZE;
                if create_every != 0 && i % create_every == 0 {
                    black_box(store.get_or_insert_with(key, |k| *k).unwrap());
                } else {
                    black_box(store.try_get(&key).unwrap());
                }
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
}

criterion_group!(
    benches,
    concurrent_reads,
    concurrent_mixed,
    segment_count_comparison
);
criterion_main!(benches);
