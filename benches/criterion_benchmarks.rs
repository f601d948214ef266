use criterion::{black_box, criterion_group, criterion_main, Criterion};
use datastore_rs::comparer::CaseInsensitiveComparer;
use datastore_rs::config::TimeToLiveConfig;
use datastore_rs::{
    DataStore, ExpiringDataStore, LockingDataStoreDecorator, SimpleDataStore, TimeToLivePolicy,
};
use std::time::Duration;

const STORE_SIZE: usize = 1000;

// Helper functions to create populated stores
fn make_simple(len: usize) -> SimpleDataStore<usize, usize> {
    let store = SimpleDataStore::new();
    for i in 0..len {
        store.set(i, i);
    }
    store
}

fn make_expiring(len: usize) -> ExpiringDataStore<usize, usize, TimeToLivePolicy> {
    let store = ExpiringDataStore::new(TimeToLivePolicy::new(TimeToLiveConfig {
        ttl: Duration::from_secs(3600),
        scan_interval: Duration::from_secs(3600),
    }));
    for i in 0..len {
        store.set(i, i);
    }
    store
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("Store Operations");

    // Simple store benchmarks
    {
        let store = make_simple(STORE_SIZE);

        group.bench_function("Simple get hit", |b| {
            b.iter(|| {
                for i in 0..100 {
                    black_box(store.try_get(&(i % STORE_SIZE)).unwrap());
                }
            });
        });

        group.bench_function("Simple get miss", |b| {
            b.iter(|| {
                for i in 0..100 {
                    black_box(store.try_get(&(i + STORE_SIZE)).unwrap());
                }
            });
        });

        group.bench_function("Simple set existing", |b| {
            b.iter(|| {
                for i in 0..100 {
                    store.set(i % STORE_SIZE, i);
                }
            });
        });

        group.bench_function("Simple get_or_create hit", |b| {
            b.iter(|| {
                for i in 0..100 {
                    black_box(store.get_or_insert_with(i % STORE_SIZE, |k| *k).unwrap());
                }
            });
        });
    }

    // Memoization round trip: miss, compute, remove
    {
        let store: SimpleDataStore<usize, usize> = SimpleDataStore::new();

        group.bench_function("Simple get_or_create miss", |b| {
            b.iter(|| {
                for i in 0..100 {
                    black_box(store.get_or_insert_with(i, |k| k * 2).unwrap());
                }
                store.clear();
            });
        });
    }

    // Case-insensitive keys
    {
        let store = SimpleDataStore::with_comparer(CaseInsensitiveComparer::new());
        let keys: Vec<String> = (0..STORE_SIZE).map(|i| format!("Key-{}", i)).collect();
        for (i, key) in keys.iter().enumerate() {
            store.set(key.clone(), i);
        }
        let lookups: Vec<String> = keys.iter().map(|k| k.to_uppercase()).collect();

        group.bench_function("Case-insensitive get hit", |b| {
            b.iter(|| {
                for key in lookups.iter().take(100) {
                    black_box(store.try_get(key).unwrap());
                }
            });
        });
    }

    // Expiring store benchmarks
    {
        let store = make_expiring(STORE_SIZE);

        group.bench_function("Expiring get hit", |b| {
            b.iter(|| {
                for i in 0..100 {
                    black_box(store.try_get(&(i % STORE_SIZE)).unwrap());
                }
            });
        });
    }

    // Locking decorator overhead (uncontended)
    {
        let store = LockingDataStoreDecorator::new(make_simple(STORE_SIZE));

        group.bench_function("Locking get hit", |b| {
            b.iter(|| {
                for i in 0..100 {
                    black_box(store.try_get(&(i % STORE_SIZE)).unwrap());
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
