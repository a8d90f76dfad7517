use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{thread_rng, Rng};
use std::sync::Arc;
use std::thread;
use travel_booking_engine::availability_cache::{AvailabilityCache, CacheConfig};
use travel_booking_engine::{BookingState, PackageCatalog, PackageType};

// Pricing and room limits run on every UI state change
pub fn pricing_benchmark(c: &mut Criterion) {
    let catalog = PackageCatalog::standard();
    let mut group = c.benchmark_group("booking_pricing");

    for package in PackageType::ALL {
        let config = catalog.get(package).unwrap().clone();
        group.bench_with_input(
            BenchmarkId::from_parameter(package),
            &package,
            |b, &package| {
                let mut rng = thread_rng();
                b.iter(|| {
                    let adults = rng.gen_range(config.min_adults..=config.max_adults);
                    let state = BookingState {
                        package_type: package,
                        adults,
                        children: 0,
                        rooms: rng.gen_range(1..=config.max_rooms),
                        ..BookingState::default()
                    };
                    let limits = catalog.room_limits(state.adults, state.children, package);
                    let pricing = catalog.calculate_pricing(&state, rng.gen_range(500.0..50000.0));
                    black_box((limits, pricing))
                });
            },
        );
    }

    group.finish();
}

// Concurrent readers and writers against the availability cache
pub fn cache_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("availability_cache");

    for max_entries in [16usize, 256, 4096].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(max_entries),
            max_entries,
            |b, &max_entries| {
                b.iter(|| {
                    let cache = Arc::new(AvailabilityCache::new(CacheConfig {
                        max_entries,
                        ..CacheConfig::default()
                    }));
                    let destination_ids = (0..100).map(|i| format!("dest{}", i)).collect::<Vec<_>>();

                    let mut handles = vec![];
                    for _ in 0..4 {
                        let cache = Arc::clone(&cache);
                        let destination_ids = destination_ids.clone();

                        handles.push(thread::spawn(move || {
                            let mut rng = thread_rng();
                            for _ in 0..250 {
                                let id = &destination_ids[rng.gen_range(0..destination_ids.len())];
                                if rng.gen_bool(0.3) {
                                    cache.store(id, Default::default(), None);
                                } else {
                                    let _ = cache.get(id);
                                }
                            }
                        }));
                    }

                    for handle in handles {
                        handle.join().unwrap();
                    }

                    black_box(cache.stats())
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, pricing_benchmark, cache_benchmark);
criterion_main!(benches);
