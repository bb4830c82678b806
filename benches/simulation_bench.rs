use criterion::{black_box, criterion_group, criterion_main, Criterion};
use police_station_sim::prelude::*;
use police_station_sim::report::NullReporter;

fn reference_run(c: &mut Criterion) {
    c.bench_function("reference_station_1800", |b| {
        b.iter(|| {
            let config = StationConfig {
                seed: Some(black_box(7)),
                ..StationConfig::default()
            };
            let mut sim = Simulator::new(config).unwrap();
            sim.run(&mut NullReporter).unwrap()
        })
    });

    c.bench_function("busy_station_one_day", |b| {
        b.iter(|| {
            let config = StationConfig {
                officers: 2,
                desks: 1,
                horizon: SimTime::new(24 * 3600),
                citizens: UnitRange::fixed(500),
                seed: Some(black_box(7)),
                ..StationConfig::default()
            };
            let mut sim = Simulator::new(config).unwrap();
            sim.run(&mut NullReporter).unwrap()
        })
    });
}

criterion_group!(benches, reference_run);
criterion_main!(benches);
