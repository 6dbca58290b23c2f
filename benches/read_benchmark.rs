use cfs_importer::native::{MockChannel, MockLibrary, MockSweep};
use cfs_importer::{load, VarType};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn recording(channels: usize, sweeps: usize, points: usize) -> MockLibrary {
    let mut lib = MockLibrary::new(sweeps as u16);
    for c in 0..channels {
        let mut channel = MockChannel::new(&format!("ch{}", c), "mV", VarType::Int16);
        for s in 0..sweeps {
            let raw = (0..points).map(|i| ((i + s) % 2048) as f64).collect();
            channel = channel.with_sweep(MockSweep::new(raw, 1e-4, 0.0).scaled(0.01, 0.0));
        }
        lib = lib.with_channel(channel);
    }
    lib
}

pub fn bench_load_descriptors(c: &mut Criterion) {
    // Many short sweeps: dominated by descriptor and calibration reads
    let mut lib = recording(4, 200, 16);
    c.bench_function("load_many_short_sweeps", |b| {
        b.iter(|| {
            let result = black_box(load(MockLibrary::PATH, &mut lib));
            black_box(result.is_ok())
        });
    });
}

pub fn bench_sweep_decoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_sweeps");
    for points in [1_000usize, 10_000, 100_000] {
        let mut lib = recording(2, 10, points);
        group.bench_with_input(BenchmarkId::from_parameter(points), &points, |b, _| {
            b.iter(|| {
                let result = black_box(load(MockLibrary::PATH, &mut lib));
                black_box(result.is_ok())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_load_descriptors, bench_sweep_decoding);
criterion_main!(benches);
