use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{rngs::StdRng, Rng, SeedableRng};

use waypoint::ordering::{insertion_position, is_degenerate, renumbered};

/// Drop `moves` items into a column at random indices, renumbering when a gap runs out.
fn simulate(start: usize, moves: usize, seed: u64, front_only: bool) -> (Vec<f64>, usize) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut col = renumbered(start);
    let mut repairs = 0usize;
    for _ in 0..moves {
        let idx = if front_only { 0 } else { rng.gen_range(0..=col.len()) };
        if is_degenerate(&col, idx) {
            col = renumbered(col.len());
            repairs += 1;
        }
        let p = insertion_position(&col, idx);
        col.insert(idx, p);
    }
    (col, repairs)
}

fn bench_ordering(c: &mut Criterion) {
    let mut group = c.benchmark_group("ordering");
    group.sample_size(30);

    for &n in &[10usize, 100, 1_000] {
        let col = renumbered(n);
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("insertion_position_mid", n), &col, |b, col| {
            b.iter(|| criterion::black_box(insertion_position(col, col.len() / 2)));
        });
    }

    for &moves in &[1_000usize, 10_000] {
        group.throughput(Throughput::Elements(moves as u64));
        group.bench_with_input(BenchmarkId::new("random_moves", moves), &moves, |b, &moves| {
            b.iter(|| criterion::black_box(simulate(20, moves, 0xC0FF_EE00, false)));
        });
        group.bench_with_input(BenchmarkId::new("prepend_moves", moves), &moves, |b, &moves| {
            b.iter(|| criterion::black_box(simulate(20, moves, 0, true)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_ordering);
criterion_main!(benches);
