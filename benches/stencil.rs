//! Benchmarks for the stencil step and a full single-rank generation.
//!
//! The band sizes straddle `PARALLEL_THRESHOLD` so both the sequential and
//! the rayon path are measured.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use game_of_life_bands::halo::wrap_single_band;
use game_of_life_bands::partition::{Band, Partition};
use game_of_life_bands::stencil::{step, Scratch};

fn seeded_band(rows: usize, cols: usize) -> Band {
    let partition = Partition::new(rows, cols, 1, 0).unwrap();
    let mut band = Band::new(&partition);
    for (i, cell) in band.owned_mut().iter_mut().enumerate() {
        *cell = u8::from((i * 7 + i / cols) % 5 < 2);
    }
    band
}

/// One stencil step on a band whose ghost rows are already fresh.
fn bench_stencil_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("stencil_step");
    for size in [64usize, 256, 1024] {
        let mut band = seeded_band(size, size);
        wrap_single_band(&mut band);
        let mut scratch = Scratch::for_band(&band);

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| step(black_box(&mut band), &mut scratch));
        });
    }
    group.finish();
}

/// Self-wrap plus step: a whole generation for a single rank.
fn bench_single_rank_generation(c: &mut Criterion) {
    let mut band = seeded_band(400, 400);
    let mut scratch = Scratch::for_band(&band);

    c.bench_function("single_rank_generation_400", |b| {
        b.iter(|| {
            wrap_single_band(black_box(&mut band));
            step(&mut band, &mut scratch);
        });
    });
}

criterion_group!(benches, bench_stencil_step, bench_single_rank_generation);
criterion_main!(benches);
