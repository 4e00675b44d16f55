//! Criterion benchmarks for extent translation and time snapping.
//!
//! - **Split**: ghost-free piece computation with and without the cache
//! - **Snap**: time-step resolution over growing step lists
//!
//! Run with: `cargo bench -p sluice-core -- translator/`
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use sluice_core::{Extent, ExtentTranslator, PieceRequest, SplitMode, TimeSnap, resolve, split_extent};

const PIECE_COUNTS: &[u32] = &[4, 64, 1024];
const STEP_COUNTS: &[usize] = &[8, 128, 4096];

fn bench_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("translator/split");
    let whole = Extent::new(0, 511, 0, 511, 0, 63);

    for &pieces in PIECE_COUNTS {
        group.bench_with_input(BenchmarkId::new("uncached", pieces), &pieces, |b, &n| {
            b.iter(|| {
                for p in 0..n {
                    black_box(split_extent(black_box(&whole), p, n, SplitMode::Block));
                }
            });
        });
        group.bench_with_input(BenchmarkId::new("cached_ghost1", pieces), &pieces, |b, &n| {
            let mut translator = ExtentTranslator::new();
            b.iter(|| {
                for p in 0..n {
                    let request = PieceRequest::new(p, n).with_ghost_levels(1);
                    black_box(translator.piece_to_extent(black_box(&whole), request));
                }
            });
        });
    }
    group.finish();
}

fn bench_snap(c: &mut Criterion) {
    let mut group = c.benchmark_group("translator/snap");
    for &count in STEP_COUNTS {
        let steps: Vec<f64> = (0..count).map(|i| i as f64 * 0.5).collect();
        let target = count as f64 * 0.25 + 0.1;
        for mode in [TimeSnap::Nearest, TimeSnap::NextBelowOrEqual, TimeSnap::NextAboveOrEqual] {
            group.bench_with_input(BenchmarkId::new(mode.name(), count), &steps, |b, steps| {
                b.iter(|| black_box(resolve(black_box(target), steps, mode)));
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_split, bench_snap);
criterion_main!(benches);
