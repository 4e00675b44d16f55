//! Criterion benchmarks for the reference nodes (`sluice-filters`).
//!
//! - **Smooth**: box smoothing of a 64x64x8 block at several radii
//! - **Stream**: source, smoothing and streamer at several division counts
//!
//! Run with: `cargo bench -p sluice-filters`
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use sluice_core::{Extent, Pipeline};
use sluice_filters::{BoxSmooth, ImageBlock, ImageSource, ImageStreamer};

const WHOLE: Extent = Extent::new(0, 63, 0, 63, 0, 7);

// ---------------------------------------------------------------------------
// Kernel cost
// ---------------------------------------------------------------------------

fn bench_smooth(c: &mut Criterion) {
    let source = ImageSource::new(WHOLE);
    let input = ImageBlock::from_fn(WHOLE, |i, j, k| source.value_at(i, j, k, 0.0));
    let mut group = c.benchmark_group("filters/smooth");
    for &radius in &[1u32, 2, 4] {
        let smooth = BoxSmooth::new(radius);
        group.bench_with_input(BenchmarkId::from_parameter(radius), &radius, |b, _| {
            b.iter(|| black_box(smooth.smooth(black_box(&input), &WHOLE)));
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Streaming through the executive
// ---------------------------------------------------------------------------

fn bench_stream(c: &mut Criterion) {
    let mut group = c.benchmark_group("filters/stream");
    for &divisions in &[1u32, 4, 8] {
        let mut pipeline = Pipeline::new();
        let src = pipeline.add(ImageSource::new(WHOLE));
        let smooth = pipeline.add(BoxSmooth::new(1));
        let streamer = pipeline.add(ImageStreamer::new(divisions));
        pipeline.connect_default(src, smooth).unwrap();
        pipeline.connect_default(smooth, streamer).unwrap();
        group.bench_with_input(
            BenchmarkId::from_parameter(divisions),
            &divisions,
            |b, _| {
                b.iter(|| {
                    pipeline.modified(src).unwrap();
                    black_box(pipeline.update(streamer).unwrap())
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_smooth, bench_stream);
criterion_main!(benches);
