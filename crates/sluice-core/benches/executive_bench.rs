//! Criterion benchmarks for executive overhead (`sluice-core::pipeline`).
//!
//! Measures scheduling cost independently of compute cost using trivial
//! nodes. Two axes:
//!
//! - **Skip**: a memoized update over a chain where nothing is stale
//! - **Execute**: a full update over a chain after marking the source modified
//!
//! Run with: `cargo bench -p sluice-core -- executive/`
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use sluice_core::{
    Algorithm, DataKind, DataRequest, Execution, Extent, InformationRequest, InputPortSpec, Key,
    NodeError, NodeId, OutputPortSpec, Pipeline, UpdateRequest,
};

const CHAIN_LENGTHS: &[usize] = &[1, 8, 64];

// ---------------------------------------------------------------------------
// Trivial nodes: isolate executive overhead from compute cost
// ---------------------------------------------------------------------------

struct Source;

impl Algorithm for Source {
    fn name(&self) -> &str {
        "source"
    }
    fn input_ports(&self) -> Vec<InputPortSpec> {
        Vec::new()
    }
    fn output_ports(&self) -> Vec<OutputPortSpec> {
        vec![OutputPortSpec::new("out", DataKind::ImageData)]
    }
    fn request_information(&mut self, req: &mut InformationRequest) -> Result<(), NodeError> {
        req.output_mut(0).set(Key::WholeExtent, Extent::new(0, 63, 0, 63, 0, 0));
        Ok(())
    }
    fn request_data(&mut self, _req: &mut DataRequest<'_>) -> Result<Execution, NodeError> {
        Ok(Execution::Done)
    }
}

struct Identity;

impl Algorithm for Identity {
    fn name(&self) -> &str {
        "identity"
    }
    fn input_ports(&self) -> Vec<InputPortSpec> {
        vec![InputPortSpec::new("in")]
    }
    fn output_ports(&self) -> Vec<OutputPortSpec> {
        vec![OutputPortSpec::same_as_input("out", 0)]
    }
    fn request_data(&mut self, req: &mut DataRequest<'_>) -> Result<Execution, NodeError> {
        if let Some(input) = req.input(0, 0).cloned() {
            if let Some(out) = req.output_mut(0) {
                out.shallow_copy(&input);
            }
        }
        Ok(Execution::Done)
    }
}

fn build_chain(len: usize) -> (Pipeline, NodeId, NodeId) {
    let mut pipeline = Pipeline::new();
    let source = pipeline.add(Source);
    let mut last = source;
    for _ in 0..len {
        let next = pipeline.add(Identity);
        pipeline.connect_default(last, next).unwrap();
        last = next;
    }
    (pipeline, source, last)
}

fn bench_skip(c: &mut Criterion) {
    let mut group = c.benchmark_group("executive/skip");
    for &len in CHAIN_LENGTHS {
        let (mut pipeline, _, tail) = build_chain(len);
        pipeline.update(tail).unwrap();
        group.bench_with_input(BenchmarkId::new("chain", len), &len, |b, _| {
            b.iter(|| black_box(pipeline.update(tail).unwrap()));
        });
    }
    group.finish();
}

fn bench_execute(c: &mut Criterion) {
    let mut group = c.benchmark_group("executive/execute");
    for &len in CHAIN_LENGTHS {
        let (mut pipeline, source, tail) = build_chain(len);
        let request = UpdateRequest::new().with_piece(1, 4).with_ghost_levels(1);
        group.bench_with_input(BenchmarkId::new("chain", len), &len, |b, _| {
            b.iter(|| {
                pipeline.modified(source).unwrap();
                black_box(pipeline.update_with(tail, &request).unwrap())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_skip, bench_execute);
criterion_main!(benches);
