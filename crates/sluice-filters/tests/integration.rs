//! Integration tests for the reference nodes.
//!
//! Each test wires a small pipeline out of the crate's nodes and checks the
//! data that reaches a probe, together with how often each node ran.

use sluice_core::{Extent, Key, NodeId, Pipeline, UpdateRequest};
use sluice_filters::{
    Append, BoxSmooth, ForceTime, ImageBlock, ImageSource, ImageStreamer, PassThrough, Probe,
    ProbeLog, TableSource, TemporalDifference,
};

fn probe(p: &mut Pipeline) -> (NodeId, ProbeLog) {
    let probe = Probe::new();
    let log = probe.log();
    (p.add(probe), log)
}

fn image_of(p: &Pipeline, node: NodeId) -> ImageBlock {
    let data = p.output_data(node, 0).unwrap();
    data.payload::<ImageBlock>().unwrap().clone()
}

// ============================================================================
// Forced time
// ============================================================================

fn forced_pipeline() -> (Pipeline, NodeId, NodeId, NodeId, ProbeLog) {
    let mut p = Pipeline::new();
    let src = p.add(
        ImageSource::new(Extent::new_2d(0, 3, 0, 3)).with_time_steps(&[0.0, 1.0, 5.0, 6.0, 9.0]),
    );
    let force = p.add(ForceTime::new(5.0));
    let (sink, log) = probe(&mut p);
    p.connect_default(src, force).unwrap();
    p.connect_default(force, sink).unwrap();
    (p, src, force, sink, log)
}

#[test]
fn forced_time_builds_cache_in_one_continue_cycle() {
    let (mut p, src, force, sink, log) = forced_pipeline();
    let report = p.update_with(sink, &UpdateRequest::new().with_time(9.0)).unwrap();

    assert_eq!(report.continue_iterations, 1);
    assert_eq!(p.phase_counts(force).unwrap().data, 2);
    assert_eq!(log.last().unwrap().time, Some(5.0));
    assert_eq!(p.node(force).unwrap().parameter("cached_time").as_deref(), Some("5"));
    // Upstream is left at the pipeline time.
    let upstream = p.output_data(src, 0).unwrap();
    assert_eq!(upstream.info().double(Key::DataTimeStep), Some(9.0));
}

#[test]
fn unchanged_forced_time_reuses_cached_object() {
    let (mut p, src, force, sink, log) = forced_pipeline();
    p.update_with(sink, &UpdateRequest::new().with_time(9.0)).unwrap();
    let first = p.output_data(force, 0).unwrap();
    let src_runs = p.phase_counts(src).unwrap().data;

    let report = p.update_with(sink, &UpdateRequest::new().with_time(9.0)).unwrap();
    assert!(!report.did_execute(src));
    assert!(!report.did_execute(force));
    assert_eq!(report.continue_iterations, 0);
    assert_eq!(p.phase_counts(src).unwrap().data, src_runs);
    let second = p.output_data(force, 0).unwrap();
    assert!(first.shares_payload_with(&second));
    assert_eq!(log.len(), 1);
}

#[test]
fn changing_forced_time_runs_exactly_one_new_cycle() {
    let (mut p, _src, force, sink, log) = forced_pipeline();
    p.update_with(sink, &UpdateRequest::new().with_time(9.0)).unwrap();
    assert_eq!(p.node(force).unwrap().parameter("invalidations").as_deref(), Some("1"));

    p.set_parameter(force, "forced_time", "6").unwrap();
    let report = p.update_with(sink, &UpdateRequest::new().with_time(9.0)).unwrap();
    assert_eq!(report.continue_iterations, 1);
    assert_eq!(p.phase_counts(force).unwrap().data, 4);
    assert_eq!(p.node(force).unwrap().parameter("invalidations").as_deref(), Some("2"));
    assert_eq!(log.last().unwrap().time, Some(6.0));
    // Index pattern: cell (0, 0) holds the time.
    assert_eq!(image_of(&p, force).get(0, 0, 0), Some(6.0));
}

#[test]
fn downstream_time_does_not_reach_forced_output() {
    let (mut p, _src, force, sink, _log) = forced_pipeline();
    p.update_with(sink, &UpdateRequest::new().with_time(0.0)).unwrap();
    let report = p.update_with(sink, &UpdateRequest::new().with_time(1.0)).unwrap();
    assert!(!report.did_execute(force));
    assert!(report.warnings.is_empty());
}

// ============================================================================
// Streaming and pieces
// ============================================================================

#[test]
fn streamed_smoothing_matches_direct_smoothing() {
    let whole = Extent::new(0, 7, 0, 7, 0, 5);

    let mut direct = Pipeline::new();
    let src = direct.add(ImageSource::new(whole));
    let smooth = direct.add(BoxSmooth::new(1));
    direct.connect_default(src, smooth).unwrap();
    direct.update(smooth).unwrap();
    let expected = image_of(&direct, smooth);

    let mut streamed = Pipeline::new();
    let src = streamed.add(ImageSource::new(whole));
    let smooth = streamed.add(BoxSmooth::new(1));
    let streamer = streamed.add(ImageStreamer::new(3));
    let (sink, log) = probe(&mut streamed);
    streamed.connect_default(src, smooth).unwrap();
    streamed.connect_default(smooth, streamer).unwrap();
    streamed.connect_default(streamer, sink).unwrap();
    let report = streamed.update(sink).unwrap();

    assert_eq!(report.continue_iterations, 2);
    assert_eq!(streamed.phase_counts(smooth).unwrap().data, 3);
    assert_eq!(image_of(&streamed, streamer), expected);
    let record = log.last().unwrap();
    assert_eq!(record.cells, whole.volume() as usize);
    assert_eq!(record.extent, Some(whole));
}

#[test]
fn smoothed_pieces_reassemble_the_whole() {
    let whole = Extent::new_2d(0, 15, 0, 15);

    let mut reference = Pipeline::new();
    let src = reference.add(ImageSource::new(whole));
    let smooth = reference.add(BoxSmooth::new(2));
    reference.connect_default(src, smooth).unwrap();
    reference.update(smooth).unwrap();
    let expected = image_of(&reference, smooth);

    let mut p = Pipeline::new();
    let src = p.add(ImageSource::new(whole));
    let smooth = p.add(BoxSmooth::new(2));
    let (sink, log) = probe(&mut p);
    p.connect_default(src, smooth).unwrap();
    p.connect_default(smooth, sink).unwrap();

    let mut assembled = ImageBlock::new(whole, f64::NAN);
    for piece in 0..4 {
        p.update_with(sink, &UpdateRequest::new().with_piece(piece, 4)).unwrap();
        let part = image_of(&p, smooth);
        assert_eq!(log.last().unwrap().piece, piece);
        assembled.paste(&part);
    }
    assert_eq!(assembled, expected);
}

#[test]
fn ghost_request_widens_source_piece() {
    let mut p = Pipeline::new();
    let src = p.add(ImageSource::new(Extent::new_2d(0, 15, 0, 15)));
    let smooth = p.add(BoxSmooth::new(2));
    let (sink, _log) = probe(&mut p);
    p.connect_default(src, smooth).unwrap();
    p.connect_default(smooth, sink).unwrap();
    p.update_with(sink, &UpdateRequest::new().with_piece(0, 4).with_ghost_levels(1))
        .unwrap();

    let request = p.output_request(src, 0).unwrap();
    assert_eq!(request.uint(Key::UpdateNumberOfGhostLevels), Some(3));
    let smooth_region = image_of(&p, smooth).extent();
    let src_region = image_of(&p, src).extent();
    assert!(src_region.contains(&smooth_region));
    assert!(src_region.volume() > smooth_region.volume());
}

// ============================================================================
// Fan-in
// ============================================================================

#[test]
fn append_merges_every_connection_in_order() {
    let mut p = Pipeline::new();
    let a = p.add(TableSource::new(3));
    let b = p.add(TableSource::new(2).with_columns(&["index"]));
    let app = p.add(Append::new());
    let (sink, log) = probe(&mut p);
    p.connect_default(a, app).unwrap();
    p.connect_default(b, app).unwrap();
    p.connect_default(app, sink).unwrap();
    p.update(sink).unwrap();

    let record = log.last().unwrap();
    assert_eq!(record.cells, 5);
    // index: 0+1+2 + 0+1, double: 0+2+4, the second table has no double.
    assert_eq!(record.sum, 10.0);

    p.set_parameter(b, "rows", "4").unwrap();
    let report = p.update(sink).unwrap();
    assert!(report.did_execute(b));
    assert!(!report.did_execute(a));
    assert_eq!(log.last().unwrap().cells, 7);
}

#[test]
fn appended_images_feed_a_filter() {
    let mut p = Pipeline::new();
    let left = p.add(ImageSource::new(Extent::new_2d(0, 3, 0, 3)));
    let right = p.add(ImageSource::new(Extent::new_2d(4, 7, 0, 3)));
    let app = p.add(Append::new());
    let pass = p.add(PassThrough::new());
    let (sink, log) = probe(&mut p);
    p.connect_default(left, app).unwrap();
    p.connect_default(right, app).unwrap();
    p.connect_default(app, pass).unwrap();
    p.connect_default(pass, sink).unwrap();
    p.update(sink).unwrap();

    let record = log.last().unwrap();
    assert_eq!(record.extent, Some(Extent::new_2d(0, 7, 0, 3)));
    assert_eq!(record.cells, 32);
}

// ============================================================================
// Time and cancellation
// ============================================================================

#[test]
fn temporal_difference_against_previous_step() {
    let mut p = Pipeline::new();
    let src = p.add(
        ImageSource::new(Extent::new_2d(0, 3, 0, 3)).with_time_steps(&[0.0, 0.5, 2.0, 4.0]),
    );
    let diff = p.add(TemporalDifference::new(1));
    let (sink, log) = probe(&mut p);
    p.connect_default(src, diff).unwrap();
    p.connect_default(diff, sink).unwrap();

    // 2.2 snaps to the step 2.0; the previous step is 0.5.
    p.update_with(sink, &UpdateRequest::new().with_time(2.2)).unwrap();
    let record = log.last().unwrap();
    assert_eq!(record.time, Some(2.0));
    assert!((record.sum - 16.0 * 1.5).abs() < 1e-9);
    assert_eq!(p.phase_counts(src).unwrap().data, 2);
}

#[test]
fn abort_from_progress_observer_publishes_partial_image() {
    let mut p = Pipeline::new();
    let src = p.add(ImageSource::new(Extent::new(0, 3, 0, 3, 0, 3)));
    let (sink, log) = probe(&mut p);
    p.connect_default(src, sink).unwrap();
    let handle = p.abort_handle();
    p.set_progress_observer(move |_node: NodeId, _name: &str, _fraction: f64| handle.abort());

    let report = p.update(sink).unwrap();
    assert!(report.is_partial());
    assert!(report.partial.contains(&src));
    let block = image_of(&p, src);
    // Only the first z slice was filled before the abort was seen.
    assert_eq!(block.get(3, 3, 0), Some(15.0));
    assert_eq!(block.get(3, 3, 3), Some(0.0));

    p.clear_progress_observer();
    let report = p.update(sink).unwrap();
    assert!(report.did_execute(src));
    assert!(!report.is_partial());
    assert_eq!(image_of(&p, src).get(3, 3, 3), Some(63.0));
    assert!(!log.is_empty());
}
