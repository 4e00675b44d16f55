//! Integration tests for sluice-config.
//!
//! These tests load the pipeline files under `demos/`, round-trip descriptions
//! through the filesystem and build live pipelines from them.

use sluice_config::{
    ConfigError, ConnectionConfig, NodeConfig, NodeRegistry, PipelineConfig, UpdateConfig,
    ValidationError,
};
use sluice_core::{Extent, Key, MultiBlock};
use sluice_filters::{ImageBlock, Table};
use std::path::PathBuf;
use tempfile::TempDir;

fn demo(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../demos")
        .join(name)
}

// ============================================================================
// Demo files
// ============================================================================

#[test]
fn every_demo_file_validates() {
    let registry = NodeRegistry::new();
    for name in [
        "streamed_smooth.toml",
        "forced_time.toml",
        "append_tables.toml",
        "grouped_smooth.toml",
    ] {
        let config = PipelineConfig::load(demo(name)).unwrap();
        assert!(
            config.validate(&registry).is_ok(),
            "{name}: {:?}",
            config.validate(&registry)
        );
    }
}

#[test]
fn streamed_demo_produces_whole_image() {
    let config = PipelineConfig::load(demo("streamed_smooth.toml")).unwrap();
    let mut built = config.build(&NodeRegistry::new()).unwrap();
    let reports = built.update().unwrap();
    let (target, report) = &reports[0];
    assert_eq!(built.id_of(*target), Some("probe"));
    assert_eq!(report.continue_iterations, 3);

    let stream = built.node("stream").unwrap();
    let data = built.pipeline.output_data(stream, 0).unwrap();
    let block = data.payload::<ImageBlock>().unwrap();
    assert_eq!(block.extent(), Extent::new(0, 31, 0, 31, 0, 7));
    assert!(block.values().iter().all(|v| v.is_finite()));
}

#[test]
fn forced_demo_ignores_requested_time() {
    let config = PipelineConfig::load(demo("forced_time.toml")).unwrap();
    let mut built = config.build(&NodeRegistry::new()).unwrap();
    assert_eq!(built.request.time, Some(9.0));
    built.update().unwrap();

    let force = built.node("force").unwrap();
    let data = built.pipeline.output_data(force, 0).unwrap();
    assert_eq!(data.info().double(Key::DataTimeStep), Some(5.0));

    // Same request again: nothing upstream runs.
    let src = built.node("src").unwrap();
    let reports = built.update().unwrap();
    assert!(!reports[0].1.did_execute(src));
}

#[test]
fn append_demo_requests_first_piece() {
    let config = PipelineConfig::load(demo("append_tables.toml")).unwrap();
    let mut built = config.build(&NodeRegistry::new()).unwrap();
    built.update().unwrap();

    let append = built.node("append").unwrap();
    let data = built.pipeline.output_data(append, 0).unwrap();
    let table = data.payload::<Table>().unwrap();
    // Half of each source: 3 rows and 2 rows.
    assert_eq!(table.row_count(), 5);
    assert_eq!(table.columns(), ["index".to_string(), "double".to_string()]);
}

#[test]
fn grouped_demo_smooths_each_block() {
    let config = PipelineConfig::load(demo("grouped_smooth.toml")).unwrap();
    let mut built = config.build(&NodeRegistry::new()).unwrap();
    built.update().unwrap();

    let smooth = built.node("smooth").unwrap();
    let data = built.pipeline.output_data(smooth, 0).unwrap();
    let blocks = data.payload::<MultiBlock>().unwrap();
    let extents: Vec<_> = blocks
        .iter()
        .map(|b| b.and_then(|b| b.payload::<ImageBlock>()).map(ImageBlock::extent))
        .collect();
    assert_eq!(
        extents,
        [Some(Extent::new_2d(0, 15, 0, 15)), Some(Extent::new_2d(0, 3, 0, 3))]
    );
}

// ============================================================================
// Files
// ============================================================================

#[test]
fn save_and_load_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("pipeline.toml");

    let config = PipelineConfig::new("round trip")
        .with_description("saved by a test")
        .with_node(
            NodeConfig::new("src", "image_source")
                .with_param("whole_extent", "0 3 0 3 0 0")
                .with_param("time_range", "0,10"),
        )
        .with_node(NodeConfig::new("probe", "probe"))
        .with_connection(ConnectionConfig::new("src", "probe"))
        .with_update(UpdateConfig {
            sink: Some("probe".to_string()),
            time: Some(2.5),
            ..UpdateConfig::default()
        });
    config.save(&path).unwrap();
    assert!(path.exists());

    let loaded = PipelineConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
    assert!(loaded.validate(&NodeRegistry::new()).is_ok());
}

#[test]
fn load_missing_file_reports_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");
    let err = PipelineConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
    assert!(err.to_string().contains("absent.toml"));
}

#[test]
fn invalid_file_fails_to_build_with_every_problem() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(
        &path,
        r#"
name = "broken"

[update]
sink = "nobody"

[[nodes]]
id = "src"
type = "image_source"
[nodes.params]
whole_extent = "0 3 0"

[[nodes]]
id = "smooth"
type = "box_smooth"
"#,
    )
    .unwrap();

    let config = PipelineConfig::load(&path).unwrap();
    let err = config.build(&NodeRegistry::new()).unwrap_err();
    let ConfigError::Invalid(ValidationError::Multiple(errors)) = err else {
        panic!("expected several validation errors");
    };
    assert_eq!(errors.len(), 3);
    assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidParameter { param, .. } if param == "whole_extent")));
    assert!(errors.iter().any(|e| matches!(e, ValidationError::MissingInput { node, .. } if node == "smooth")));
    assert!(errors.contains(&ValidationError::UnknownNode("nobody".to_string())));
}
