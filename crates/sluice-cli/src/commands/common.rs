//! Shared CLI helpers used across multiple commands.

use sluice_config::{PipelineConfig, ValidationError};
use sluice_core::{Extent, NodeId, Pipeline};
use sluice_filters::{ProbeRecord, summarize};
use std::path::Path;

/// Parse a `key=value` string for clap's `value_parser`.
pub fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let parts: Vec<&str> = s.splitn(2, '=').collect();
    if parts.len() != 2 {
        return Err(format!(
            "Invalid parameter format: '{s}' (expected node.param=value)"
        ));
    }
    Ok((parts[0].to_string(), parts[1].to_string()))
}

/// Parse a comma or space separated list of numbers.
pub fn parse_list(s: &str) -> anyhow::Result<Vec<f64>> {
    s.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(|t| {
            t.parse::<f64>()
                .map_err(|_| anyhow::anyhow!("'{t}' is not a number"))
        })
        .collect()
}

/// Load a pipeline file.
pub fn load_config(path: &Path) -> anyhow::Result<PipelineConfig> {
    Ok(PipelineConfig::load(path)?)
}

/// Apply `node.param=value` overrides to a description.
pub fn apply_overrides(
    config: &mut PipelineConfig,
    overrides: &[(String, String)],
) -> anyhow::Result<()> {
    for (key, value) in overrides {
        let (node, param) = key
            .split_once('.')
            .ok_or_else(|| anyhow::anyhow!("override '{key}' must be written node.param"))?;
        let entry = config
            .nodes
            .iter_mut()
            .find(|n| n.id == node)
            .ok_or_else(|| anyhow::anyhow!("override '{key}' names unknown node '{node}'"))?;
        entry.set_param(param, value.clone());
    }
    Ok(())
}

/// Every individual problem inside a validation error.
pub fn flatten(err: &ValidationError) -> Vec<&ValidationError> {
    match err {
        ValidationError::Multiple(errors) => errors.iter().flat_map(flatten).collect(),
        other => vec![other],
    }
}

/// Output objects an update of `target` delivered: the target's own outputs,
/// or what its producers hand it when it has none.
pub fn delivered(pipeline: &Pipeline, target: NodeId) -> Vec<(NodeId, ProbeRecord)> {
    let own = outputs_of(pipeline, target);
    if !own.is_empty() {
        return own;
    }
    pipeline
        .producers(target)
        .into_iter()
        .flat_map(|producer| outputs_of(pipeline, producer))
        .collect()
}

fn outputs_of(pipeline: &Pipeline, node: NodeId) -> Vec<(NodeId, ProbeRecord)> {
    (0..)
        .map_while(|port| pipeline.output_data(node, port).map(|data| (port, data)))
        .map(|(port, data)| (node, summarize(port, &data)))
        .collect()
}

/// Display name of a node.
pub fn node_label(pipeline: &Pipeline, node: NodeId) -> String {
    pipeline
        .name(node)
        .map_or_else(|| format!("#{}", node.index()), str::to_string)
}

/// Extent as `[x0 x1 y0 y1 z0 z1]`, or `-` when absent.
pub fn extent_label(extent: Option<Extent>) -> String {
    extent.map_or_else(|| "-".to_string(), |e| e.to_string())
}
