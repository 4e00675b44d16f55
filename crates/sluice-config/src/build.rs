//! Turning a description into a live pipeline.

use sluice_core::{NodeId, Pipeline, PipelineError, UpdateReport, UpdateRequest};
use sluice_registry::NodeRegistry;
use std::collections::{BTreeMap, BTreeSet};

use crate::pipeline_config::PipelineConfig;
use crate::validation::{ValidationError, ValidationResult, instantiate};

/// A pipeline created from a [`PipelineConfig`].
///
/// Every node carries its config id as its pipeline name.
pub struct BuiltPipeline {
    /// The live pipeline.
    pub pipeline: Pipeline,
    /// Config ids and node handles, in declaration order.
    pub nodes: Vec<(String, NodeId)>,
    /// Node named by `[update] sink`, if any.
    pub sink: Option<NodeId>,
    /// Request parsed from the `[update]` section.
    pub request: UpdateRequest,
}

impl BuiltPipeline {
    /// Handle of the node declared as `id`.
    pub fn node(&self, id: &str) -> Option<NodeId> {
        self.nodes.iter().find(|(name, _)| name == id).map(|&(_, node)| node)
    }

    /// Config id of `node`.
    pub fn id_of(&self, node: NodeId) -> Option<&str> {
        self.nodes
            .iter()
            .find(|&&(_, n)| n == node)
            .map(|(name, _)| name.as_str())
    }

    /// Nodes an update drives: the configured sink, else every sink.
    pub fn targets(&self) -> Vec<NodeId> {
        match self.sink {
            Some(sink) => vec![sink],
            None => self.pipeline.sinks(),
        }
    }

    /// Updates every target with the configured request.
    pub fn update(&mut self) -> Result<Vec<(NodeId, UpdateReport)>, PipelineError> {
        let request = self.request;
        self.update_with(&request)
    }

    /// Updates every target with `request`, stopping at the first failure.
    pub fn update_with(
        &mut self,
        request: &UpdateRequest,
    ) -> Result<Vec<(NodeId, UpdateReport)>, PipelineError> {
        let mut reports = Vec::new();
        for target in self.targets() {
            let report = self.pipeline.update_with(target, request)?;
            reports.push((target, report));
        }
        Ok(reports)
    }
}

impl std::fmt::Debug for BuiltPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltPipeline")
            .field("nodes", &self.nodes)
            .field("edges", &self.pipeline.edge_count())
            .field("sink", &self.sink)
            .field("request", &self.request)
            .finish()
    }
}

/// Builds the pipeline or returns every problem found on the way.
pub(crate) fn assemble(
    config: &PipelineConfig,
    registry: &NodeRegistry,
) -> ValidationResult<BuiltPipeline> {
    let mut errors = Vec::new();
    if config.nodes.is_empty() {
        errors.push(ValidationError::Empty);
    }

    let options = config.executive.to_options().map_err(|e| errors.push(e)).ok();
    let request = config.update.to_request().map_err(|e| errors.push(e)).ok();
    let mut pipeline = Pipeline::with_options(options.unwrap_or_default());

    let mut nodes: Vec<(String, NodeId)> = Vec::new();
    let mut declared = BTreeSet::new();
    for node_config in &config.nodes {
        if !declared.insert(node_config.id.as_str()) {
            errors.push(ValidationError::DuplicateNode(node_config.id.clone()));
            continue;
        }
        if let Some(algorithm) = instantiate(node_config, registry, &mut errors) {
            let id = pipeline.add_node(algorithm);
            // A fresh id always names a live node.
            let _ = pipeline.set_name(id, node_config.id.clone());
            nodes.push((node_config.id.clone(), id));
        }
    }
    let lookup: BTreeMap<&str, NodeId> =
        nodes.iter().map(|(name, id)| (name.as_str(), *id)).collect();

    let mut connected: BTreeSet<(NodeId, usize)> = BTreeSet::new();
    for conn in &config.connections {
        let mut endpoint = |name: &str| {
            if !declared.contains(name) {
                errors.push(ValidationError::UnknownNode(name.to_string()));
            }
            lookup.get(name).copied()
        };
        let (from, to) = (endpoint(&conn.from), endpoint(&conn.to));
        // Edges touching a node that failed to build are skipped.
        let (Some(from), Some(to)) = (from, to) else {
            continue;
        };
        match pipeline.connect(from, conn.from_port, to, conn.to_port) {
            Ok(_) => {
                connected.insert((to, conn.to_port));
            }
            Err(e) => errors.push(ValidationError::InvalidConnection {
                from: conn.from.clone(),
                to: conn.to.clone(),
                reason: e.to_string(),
            }),
        }
    }

    for (name, id) in &nodes {
        let Some(algorithm) = pipeline.node(*id) else {
            continue;
        };
        for (port, spec) in algorithm.input_ports().iter().enumerate() {
            if !spec.optional && !connected.contains(&(*id, port)) {
                errors.push(ValidationError::MissingInput {
                    node: name.clone(),
                    port,
                    port_name: spec.name.to_string(),
                });
            }
        }
    }

    let sink = match config.update.sink.as_deref() {
        Some(name) if !declared.contains(name) => {
            errors.push(ValidationError::UnknownNode(name.to_string()));
            None
        }
        Some(name) => lookup.get(name).copied(),
        None => None,
    };

    ValidationError::from_list(errors)?;
    Ok(BuiltPipeline {
        pipeline,
        nodes,
        sink,
        request: request.unwrap_or_default(),
    })
}
