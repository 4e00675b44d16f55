//! Pipeline topology: nodes, edges, and the mutation API.
//!
//! [`Pipeline`] owns every node and edge. Mutations stamp the affected nodes
//! with a fresh modification time from the pipeline clock; the executive
//! compares those stamps against the times metadata and data were last
//! produced to decide what must be recomputed.

#[cfg(not(feature = "std"))]
use alloc::{boxed::Box, string::String, vec, vec::Vec};

use core::fmt;

use crate::algorithm::{Algorithm, NodeError, NodeFamily};
use crate::context::{AbortHandle, PhaseCounts, PhaseState, ProgressObserver};
use crate::data::{DataHandle, DataKind, DataObject};
use crate::info::Information;
use crate::port::{Capabilities, ProducedKind};
use crate::translator::ExtentTranslator;

use super::edge::{Edge, EdgeId};
use super::executive::ExecutiveOptions;
use super::node::{NodeData, NodeId};

/// Errors from pipeline mutation and execution.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// The specified node was not found in the pipeline.
    NodeNotFound(NodeId),
    /// The specified edge was not found in the pipeline.
    EdgeNotFound(EdgeId),
    /// A port index past the node's declared ports.
    PortOutOfRange {
        /// Node addressed.
        node: NodeId,
        /// Port index.
        port: usize,
        /// `true` for an output port.
        output: bool,
    },
    /// Adding this edge would create a cycle.
    CycleDetected,
    /// An identical edge already exists between these nodes.
    DuplicateEdge(NodeId, NodeId),
    /// A non-repeatable input port already has a connection.
    PortOccupied {
        /// Consumer node.
        node: NodeId,
        /// Input port.
        port: usize,
    },
    /// A required input port has no connection.
    MissingInput {
        /// Consumer node.
        node: NodeId,
        /// Input port.
        port: usize,
    },
    /// A producer delivers a kind the input port does not accept.
    IncompatibleInput {
        /// Consumer node.
        node: NodeId,
        /// Input port.
        port: usize,
        /// Offending kind.
        kind: DataKind,
    },
    /// A node finished its compute phase without an output object.
    MissingDataObject {
        /// Producer node.
        node: NodeId,
        /// Output port.
        port: usize,
    },
    /// A node reported failure from one of its phases.
    NodeFailed {
        /// Failing node.
        node: NodeId,
        /// Phase that failed.
        phase: PhaseState,
        /// The node's error.
        error: NodeError,
    },
    /// A node kept requesting continue-executing past the configured limit.
    ContinueLimitExceeded {
        /// Looping node.
        node: NodeId,
        /// Configured limit.
        limit: u32,
    },
}

impl PipelineError {
    /// Node the error is attributed to, if any.
    pub fn node(&self) -> Option<NodeId> {
        match self {
            Self::NodeNotFound(id) => Some(*id),
            Self::PortOutOfRange { node, .. }
            | Self::PortOccupied { node, .. }
            | Self::MissingInput { node, .. }
            | Self::IncompatibleInput { node, .. }
            | Self::MissingDataObject { node, .. }
            | Self::NodeFailed { node, .. }
            | Self::ContinueLimitExceeded { node, .. } => Some(*node),
            Self::EdgeNotFound(_) | Self::CycleDetected | Self::DuplicateEdge(..) => None,
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NodeNotFound(id) => write!(f, "{id} not found"),
            Self::EdgeNotFound(id) => write!(f, "{id} not found"),
            Self::PortOutOfRange { node, port, output } => {
                let side = if *output { "output" } else { "input" };
                write!(f, "{node} has no {side} port {port}")
            }
            Self::CycleDetected => write!(f, "adding this edge would create a cycle"),
            Self::DuplicateEdge(a, b) => write!(f, "edge from {a} to {b} already exists"),
            Self::PortOccupied { node, port } => {
                write!(f, "input port {port} of {node} is not repeatable and already connected")
            }
            Self::MissingInput { node, port } => {
                write!(f, "required input port {port} of {node} is not connected")
            }
            Self::IncompatibleInput { node, port, kind } => {
                write!(f, "input port {port} of {node} does not accept {kind}")
            }
            Self::MissingDataObject { node, port } => {
                write!(f, "{node} produced no data object on output port {port}")
            }
            Self::NodeFailed { node, phase, error } => {
                write!(f, "{node} failed in {}: {error}", phase.name())
            }
            Self::ContinueLimitExceeded { node, limit } => {
                write!(f, "{node} requested more than {limit} continue iterations")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::NodeFailed { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// A demand-driven pipeline of [`Algorithm`] nodes.
///
/// # Usage
///
/// 1. Create a pipeline with [`new()`](Self::new)
/// 2. Add nodes with [`add_node()`](Self::add_node)
/// 3. Connect output ports to input ports with [`connect()`](Self::connect)
/// 4. Pull results with [`update()`](Self::update) or
///    [`update_with()`](Self::update_with) on a terminal node
pub struct Pipeline {
    pub(crate) nodes: Vec<Option<NodeData>>,
    pub(crate) edges: Vec<Option<Edge>>,
    pub(crate) clock: u64,
    pub(crate) pass: u64,
    pub(crate) options: ExecutiveOptions,
    pub(crate) translator: ExtentTranslator,
    pub(crate) abort: AbortHandle,
    pub(crate) progress: Option<Box<dyn ProgressObserver>>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    /// Creates an empty pipeline with default executive options.
    pub fn new() -> Self {
        Self::with_options(ExecutiveOptions::default())
    }

    /// Creates an empty pipeline with the given executive options.
    pub fn with_options(options: ExecutiveOptions) -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            clock: 0,
            pass: 0,
            translator: ExtentTranslator::with_mode(options.split_mode),
            options,
            abort: AbortHandle::new(),
            progress: None,
        }
    }

    /// Executive options.
    pub fn options(&self) -> &ExecutiveOptions {
        &self.options
    }

    /// Replaces the executive options. Every node is marked modified.
    pub fn set_options(&mut self, options: ExecutiveOptions) {
        self.translator.set_mode(options.split_mode);
        self.options = options;
        let stamp = self.tick();
        for node in self.nodes.iter_mut().flatten() {
            node.mtime = stamp;
        }
    }

    /// Handle to the cancellation flag polled by executing nodes.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Installs a progress observer.
    pub fn set_progress_observer(&mut self, observer: impl ProgressObserver + 'static) {
        self.progress = Some(Box::new(observer));
    }

    /// Removes the progress observer.
    pub fn clear_progress_observer(&mut self) {
        self.progress = None;
    }

    pub(crate) fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    // --- Nodes ---

    /// Adds a node. Its ports are declared once, here.
    pub fn add_node(&mut self, algorithm: Box<dyn Algorithm>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let stamp = self.tick();
        let data = NodeData::new(id, algorithm, stamp);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            node = id.0,
            name = %data.name,
            inputs = data.inputs.len(),
            outputs = data.outputs.len(),
            "pipeline: add node"
        );

        self.nodes.push(Some(data));
        id
    }

    /// Adds a node by value.
    pub fn add<A: Algorithm + 'static>(&mut self, algorithm: A) -> NodeId {
        self.add_node(Box::new(algorithm))
    }

    /// Removes a node and every edge touching it, returning its algorithm.
    pub fn remove_node(&mut self, id: NodeId) -> Result<Box<dyn Algorithm>, PipelineError> {
        self.node_data(id)?;
        let incident: Vec<EdgeId> = self
            .edges
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.filter(|e| e.from == id || e.to == id).map(|_| EdgeId(i as u32)))
            .collect();
        for edge in incident {
            self.disconnect(edge)?;
        }
        let data = self.nodes[id.0 as usize]
            .take()
            .ok_or(PipelineError::NodeNotFound(id))?;

        #[cfg(feature = "tracing")]
        tracing::debug!(node = id.0, "pipeline: remove node");

        Ok(data.algorithm)
    }

    /// Borrows a node's algorithm.
    pub fn node(&self, id: NodeId) -> Option<&dyn Algorithm> {
        self.nodes
            .get(id.0 as usize)?
            .as_ref()
            .map(|n| n.algorithm.as_ref())
    }

    /// Mutably borrows a node's algorithm and marks it modified.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut (dyn Algorithm + 'static)> {
        let stamp = self.tick();
        let node = self.nodes.get_mut(id.0 as usize)?.as_mut()?;
        node.mtime = stamp;
        Some(node.algorithm.as_mut())
    }

    /// Sets a node parameter and marks the node modified.
    pub fn set_parameter(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), PipelineError> {
        let stamp = self.tick();
        let node = self.node_data_mut(id)?;
        node.algorithm
            .set_parameter(name, value)
            .map_err(|error| PipelineError::NodeFailed {
                node: id,
                phase: PhaseState::Idle,
                error,
            })?;
        node.mtime = stamp;
        Ok(())
    }

    /// Marks a node modified so the next update recomputes it.
    pub fn modified(&mut self, id: NodeId) -> Result<(), PipelineError> {
        let stamp = self.tick();
        self.node_data_mut(id)?.mtime = stamp;
        Ok(())
    }

    /// Drops the output payloads of a node. The next update re-executes it.
    pub fn release_data(&mut self, id: NodeId) -> Result<(), PipelineError> {
        let node = self.node_data_mut(id)?;
        for port in &mut node.outputs {
            if let Some(kind) = port.kind {
                let placeholder: DataHandle = DataObject::new(kind).into();
                port.data = Some(placeholder);
            }
            port.generated = false;
        }
        Ok(())
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    /// IDs of live nodes, in creation order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().flatten().map(|n| n.id)
    }

    /// Display name of a node.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        Some(self.nodes.get(id.0 as usize)?.as_ref()?.name.as_str())
    }

    /// Renames a node. Progress reports and logs use the new name.
    pub fn set_name(&mut self, id: NodeId, name: impl Into<String>) -> Result<(), PipelineError> {
        self.node_data_mut(id)?.name = name.into();
        Ok(())
    }

    /// Family of a node.
    pub fn family(&self, id: NodeId) -> Option<NodeFamily> {
        Some(self.nodes.get(id.0 as usize)?.as_ref()?.family)
    }

    /// Capabilities a node declared when it was added.
    pub fn capabilities(&self, id: NodeId) -> Option<Capabilities> {
        Some(self.nodes.get(id.0 as usize)?.as_ref()?.capabilities)
    }

    /// Nodes without output ports.
    pub fn sinks(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .flatten()
            .filter(|n| n.family == NodeFamily::Sink)
            .map(|n| n.id)
            .collect()
    }

    /// Current phase of a node.
    pub fn phase_state(&self, id: NodeId) -> Option<PhaseState> {
        Some(self.nodes.get(id.0 as usize)?.as_ref()?.phase)
    }

    /// Lifetime phase counters of a node.
    pub fn phase_counts(&self, id: NodeId) -> Option<PhaseCounts> {
        Some(self.nodes.get(id.0 as usize)?.as_ref()?.counts)
    }

    // --- Ports ---

    /// Current data object on an output port.
    pub fn output_data(&self, id: NodeId, port: usize) -> Option<DataHandle> {
        self.nodes
            .get(id.0 as usize)?
            .as_ref()?
            .outputs
            .get(port)?
            .data
            .clone()
    }

    /// Metadata on an output port.
    pub fn output_information(&self, id: NodeId, port: usize) -> Option<&Information> {
        Some(&self.nodes.get(id.0 as usize)?.as_ref()?.outputs.get(port)?.info)
    }

    /// Last request negotiated onto an output port.
    pub fn output_request(&self, id: NodeId, port: usize) -> Option<&Information> {
        Some(&self.nodes.get(id.0 as usize)?.as_ref()?.outputs.get(port)?.request)
    }

    // --- Edges ---

    /// Connects output `from_port` of `from` to input `to_port` of `to`.
    pub fn connect(
        &mut self,
        from: NodeId,
        from_port: usize,
        to: NodeId,
        to_port: usize,
    ) -> Result<EdgeId, PipelineError> {
        let producer = self.node_data(from)?;
        let out_spec = producer
            .outputs
            .get(from_port)
            .map(|p| p.spec.produced)
            .ok_or(PipelineError::PortOutOfRange {
                node: from,
                port: from_port,
                output: true,
            })?;
        let consumer = self.node_data(to)?;
        let input = consumer
            .inputs
            .get(to_port)
            .ok_or(PipelineError::PortOutOfRange {
                node: to,
                port: to_port,
                output: false,
            })?;

        let candidate = Edge {
            from,
            from_port,
            to,
            to_port,
        };
        if self.edges.iter().flatten().any(|e| *e == candidate) {
            return Err(PipelineError::DuplicateEdge(from, to));
        }
        if !input.spec.repeatable && !input.edges.is_empty() {
            return Err(PipelineError::PortOccupied { node: to, port: to_port });
        }
        if let ProducedKind::Fixed(kind) = out_spec {
            // A lone composite is iterated block by block.
            let iterated = kind.is_composite() && input.edges.is_empty();
            if !input.spec.accepts(kind) && !iterated {
                return Err(PipelineError::IncompatibleInput {
                    node: to,
                    port: to_port,
                    kind,
                });
            }
        }
        if from == to || self.can_reach(to, from) {
            return Err(PipelineError::CycleDetected);
        }

        let id = EdgeId(self.edges.len() as u32);
        self.edges.push(Some(candidate));
        let stamp = self.tick();
        if let Some(p) = self.nodes[from.0 as usize].as_mut() {
            p.outputs[from_port].edges.push(id);
        }
        if let Some(c) = self.nodes[to.0 as usize].as_mut() {
            c.inputs[to_port].edges.push(id);
            c.mtime = stamp;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            edge = id.0,
            from = from.0,
            from_port,
            to = to.0,
            to_port,
            "pipeline: connect"
        );

        Ok(id)
    }

    /// Connects output 0 of `from` to input 0 of `to`.
    pub fn connect_default(&mut self, from: NodeId, to: NodeId) -> Result<EdgeId, PipelineError> {
        self.connect(from, 0, to, 0)
    }

    /// Removes an edge. The consumer is marked modified.
    pub fn disconnect(&mut self, id: EdgeId) -> Result<(), PipelineError> {
        let edge = self
            .edges
            .get_mut(id.0 as usize)
            .and_then(Option::take)
            .ok_or(PipelineError::EdgeNotFound(id))?;
        let stamp = self.tick();
        if let Some(p) = self.nodes[edge.from.0 as usize].as_mut() {
            p.outputs[edge.from_port].edges.retain(|e| *e != id);
        }
        if let Some(c) = self.nodes[edge.to.0 as usize].as_mut() {
            c.inputs[edge.to_port].edges.retain(|e| *e != id);
            c.mtime = stamp;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(edge = id.0, "pipeline: disconnect");

        Ok(())
    }

    /// Number of live edges.
    pub fn edge_count(&self) -> usize {
        self.edges.iter().flatten().count()
    }

    /// Endpoints of an edge.
    pub fn edge(&self, id: EdgeId) -> Option<Edge> {
        *self.edges.get(id.0 as usize)?
    }

    /// Distinct producers feeding `id`, in port and connection order.
    pub fn producers(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if let Some(node) = self.nodes.get(id.0 as usize).and_then(Option::as_ref) {
            for port in &node.inputs {
                for edge in &port.edges {
                    if let Some(e) = self.edge(*edge) {
                        if !out.contains(&e.from) {
                            out.push(e.from);
                        }
                    }
                }
            }
        }
        out
    }

    /// Distinct consumers fed by `id`.
    pub fn consumers(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if let Some(node) = self.nodes.get(id.0 as usize).and_then(Option::as_ref) {
            for port in &node.outputs {
                for edge in &port.edges {
                    if let Some(e) = self.edge(*edge) {
                        if !out.contains(&e.to) {
                            out.push(e.to);
                        }
                    }
                }
            }
        }
        out
    }

    /// Returns `true` if `target` is reachable downstream of `from`.
    fn can_reach(&self, from: NodeId, target: NodeId) -> bool {
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![from];
        while let Some(current) = stack.pop() {
            if current == target {
                return true;
            }
            let idx = current.0 as usize;
            if idx >= visited.len() || visited[idx] {
                continue;
            }
            visited[idx] = true;
            stack.extend(self.consumers(current));
        }
        false
    }

    pub(crate) fn node_data(&self, id: NodeId) -> Result<&NodeData, PipelineError> {
        self.nodes
            .get(id.0 as usize)
            .and_then(Option::as_ref)
            .ok_or(PipelineError::NodeNotFound(id))
    }

    pub(crate) fn node_data_mut(&mut self, id: NodeId) -> Result<&mut NodeData, PipelineError> {
        self.nodes
            .get_mut(id.0 as usize)
            .and_then(Option::as_mut)
            .ok_or(PipelineError::NodeNotFound(id))
    }
}
