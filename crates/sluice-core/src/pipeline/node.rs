//! Pipeline node bookkeeping.
//!
//! Each node wraps a boxed [`Algorithm`] together with its ports, the
//! metadata and requests living on those ports, and the timestamps the
//! executive uses to decide what is stale.

#[cfg(not(feature = "std"))]
use alloc::{boxed::Box, string::String, vec, vec::Vec};

use crate::algorithm::{Algorithm, NodeFamily};
use crate::context::{PhaseCounts, PhaseState};
use crate::data::{DataHandle, DataKind};
use crate::info::Information;
use crate::port::{Capabilities, InputPortSpec, OutputPortSpec};

use super::PipelineError;
use super::edge::EdgeId;

/// Unique identifier for a node in the pipeline.
///
/// Node IDs are assigned sequentially and never reused within a pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Position of this node in insertion order.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for NodeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

pub(crate) struct InputPort {
    pub spec: InputPortSpec,
    /// Connections in the order they were made.
    pub edges: Vec<EdgeId>,
}

pub(crate) struct OutputPort {
    pub spec: OutputPortSpec,
    /// Kind resolved in the data-object phase.
    pub kind: Option<DataKind>,
    /// Metadata from the information phase.
    pub info: Information,
    /// Downstream request negotiated in the update-extent phase.
    pub request: Information,
    /// Pass in which `request` was last written.
    pub request_pass: u64,
    /// Current data object. A placeholder until the first execution.
    pub data: Option<DataHandle>,
    /// `data` was produced by an execution that completed.
    pub generated: bool,
    pub previous_update_time: Option<f64>,
    pub edges: Vec<EdgeId>,
}

impl OutputPort {
    pub fn new(spec: OutputPortSpec) -> Self {
        Self {
            spec,
            kind: None,
            info: Information::new(),
            request: Information::new(),
            request_pass: 0,
            data: None,
            generated: false,
            previous_update_time: None,
            edges: Vec::new(),
        }
    }
}

pub(crate) struct NodeData {
    /// Kept for diagnostics.
    #[allow(dead_code)]
    pub id: NodeId,
    pub name: String,
    pub algorithm: Box<dyn Algorithm>,
    pub family: NodeFamily,
    pub capabilities: Capabilities,
    pub inputs: Vec<InputPort>,
    pub outputs: Vec<OutputPort>,
    /// Request passed to `update` when this node has no outputs.
    pub external_request: Information,
    /// `external_request` as of the last execution.
    pub executed_request: Option<Information>,

    // --- Timestamps (pipeline clock; 0 = never) ---
    pub mtime: u64,
    pub pipeline_mtime: u64,
    pub information_time: u64,
    pub execute_time: u64,

    // --- Per-pass marks ---
    pub info_pass: u64,
    pub info_error: Option<PipelineError>,
    pub data_pass: u64,
    pub data_error: Option<PipelineError>,

    /// The last execution stopped on the abort flag.
    pub partial: bool,
    pub phase: PhaseState,
    pub counts: PhaseCounts,
}

impl NodeData {
    pub fn new(id: NodeId, algorithm: Box<dyn Algorithm>, mtime: u64) -> Self {
        let inputs: Vec<InputPort> = algorithm
            .input_ports()
            .into_iter()
            .map(|spec| InputPort {
                spec,
                edges: Vec::new(),
            })
            .collect();
        let outputs: Vec<OutputPort> = algorithm
            .output_ports()
            .into_iter()
            .map(OutputPort::new)
            .collect();
        Self {
            id,
            name: String::from(algorithm.name()),
            family: NodeFamily::classify(inputs.len(), outputs.len()),
            capabilities: algorithm.capabilities(),
            algorithm,
            inputs,
            outputs,
            external_request: Information::new(),
            executed_request: None,
            mtime,
            pipeline_mtime: mtime,
            information_time: 0,
            execute_time: 0,
            info_pass: 0,
            info_error: None,
            data_pass: 0,
            data_error: None,
            partial: false,
            phase: PhaseState::Idle,
            counts: PhaseCounts::default(),
        }
    }

    /// Requests this node answers: one per output, or the external request
    /// for a node without outputs.
    pub fn driving_requests(&self) -> Vec<Information> {
        if self.outputs.is_empty() {
            vec![self.external_request.clone()]
        } else {
            self.outputs.iter().map(|p| p.request.clone()).collect()
        }
    }
}
