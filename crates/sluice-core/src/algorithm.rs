//! The node contract.
//!
//! Every pipeline node implements [`Algorithm`]. The executive drives each
//! node through four phases, in order:
//!
//! 1. [`request_data_object`](Algorithm::request_data_object) decides the
//!    concrete kind of every output.
//! 2. [`request_information`](Algorithm::request_information) derives output
//!    metadata (whole extent, time steps) from input metadata.
//! 3. [`request_update_extent`](Algorithm::request_update_extent) translates
//!    the downstream request on the outputs into requests on the inputs.
//! 4. [`request_data`](Algorithm::request_data) computes the outputs.
//!
//! Each phase receives an immutable snapshot of what it reads and a builder
//! for what it writes. The builders are prefilled with the executive's
//! defaults, so a node only touches what it changes. The executive commits
//! the builders once the phase returns `Ok`.

#[cfg(not(feature = "std"))]
use alloc::{string::String, vec::Vec};

use core::fmt;

use crate::context::{AbortHandle, ProgressObserver};
use crate::data::{DataHandle, DataKind, DataObject};
use crate::info::Information;
use crate::pipeline::NodeId;
use crate::port::{Capabilities, InputPortSpec, OutputPortSpec};

/// Outcome of a successful compute phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Execution {
    /// Outputs are complete.
    Done,
    /// Run the compute phase again (continue-executing).
    Continue,
}

/// A phase failure reported by a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    /// Wrong data kind, or the output kind cannot be determined.
    Structural(String),
    /// A request the node cannot translate.
    Negotiation(String),
    /// Failure inside the compute step.
    Compute(String),
    /// Unknown parameter or unparsable value.
    Parameter(String),
}

impl NodeError {
    /// Structural failure.
    pub fn structural(msg: impl Into<String>) -> Self {
        Self::Structural(msg.into())
    }

    /// Negotiation failure.
    pub fn negotiation(msg: impl Into<String>) -> Self {
        Self::Negotiation(msg.into())
    }

    /// Compute failure.
    pub fn compute(msg: impl Into<String>) -> Self {
        Self::Compute(msg.into())
    }

    /// Parameter failure.
    pub fn parameter(msg: impl Into<String>) -> Self {
        Self::Parameter(msg.into())
    }
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structural(msg) => write!(f, "structural error: {msg}"),
            Self::Negotiation(msg) => write!(f, "negotiation error: {msg}"),
            Self::Compute(msg) => write!(f, "compute error: {msg}"),
            Self::Parameter(msg) => write!(f, "parameter error: {msg}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for NodeError {}

/// Node family, derived from port counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeFamily {
    /// No inputs.
    Source,
    /// Inputs and outputs.
    Filter,
    /// Inputs, no outputs.
    Sink,
}

impl NodeFamily {
    /// Classifies a node with `inputs` input ports and `outputs` output ports.
    pub fn classify(inputs: usize, outputs: usize) -> Self {
        match (inputs, outputs) {
            (0, _) => NodeFamily::Source,
            (_, 0) => NodeFamily::Sink,
            _ => NodeFamily::Filter,
        }
    }
}

// --- Phase requests ---

/// Phase 1: output kinds.
#[derive(Debug, Clone)]
pub struct DataObjectRequest {
    pub(crate) inputs: Vec<Vec<DataKind>>,
    pub(crate) outputs: Vec<Option<DataKind>>,
}

impl DataObjectRequest {
    /// Number of input ports.
    pub fn input_port_count(&self) -> usize {
        self.inputs.len()
    }

    /// Connections on input `port`.
    pub fn connection_count(&self, port: usize) -> usize {
        self.inputs.get(port).map_or(0, Vec::len)
    }

    /// Kind delivered by connection `conn` of input `port`.
    pub fn input_kind(&self, port: usize, conn: usize) -> Option<DataKind> {
        self.inputs.get(port)?.get(conn).copied()
    }

    /// Number of output ports.
    pub fn output_port_count(&self) -> usize {
        self.outputs.len()
    }

    /// Kind currently chosen for output `port`.
    pub fn output_kind(&self, port: usize) -> Option<DataKind> {
        self.outputs.get(port).copied().flatten()
    }

    /// Chooses the kind for output `port`. `None` leaves it undetermined,
    /// which fails the phase.
    pub fn set_output_kind(&mut self, port: usize, kind: Option<DataKind>) {
        if let Some(slot) = self.outputs.get_mut(port) {
            *slot = kind;
        }
    }
}

/// Phase 2: metadata.
#[derive(Debug, Clone)]
pub struct InformationRequest {
    pub(crate) inputs: Vec<Vec<Information>>,
    pub(crate) outputs: Vec<Information>,
}

impl InformationRequest {
    /// Metadata of connection `conn` on input `port`.
    pub fn input(&self, port: usize, conn: usize) -> Option<&Information> {
        self.inputs.get(port)?.get(conn)
    }

    /// Metadata of every connection on input `port`.
    pub fn inputs(&self, port: usize) -> &[Information] {
        self.inputs.get(port).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Output metadata being built.
    pub fn output(&self, port: usize) -> &Information {
        &self.outputs[port]
    }

    /// Mutable output metadata.
    pub fn output_mut(&mut self, port: usize) -> &mut Information {
        &mut self.outputs[port]
    }

    /// Number of output ports.
    pub fn output_port_count(&self) -> usize {
        self.outputs.len()
    }
}

/// Phase 3: request translation.
///
/// For a sink, output port 0 holds the request the caller passed to
/// `update`.
#[derive(Debug, Clone)]
pub struct UpdateExtentRequest {
    pub(crate) output_requests: Vec<Information>,
    pub(crate) output_info: Vec<Information>,
    pub(crate) input_info: Vec<Vec<Information>>,
    pub(crate) input_requests: Vec<Vec<Information>>,
    pub(crate) iteration: u32,
}

impl UpdateExtentRequest {
    /// Downstream request on output `port`.
    pub fn output_request(&self, port: usize) -> &Information {
        &self.output_requests[port]
    }

    /// This node's metadata on output `port`.
    pub fn output_information(&self, port: usize) -> &Information {
        &self.output_info[port]
    }

    /// Producer metadata behind connection `conn` of input `port`.
    pub fn input_information(&self, port: usize, conn: usize) -> Option<&Information> {
        self.input_info.get(port)?.get(conn)
    }

    /// Connections on input `port`.
    pub fn connection_count(&self, port: usize) -> usize {
        self.input_requests.get(port).map_or(0, Vec::len)
    }

    /// Request being built for connection `conn` of input `port`.
    pub fn input_request(&self, port: usize, conn: usize) -> Option<&Information> {
        self.input_requests.get(port)?.get(conn)
    }

    /// Mutable request for connection `conn` of input `port`.
    pub fn input_request_mut(&mut self, port: usize, conn: usize) -> Option<&mut Information> {
        self.input_requests.get_mut(port)?.get_mut(conn)
    }

    /// Mutable requests for every connection of input `port`.
    pub fn input_requests_mut(&mut self, port: usize) -> &mut [Information] {
        match self.input_requests.get_mut(port) {
            Some(requests) => requests.as_mut_slice(),
            None => &mut [],
        }
    }

    /// Continue-loop iteration this request belongs to.
    pub fn iteration(&self) -> u32 {
        self.iteration
    }
}

/// Phase 4: computation.
pub struct DataRequest<'a> {
    pub(crate) node: NodeId,
    pub(crate) name: &'a str,
    pub(crate) inputs: Vec<Vec<DataHandle>>,
    pub(crate) input_requests: Vec<Vec<Information>>,
    pub(crate) output_requests: Vec<Information>,
    pub(crate) output_info: Vec<Information>,
    pub(crate) outputs: Vec<Option<DataObject>>,
    pub(crate) iteration: u32,
    pub(crate) abort: &'a AbortHandle,
    pub(crate) progress: Option<&'a dyn ProgressObserver>,
}

impl DataRequest<'_> {
    /// Node being executed.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Continue-loop iteration, starting at 0.
    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    /// Data on connection `conn` of input `port`.
    pub fn input(&self, port: usize, conn: usize) -> Option<&DataHandle> {
        self.inputs.get(port)?.get(conn)
    }

    /// Data on every connection of input `port`, in connection order.
    pub fn inputs(&self, port: usize) -> &[DataHandle] {
        self.inputs.get(port).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Connections on input `port`.
    pub fn connection_count(&self, port: usize) -> usize {
        self.inputs.get(port).map_or(0, Vec::len)
    }

    /// Request this node sent up connection `conn` of input `port`.
    pub fn input_request(&self, port: usize, conn: usize) -> Option<&Information> {
        self.input_requests.get(port)?.get(conn)
    }

    /// Request on output `port`, after sub-extent translation.
    pub fn output_request(&self, port: usize) -> &Information {
        &self.output_requests[port]
    }

    /// This node's metadata on output `port`.
    pub fn output_information(&self, port: usize) -> &Information {
        &self.output_info[port]
    }

    /// Output object being filled. `None` after [`take_output`](Self::take_output).
    pub fn output_mut(&mut self, port: usize) -> Option<&mut DataObject> {
        self.outputs.get_mut(port)?.as_mut()
    }

    /// Replaces output `port`.
    pub fn set_output(&mut self, port: usize, object: DataObject) {
        if let Some(slot) = self.outputs.get_mut(port) {
            *slot = Some(object);
        }
    }

    /// Removes output `port`. Leaving it empty fails the update.
    pub fn take_output(&mut self, port: usize) -> Option<DataObject> {
        self.outputs.get_mut(port)?.take()
    }

    /// Returns `true` once the caller asked to stop. Nodes should return
    /// promptly; whatever they produced is published as a partial result.
    pub fn abort_requested(&self) -> bool {
        self.abort.is_aborted()
    }

    /// Reports progress in `[0, 1]`.
    pub fn update_progress(&self, fraction: f64) {
        if let Some(observer) = self.progress {
            observer.on_progress(self.node, self.name, fraction.clamp(0.0, 1.0));
        }
    }
}

/// A phase request routed through [`Algorithm::process_request`].
pub enum PhaseRequest<'r, 'a> {
    /// Phase 1.
    DataObject(&'r mut DataObjectRequest),
    /// Phase 2.
    Information(&'r mut InformationRequest),
    /// Phase 3.
    UpdateExtent(&'r mut UpdateExtentRequest),
    /// Phase 4.
    Data(&'r mut DataRequest<'a>),
}

/// A pipeline node.
///
/// Only [`request_data`](Self::request_data) is required. The defaults of the
/// other phases keep the executive's prefilled builders unchanged.
pub trait Algorithm: Send {
    /// Display name.
    fn name(&self) -> &str;

    /// Input port declarations.
    fn input_ports(&self) -> Vec<InputPortSpec>;

    /// Output port declarations.
    fn output_ports(&self) -> Vec<OutputPortSpec>;

    /// Optional capabilities.
    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE
    }

    /// Sets a named parameter from text.
    fn set_parameter(&mut self, name: &str, _value: &str) -> Result<(), NodeError> {
        Err(NodeError::parameter(format_unknown(self.name(), name)))
    }

    /// Reads a named parameter as text.
    fn parameter(&self, _name: &str) -> Option<String> {
        None
    }

    /// Generic dispatcher. The executive calls every phase through here.
    fn process_request(&mut self, request: PhaseRequest<'_, '_>) -> Result<Execution, NodeError> {
        match request {
            PhaseRequest::DataObject(req) => self.request_data_object(req).map(|()| Execution::Done),
            PhaseRequest::Information(req) => self.request_information(req).map(|()| Execution::Done),
            PhaseRequest::UpdateExtent(req) => {
                self.request_update_extent(req).map(|()| Execution::Done)
            }
            PhaseRequest::Data(req) => self.request_data(req),
        }
    }

    /// Phase 1. Output kinds arrive resolved from the port declarations.
    fn request_data_object(&mut self, _req: &mut DataObjectRequest) -> Result<(), NodeError> {
        Ok(())
    }

    /// Phase 2. Outputs arrive with `WHOLE_EXTENT`, `TIME_STEPS` and
    /// `TIME_RANGE` copied from the first input connection.
    fn request_information(&mut self, _req: &mut InformationRequest) -> Result<(), NodeError> {
        Ok(())
    }

    /// Phase 3. Inputs arrive with the first output's request copied onto
    /// them, clamped to each producer's whole extent.
    fn request_update_extent(&mut self, _req: &mut UpdateExtentRequest) -> Result<(), NodeError> {
        Ok(())
    }

    /// Phase 4.
    fn request_data(&mut self, req: &mut DataRequest<'_>) -> Result<Execution, NodeError>;
}

fn format_unknown(node: &str, param: &str) -> String {
    let mut msg = String::from(node);
    msg.push_str(": unknown parameter '");
    msg.push_str(param);
    msg.push('\'');
    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_families() {
        assert_eq!(NodeFamily::classify(0, 1), NodeFamily::Source);
        assert_eq!(NodeFamily::classify(1, 1), NodeFamily::Filter);
        assert_eq!(NodeFamily::classify(2, 0), NodeFamily::Sink);
    }

    #[test]
    fn test_data_object_request_accessors() {
        let mut req = DataObjectRequest {
            inputs: vec![vec![DataKind::Table, DataKind::Table]],
            outputs: vec![None],
        };
        assert_eq!(req.connection_count(0), 2);
        assert_eq!(req.connection_count(3), 0);
        assert_eq!(req.input_kind(0, 1), Some(DataKind::Table));
        req.set_output_kind(0, Some(DataKind::Table));
        assert_eq!(req.output_kind(0), Some(DataKind::Table));
        req.set_output_kind(5, Some(DataKind::Graph));
        assert_eq!(req.output_port_count(), 1);
    }

    #[test]
    fn test_node_error_display() {
        let err = NodeError::structural("no input");
        assert_eq!(err.to_string(), "structural error: no input");
    }

    struct Nothing;

    impl Algorithm for Nothing {
        fn name(&self) -> &str {
            "nothing"
        }
        fn input_ports(&self) -> Vec<InputPortSpec> {
            Vec::new()
        }
        fn output_ports(&self) -> Vec<OutputPortSpec> {
            Vec::new()
        }
        fn request_data(&mut self, _req: &mut DataRequest<'_>) -> Result<Execution, NodeError> {
            Ok(Execution::Done)
        }
    }

    #[test]
    fn test_default_set_parameter_rejects() {
        let mut node = Nothing;
        let err = node.set_parameter("gain", "1.0").unwrap_err();
        assert_eq!(err, NodeError::Parameter("nothing: unknown parameter 'gain'".into()));
        assert!(node.parameter("gain").is_none());
    }
}
