//! The demand-driven executive.
//!
//! An update runs four sweeps over the subgraph feeding the requested node:
//!
//! 1. **Information**: depth-first from the producers, each node whose
//!    pipeline modification time is newer than its metadata runs the
//!    data-object and information phases.
//! 2. **Request**: the caller's request is written onto the node's outputs.
//! 3. **Update extent**: consumer to producer, each node that needs to execute
//!    translates its output requests onto its inputs. Producers reached twice
//!    in one pass combine the requests.
//! 4. **Data**: depth-first again, every producer completes before its
//!    consumer computes. Nodes whose outputs already satisfy their request are
//!    skipped.
//!
//! A node that answers [`Execution::Continue`] is driven again without
//! repeating sweeps 1 and 2; each iteration re-runs its update-extent phase
//! and re-pulls whichever producers the new requests invalidate.
//!
//! A node fed a [`DataKind::MultiBlock`] on a port that does not accept it
//! runs all four phases once per block instead. Its outputs are multi-block
//! objects with the input's structure.

#[cfg(not(feature = "std"))]
use alloc::{format, string::String, sync::Arc, vec, vec::Vec};
#[cfg(feature = "std")]
use std::sync::Arc;

use crate::algorithm::{
    DataObjectRequest, DataRequest, Execution, InformationRequest, NodeError, NodeFamily,
    PhaseRequest, UpdateExtentRequest,
};
use crate::context::{AbortHandle, ExecutionContext, PhaseState, ProgressObserver, UpdateReport};
use crate::data::{DataHandle, DataKind, DataObject, MultiBlock};
use crate::extent::Extent;
use crate::info::{Information, Key};
use crate::port::{Capabilities, OutputPortSpec, ProducedKind};
use crate::time::{self, TimeSnap};
use crate::translator::{self as translate, PieceRequest, SplitMode};

use super::graph::{Pipeline, PipelineError};
use super::node::{NodeData, NodeId, OutputPort};

/// Default bound on continue-executing iterations per node and update.
pub const DEFAULT_MAX_CONTINUE_ITERATIONS: u32 = 10_000;

/// Executive configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutiveOptions {
    /// Continue requests accepted from one node in one update. One more fails
    /// the update with [`PipelineError::ContinueLimitExceeded`].
    pub max_continue_iterations: u32,
    /// Split mode used for sub-extent translation.
    pub split_mode: SplitMode,
    /// How requested times snap to a producer's time steps.
    pub time_snap: TimeSnap,
    /// Record every phase entry in [`UpdateReport::trace`].
    pub record_trace: bool,
}

impl Default for ExecutiveOptions {
    fn default() -> Self {
        Self {
            max_continue_iterations: DEFAULT_MAX_CONTINUE_ITERATIONS,
            split_mode: SplitMode::Block,
            time_snap: TimeSnap::Nearest,
            record_trace: true,
        }
    }
}

/// What a caller asks of a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateRequest {
    /// Piece index.
    pub piece: u32,
    /// Piece count.
    pub num_pieces: u32,
    /// Ghost levels around the piece.
    pub ghost_levels: u32,
    /// Explicit update extent. `None` requests the whole extent.
    pub extent: Option<Extent>,
    /// Requested time. `None` leaves time unconstrained.
    pub time: Option<f64>,
    /// Forbid ghost growth beyond the requested extent.
    pub exact: bool,
}

impl Default for UpdateRequest {
    fn default() -> Self {
        Self {
            piece: 0,
            num_pieces: 1,
            ghost_levels: 0,
            extent: None,
            time: None,
            exact: false,
        }
    }
}

impl UpdateRequest {
    /// Whole-extent, single-piece request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests `piece` of `num_pieces`.
    pub fn with_piece(mut self, piece: u32, num_pieces: u32) -> Self {
        self.piece = piece;
        self.num_pieces = num_pieces;
        self
    }

    /// Requests ghost levels.
    pub fn with_ghost_levels(mut self, ghost_levels: u32) -> Self {
        self.ghost_levels = ghost_levels;
        self
    }

    /// Requests an explicit extent.
    pub fn with_extent(mut self, extent: Extent) -> Self {
        self.extent = Some(extent);
        self
    }

    /// Requests a time.
    pub fn with_time(mut self, time: f64) -> Self {
        self.time = Some(time);
        self
    }

    /// Marks the request exact.
    pub fn exact(mut self) -> Self {
        self.exact = true;
        self
    }

    /// Request keys for this request.
    pub fn to_information(&self) -> Information {
        let mut info = Information::new();
        info.set(Key::UpdatePieceNumber, self.piece);
        info.set(Key::UpdateNumberOfPieces, self.num_pieces);
        info.set(Key::UpdateNumberOfGhostLevels, self.ghost_levels);
        if let Some(extent) = self.extent {
            info.set(Key::UpdateExtent, extent);
        }
        if let Some(t) = self.time {
            info.set(Key::UpdateTimeStep, t);
        }
        if self.exact {
            info.set(Key::ExactExtent, true);
        }
        info
    }
}

impl Pipeline {
    /// Brings `node` up to date for a whole-extent, single-piece request.
    pub fn update(&mut self, node: NodeId) -> Result<UpdateReport, PipelineError> {
        self.update_with(node, &UpdateRequest::default())
    }

    /// Brings `node` up to date for its full whole extent, resolved from
    /// fresh metadata.
    pub fn update_whole_extent(&mut self, node: NodeId) -> Result<UpdateReport, PipelineError> {
        self.update_information(node)?;
        let whole = self
            .output_information(node, 0)
            .and_then(|info| info.extent(Key::WholeExtent));
        let request = match whole {
            Some(extent) => UpdateRequest::default().with_extent(extent),
            None => UpdateRequest::default(),
        };
        self.update_with(node, &request)
    }

    /// Brings `node` up to date for `request`.
    ///
    /// A failure aborts only the subgraph that depends on the failing node.
    /// Producers that completed keep their outputs for the next update.
    pub fn update_with(
        &mut self,
        node: NodeId,
        request: &UpdateRequest,
    ) -> Result<UpdateReport, PipelineError> {
        self.node_data(node)?;
        let mut ctx = self.begin_pass();

        #[cfg(feature = "tracing")]
        tracing::debug!(node = node.index(), pass = ctx.pass, "executive: update");

        self.update_information_node(node, &mut ctx)?;
        self.apply_request(node, request, &mut ctx)?;
        self.propagate_update_extent(node, &mut ctx)?;
        self.update_data(node, &mut ctx, false)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            node = node.index(),
            executed = ctx.report.executed.len(),
            skipped = ctx.report.skipped.len(),
            "executive: update complete"
        );

        Ok(ctx.report)
    }

    /// Runs only the data-object and information phases feeding `node`.
    pub fn update_information(&mut self, node: NodeId) -> Result<(), PipelineError> {
        self.node_data(node)?;
        let mut ctx = self.begin_pass();
        self.update_information_node(node, &mut ctx).map(|_| ())
    }

    /// Updates every node without outputs. Each result is independent.
    pub fn update_sinks(&mut self) -> Vec<(NodeId, Result<UpdateReport, PipelineError>)> {
        self.sinks()
            .into_iter()
            .map(|sink| (sink, self.update(sink)))
            .collect()
    }

    fn begin_pass(&mut self) -> ExecutionContext {
        self.abort.reset();
        self.pass += 1;
        for node in self.nodes.iter_mut().flatten() {
            node.phase = PhaseState::Idle;
        }
        ExecutionContext::new(self.pass, self.abort.clone(), self.options.record_trace)
    }

    // --- Information sweep ---

    /// Returns the pipeline modification time of `id`.
    fn update_information_node(
        &mut self,
        id: NodeId,
        ctx: &mut ExecutionContext,
    ) -> Result<u64, PipelineError> {
        {
            let node = self.node_data(id)?;
            if node.info_pass == ctx.pass {
                return match &node.info_error {
                    Some(err) => Err(err.clone()),
                    None => Ok(node.pipeline_mtime),
                };
            }
        }
        self.node_data_mut(id)?.info_pass = ctx.pass;
        let result = self.refresh_information(id, ctx);
        self.node_data_mut(id)?.info_error = result.as_ref().err().cloned();
        result
    }

    fn refresh_information(
        &mut self,
        id: NodeId,
        ctx: &mut ExecutionContext,
    ) -> Result<u64, PipelineError> {
        let mut pipeline_mtime = self.node_data(id)?.mtime;
        let mut first_error = None;
        for producer in self.producers(id) {
            match self.update_information_node(producer, ctx) {
                Ok(t) => pipeline_mtime = pipeline_mtime.max(t),
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }
        if let Some(err) = first_error {
            return Err(err);
        }

        let node = self.node_data_mut(id)?;
        node.pipeline_mtime = pipeline_mtime;
        if node.information_time != 0 && pipeline_mtime <= node.information_time {
            return Ok(pipeline_mtime);
        }

        self.validate_inputs(id)?;
        self.run_data_object_phase(id, ctx)?;
        self.run_information_phase(id, ctx)?;
        let stamp = self.tick();
        self.node_data_mut(id)?.information_time = stamp;
        Ok(pipeline_mtime)
    }

    fn validate_inputs(&self, id: NodeId) -> Result<(), PipelineError> {
        let node = self.node_data(id)?;
        for (port, input) in node.inputs.iter().enumerate() {
            if input.edges.is_empty() && !input.spec.optional {
                return Err(PipelineError::MissingInput { node: id, port });
            }
            for edge in &input.edges {
                let Some(edge) = self.edge(*edge) else {
                    continue;
                };
                if let Some(kind) = self.output_port(edge.from, edge.from_port)?.kind {
                    let iterated = kind.is_composite() && input.edges.len() == 1;
                    if !input.spec.accepts(kind) && !iterated {
                        return Err(PipelineError::IncompatibleInput {
                            node: id,
                            port,
                            kind,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn run_data_object_phase(
        &mut self,
        id: NodeId,
        ctx: &mut ExecutionContext,
    ) -> Result<(), PipelineError> {
        let inputs = self.collect_inputs(id, |port| port.kind)?;
        let inputs: Vec<Vec<DataKind>> = inputs
            .into_iter()
            .map(|conns| conns.into_iter().flatten().collect())
            .collect();
        let outputs: Vec<Option<DataKind>> = self
            .node_data(id)?
            .outputs
            .iter()
            .map(|port| match port.spec.produced {
                ProducedKind::Fixed(kind) => Some(kind),
                ProducedKind::SameAsInput(input) => {
                    inputs.get(input).and_then(|conns| conns.first()).copied()
                }
            })
            .collect();
        let mut req = DataObjectRequest { inputs, outputs };
        let composite = self.composite_input(id)?.is_some();

        ctx.enter(id, PhaseState::DataObject, 0);
        let node = self.node_data_mut(id)?;
        node.phase = PhaseState::DataObject;
        if composite {
            req.outputs.fill(Some(DataKind::MultiBlock));
        } else {
            node.counts.data_object += 1;
            node.algorithm
                .process_request(PhaseRequest::DataObject(&mut req))
                .map(|_| ())
                .map_err(|error| PipelineError::NodeFailed {
                    node: id,
                    phase: PhaseState::DataObject,
                    error,
                })?;
        }

        for (port, kind) in node.outputs.iter_mut().zip(req.outputs) {
            let Some(kind) = kind else {
                return Err(PipelineError::NodeFailed {
                    node: id,
                    phase: PhaseState::DataObject,
                    error: NodeError::structural(format!(
                        "cannot determine the kind of output '{}'",
                        port.spec.name
                    )),
                });
            };
            let stale = port.data.as_ref().is_none_or(|d| d.kind() != kind);
            port.kind = Some(kind);
            if stale {
                port.data = Some(Arc::new(DataObject::new(kind)));
                port.generated = false;
            }
        }
        node.phase = PhaseState::Idle;
        Ok(())
    }

    fn run_information_phase(
        &mut self,
        id: NodeId,
        ctx: &mut ExecutionContext,
    ) -> Result<(), PipelineError> {
        let inputs = self.collect_inputs(id, |port| port.info.clone())?;
        let template = default_information(&inputs);
        let outputs = vec![template; self.node_data(id)?.outputs.len()];
        let mut req = InformationRequest { inputs, outputs };
        let composite = self.composite_input(id)?.is_some();

        ctx.enter(id, PhaseState::Information, 0);
        let node = self.node_data_mut(id)?;
        node.phase = PhaseState::Information;
        if !composite {
            node.counts.information += 1;
            node.algorithm
                .process_request(PhaseRequest::Information(&mut req))
                .map(|_| ())
                .map_err(|error| PipelineError::NodeFailed {
                    node: id,
                    phase: PhaseState::Information,
                    error,
                })?;
        }

        let caps = node.capabilities;
        for (port, mut info) in node.outputs.iter_mut().zip(req.outputs) {
            if let Some(kind) = port.kind {
                info.set(Key::DataTypeName, kind.name());
            }
            if caps.contains(Capabilities::SUB_EXTENT) && !info.has(Key::CanProduceSubExtent) {
                info.set(Key::CanProduceSubExtent, true);
            }
            if caps.contains(Capabilities::PIECES) && !info.has(Key::CanHandlePieceRequest) {
                info.set(Key::CanHandlePieceRequest, true);
            }
            if let Some(data) = &port.data {
                info.set(Key::DataObject, Arc::clone(data));
            }
            if let Some(t) = port.previous_update_time {
                info.set(Key::PreviousUpdateTimeStep, t);
            }
            port.info = info;
        }
        node.phase = PhaseState::Idle;
        Ok(())
    }

    // --- Request sweep ---

    fn apply_request(
        &mut self,
        id: NodeId,
        request: &UpdateRequest,
        ctx: &mut ExecutionContext,
    ) -> Result<(), PipelineError> {
        let info = request.to_information();
        let snap = self.options.time_snap;
        let node = self.node_data_mut(id)?;
        if node.outputs.is_empty() {
            node.external_request = info;
            return Ok(());
        }
        let mut warnings = Vec::new();
        for port in &mut node.outputs {
            let mut req = info.clone();
            warnings.extend(normalize_request(&mut req, &port.info, snap, id));
            port.request = req;
            port.request_pass = ctx.pass;
        }
        for warning in warnings {
            ctx.warn(warning);
        }
        Ok(())
    }

    // --- Update-extent sweep ---

    fn propagate_update_extent(
        &mut self,
        id: NodeId,
        ctx: &mut ExecutionContext,
    ) -> Result<(), PipelineError> {
        if !self.need_to_execute(id)? {
            return Ok(());
        }
        let changed = self.request_update_extent(id, ctx, 0, false)?;
        for producer in changed {
            self.propagate_update_extent(producer, ctx)?;
        }
        Ok(())
    }

    /// Runs the node's update-extent phase and pushes the resulting input
    /// requests upstream. Returns the producers whose request changed.
    fn request_update_extent(
        &mut self,
        id: NodeId,
        ctx: &mut ExecutionContext,
        iteration: u32,
        replace: bool,
    ) -> Result<Vec<NodeId>, PipelineError> {
        let node = self.node_data(id)?;
        let driving = node.driving_requests();
        let first = driving.first().cloned().unwrap_or_default();
        let own_ghost = driving
            .iter()
            .filter_map(|r| r.uint(Key::UpdateNumberOfGhostLevels))
            .max()
            .unwrap_or(0);
        let output_info: Vec<Information> = node.outputs.iter().map(|p| p.info.clone()).collect();

        let mut targets = Vec::with_capacity(node.inputs.len());
        let mut input_info = Vec::with_capacity(node.inputs.len());
        let mut input_requests = Vec::with_capacity(node.inputs.len());
        for input in &node.inputs {
            let mut port_targets = Vec::new();
            let mut port_info = Vec::new();
            let mut port_requests = Vec::new();
            for edge in &input.edges {
                let Some(edge) = self.edge(*edge) else {
                    continue;
                };
                let meta = &self.output_port(edge.from, edge.from_port)?.info;
                port_requests.push(default_input_request(&first, meta));
                port_info.push(meta.clone());
                port_targets.push((edge.from, edge.from_port));
            }
            targets.push(port_targets);
            input_info.push(port_info);
            input_requests.push(port_requests);
        }

        let mut req = UpdateExtentRequest {
            output_requests: driving,
            output_info,
            input_info,
            input_requests,
            iteration,
        };
        let composite = self.composite_input(id)?.is_some();

        ctx.enter(id, PhaseState::UpdateExtent, iteration);
        let node = self.node_data_mut(id)?;
        node.phase = PhaseState::UpdateExtent;
        // Block runs negotiate their own extents; the composite producer
        // gets the default requests.
        if !composite {
            node.counts.update_extent += 1;
            node.algorithm
                .process_request(PhaseRequest::UpdateExtent(&mut req))
                .map(|_| ())
                .map_err(|error| PipelineError::NodeFailed {
                    node: id,
                    phase: PhaseState::UpdateExtent,
                    error,
                })?;
        }
        node.phase = PhaseState::Idle;

        let mut changed = Vec::new();
        for (port_targets, requests) in targets.into_iter().zip(req.input_requests) {
            for ((producer, port), mut request) in port_targets.into_iter().zip(requests) {
                if request.uint(Key::UpdateNumberOfGhostLevels).unwrap_or(0) < own_ghost {
                    request.set(Key::UpdateNumberOfGhostLevels, own_ghost);
                }
                if self.push_request(producer, port, request, ctx, replace)?
                    && !changed.contains(&producer)
                {
                    changed.push(producer);
                }
            }
        }
        Ok(changed)
    }

    /// Stores `request` on a producer's output port, combining it with a
    /// request already stored in this pass. Returns `true` if the producer
    /// must translate its inputs again.
    fn push_request(
        &mut self,
        producer: NodeId,
        port: usize,
        mut request: Information,
        ctx: &mut ExecutionContext,
        replace: bool,
    ) -> Result<bool, PipelineError> {
        let snap = self.options.time_snap;
        let pass = ctx.pass;
        let out = self.output_port_mut(producer, port)?;
        let mut warnings = normalize_request(&mut request, &out.info, snap, producer);

        let first_visit = out.request_pass != pass;
        let merged = if first_visit || replace {
            request
        } else {
            let (merged, conflicts) = combine_requests(&out.request, &request, producer);
            warnings.extend(conflicts);
            merged
        };
        let changed = first_visit || out.request != merged;
        out.request = merged;
        out.request_pass = pass;

        for warning in warnings {
            ctx.warn(warning);
        }
        Ok(changed)
    }

    // --- Data sweep ---

    fn update_data(
        &mut self,
        id: NodeId,
        ctx: &mut ExecutionContext,
        revisit: bool,
    ) -> Result<(), PipelineError> {
        {
            let node = self.node_data(id)?;
            if node.data_pass == ctx.pass && !revisit {
                return match &node.data_error {
                    Some(err) => Err(err.clone()),
                    None => Ok(()),
                };
            }
        }
        self.node_data_mut(id)?.data_pass = ctx.pass;
        let result = self.refresh_data(id, ctx, revisit);
        self.node_data_mut(id)?.data_error = result.as_ref().err().cloned();
        result
    }

    fn refresh_data(
        &mut self,
        id: NodeId,
        ctx: &mut ExecutionContext,
        revisit: bool,
    ) -> Result<(), PipelineError> {
        if self.serves_empty_piece(id)? {
            self.publish_empty_piece(id)?;
            record_skip(ctx, id);
            return Ok(());
        }
        if !self.need_to_execute(id)? {
            #[cfg(feature = "tracing")]
            tracing::debug!(node = id.index(), "executive: outputs current, skipping");
            record_skip(ctx, id);
            return Ok(());
        }
        self.update_producers(id, ctx, revisit)?;
        self.execute_node(id, ctx)
    }

    /// Every producer branch runs to completion before the first error is
    /// returned.
    fn update_producers(
        &mut self,
        id: NodeId,
        ctx: &mut ExecutionContext,
        revisit: bool,
    ) -> Result<(), PipelineError> {
        let mut first_error = None;
        for producer in self.producers(id) {
            if let Err(err) = self.update_data(producer, ctx, revisit) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn execute_node(&mut self, id: NodeId, ctx: &mut ExecutionContext) -> Result<(), PipelineError> {
        let limit = self.options.max_continue_iterations;
        let may_continue = self
            .node_data(id)?
            .capabilities
            .contains(Capabilities::CONTINUE_EXECUTING);
        let composite = self.composite_input(id)?;
        let mut iteration = 0u32;
        loop {
            if iteration > 0 {
                let changed = self.request_update_extent(id, ctx, iteration, true)?;
                for producer in changed {
                    self.propagate_update_extent(producer, ctx)?;
                }
                self.update_producers(id, ctx, true)?;
            }
            let execution = match composite {
                Some(port) => self.run_composite(id, ctx, port)?,
                None => self.run_request_data(id, ctx, iteration)?,
            };
            match execution {
                Execution::Done => break,
                Execution::Continue => {
                    if !may_continue {
                        self.invalidate_outputs(id)?;
                        return Err(PipelineError::NodeFailed {
                            node: id,
                            phase: PhaseState::Executing,
                            error: NodeError::structural(
                                "returned Continue without the CONTINUE_EXECUTING capability",
                            ),
                        });
                    }
                    if ctx.abort.is_aborted() {
                        break;
                    }
                    if iteration >= limit {
                        return Err(PipelineError::ContinueLimitExceeded { node: id, limit });
                    }
                    iteration += 1;
                    ctx.report.continue_iterations += 1;

                    #[cfg(feature = "tracing")]
                    tracing::debug!(node = id.index(), iteration, "executive: continue executing");
                }
            }
        }

        let partial = ctx.abort.is_aborted();
        let node = self.node_data_mut(id)?;
        node.phase = PhaseState::Idle;
        node.partial = partial;
        if partial {
            #[cfg(feature = "tracing")]
            tracing::debug!(node = id.index(), "executive: aborted, output is partial");
            ctx.report.partial.push(id);
        }
        if !ctx.report.executed.contains(&id) {
            ctx.report.executed.push(id);
        }
        Ok(())
    }

    fn run_request_data(
        &mut self,
        id: NodeId,
        ctx: &mut ExecutionContext,
        iteration: u32,
    ) -> Result<Execution, PipelineError> {
        let stamp = self.tick();

        let (inputs, input_requests) = self.input_data(id)?;
        let input_time = first_input_time(&inputs);
        let node = self.node_data(id)?;
        let translate = node.capabilities.contains(Capabilities::SUB_EXTENT);
        let mut output_requests = node.driving_requests();
        let output_info: Vec<Information> = node.outputs.iter().map(|p| p.info.clone()).collect();
        let outputs: Vec<Option<DataObject>> =
            node.outputs.iter().map(|p| p.kind.map(DataObject::new)).collect();

        if translate && !node.outputs.is_empty() {
            for (request, info) in output_requests.iter_mut().zip(&output_info) {
                self.translate_sub_extent(request, info);
            }
        }

        ctx.enter(id, PhaseState::Executing, iteration);
        let Self {
            nodes,
            abort,
            progress,
            ..
        } = self;
        let node = nodes
            .get_mut(id.0 as usize)
            .and_then(Option::as_mut)
            .ok_or(PipelineError::NodeNotFound(id))?;
        node.phase = PhaseState::Executing;
        node.counts.data += 1;

        let mut req = DataRequest {
            node: id,
            name: &node.name,
            inputs,
            input_requests,
            output_requests,
            output_info,
            outputs,
            iteration,
            abort: &*abort,
            progress: progress.as_deref(),
        };
        let result = node.algorithm.process_request(PhaseRequest::Data(&mut req));
        let DataRequest {
            outputs,
            output_requests,
            ..
        } = req;

        let expected: Vec<Option<DataKind>> = node.outputs.iter().map(|p| p.kind).collect();
        let checked = result
            .map_err(|error| PipelineError::NodeFailed {
                node: id,
                phase: PhaseState::Executing,
                error,
            })
            .and_then(|execution| {
                check_outputs(id, outputs, &expected).map(|produced| (execution, produced))
            });
        let (execution, produced) = match checked {
            Ok(checked) => checked,
            Err(err) => {
                for port in &mut node.outputs {
                    port.generated = false;
                }
                return Err(err);
            }
        };
        self.publish_outputs(id, produced, &output_requests, input_time, stamp)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(node = id.index(), iteration, "executive: executed");

        Ok(execution)
    }

    /// Commits produced objects to the node's output ports.
    fn publish_outputs(
        &mut self,
        id: NodeId,
        produced: Vec<DataObject>,
        requests: &[Information],
        input_time: Option<f64>,
        stamp: u64,
    ) -> Result<(), PipelineError> {
        let node = self.node_data_mut(id)?;
        for ((mut object, port), request) in produced
            .into_iter()
            .zip(node.outputs.iter_mut())
            .zip(requests)
        {
            mark_generated(&mut object, &port.info, request, input_time);
            let handle: DataHandle = Arc::new(object);
            port.info.set(Key::DataObject, Arc::clone(&handle));
            port.previous_update_time = request.double(Key::UpdateTimeStep);
            match port.previous_update_time {
                Some(t) => port.info.set(Key::PreviousUpdateTimeStep, t),
                None => {
                    port.info.remove(Key::PreviousUpdateTimeStep);
                }
            }
            port.data = Some(handle);
            port.generated = true;
        }
        node.execute_time = stamp;
        if node.outputs.is_empty() {
            node.executed_request = Some(node.external_request.clone());
        }
        Ok(())
    }

    fn invalidate_outputs(&mut self, id: NodeId) -> Result<(), PipelineError> {
        for port in &mut self.node_data_mut(id)?.outputs {
            port.generated = false;
        }
        Ok(())
    }

    /// Data handles and sent requests on every input connection of `id`.
    fn input_data(
        &self,
        id: NodeId,
    ) -> Result<(Vec<Vec<DataHandle>>, Vec<Vec<Information>>), PipelineError> {
        let node = self.node_data(id)?;
        let mut inputs = Vec::with_capacity(node.inputs.len());
        let mut input_requests = Vec::with_capacity(node.inputs.len());
        for input in &node.inputs {
            let mut data = Vec::with_capacity(input.edges.len());
            let mut requests = Vec::with_capacity(input.edges.len());
            for edge in &input.edges {
                let Some(edge) = self.edge(*edge) else {
                    continue;
                };
                let out = self.output_port(edge.from, edge.from_port)?;
                let handle = out.data.as_ref().ok_or(PipelineError::MissingDataObject {
                    node: edge.from,
                    port: edge.from_port,
                })?;
                data.push(Arc::clone(handle));
                requests.push(out.request.clone());
            }
            inputs.push(data);
            input_requests.push(requests);
        }
        Ok((inputs, input_requests))
    }

    /// Replaces a multi-piece `UpdateExtent` with this piece's sub-extent.
    fn translate_sub_extent(&mut self, request: &mut Information, info: &Information) {
        let Some((base, piece, mode)) = piece_window(request, info, self.options.split_mode) else {
            return;
        };
        self.translator.set_mode(mode);
        let extent = self.translator.piece_to_extent(&base, piece);
        self.translator.set_mode(self.options.split_mode);
        request.set(Key::AllPiecesExtent, base);
        request.set(Key::UpdateExtent, extent);
    }

    // --- Composite iteration ---

    /// First input port holding a composite its node does not accept.
    fn composite_input(&self, id: NodeId) -> Result<Option<usize>, PipelineError> {
        let node = self.node_data(id)?;
        for (port, input) in node.inputs.iter().enumerate() {
            let [edge] = input.edges.as_slice() else {
                continue;
            };
            let Some(edge) = self.edge(*edge) else {
                continue;
            };
            let kind = self.output_port(edge.from, edge.from_port)?.kind;
            if kind.is_some_and(|k| k.is_composite() && !input.spec.accepts(k)) {
                return Ok(Some(port));
            }
        }
        Ok(None)
    }

    /// Runs `id` once per leaf of the composite on input `port`.
    fn run_composite(
        &mut self,
        id: NodeId,
        ctx: &mut ExecutionContext,
        port: usize,
    ) -> Result<Execution, PipelineError> {
        let stamp = self.tick();
        let (inputs, _) = self.input_data(id)?;
        let input_time = first_input_time(&inputs);
        let node = self.node_data(id)?;
        let env = BlockEnv {
            port,
            kinds: self
                .collect_inputs(id, |p| p.kind)?
                .into_iter()
                .map(|conns| conns.into_iter().flatten().collect())
                .collect(),
            infos: self.collect_inputs(id, |p| p.info.clone())?,
            driving: node.driving_requests(),
            specs: node.outputs.iter().map(|p| p.spec.clone()).collect(),
            inputs,
        };
        let composite = env
            .inputs
            .get(port)
            .and_then(|conns| conns.first())
            .cloned()
            .ok_or(PipelineError::MissingInput { node: id, port })?;
        let empty = MultiBlock::new();
        let blocks = composite.payload::<MultiBlock>().unwrap_or(&empty);
        let mut progress = (0, blocks.leaf_count().max(1));

        #[cfg(feature = "tracing")]
        tracing::debug!(node = id.index(), blocks = progress.1, "executive: iterating over blocks");

        let composites = match self.run_blocks(id, ctx, blocks, &env, &mut progress) {
            Ok(composites) => composites,
            Err(err) => {
                self.invalidate_outputs(id)?;
                return Err(err);
            }
        };
        let produced = composites
            .into_iter()
            .map(|blocks| DataObject::with_payload(DataKind::MultiBlock, blocks))
            .collect();
        self.publish_outputs(id, produced, &env.driving, input_time, stamp)?;
        Ok(Execution::Done)
    }

    /// One output composite per output port, shaped like `blocks`.
    fn run_blocks(
        &mut self,
        id: NodeId,
        ctx: &mut ExecutionContext,
        blocks: &MultiBlock,
        env: &BlockEnv,
        progress: &mut (usize, usize),
    ) -> Result<Vec<MultiBlock>, PipelineError> {
        let mut outputs = vec![MultiBlock::with_len(blocks.len()); env.specs.len()];
        for (index, block) in blocks.iter().enumerate() {
            let Some(block) = block else {
                continue;
            };
            if ctx.abort.is_aborted() {
                break;
            }
            let produced: Vec<DataObject> = match block.payload::<MultiBlock>() {
                Some(inner) => self
                    .run_blocks(id, ctx, inner, env, progress)?
                    .into_iter()
                    .map(|nested| DataObject::with_payload(DataKind::MultiBlock, nested))
                    .collect(),
                None if block.kind().is_composite() => env
                    .specs
                    .iter()
                    .map(|_| DataObject::with_payload(DataKind::MultiBlock, MultiBlock::new()))
                    .collect(),
                None => {
                    let produced = self.run_block(id, ctx, block, env)?;
                    progress.0 += 1;
                    self.report_progress(id, progress.0 as f64 / progress.1 as f64);
                    produced
                }
            };
            for (output, object) in outputs.iter_mut().zip(produced) {
                output.set_block(index, Some(Arc::new(object)));
            }
        }
        Ok(outputs)
    }

    /// All four phases over one leaf block, requesting the whole block.
    fn run_block(
        &mut self,
        id: NodeId,
        ctx: &mut ExecutionContext,
        block: &DataHandle,
        env: &BlockEnv,
    ) -> Result<Vec<DataObject>, PipelineError> {
        let port = env.port;
        if !self.node_data(id)?.inputs[port].spec.accepts(block.kind()) {
            return Err(PipelineError::IncompatibleInput {
                node: id,
                port,
                kind: block.kind(),
            });
        }

        let mut kinds = env.kinds.clone();
        kinds[port] = vec![block.kind()];
        let outputs = env
            .specs
            .iter()
            .map(|spec| match spec.produced {
                ProducedKind::Fixed(kind) => Some(kind),
                ProducedKind::SameAsInput(input) => {
                    kinds.get(input).and_then(|conns| conns.first()).copied()
                }
            })
            .collect();
        let mut object_req = DataObjectRequest {
            inputs: kinds,
            outputs,
        };
        self.call_algorithm(id, ctx, PhaseState::DataObject, |node, _, _| {
            node.algorithm
                .process_request(PhaseRequest::DataObject(&mut object_req))
                .map(|_| ())
        })?;
        let mut out_kinds = Vec::with_capacity(object_req.outputs.len());
        for (index, kind) in object_req.outputs.into_iter().enumerate() {
            out_kinds.push(kind.ok_or_else(|| PipelineError::NodeFailed {
                node: id,
                phase: PhaseState::DataObject,
                error: NodeError::structural(format!(
                    "cannot determine the kind of output {index} for a block"
                )),
            })?);
        }

        let mut infos = env.infos.clone();
        infos[port] = vec![block_information(block)];
        let template = default_information(&infos);
        let mut info_req = InformationRequest {
            outputs: vec![template; out_kinds.len()],
            inputs: infos,
        };
        self.call_algorithm(id, ctx, PhaseState::Information, |node, _, _| {
            node.algorithm
                .process_request(PhaseRequest::Information(&mut info_req))
                .map(|_| ())
        })?;
        let InformationRequest {
            inputs: infos,
            outputs: mut out_info,
        } = info_req;
        for (info, kind) in out_info.iter_mut().zip(&out_kinds) {
            info.set(Key::DataTypeName, kind.name());
        }

        let requests: Vec<Information> = env
            .driving
            .iter()
            .enumerate()
            .map(|(index, driving)| {
                let mut request = driving.clone();
                match out_info.get(index).and_then(|info| info.extent(Key::WholeExtent)) {
                    Some(whole) => request.set(Key::UpdateExtent, whole),
                    None => {
                        request.remove(Key::UpdateExtent);
                    }
                }
                request.set(Key::UpdatePieceNumber, 0u32);
                request.set(Key::UpdateNumberOfPieces, 1u32);
                request.remove(Key::AllPiecesExtent);
                request
            })
            .collect();
        let first = requests.first().cloned().unwrap_or_default();
        let input_requests = infos
            .iter()
            .map(|conns| conns.iter().map(|meta| default_input_request(&first, meta)).collect())
            .collect();
        let mut extent_req = UpdateExtentRequest {
            output_requests: requests,
            output_info: out_info.clone(),
            input_info: infos,
            input_requests,
            iteration: 0,
        };
        self.call_algorithm(id, ctx, PhaseState::UpdateExtent, |node, _, _| {
            node.algorithm
                .process_request(PhaseRequest::UpdateExtent(&mut extent_req))
                .map(|_| ())
        })?;

        let mut inputs = env.inputs.clone();
        inputs[port] = vec![Arc::clone(block)];
        let input_time = first_input_time(&inputs);
        let UpdateExtentRequest {
            output_requests,
            input_requests,
            ..
        } = extent_req;
        let mut data_req_outputs: Option<Vec<Option<DataObject>>> =
            Some(out_kinds.iter().map(|k| Some(DataObject::new(*k))).collect());
        let mut served = Vec::new();
        let execution = self.call_algorithm(id, ctx, PhaseState::Executing, |node, abort, progress| {
            let mut req = DataRequest {
                node: id,
                name: &node.name,
                inputs,
                input_requests,
                output_requests,
                output_info: out_info.clone(),
                outputs: data_req_outputs.take().unwrap_or_default(),
                iteration: 0,
                abort,
                progress,
            };
            let result = node.algorithm.process_request(PhaseRequest::Data(&mut req));
            data_req_outputs = Some(req.outputs);
            served = req.output_requests;
            result
        })?;
        if execution == Execution::Continue {
            return Err(PipelineError::NodeFailed {
                node: id,
                phase: PhaseState::Executing,
                error: NodeError::structural(
                    "continue-executing is not supported while iterating over blocks",
                ),
            });
        }
        let expected: Vec<Option<DataKind>> = out_kinds.into_iter().map(Some).collect();
        let mut produced = check_outputs(id, data_req_outputs.unwrap_or_default(), &expected)?;
        for ((object, info), request) in produced.iter_mut().zip(&out_info).zip(&served) {
            mark_generated(object, info, request, input_time);
        }
        Ok(produced)
    }

    /// Calls into the node's algorithm for one phase, counting the entry.
    fn call_algorithm<R>(
        &mut self,
        id: NodeId,
        ctx: &mut ExecutionContext,
        phase: PhaseState,
        call: impl FnOnce(&mut NodeData, &AbortHandle, Option<&dyn ProgressObserver>) -> Result<R, NodeError>,
    ) -> Result<R, PipelineError> {
        ctx.enter(id, phase, 0);
        let Self {
            nodes,
            abort,
            progress,
            ..
        } = self;
        let node = nodes
            .get_mut(id.0 as usize)
            .and_then(Option::as_mut)
            .ok_or(PipelineError::NodeNotFound(id))?;
        node.phase = phase;
        match phase {
            PhaseState::DataObject => node.counts.data_object += 1,
            PhaseState::Information => node.counts.information += 1,
            PhaseState::UpdateExtent => node.counts.update_extent += 1,
            PhaseState::Executing => node.counts.data += 1,
            PhaseState::Idle => {}
        }
        let output = call(node, abort, progress.as_deref())
            .map_err(|error| PipelineError::NodeFailed { node: id, phase, error })?;
        node.phase = PhaseState::Idle;
        Ok(output)
    }

    fn report_progress(&self, id: NodeId, fraction: f64) {
        if let (Some(observer), Ok(node)) = (self.progress.as_deref(), self.node_data(id)) {
            observer.on_progress(id, &node.name, fraction.clamp(0.0, 1.0));
        }
    }

    // --- Staleness ---

    fn need_to_execute(&self, id: NodeId) -> Result<bool, PipelineError> {
        let node = self.node_data(id)?;
        if node.execute_time == 0 || node.partial || node.pipeline_mtime > node.execute_time {
            return Ok(true);
        }
        if node.outputs.is_empty() {
            return Ok(node.executed_request.as_ref() != Some(&node.external_request));
        }
        let sub_extent = node.capabilities.contains(Capabilities::SUB_EXTENT);
        let mode = self.options.split_mode;
        Ok(node.outputs.iter().any(|port| {
            let mut request = port.request.clone();
            if sub_extent {
                if let Some((base, piece, mode)) = piece_window(&request, &port.info, mode) {
                    request.set(Key::UpdateExtent, translate::piece_extent(&base, piece, mode));
                }
            }
            port_is_stale(port, &request)
        }))
    }

    /// A source that cannot split its output serves piece 0 only.
    fn serves_empty_piece(&self, id: NodeId) -> Result<bool, PipelineError> {
        let node = self.node_data(id)?;
        if node.family != NodeFamily::Source
            || node.capabilities.contains(Capabilities::PIECES)
            || node.capabilities.contains(Capabilities::SUB_EXTENT)
        {
            return Ok(false);
        }
        Ok(node.outputs.first().is_some_and(|port| {
            port.request.uint(Key::UpdateNumberOfPieces).unwrap_or(1) > 1
                && port.request.uint(Key::UpdatePieceNumber).unwrap_or(0) > 0
        }))
    }

    fn publish_empty_piece(&mut self, id: NodeId) -> Result<(), PipelineError> {
        let node = self.node_data_mut(id)?;
        for port in &mut node.outputs {
            let Some(kind) = port.kind else {
                continue;
            };
            let piece = port.request.uint(Key::UpdatePieceNumber).unwrap_or(0);
            let num_pieces = port.request.uint(Key::UpdateNumberOfPieces).unwrap_or(1);
            let current = !port.generated
                && port.data.as_ref().is_some_and(|d| {
                    d.info().uint(Key::DataPieceNumber) == Some(piece)
                        && d.info().uint(Key::DataNumberOfPieces) == Some(num_pieces)
                });
            if current {
                continue;
            }
            let mut object = DataObject::new(kind);
            object.info_mut().set(Key::DataPieceNumber, piece);
            object.info_mut().set(Key::DataNumberOfPieces, num_pieces);
            let handle: DataHandle = Arc::new(object);
            port.info.set(Key::DataObject, Arc::clone(&handle));
            port.data = Some(handle);
            port.generated = false;
        }
        Ok(())
    }

    // --- Helpers ---

    fn output_port(&self, id: NodeId, port: usize) -> Result<&OutputPort, PipelineError> {
        self.node_data(id)?
            .outputs
            .get(port)
            .ok_or(PipelineError::PortOutOfRange {
                node: id,
                port,
                output: true,
            })
    }

    fn output_port_mut(&mut self, id: NodeId, port: usize) -> Result<&mut OutputPort, PipelineError> {
        self.node_data_mut(id)?
            .outputs
            .get_mut(port)
            .ok_or(PipelineError::PortOutOfRange {
                node: id,
                port,
                output: true,
            })
    }

    /// Maps every connection of every input port of `id` through `f`,
    /// applied to the producer's output port.
    fn collect_inputs<T>(
        &self,
        id: NodeId,
        f: impl Fn(&OutputPort) -> T,
    ) -> Result<Vec<Vec<T>>, PipelineError> {
        let node = self.node_data(id)?;
        let mut out = Vec::with_capacity(node.inputs.len());
        for input in &node.inputs {
            let mut conns = Vec::with_capacity(input.edges.len());
            for edge in &input.edges {
                if let Some(edge) = self.edge(*edge) {
                    conns.push(f(self.output_port(edge.from, edge.from_port)?));
                }
            }
            out.push(conns);
        }
        Ok(out)
    }
}

/// What every block run of one composite execution shares.
struct BlockEnv {
    /// Input port carrying the composite.
    port: usize,
    inputs: Vec<Vec<DataHandle>>,
    kinds: Vec<Vec<DataKind>>,
    infos: Vec<Vec<Information>>,
    driving: Vec<Information>,
    specs: Vec<OutputPortSpec>,
}

/// Metadata a block advertises as if a producer had announced it.
fn block_information(block: &DataHandle) -> Information {
    let mut info = Information::new();
    if let Some(extent) = block.info().extent(Key::DataExtent) {
        info.set(Key::WholeExtent, extent);
    }
    if let Some(t) = block.info().double(Key::DataTimeStep) {
        info.set(Key::TimeSteps, vec![t]);
    }
    info.set(Key::DataTypeName, block.kind().name());
    info.set(Key::DataObject, Arc::clone(block));
    info
}

/// Output metadata prefilled from the first input connection.
fn default_information(inputs: &[Vec<Information>]) -> Information {
    let mut info = Information::new();
    if let Some(first) = inputs.first().and_then(|conns| conns.first()) {
        for key in [Key::WholeExtent, Key::TimeSteps, Key::TimeRange] {
            info.copy_entry(first, key);
        }
    }
    info
}

fn first_input_time(inputs: &[Vec<DataHandle>]) -> Option<f64> {
    inputs
        .first()
        .and_then(|conns| conns.first())
        .and_then(|d| d.info().double(Key::DataTimeStep))
}

/// Base extent, piece and split mode of a multi-piece request over a
/// structured output. `None` for single-piece requests.
fn piece_window(
    request: &Information,
    info: &Information,
    default_mode: SplitMode,
) -> Option<(Extent, PieceRequest, SplitMode)> {
    let num_pieces = request.uint(Key::UpdateNumberOfPieces).unwrap_or(1);
    if num_pieces <= 1 {
        return None;
    }
    let whole = info.extent(Key::WholeExtent)?;
    let base = request.extent(Key::UpdateExtent).unwrap_or(whole);
    let mut piece = PieceRequest::new(request.uint(Key::UpdatePieceNumber).unwrap_or(0), num_pieces)
        .with_ghost_levels(request.uint(Key::UpdateNumberOfGhostLevels).unwrap_or(0));
    if request.flag(Key::ExactExtent) {
        piece = piece.exact();
    }
    let mode = request
        .string(Key::UpdateSplitMode)
        .and_then(|name| name.parse::<SplitMode>().ok())
        .unwrap_or(default_mode);
    Some((base, piece, mode))
}

fn record_skip(ctx: &mut ExecutionContext, id: NodeId) {
    if !ctx.report.skipped.contains(&id) && !ctx.report.executed.contains(&id) {
        ctx.report.skipped.push(id);
    }
}

/// Takes every output object, checking each against its port's kind.
fn check_outputs(
    id: NodeId,
    outputs: Vec<Option<DataObject>>,
    expected: &[Option<DataKind>],
) -> Result<Vec<DataObject>, PipelineError> {
    let mut produced = Vec::with_capacity(outputs.len());
    for (index, (slot, kind)) in outputs.into_iter().zip(expected).enumerate() {
        let object = slot.ok_or(PipelineError::MissingDataObject { node: id, port: index })?;
        if Some(object.kind()) != *kind {
            return Err(PipelineError::NodeFailed {
                node: id,
                phase: PhaseState::Executing,
                error: NodeError::structural(format!(
                    "output {index} holds {} but the port resolved another kind",
                    object.kind()
                )),
            });
        }
        produced.push(object);
    }
    Ok(produced)
}

/// Input request derived from the node's first driving request.
fn default_input_request(driving: &Information, producer: &Information) -> Information {
    let mut req = Information::new();
    for key in [
        Key::UpdatePieceNumber,
        Key::UpdateNumberOfPieces,
        Key::UpdateNumberOfGhostLevels,
        Key::UpdateTimeStep,
        Key::UpdateSplitMode,
    ] {
        if let Some(value) = driving.get(key) {
            req.set(key, value.clone());
        }
    }
    if let Some(whole) = producer.extent(Key::WholeExtent) {
        let extent = driving
            .extent(Key::UpdateExtent)
            .map_or(whole, |e| e.clamp_to(&whole));
        req.set(Key::UpdateExtent, extent);
    }
    req
}

/// Brings `request` within what `meta` advertises. Returns one warning per
/// clamp.
fn normalize_request(
    request: &mut Information,
    meta: &Information,
    snap: TimeSnap,
    node: NodeId,
) -> Vec<String> {
    let mut warnings = Vec::new();

    let asked = PieceRequest::new(
        request.uint(Key::UpdatePieceNumber).unwrap_or(0),
        request.uint(Key::UpdateNumberOfPieces).unwrap_or(1),
    );
    let (pieces, clamped) = asked.normalized();
    if clamped {
        warnings.push(format!(
            "{node}: piece {} of {} out of range, using piece {} of {}",
            asked.piece, asked.num_pieces, pieces.piece, pieces.num_pieces
        ));
    }
    request.set(Key::UpdatePieceNumber, pieces.piece);
    request.set(Key::UpdateNumberOfPieces, pieces.num_pieces);
    if !request.has(Key::UpdateNumberOfGhostLevels) {
        request.set(Key::UpdateNumberOfGhostLevels, 0u32);
    }

    if let Some(whole) = meta.extent(Key::WholeExtent) {
        match request.extent(Key::UpdateExtent) {
            None => request.set(Key::UpdateExtent, whole),
            Some(extent) if !extent.is_empty() && !whole.contains(&extent) => {
                let clamped = extent.clamp_to(&whole);
                warnings.push(format!(
                    "{node}: update extent {extent} outside whole extent {whole}, clamped to {clamped}"
                ));
                request.set(Key::UpdateExtent, clamped);
            }
            Some(_) => {}
        }
    }

    if let Some(requested) = request.double(Key::UpdateTimeStep) {
        let snapped = match (meta.doubles(Key::TimeSteps), meta.time_range()) {
            (Some(steps), _) if !steps.is_empty() => Some(time::snap(requested, steps, snap)),
            (_, Some(range)) => Some(time::clamp_to_range(requested, range)),
            _ => None,
        };
        if let Some(snapped) = snapped {
            if snapped.clamped {
                warnings.push(format!(
                    "{node}: time {requested} outside available times, using {}",
                    snapped.time
                ));
            }
            request.set(Key::UpdateTimeStep, snapped.time);
        }
    }

    warnings
}

/// Merges a second consumer's request into one stored earlier in the pass.
fn combine_requests(
    existing: &Information,
    incoming: &Information,
    node: NodeId,
) -> (Information, Vec<String>) {
    let mut merged = existing.clone();
    let mut warnings = Vec::new();

    match (existing.extent(Key::UpdateExtent), incoming.extent(Key::UpdateExtent)) {
        (Some(a), Some(b)) if a != b => {
            merged.set(Key::UpdateExtent, a.union(&b));
            merged.set(Key::CombinedUpdateExtent, true);
        }
        (None, Some(b)) => merged.set(Key::UpdateExtent, b),
        _ => {}
    }

    let ghost = existing
        .uint(Key::UpdateNumberOfGhostLevels)
        .unwrap_or(0)
        .max(incoming.uint(Key::UpdateNumberOfGhostLevels).unwrap_or(0));
    merged.set(Key::UpdateNumberOfGhostLevels, ghost);

    let piece_of = |info: &Information| {
        (
            info.uint(Key::UpdatePieceNumber).unwrap_or(0),
            info.uint(Key::UpdateNumberOfPieces).unwrap_or(1),
        )
    };
    if piece_of(existing) != piece_of(incoming) {
        let (piece, num) = piece_of(existing);
        warnings.push(format!(
            "{node}: conflicting piece requests in one update, keeping piece {piece} of {num}"
        ));
    }

    match (existing.double(Key::UpdateTimeStep), incoming.double(Key::UpdateTimeStep)) {
        (Some(a), Some(b)) if a.to_bits() != b.to_bits() => {
            warnings.push(format!(
                "{node}: conflicting time requests {a} and {b} in one update, keeping {a}"
            ));
        }
        (None, Some(b)) => merged.set(Key::UpdateTimeStep, b),
        _ => {}
    }

    if !(existing.flag(Key::ExactExtent) && incoming.flag(Key::ExactExtent)) {
        merged.remove(Key::ExactExtent);
    }
    (merged, warnings)
}

/// `request` is the port's request, translated for sub-extent producers.
fn port_is_stale(port: &OutputPort, request: &Information) -> bool {
    let Some(object) = port.data.as_ref() else {
        return true;
    };
    if !port.generated {
        return true;
    }
    let data = object.info();

    let num_pieces = request.uint(Key::UpdateNumberOfPieces).unwrap_or(1);
    let piece = request.uint(Key::UpdatePieceNumber).unwrap_or(0);
    if data.uint(Key::DataNumberOfPieces) != Some(num_pieces)
        || data.uint(Key::DataPieceNumber) != Some(piece)
    {
        return true;
    }
    let ghost = request.uint(Key::UpdateNumberOfGhostLevels).unwrap_or(0);
    if num_pieces > 1 && data.uint(Key::DataNumberOfGhostLevels).unwrap_or(0) < ghost {
        return true;
    }

    // Composites hold blocks of their own extents.
    let extents = (request.extent(Key::UpdateExtent), data.extent(Key::DataExtent));
    if let (Some(update), Some(held), false) = (extents.0, extents.1, object.kind().is_composite()) {
        if !update.is_empty() && !held.contains(&update) {
            return true;
        }
        // Only croppable outputs can match an exact request.
        if request.flag(Key::ExactExtent) && held != update && object.is_croppable() {
            return true;
        }
    }

    if let Some(requested) = request.double(Key::UpdateTimeStep) {
        if port.info.has(Key::TimeSteps) || port.info.has(Key::TimeRange) {
            match data.double(Key::DataTimeStep) {
                None => return true,
                Some(held) => {
                    let same_as_last = port
                        .previous_update_time
                        .is_some_and(|t| t.to_bits() == requested.to_bits());
                    if held.to_bits() != requested.to_bits() && !same_as_last {
                        return true;
                    }
                }
            }
        }
    }
    false
}

/// Records what the just-produced `object` holds.
fn mark_generated(
    object: &mut DataObject,
    port_info: &Information,
    request: &Information,
    input_time: Option<f64>,
) {
    let info = object.info_mut();
    info.set(Key::DataPieceNumber, request.uint(Key::UpdatePieceNumber).unwrap_or(0));
    info.set(
        Key::DataNumberOfPieces,
        request.uint(Key::UpdateNumberOfPieces).unwrap_or(1),
    );
    let ghost = info
        .uint(Key::DataNumberOfGhostLevels)
        .unwrap_or(0)
        .max(request.uint(Key::UpdateNumberOfGhostLevels).unwrap_or(0));
    info.set(Key::DataNumberOfGhostLevels, ghost);

    if !info.has(Key::DataExtent) && port_info.has(Key::WholeExtent) {
        if let Some(extent) = request.extent(Key::UpdateExtent) {
            info.set(Key::DataExtent, extent);
        }
    }
    if let Some(base) = request.extent(Key::AllPiecesExtent) {
        info.set(Key::AllPiecesExtent, base);
    }
    if !info.has(Key::DataTimeStep)
        && (port_info.has(Key::TimeSteps) || port_info.has(Key::TimeRange))
    {
        if let Some(t) = input_time.or_else(|| request.double(Key::UpdateTimeStep)) {
            info.set(Key::DataTimeStep, t);
        }
    }
    if request.flag(Key::ExactExtent) {
        info.set(Key::ExactExtent, true);
        let extents = (request.extent(Key::UpdateExtent), info.extent(Key::DataExtent));
        if let (Some(update), Some(held)) = extents {
            if held != update && held.contains(&update) && object.crop(&update) {
                #[cfg(feature = "tracing")]
                tracing::debug!(extent = %update, "executive: cropped output to exact extent");
            }
        }
    }
}
