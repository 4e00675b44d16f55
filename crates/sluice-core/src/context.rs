//! Per-update execution context: cancellation, progress, bookkeeping.
//!
//! One [`ExecutionContext`] is created for each `update` call and threaded
//! through the executive's recursion. Nothing here is global.

#[cfg(not(feature = "std"))]
use alloc::{string::String, sync::Arc, vec::Vec};
#[cfg(feature = "std")]
use std::sync::Arc;

use core::sync::atomic::{AtomicBool, Ordering};

use crate::pipeline::NodeId;

/// Shared cancellation flag.
///
/// Cloning yields another handle to the same flag, so a caller on another
/// thread (or a signal handler) can stop a running update.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    /// Creates a cleared flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn abort(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns `true` once cancellation was requested.
    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Clears the flag.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Receives progress reports from executing nodes.
pub trait ProgressObserver: Send {
    /// `fraction` is in `[0, 1]`.
    fn on_progress(&self, node: NodeId, name: &str, fraction: f64);
}

impl<F> ProgressObserver for F
where
    F: Fn(NodeId, &str, f64) + Send,
{
    fn on_progress(&self, node: NodeId, name: &str, fraction: f64) {
        self(node, name, fraction);
    }
}

/// A phase of the per-node state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PhaseState {
    /// Not being driven.
    #[default]
    Idle,
    /// Ensuring output data objects of the right kind.
    DataObject,
    /// Deriving output metadata.
    Information,
    /// Translating downstream requests onto inputs.
    UpdateExtent,
    /// Computing outputs.
    Executing,
}

impl PhaseState {
    /// Upper-snake name.
    pub const fn name(self) -> &'static str {
        match self {
            PhaseState::Idle => "IDLE",
            PhaseState::DataObject => "DATA_OBJECT",
            PhaseState::Information => "INFORMATION",
            PhaseState::UpdateExtent => "UPDATE_EXTENT",
            PhaseState::Executing => "EXECUTING",
        }
    }
}

/// One recorded phase entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseEvent {
    /// Node that entered the phase.
    pub node: NodeId,
    /// Phase entered.
    pub phase: PhaseState,
    /// Continue-loop iteration (0 outside the loop).
    pub iteration: u32,
}

/// How often each phase ran on one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PhaseCounts {
    /// `request_data_object` calls.
    pub data_object: u32,
    /// `request_information` calls.
    pub information: u32,
    /// `request_update_extent` calls.
    pub update_extent: u32,
    /// `request_data` calls.
    pub data: u32,
}

/// Summary of one `update` call.
#[derive(Debug, Clone, Default)]
pub struct UpdateReport {
    /// Nodes whose compute phase ran, in completion order.
    pub executed: Vec<NodeId>,
    /// Nodes whose existing outputs already satisfied the request.
    pub skipped: Vec<NodeId>,
    /// Nodes that stopped early on the abort flag.
    pub partial: Vec<NodeId>,
    /// Extra compute iterations requested through continue-executing.
    pub continue_iterations: u32,
    /// Recoverable negotiation warnings (clamps).
    pub warnings: Vec<String>,
    /// Phase entries in call order, when tracing is enabled in the options.
    pub trace: Vec<PhaseEvent>,
}

impl UpdateReport {
    /// Returns `true` if `node` computed during this update.
    pub fn did_execute(&self, node: NodeId) -> bool {
        self.executed.contains(&node)
    }

    /// Returns `true` if any node was aborted part-way.
    pub fn is_partial(&self) -> bool {
        !self.partial.is_empty()
    }
}

/// State for one update call tree.
pub(crate) struct ExecutionContext {
    /// Identifies this update for per-node visit marks.
    pub pass: u64,
    pub abort: AbortHandle,
    pub record_trace: bool,
    pub report: UpdateReport,
}

impl ExecutionContext {
    pub fn new(pass: u64, abort: AbortHandle, record_trace: bool) -> Self {
        Self {
            pass,
            abort,
            record_trace,
            report: UpdateReport::default(),
        }
    }

    pub fn enter(&mut self, node: NodeId, phase: PhaseState, iteration: u32) {
        #[cfg(feature = "tracing")]
        tracing::trace!(node = node.index(), phase = phase.name(), iteration, "phase");
        if self.record_trace {
            self.report.trace.push(PhaseEvent {
                node,
                phase,
                iteration,
            });
        }
    }

    pub fn warn(&mut self, message: String) {
        #[cfg(feature = "tracing")]
        tracing::warn!("{message}");
        self.report.warnings.push(message);
    }
}
