//! Pipeline edges.
//!
//! An edge binds one producer output port to one consumer input port. Edges
//! never form cycles; re-entrant execution is expressed through
//! continue-executing, not through the graph.

use super::node::NodeId;

/// Unique identifier for an edge in the pipeline.
///
/// Edge IDs are assigned sequentially and never reused within a pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub(crate) u32);

impl EdgeId {
    /// Sequence number of this edge.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "edge#{}", self.0)
    }
}

/// A directed connection `from:from_port -> to:to_port`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Edge {
    /// Producer node.
    pub from: NodeId,
    /// Producer output port.
    pub from_port: usize,
    /// Consumer node.
    pub to: NodeId,
    /// Consumer input port.
    pub to_port: usize,
}
