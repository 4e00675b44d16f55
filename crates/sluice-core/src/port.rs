//! Port declarations and node capability flags.
//!
//! Nodes declare their ports once, when added to a pipeline. An input port
//! states which [`DataKind`]s it accepts and its cardinality; an output port
//! states what it produces.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use core::ops::BitOr;

use crate::data::DataKind;

/// Declaration of one input port.
#[derive(Debug, Clone, PartialEq)]
pub struct InputPortSpec {
    /// Port name, for diagnostics.
    pub name: &'static str,
    /// Accepted kinds. Empty accepts anything.
    pub accepted: Vec<DataKind>,
    /// The node can run with nothing connected here.
    pub optional: bool,
    /// More than one connection may share this port.
    pub repeatable: bool,
}

impl InputPortSpec {
    /// A required, single-connection port accepting any kind.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            accepted: Vec::new(),
            optional: false,
            repeatable: false,
        }
    }

    /// Restricts the accepted kinds.
    pub fn accepting(mut self, kinds: &[DataKind]) -> Self {
        self.accepted = kinds.to_vec();
        self
    }

    /// Marks the port optional.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Marks the port repeatable.
    pub fn repeatable(mut self) -> Self {
        self.repeatable = true;
        self
    }

    /// Returns `true` if `kind` may be connected here.
    pub fn accepts(&self, kind: DataKind) -> bool {
        self.accepted.is_empty() || self.accepted.contains(&kind)
    }
}

/// What an output port produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducedKind {
    /// Always this kind.
    Fixed(DataKind),
    /// Whatever arrives on the given input port's first connection.
    SameAsInput(usize),
}

/// Declaration of one output port.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputPortSpec {
    /// Port name, for diagnostics.
    pub name: &'static str,
    /// Produced kind.
    pub produced: ProducedKind,
}

impl OutputPortSpec {
    /// An output that always produces `kind`.
    pub fn new(name: &'static str, kind: DataKind) -> Self {
        Self {
            name,
            produced: ProducedKind::Fixed(kind),
        }
    }

    /// An output whose kind mirrors input `port`.
    pub fn same_as_input(name: &'static str, port: usize) -> Self {
        Self {
            name,
            produced: ProducedKind::SameAsInput(port),
        }
    }
}

/// Optional capability flags a node advertises to the executive.
///
/// Flags combine with `|` or [`union`](Self::union). `PIECES`,
/// `SUB_EXTENT` and `CONTINUE_EXECUTING` change how the executive drives
/// the node. `GHOST_LEVELS` and `TIME` are descriptive: ghost and time
/// requests reach every node either way, and consumers may inspect the
/// flags through [`Pipeline::capabilities`](crate::Pipeline::capabilities).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Capabilities(u8);

impl Capabilities {
    /// No optional capabilities.
    pub const NONE: Self = Self(0);
    /// Honours piece requests.
    pub const PIECES: Self = Self(1 << 0);
    /// Produces the requested number of ghost levels.
    pub const GHOST_LEVELS: Self = Self(1 << 1);
    /// Understands time requests.
    pub const TIME: Self = Self(1 << 2);
    /// May return [`Execution::Continue`](crate::Execution::Continue). Without
    /// it a continue fails the update.
    pub const CONTINUE_EXECUTING: Self = Self(1 << 3);
    /// Computes only the executive-translated sub-extent of a piece request.
    pub const SUB_EXTENT: Self = Self(1 << 4);

    /// Returns `true` if all flags in `other` are set.
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Union of two flag sets.
    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Raw bits.
    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for Capabilities {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_any_when_unrestricted() {
        let port = InputPortSpec::new("input");
        assert!(port.accepts(DataKind::Graph));
        let port = port.accepting(&[DataKind::Table]);
        assert!(port.accepts(DataKind::Table));
        assert!(!port.accepts(DataKind::ImageData));
    }

    #[test]
    fn test_builder_flags() {
        let port = InputPortSpec::new("inputs").repeatable().optional();
        assert!(port.repeatable);
        assert!(port.optional);
    }

    #[test]
    fn test_capabilities() {
        let caps = Capabilities::PIECES | Capabilities::TIME;
        assert!(caps.contains(Capabilities::PIECES));
        assert!(caps.contains(Capabilities::PIECES.union(Capabilities::TIME)));
        assert!(!caps.contains(Capabilities::SUB_EXTENT));
        assert!(caps.contains(Capabilities::NONE));
    }
}
