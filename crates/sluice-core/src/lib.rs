//! Sluice Core - demand-driven pipeline executive
//!
//! This crate schedules a DAG of data-processing nodes on demand: a consumer
//! asks for a piece, extent or time step of its output, and only the work
//! needed to produce exactly that runs upstream.
//!
//! # Core Abstractions
//!
//! ## Node Contract
//!
//! - [`Algorithm`] - Object-safe trait every node implements
//! - [`InputPortSpec`] / [`OutputPortSpec`] - Port declarations
//! - [`Capabilities`] - Optional features a node advertises
//! - [`Execution`] - `Done` or `Continue` after a compute step
//!
//! ## Metadata
//!
//! - [`Information`] - Keyed store of typed values attached to ports and data
//! - [`Key`] / [`Value`] - The closed key set and its value types
//! - [`DataObject`] - Opaque payload with its own metadata
//!
//! ## Scheduling
//!
//! - [`Pipeline`] - Topology plus the four-phase executive
//! - [`UpdateRequest`] - Piece, extent, ghost levels and time a caller wants
//! - [`UpdateReport`] - What ran, what was skipped, and every warning
//!
//! ## Negotiation
//!
//! - [`ExtentTranslator`] - Piece number to sub-extent, with ghost growth
//! - [`TimeNegotiator`] - Time-step snapping with a forced override
//!
//! # no_std Support
//!
//! The crate is `no_std` compatible with `alloc`. Disable the default `std`
//! feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! sluice-core = { version = "0.1", default-features = false }
//! ```
//!
//! # Logging
//!
//! Enable the `tracing` feature to emit phase transitions, skips, clamps and
//! continue iterations through the `tracing` crate.
//!
//! # Design Principles
//!
//! - **Pull, never push**: editing the graph never executes anything
//! - **Snapshots in, builders out**: a phase reads immutable input metadata
//!   and writes a builder the executive commits
//! - **Clamp and warn**: out-of-range requests are corrected, not rejected
//! - **No globals**: all per-update state lives in one context value

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod algorithm;
pub mod context;
pub mod data;
pub mod extent;
pub mod info;
pub mod pipeline;
pub mod port;
pub mod time;
pub mod translator;

// Re-export main types at crate root
pub use algorithm::{
    Algorithm, DataObjectRequest, DataRequest, Execution, InformationRequest, NodeError,
    NodeFamily, PhaseRequest, UpdateExtentRequest,
};
pub use context::{AbortHandle, PhaseCounts, PhaseEvent, PhaseState, ProgressObserver, UpdateReport};
pub use data::{Crop, DataHandle, DataKind, DataObject, MultiBlock};
pub use extent::{Extent, ParseExtentError};
pub use info::{Information, Key, Value};
pub use pipeline::{
    DEFAULT_MAX_CONTINUE_ITERATIONS, Edge, EdgeId, ExecutiveOptions, NodeId, Pipeline,
    PipelineError, UpdateRequest,
};
pub use port::{Capabilities, InputPortSpec, OutputPortSpec, ProducedKind};
pub use time::{
    ParseTimeSnapError, Resolution, Snapped, TimeNegotiator, TimeSnap, clamp_to_range, resolve,
    snap,
};
pub use translator::{
    ExtentTranslator, ParseSplitModeError, PieceRequest, SplitMode, piece_extent, split_extent,
};
