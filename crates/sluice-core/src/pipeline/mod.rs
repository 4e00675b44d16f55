//! Pipeline graph and demand-driven executive.
//!
//! A [`Pipeline`] owns a DAG of [`Algorithm`](crate::Algorithm) nodes joined
//! output port to input port. Nothing executes when the graph is edited;
//! work happens only when a caller pulls a node with
//! [`update()`](Pipeline::update) or [`update_with()`](Pipeline::update_with).
//!
//! # Architecture
//!
//! - [`Pipeline`] holds topology, per-port metadata, negotiated requests and
//!   the data objects themselves. Node and edge IDs are stable slot indices.
//! - The executive (an `impl Pipeline` block) walks the subgraph feeding the
//!   pulled node in four sweeps: information, request, update extent, data.
//!   See the `executive` module source for the order of operations.
//!
//! # Staleness
//!
//! Every mutation stamps the node with a value from one monotonic clock. A
//! node's pipeline time is the newest stamp among itself and everything
//! upstream. Metadata is re-derived only when it is older than the pipeline
//! time; data is recomputed only when it is older, or when the held piece,
//! extent, ghost level or time no longer covers the request.
//!
//! # Example
//!
//! ```rust,ignore
//! use sluice_core::pipeline::{Pipeline, UpdateRequest};
//!
//! let mut pipeline = Pipeline::new();
//! let source = pipeline.add(ImageSource::new(Extent::new_2d(0, 9, 0, 9)));
//! let smooth = pipeline.add(BoxSmooth::new(1));
//! pipeline.connect_default(source, smooth)?;
//!
//! let report = pipeline.update_with(smooth, &UpdateRequest::new().with_piece(2, 4))?;
//! assert!(report.did_execute(source));
//! ```

mod edge;
mod executive;
mod graph;
mod node;

pub use edge::{Edge, EdgeId};
pub use executive::{DEFAULT_MAX_CONTINUE_ITERATIONS, ExecutiveOptions, UpdateRequest};
pub use graph::{Pipeline, PipelineError};
pub use node::NodeId;
