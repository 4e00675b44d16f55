//! Sluice Filters - Reference nodes for sluice pipelines
//!
//! This crate provides sources, filters and sinks built on sluice-core:
//!
//! - [`ImageSource`] - Synthetic structured grid, any sub-extent, optional time
//! - [`TableSource`] - Synthetic table split into row pieces
//! - [`BoxSmooth`] - Box average that widens its request by the box radius
//! - [`Append`] - Fan-in merge of tables or image blocks
//! - [`Group`] - Fan-in that collects its inputs into one multi-block
//! - [`ForceTime`] - Pins upstream time, caching through a continue loop
//! - [`ImageStreamer`] - Pulls its output from upstream one division at a time
//! - [`TemporalDifference`] - Subtracts an earlier time step of the same image
//! - [`PassThrough`] - Identity filter that forwards custom metadata
//! - [`Probe`] - Sink recording a summary of every input (requires `std`)
//!
//! Image objects carry an [`ImageBlock`] payload, table objects a [`Table`].
//! Single-connection filters fed a multi-block run once per block.
//!
//! ## Example
//!
//! ```rust,ignore
//! use sluice_core::{Extent, Pipeline, UpdateRequest};
//! use sluice_filters::{BoxSmooth, ImageSource, Probe};
//!
//! let mut pipeline = Pipeline::new();
//! let src = pipeline.add(ImageSource::new(Extent::new_2d(0, 63, 0, 63)));
//! let smooth = pipeline.add(BoxSmooth::new(2));
//! let probe = Probe::new();
//! let log = probe.log();
//! let sink = pipeline.add(probe);
//! pipeline.connect_default(src, smooth)?;
//! pipeline.connect_default(smooth, sink)?;
//!
//! // Piece 1 of 4; the source is asked for two ghost levels.
//! pipeline.update_with(sink, &UpdateRequest::new().with_piece(1, 4))?;
//! println!("{:?}", log.last());
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod append;
pub mod box_smooth;
pub mod force_time;
pub mod group;
pub mod image;
pub mod image_source;
pub mod image_streamer;
pub mod params;
pub mod pass_through;
#[cfg(feature = "std")]
pub mod probe;
pub mod table;
pub mod table_source;
pub mod temporal_difference;

// Re-export main types at crate root
pub use append::Append;
pub use box_smooth::BoxSmooth;
pub use force_time::ForceTime;
pub use group::Group;
pub use image::ImageBlock;
pub use image_source::{ImageSource, Pattern};
pub use image_streamer::ImageStreamer;
pub use pass_through::PassThrough;
#[cfg(feature = "std")]
pub use probe::{Probe, ProbeLog, ProbeRecord, summarize};
pub use table::Table;
pub use table_source::TableSource;
pub use temporal_difference::TemporalDifference;
