//! Streams an image through its producer in divisions.

#[cfg(not(feature = "std"))]
use alloc::{format, string::String, vec, vec::Vec};

use sluice_core::{
    Algorithm, Capabilities, DataKind, DataRequest, Execution, Extent, ExtentTranslator,
    InputPortSpec, Key, NodeError, OutputPortSpec, PieceRequest, SplitMode, UpdateExtentRequest,
};

use crate::image::ImageBlock;
use crate::params;

/// Pulls its output extent from upstream one division at a time.
///
/// Compute iteration `n` requests division `n` of the output update extent
/// and pastes whatever arrives into an accumulator. The full block is
/// published once the last division is in, so upstream memory stays bounded
/// by one division.
#[derive(Debug, Clone)]
pub struct ImageStreamer {
    divisions: u32,
    translator: ExtentTranslator,
    accumulator: Option<ImageBlock>,
    requested: Vec<Extent>,
}

impl Default for ImageStreamer {
    fn default() -> Self {
        Self::new(4)
    }
}

impl ImageStreamer {
    /// Streamer splitting into `divisions` z-slabs.
    pub fn new(divisions: u32) -> Self {
        Self {
            divisions: divisions.max(1),
            translator: ExtentTranslator::with_mode(SplitMode::ZSlab),
            accumulator: None,
            requested: Vec::new(),
        }
    }

    /// Uses `mode` to cut divisions.
    pub fn with_split_mode(mut self, mode: SplitMode) -> Self {
        self.translator.set_mode(mode);
        self
    }

    /// Number of divisions.
    pub fn divisions(&self) -> u32 {
        self.divisions
    }

    /// Sets the number of divisions; zero means one.
    pub fn set_divisions(&mut self, divisions: u32) {
        self.divisions = divisions.max(1);
    }

    /// Extents requested upstream by the most recent execution, in order.
    pub fn requested_divisions(&self) -> &[Extent] {
        &self.requested
    }

    fn target_extent(output: &sluice_core::Information) -> Extent {
        output
            .extent(Key::UpdateExtent)
            .or_else(|| output.extent(Key::WholeExtent))
            .unwrap_or(Extent::EMPTY)
    }
}

impl Algorithm for ImageStreamer {
    fn name(&self) -> &str {
        "image_streamer"
    }

    fn input_ports(&self) -> Vec<InputPortSpec> {
        vec![InputPortSpec::new("image").accepting(&[DataKind::ImageData])]
    }

    fn output_ports(&self) -> Vec<OutputPortSpec> {
        vec![OutputPortSpec::new("image", DataKind::ImageData)]
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::CONTINUE_EXECUTING | Capabilities::GHOST_LEVELS
    }

    fn set_parameter(&mut self, name: &str, value: &str) -> Result<(), NodeError> {
        let node = self.name();
        match name {
            "divisions" => self.set_divisions(params::parse_u32(node, name, value)?),
            "split_mode" => self.translator.set_mode(params::parse_split_mode(node, name, value)?),
            _ => return Err(params::unknown(node, name)),
        }
        Ok(())
    }

    fn parameter(&self, name: &str) -> Option<String> {
        match name {
            "divisions" => Some(format!("{}", self.divisions)),
            "split_mode" => Some(String::from(self.translator.mode().name())),
            _ => None,
        }
    }

    fn request_update_extent(&mut self, req: &mut UpdateExtentRequest) -> Result<(), NodeError> {
        let target = Self::target_extent(req.output_request(0));
        let iteration = req.iteration();
        if iteration >= self.divisions {
            return Err(NodeError::negotiation(format!(
                "image_streamer: iteration {iteration} past {} divisions",
                self.divisions
            )));
        }
        let division = self
            .translator
            .piece_to_extent(&target, PieceRequest::new(iteration, self.divisions));
        if iteration == 0 {
            self.requested.clear();
        }
        self.requested.push(division);

        let Some(input) = req.input_request_mut(0, 0) else {
            return Ok(());
        };
        input.set(Key::UpdatePieceNumber, 0u32);
        input.set(Key::UpdateNumberOfPieces, 1u32);
        input.set(Key::UpdateExtent, division);
        Ok(())
    }

    fn request_data(&mut self, req: &mut DataRequest<'_>) -> Result<Execution, NodeError> {
        let target = Self::target_extent(req.output_request(0));
        let iteration = req.iteration();
        let Some(input) = req.input(0, 0) else {
            return Err(NodeError::compute("image_streamer: no input"));
        };
        let Some(block) = input.payload::<ImageBlock>() else {
            return Err(NodeError::structural("image_streamer: input carries no image block"));
        };
        let division = self.requested.last().copied().unwrap_or(target);

        if iteration == 0 || self.accumulator.is_none() {
            self.accumulator = Some(ImageBlock::new(target, 0.0));
        }
        if let Some(acc) = self.accumulator.as_mut() {
            acc.paste(&block.crop(&division));
        }
        req.update_progress(f64::from(iteration + 1) / f64::from(self.divisions));

        if iteration + 1 < self.divisions && !req.abort_requested() {
            return Ok(Execution::Continue);
        }
        let Some(full) = self.accumulator.take() else {
            return Err(NodeError::compute("image_streamer: accumulator missing"));
        };
        let Some(output) = req.output_mut(0) else {
            return Err(NodeError::compute("image_streamer: output missing"));
        };
        output.info_mut().set(Key::DataExtent, full.extent());
        output.set_croppable_payload(full);
        Ok(Execution::Done)
    }
}
