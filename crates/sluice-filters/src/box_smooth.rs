//! Box-average image filter.

#[cfg(not(feature = "std"))]
use alloc::{format, string::String, vec, vec::Vec};

use sluice_core::{
    Algorithm, Capabilities, DataKind, DataRequest, Execution, InputPortSpec, Key, NodeError,
    OutputPortSpec, UpdateExtentRequest,
};

use crate::image::{ImageBlock, for_each_index_in};
use crate::params;

/// Replaces every cell by the mean of the `(2r + 1)^3` box around it.
///
/// Neighbours outside the input are left out of the mean. The filter asks
/// its producer for `radius` extra ghost levels in piece mode and for an
/// extent grown by `radius` in extent mode, so results at piece borders
/// match the whole-image result.
#[derive(Debug, Clone)]
pub struct BoxSmooth {
    radius: u32,
}

impl Default for BoxSmooth {
    fn default() -> Self {
        Self::new(1)
    }
}

impl BoxSmooth {
    /// Filter with the given box radius.
    pub fn new(radius: u32) -> Self {
        Self { radius }
    }

    /// Box radius in cells.
    pub fn radius(&self) -> u32 {
        self.radius
    }

    /// Sets the box radius.
    pub fn set_radius(&mut self, radius: u32) {
        self.radius = radius;
    }

    /// Smooths `input` over `region`. Cells of `region` outside `input` are 0.
    pub fn smooth(&self, input: &ImageBlock, region: &sluice_core::Extent) -> ImageBlock {
        let r = self.radius as i32;
        let mut out = ImageBlock::new(*region, 0.0);
        for_each_index_in(region, |i, j, k| {
            if input.get(i, j, k).is_none() {
                return;
            }
            let mut sum = 0.0;
            let mut count = 0u32;
            for dk in -r..=r {
                for dj in -r..=r {
                    for di in -r..=r {
                        if let Some(v) = input.get(i + di, j + dj, k + dk) {
                            sum += v;
                            count += 1;
                        }
                    }
                }
            }
            out.set(i, j, k, sum / f64::from(count));
        });
        out
    }
}

impl Algorithm for BoxSmooth {
    fn name(&self) -> &str {
        "box_smooth"
    }

    fn input_ports(&self) -> Vec<InputPortSpec> {
        vec![InputPortSpec::new("image").accepting(&[DataKind::ImageData])]
    }

    fn output_ports(&self) -> Vec<OutputPortSpec> {
        vec![OutputPortSpec::new("image", DataKind::ImageData)]
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::PIECES | Capabilities::GHOST_LEVELS | Capabilities::SUB_EXTENT
    }

    fn set_parameter(&mut self, name: &str, value: &str) -> Result<(), NodeError> {
        match name {
            "radius" => self.radius = params::parse_u32(self.name(), name, value)?,
            _ => return Err(params::unknown(self.name(), name)),
        }
        Ok(())
    }

    fn parameter(&self, name: &str) -> Option<String> {
        match name {
            "radius" => Some(format!("{}", self.radius)),
            _ => None,
        }
    }

    fn request_update_extent(&mut self, req: &mut UpdateExtentRequest) -> Result<(), NodeError> {
        let output = req.output_request(0);
        let ghost = output.uint(Key::UpdateNumberOfGhostLevels).unwrap_or(0);
        let num_pieces = output.uint(Key::UpdateNumberOfPieces).unwrap_or(1);
        let extent = output.extent(Key::UpdateExtent);
        let exact = output.flag(Key::ExactExtent);
        let whole = req
            .input_information(0, 0)
            .and_then(|info| info.extent(Key::WholeExtent));

        let Some(input) = req.input_request_mut(0, 0) else {
            return Ok(());
        };
        if num_pieces > 1 {
            input.set(Key::UpdateNumberOfGhostLevels, ghost + self.radius);
        } else if let (Some(extent), Some(whole)) = (extent, whole) {
            input.set(Key::UpdateExtent, extent.grow(self.radius, &whole));
        }
        // The grown input never matches the output exactly.
        if exact {
            input.remove(Key::ExactExtent);
        }
        Ok(())
    }

    fn request_data(&mut self, req: &mut DataRequest<'_>) -> Result<Execution, NodeError> {
        let Some(input) = req.input(0, 0) else {
            return Err(NodeError::compute("box_smooth: no input"));
        };
        let Some(block) = input.payload::<ImageBlock>() else {
            return Err(NodeError::structural("box_smooth: input carries no image block"));
        };
        let region = req
            .output_request(0)
            .extent(Key::UpdateExtent)
            .unwrap_or(block.extent())
            .intersection(&block.extent());
        let smoothed = self.smooth(block, &region);

        let Some(output) = req.output_mut(0) else {
            return Err(NodeError::compute("box_smooth: output missing"));
        };
        output.info_mut().set(Key::DataExtent, region);
        output.set_croppable_payload(smoothed);
        Ok(Execution::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ImageSource;
    use sluice_core::{Extent, Pipeline, UpdateRequest};

    #[test]
    fn test_constant_image_unchanged() {
        let input = ImageBlock::new(Extent::new_2d(0, 4, 0, 4), 3.0);
        let out = BoxSmooth::new(2).smooth(&input, &input.extent());
        assert!(out.values().iter().all(|&v| (v - 3.0).abs() < 1e-12));
    }

    #[test]
    fn test_mean_of_neighbours() {
        let input = ImageBlock::from_fn(Extent::new(0, 2, 0, 0, 0, 0), |i, _, _| f64::from(i));
        let out = BoxSmooth::new(1).smooth(&input, &input.extent());
        assert_eq!(out.values(), &[0.5, 1.0, 1.5]);
    }

    #[test]
    fn test_extent_request_grows_input() {
        let mut p = Pipeline::new();
        let src = p.add(ImageSource::new(Extent::new_2d(0, 9, 0, 9)));
        let smooth = p.add(BoxSmooth::new(2));
        p.connect_default(src, smooth).unwrap();
        let window = Extent::new_2d(4, 5, 4, 5);
        p.update_with(smooth, &UpdateRequest::new().with_extent(window)).unwrap();

        let src_data = p.output_data(src, 0).unwrap();
        assert_eq!(
            src_data.info().extent(Key::DataExtent),
            Some(Extent::new_2d(2, 7, 2, 7))
        );
        let out = p.output_data(smooth, 0).unwrap();
        assert_eq!(out.payload::<ImageBlock>().unwrap().extent(), window);
    }

    #[test]
    fn test_pieces_agree_with_whole() {
        let whole = Extent::new_2d(0, 11, 0, 11);

        let mut reference = Pipeline::new();
        let src = reference.add(ImageSource::new(whole));
        let smooth = reference.add(BoxSmooth::new(1));
        reference.connect_default(src, smooth).unwrap();
        reference.update(smooth).unwrap();
        let full = reference.output_data(smooth, 0).unwrap();
        let full = full.payload::<ImageBlock>().unwrap().clone();

        for piece in 0..4 {
            let mut p = Pipeline::new();
            let src = p.add(ImageSource::new(whole));
            let smooth = p.add(BoxSmooth::new(1));
            p.connect_default(src, smooth).unwrap();
            p.update_with(smooth, &UpdateRequest::new().with_piece(piece, 4)).unwrap();
            let part = p.output_data(smooth, 0).unwrap();
            let part = part.payload::<ImageBlock>().unwrap();
            assert!(!part.is_empty());
            part.for_each_index(|i, j, k| {
                assert_eq!(part.get(i, j, k), full.get(i, j, k), "cell ({i},{j},{k})");
            });
        }
    }
}
