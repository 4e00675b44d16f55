//! Difference between an image and an earlier time step of itself.

#[cfg(not(feature = "std"))]
use alloc::{format, string::String, vec, vec::Vec};

use sluice_core::{
    Algorithm, Capabilities, DataKind, DataRequest, Execution, InputPortSpec, Key, NodeError,
    OutputPortSpec, TimeSnap, UpdateExtentRequest, time,
};

use crate::image::{ImageBlock, for_each_index_in};
use crate::params;

/// Outputs `image(t) - image(t - lag steps)`.
///
/// Two compute iterations per execution: the first pulls time `t` and keeps
/// it, the second pulls the step `lag` places earlier (clamped to the first
/// step) and subtracts. Cells present in only one block are left out.
#[derive(Debug, Clone)]
pub struct TemporalDifference {
    lag: u32,
    current: Option<ImageBlock>,
}

impl Default for TemporalDifference {
    fn default() -> Self {
        Self::new(1)
    }
}

impl TemporalDifference {
    /// Difference against the step `lag` places back.
    pub fn new(lag: u32) -> Self {
        Self { lag, current: None }
    }

    /// Step distance.
    pub fn lag(&self) -> u32 {
        self.lag
    }

    /// Sets the step distance.
    pub fn set_lag(&mut self, lag: u32) {
        self.lag = lag;
    }

    /// Step `lag` places before `t`, or `t` itself without steps.
    pub fn earlier_step(&self, t: f64, steps: &[f64]) -> f64 {
        let snapped = time::resolve(t, steps, TimeSnap::Nearest);
        match steps.iter().position(|&s| s == snapped) {
            Some(index) => steps[index.saturating_sub(self.lag as usize)],
            None => t,
        }
    }
}

impl Algorithm for TemporalDifference {
    fn name(&self) -> &str {
        "temporal_difference"
    }

    fn input_ports(&self) -> Vec<InputPortSpec> {
        vec![InputPortSpec::new("image").accepting(&[DataKind::ImageData])]
    }

    fn output_ports(&self) -> Vec<OutputPortSpec> {
        vec![OutputPortSpec::new("difference", DataKind::ImageData)]
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::TIME | Capabilities::CONTINUE_EXECUTING
    }

    fn set_parameter(&mut self, name: &str, value: &str) -> Result<(), NodeError> {
        match name {
            "lag" => self.lag = params::parse_u32(self.name(), name, value)?,
            _ => return Err(params::unknown(self.name(), name)),
        }
        Ok(())
    }

    fn parameter(&self, name: &str) -> Option<String> {
        match name {
            "lag" => Some(format!("{}", self.lag)),
            _ => None,
        }
    }

    fn request_update_extent(&mut self, req: &mut UpdateExtentRequest) -> Result<(), NodeError> {
        let steps: Vec<f64> = req
            .input_information(0, 0)
            .and_then(|info| info.doubles(Key::TimeSteps))
            .map(<[f64]>::to_vec)
            .unwrap_or_default();
        let Some(&first) = steps.first() else {
            return Err(NodeError::negotiation(
                "temporal_difference: input advertises no time steps",
            ));
        };
        let t = req.output_request(0).double(Key::UpdateTimeStep).unwrap_or(first);
        let wanted = if req.iteration() == 0 { t } else { self.earlier_step(t, &steps) };
        if let Some(input) = req.input_request_mut(0, 0) {
            input.set(Key::UpdateTimeStep, wanted);
        }
        Ok(())
    }

    fn request_data(&mut self, req: &mut DataRequest<'_>) -> Result<Execution, NodeError> {
        let Some(input) = req.input(0, 0) else {
            return Err(NodeError::compute("temporal_difference: no input"));
        };
        let Some(block) = input.payload::<ImageBlock>() else {
            return Err(NodeError::structural(
                "temporal_difference: input carries no image block",
            ));
        };

        if req.iteration() == 0 {
            self.current = Some(block.clone());
            return Ok(Execution::Continue);
        }
        let Some(current) = self.current.take() else {
            return Err(NodeError::compute("temporal_difference: current step missing"));
        };
        let region = current.extent().intersection(&block.extent());
        let mut diff = ImageBlock::new(region, 0.0);
        for_each_index_in(&region, |i, j, k| {
            if let (Some(a), Some(b)) = (current.get(i, j, k), block.get(i, j, k)) {
                diff.set(i, j, k, a - b);
            }
        });

        let t = req
            .output_request(0)
            .double(Key::UpdateTimeStep)
            .or_else(|| req.input_request(0, 0).and_then(|r| r.double(Key::UpdateTimeStep)));
        let Some(output) = req.output_mut(0) else {
            return Err(NodeError::compute("temporal_difference: output missing"));
        };
        let info = output.info_mut();
        info.set(Key::DataExtent, region);
        if let Some(t) = t {
            info.set(Key::DataTimeStep, t);
        }
        output.set_croppable_payload(diff);
        Ok(Execution::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ImageSource;
    use sluice_core::{Extent, Pipeline, UpdateRequest};

    #[test]
    fn test_earlier_step() {
        let node = TemporalDifference::new(2);
        let steps = [0.0, 1.0, 2.0, 3.0];
        assert_eq!(node.earlier_step(3.0, &steps), 1.0);
        assert_eq!(node.earlier_step(1.0, &steps), 0.0);
        assert_eq!(node.earlier_step(1.2, &[]), 1.2);
    }

    #[test]
    fn test_difference_of_index_pattern_is_time_delta() {
        let mut p = Pipeline::new();
        let src = p.add(
            ImageSource::new(Extent::new_2d(0, 2, 0, 2)).with_time_steps(&[0.0, 1.0, 3.0]),
        );
        let diff = p.add(TemporalDifference::new(1));
        p.connect_default(src, diff).unwrap();

        let report = p.update_with(diff, &UpdateRequest::new().with_time(3.0)).unwrap();
        assert_eq!(report.continue_iterations, 1);
        let out = p.output_data(diff, 0).unwrap();
        assert_eq!(out.info().double(Key::DataTimeStep), Some(3.0));
        let block = out.payload::<ImageBlock>().unwrap();
        assert_eq!(block.len(), 9);
        assert!(block.values().iter().all(|&v| v == 2.0));
    }

    #[test]
    fn test_requires_time_steps() {
        let mut p = Pipeline::new();
        let src = p.add(ImageSource::new(Extent::new_2d(0, 2, 0, 2)));
        let diff = p.add(TemporalDifference::default());
        p.connect_default(src, diff).unwrap();
        assert!(p.update(diff).is_err());
    }
}
