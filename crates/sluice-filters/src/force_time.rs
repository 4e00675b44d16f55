//! Pins upstream time to a fixed value.

#[cfg(not(feature = "std"))]
use alloc::{format, string::String, vec, vec::Vec};

use sluice_core::{
    Algorithm, Capabilities, DataHandle, DataRequest, Execution, InformationRequest,
    InputPortSpec, Key, NodeError, OutputPortSpec, TimeNegotiator, TimeSnap, UpdateExtentRequest,
};

use crate::params;

/// Serves upstream data at `forced_time` whatever time is requested downstream.
///
/// While forcing, the output advertises no time steps: downstream time
/// requests neither clamp nor re-execute it. Each execution runs two
/// compute iterations. The first pulls the upstream at the forced time and
/// caches the result; the second restores the downstream time on the input,
/// so shared producers are left at the pipeline time, and publishes the
/// cache.
///
/// With `ignore_pipeline_time` off the node passes its input through.
#[derive(Debug, Clone)]
pub struct ForceTime {
    negotiator: TimeNegotiator,
    forced_time: f64,
    ignore_pipeline_time: bool,
    cache: Option<DataHandle>,
    invalidations: u32,
}

impl Default for ForceTime {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl ForceTime {
    /// Forces `time`.
    pub fn new(time: f64) -> Self {
        let mut negotiator = TimeNegotiator::new(TimeSnap::Nearest);
        negotiator.force(time);
        Self {
            negotiator,
            forced_time: time,
            ignore_pipeline_time: true,
            cache: None,
            invalidations: 0,
        }
    }

    /// Forced time.
    pub fn forced_time(&self) -> f64 {
        self.forced_time
    }

    /// Sets the forced time.
    pub fn set_forced_time(&mut self, time: f64) {
        self.forced_time = time;
        if self.ignore_pipeline_time {
            self.negotiator.force(time);
        }
    }

    /// Returns `true` while the pipeline time is ignored.
    pub fn ignores_pipeline_time(&self) -> bool {
        self.ignore_pipeline_time
    }

    /// Turns forcing on or off.
    pub fn set_ignore_pipeline_time(&mut self, ignore: bool) {
        self.ignore_pipeline_time = ignore;
        if ignore {
            self.negotiator.force(self.forced_time);
        } else {
            self.negotiator.release();
        }
    }

    /// Cached upstream result, if one was built.
    pub fn cached(&self) -> Option<&DataHandle> {
        self.cache.as_ref()
    }

    /// How often a change of forcing state discarded the cache.
    pub fn invalidations(&self) -> u32 {
        self.invalidations
    }
}

impl Algorithm for ForceTime {
    fn name(&self) -> &str {
        "force_time"
    }

    fn input_ports(&self) -> Vec<InputPortSpec> {
        vec![InputPortSpec::new("input")]
    }

    fn output_ports(&self) -> Vec<OutputPortSpec> {
        vec![OutputPortSpec::same_as_input("output", 0)]
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::TIME | Capabilities::CONTINUE_EXECUTING
    }

    fn set_parameter(&mut self, name: &str, value: &str) -> Result<(), NodeError> {
        let node = self.name();
        match name {
            "forced_time" => {
                let time = params::parse_f64(node, name, value)?;
                self.set_forced_time(time);
            }
            "ignore_pipeline_time" => {
                let ignore = params::parse_bool(node, name, value)?;
                self.set_ignore_pipeline_time(ignore);
            }
            _ => return Err(params::unknown(node, name)),
        }
        Ok(())
    }

    fn parameter(&self, name: &str) -> Option<String> {
        match name {
            "forced_time" => Some(format!("{}", self.forced_time)),
            "ignore_pipeline_time" => Some(format!("{}", self.ignore_pipeline_time)),
            "invalidations" => Some(format!("{}", self.invalidations)),
            "cached_time" => self
                .cache
                .as_ref()
                .and_then(|c| c.info().double(Key::DataTimeStep))
                .map(|t| format!("{t}")),
            _ => None,
        }
    }

    fn request_information(&mut self, req: &mut InformationRequest) -> Result<(), NodeError> {
        if self.ignore_pipeline_time {
            let out = req.output_mut(0);
            out.remove(Key::TimeSteps);
            out.remove(Key::TimeRange);
        }
        Ok(())
    }

    fn request_update_extent(&mut self, req: &mut UpdateExtentRequest) -> Result<(), NodeError> {
        let requested = req.output_request(0).double(Key::UpdateTimeStep);
        let steps: Vec<f64> = req
            .input_information(0, 0)
            .and_then(|info| info.doubles(Key::TimeSteps))
            .map(<[f64]>::to_vec)
            .unwrap_or_default();
        let iteration = req.iteration();

        let time = if iteration == 0 || !self.ignore_pipeline_time {
            let resolution = self.negotiator.negotiate(requested, &steps);
            if resolution.invalidated {
                self.invalidations += 1;
                self.cache = None;
            }
            resolution.time
        } else {
            requested
        };

        let Some(input) = req.input_request_mut(0, 0) else {
            return Ok(());
        };
        match time {
            Some(t) => input.set(Key::UpdateTimeStep, t),
            None => {
                input.remove(Key::UpdateTimeStep);
            }
        }
        Ok(())
    }

    fn request_data(&mut self, req: &mut DataRequest<'_>) -> Result<Execution, NodeError> {
        let Some(input) = req.input(0, 0).cloned() else {
            return Err(NodeError::compute("force_time: no input"));
        };

        let (published, execution) = if !self.ignore_pipeline_time {
            (input, Execution::Done)
        } else if req.iteration() == 0 {
            self.cache = Some(DataHandle::clone(&input));
            (input, Execution::Continue)
        } else {
            let Some(cache) = self.cache.clone() else {
                return Err(NodeError::compute("force_time: no cached result to publish"));
            };
            (cache, Execution::Done)
        };

        let Some(output) = req.output_mut(0) else {
            return Err(NodeError::compute("force_time: output missing"));
        };
        output.shallow_copy(&published);
        Ok(execution)
    }
}
