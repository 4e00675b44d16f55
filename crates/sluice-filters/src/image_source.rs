//! Synthetic structured-grid source.

#[cfg(not(feature = "std"))]
use alloc::{format, string::String, vec, vec::Vec};

use sluice_core::{
    Algorithm, Capabilities, DataKind, DataRequest, Execution, Extent, InformationRequest,
    InputPortSpec, Key, NodeError, OutputPortSpec,
};

use crate::image::ImageBlock;
use crate::params;

/// Cell value formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pattern {
    /// Linear cell index within the whole extent, plus the time.
    #[default]
    Index,
    /// `sin(0.5 i + 0.3 j + 0.2 k + t)`.
    Wave,
}

impl Pattern {
    /// Parameter spelling.
    pub const fn name(self) -> &'static str {
        match self {
            Pattern::Index => "index",
            Pattern::Wave => "wave",
        }
    }
}

/// Generates an `ImageData` block over any requested sub-extent.
///
/// Values depend only on the global cell index and the time, so pieces
/// computed separately agree with the whole image on every shared cell.
///
/// ## Parameters
///
/// - `whole_extent`: full index range (default `"0 9 0 9 0 0"`)
/// - `time_steps`: comma separated discrete times (default none)
/// - `time_range`: `lo,hi` continuous time range when there are no steps
/// - `pattern`: `index` or `wave`
/// - `scale`: multiplier applied to every value (default 1.0)
///
/// `executions` reads back how many times the compute step ran.
#[derive(Debug, Clone)]
pub struct ImageSource {
    whole_extent: Extent,
    time_steps: Vec<f64>,
    time_range: Option<[f64; 2]>,
    pattern: Pattern,
    scale: f64,
    executions: u32,
}

impl Default for ImageSource {
    fn default() -> Self {
        Self::new(Extent::new(0, 9, 0, 9, 0, 0))
    }
}

impl ImageSource {
    /// Source over `whole_extent` without time.
    pub fn new(whole_extent: Extent) -> Self {
        Self {
            whole_extent,
            time_steps: Vec::new(),
            time_range: None,
            pattern: Pattern::Index,
            scale: 1.0,
            executions: 0,
        }
    }

    /// Advertises discrete time steps. They must be sorted ascending.
    pub fn with_time_steps(mut self, steps: &[f64]) -> Self {
        self.time_steps = steps.to_vec();
        self
    }

    /// Advertises a continuous time range.
    pub fn with_time_range(mut self, lo: f64, hi: f64) -> Self {
        self.time_range = Some([lo, hi]);
        self
    }

    /// Selects the value formula.
    pub fn with_pattern(mut self, pattern: Pattern) -> Self {
        self.pattern = pattern;
        self
    }

    /// Full index range.
    pub fn whole_extent(&self) -> Extent {
        self.whole_extent
    }

    /// Sets the full index range.
    pub fn set_whole_extent(&mut self, extent: Extent) {
        self.whole_extent = extent;
    }

    /// Number of completed compute steps.
    pub fn executions(&self) -> u32 {
        self.executions
    }

    /// Value of cell `(i, j, k)` at time `t`.
    pub fn value_at(&self, i: i32, j: i32, k: i32, t: f64) -> f64 {
        let raw = match self.pattern {
            Pattern::Index => {
                let [nx, ny, _] = self.whole_extent.dims();
                let w = &self.whole_extent.0;
                let di = f64::from(i - w[0]);
                let dj = f64::from(j - w[2]);
                let dk = f64::from(k - w[4]);
                di + nx as f64 * (dj + ny as f64 * dk) + t
            }
            Pattern::Wave => {
                libm::sin(0.5 * f64::from(i) + 0.3 * f64::from(j) + 0.2 * f64::from(k) + t)
            }
        };
        self.scale * raw
    }

    fn time_aware(&self) -> bool {
        !self.time_steps.is_empty() || self.time_range.is_some()
    }

    fn default_time(&self) -> f64 {
        self.time_steps
            .first()
            .copied()
            .or(self.time_range.map(|r| r[0]))
            .unwrap_or(0.0)
    }
}

impl Algorithm for ImageSource {
    fn name(&self) -> &str {
        "image_source"
    }

    fn input_ports(&self) -> Vec<InputPortSpec> {
        Vec::new()
    }

    fn output_ports(&self) -> Vec<OutputPortSpec> {
        vec![OutputPortSpec::new("image", DataKind::ImageData)]
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::PIECES | Capabilities::GHOST_LEVELS | Capabilities::SUB_EXTENT | Capabilities::TIME
    }

    fn set_parameter(&mut self, name: &str, value: &str) -> Result<(), NodeError> {
        let node = self.name();
        match name {
            "whole_extent" => self.whole_extent = params::parse_extent(node, name, value)?,
            "time_steps" => self.time_steps = params::parse_time_steps(node, name, value)?,
            "time_range" => self.time_range = params::parse_range(node, name, value)?,
            "pattern" => {
                self.pattern = match value.trim() {
                    "index" => Pattern::Index,
                    "wave" => Pattern::Wave,
                    _ => {
                        return Err(NodeError::parameter(format!(
                            "{node}: unknown pattern '{value}', expected index or wave"
                        )));
                    }
                }
            }
            "scale" => self.scale = params::parse_f64(node, name, value)?,
            _ => return Err(params::unknown(node, name)),
        }
        Ok(())
    }

    fn parameter(&self, name: &str) -> Option<String> {
        match name {
            "whole_extent" => Some(params::format_extent(&self.whole_extent)),
            "time_steps" => Some(params::format_list(&self.time_steps)),
            "time_range" => Some(self.time_range.map(|r| params::format_list(&r)).unwrap_or_default()),
            "pattern" => Some(String::from(self.pattern.name())),
            "scale" => Some(format!("{}", self.scale)),
            "executions" => Some(format!("{}", self.executions)),
            _ => None,
        }
    }

    fn request_information(&mut self, req: &mut InformationRequest) -> Result<(), NodeError> {
        if self.whole_extent.is_empty() {
            return Err(NodeError::negotiation("image_source: whole extent is empty"));
        }
        let out = req.output_mut(0);
        out.set(Key::WholeExtent, self.whole_extent);
        if let (Some(&first), Some(&last)) = (self.time_steps.first(), self.time_steps.last()) {
            out.set(Key::TimeSteps, self.time_steps.clone());
            out.set(Key::TimeRange, [first, last]);
        } else if let Some(range) = self.time_range {
            out.set(Key::TimeRange, range);
        }
        Ok(())
    }

    fn request_data(&mut self, req: &mut DataRequest<'_>) -> Result<Execution, NodeError> {
        let request = req.output_request(0);
        let extent = request
            .extent(Key::UpdateExtent)
            .unwrap_or(self.whole_extent)
            .intersection(&self.whole_extent);
        let time = request
            .double(Key::UpdateTimeStep)
            .unwrap_or_else(|| self.default_time());

        let mut block = ImageBlock::new(extent, 0.0);
        if !extent.is_empty() {
            let e = extent.0;
            let slices = f64::from(e[5] - e[4] + 1);
            'slices: for k in e[4]..=e[5] {
                for j in e[2]..=e[3] {
                    if req.abort_requested() {
                        break 'slices;
                    }
                    for i in e[0]..=e[1] {
                        block.set(i, j, k, self.value_at(i, j, k, time));
                    }
                }
                req.update_progress(f64::from(k - e[4] + 1) / slices);
            }
        }

        let time_aware = self.time_aware();
        let Some(output) = req.output_mut(0) else {
            return Err(NodeError::compute("image_source: output missing"));
        };
        output.info_mut().set(Key::DataExtent, extent);
        if time_aware {
            output.info_mut().set(Key::DataTimeStep, time);
        }
        output.set_croppable_payload(block);
        self.executions += 1;
        Ok(Execution::Done)
    }
}
