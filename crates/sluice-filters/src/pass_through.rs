//! Identity filter.

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

use sluice_core::{
    Algorithm, Capabilities, DataRequest, Execution, InformationRequest, InputPortSpec, NodeError,
    OutputPortSpec,
};

/// Shares its input unchanged, forwarding custom metadata keys as well.
///
/// Useful as a named tap point and for exercising request propagation.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl PassThrough {
    /// Creates the filter.
    pub fn new() -> Self {
        Self
    }
}

impl Algorithm for PassThrough {
    fn name(&self) -> &str {
        "pass_through"
    }

    fn input_ports(&self) -> Vec<InputPortSpec> {
        vec![InputPortSpec::new("input")]
    }

    fn output_ports(&self) -> Vec<OutputPortSpec> {
        vec![OutputPortSpec::same_as_input("output", 0)]
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::PIECES | Capabilities::GHOST_LEVELS | Capabilities::TIME
    }

    fn request_information(&mut self, req: &mut InformationRequest) -> Result<(), NodeError> {
        if let Some(input) = req.input(0, 0).cloned() {
            req.output_mut(0).forward_custom(&input);
        }
        Ok(())
    }

    fn request_data(&mut self, req: &mut DataRequest<'_>) -> Result<Execution, NodeError> {
        let Some(input) = req.input(0, 0).cloned() else {
            return Err(NodeError::compute("pass_through: no input"));
        };
        let Some(output) = req.output_mut(0) else {
            return Err(NodeError::compute("pass_through: output missing"));
        };
        output.shallow_copy(&input);
        Ok(Execution::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_core::{DataKind, Extent, Information, Key, Pipeline, UpdateRequest};

    struct Tagged;

    impl Algorithm for Tagged {
        fn name(&self) -> &str {
            "tagged"
        }
        fn input_ports(&self) -> Vec<InputPortSpec> {
            Vec::new()
        }
        fn output_ports(&self) -> Vec<OutputPortSpec> {
            vec![OutputPortSpec::new("out", DataKind::Generic)]
        }
        fn request_information(&mut self, req: &mut InformationRequest) -> Result<(), NodeError> {
            req.output_mut(0).set(Key::Custom("UNITS"), "kelvin");
            req.output_mut(0).set(Key::WholeExtent, Extent::new_2d(0, 3, 0, 3));
            Ok(())
        }
        fn request_data(&mut self, req: &mut DataRequest<'_>) -> Result<Execution, NodeError> {
            if let Some(out) = req.output_mut(0) {
                out.set_payload(42u32);
            }
            Ok(Execution::Done)
        }
    }

    #[test]
    fn test_forwards_custom_keys_and_shares_payload() {
        let mut p = Pipeline::new();
        let src = p.add(Tagged);
        let pass = p.add(PassThrough::new());
        p.connect_default(src, pass).unwrap();
        p.update_with(pass, &UpdateRequest::new().with_extent(Extent::new_2d(0, 1, 0, 1)))
            .unwrap();

        let info: &Information = p.output_information(pass, 0).unwrap();
        assert_eq!(info.string(Key::Custom("UNITS")), Some("kelvin"));
        let a = p.output_data(src, 0).unwrap();
        let b = p.output_data(pass, 0).unwrap();
        assert!(a.shares_payload_with(&b));
        assert_eq!(b.payload::<u32>(), Some(&42));
        assert_eq!(
            p.output_request(src, 0).unwrap().extent(Key::UpdateExtent),
            Some(Extent::new_2d(0, 1, 0, 1))
        );
    }
}
