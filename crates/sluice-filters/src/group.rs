//! Fan-in node that collects its inputs into one multi-block object.

#[cfg(not(feature = "std"))]
use alloc::{sync::Arc, vec, vec::Vec};
#[cfg(feature = "std")]
use std::sync::Arc;

use sluice_core::{
    Algorithm, DataKind, DataRequest, Execution, InformationRequest, InputPortSpec, Key,
    MultiBlock, NodeError, OutputPortSpec, UpdateExtentRequest,
};

/// Publishes every connection on its input as one block of a
/// [`MultiBlock`], in connection order.
///
/// Blocks share their producers' payloads. Each producer is asked for its
/// whole extent as a single piece, so downstream nodes that iterate over
/// the blocks see complete data.
#[derive(Debug, Clone, Copy, Default)]
pub struct Group;

impl Group {
    /// Creates the node.
    pub fn new() -> Self {
        Self
    }
}

impl Algorithm for Group {
    fn name(&self) -> &str {
        "group"
    }

    fn input_ports(&self) -> Vec<InputPortSpec> {
        vec![InputPortSpec::new("blocks").repeatable()]
    }

    fn output_ports(&self) -> Vec<OutputPortSpec> {
        vec![OutputPortSpec::new("multiblock", DataKind::MultiBlock)]
    }

    fn request_information(&mut self, req: &mut InformationRequest) -> Result<(), NodeError> {
        // Blocks keep their own extents; the composite has none.
        req.output_mut(0).remove(Key::WholeExtent);
        Ok(())
    }

    fn request_update_extent(&mut self, req: &mut UpdateExtentRequest) -> Result<(), NodeError> {
        for conn in 0..req.connection_count(0) {
            let whole = req
                .input_information(0, conn)
                .and_then(|info| info.extent(Key::WholeExtent));
            let Some(input) = req.input_request_mut(0, conn) else {
                continue;
            };
            input.set(Key::UpdatePieceNumber, 0u32);
            input.set(Key::UpdateNumberOfPieces, 1u32);
            input.remove(Key::ExactExtent);
            match whole {
                Some(whole) => input.set(Key::UpdateExtent, whole),
                None => {
                    input.remove(Key::UpdateExtent);
                }
            }
        }
        Ok(())
    }

    fn request_data(&mut self, req: &mut DataRequest<'_>) -> Result<Execution, NodeError> {
        let mut blocks = MultiBlock::new();
        for input in req.inputs(0) {
            blocks.push(Some(Arc::clone(input)));
        }
        let Some(output) = req.output_mut(0) else {
            return Err(NodeError::compute("group: output missing"));
        };
        output.set_payload(blocks);
        Ok(Execution::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BoxSmooth, ImageBlock, ImageSource, Probe};
    use sluice_core::{Extent, Pipeline, UpdateRequest};

    #[test]
    fn test_groups_connections_in_order() {
        let mut p = Pipeline::new();
        let a = p.add(ImageSource::new(Extent::new_2d(0, 3, 0, 3)));
        let b = p.add(ImageSource::new(Extent::new_2d(0, 1, 0, 1)));
        let group = p.add(Group::new());
        p.connect_default(a, group).unwrap();
        p.connect_default(b, group).unwrap();
        p.update_with(group, &UpdateRequest::new().with_piece(1, 2)).unwrap();

        let out = p.output_data(group, 0).unwrap();
        let blocks = out.payload::<MultiBlock>().unwrap();
        assert_eq!(blocks.len(), 2);
        let first = blocks.block(0).and_then(|d| d.payload::<ImageBlock>()).unwrap();
        assert_eq!(first.extent(), Extent::new_2d(0, 3, 0, 3));
        assert!(blocks.block(1).unwrap().shares_payload_with(&p.output_data(b, 0).unwrap()));
        assert!(!p.output_information(group, 0).unwrap().has(Key::WholeExtent));
    }

    #[test]
    fn test_image_filter_smooths_each_block() {
        let mut p = Pipeline::new();
        let a = p.add(ImageSource::new(Extent::new_2d(0, 3, 0, 3)));
        let b = p.add(ImageSource::new(Extent::new_2d(0, 2, 0, 0)));
        let group = p.add(Group::new());
        let smooth = p.add(BoxSmooth::new(1));
        let recorder = Probe::new();
        let log = recorder.log();
        let sink = p.add(recorder);
        p.connect_default(a, group).unwrap();
        p.connect_default(b, group).unwrap();
        p.connect_default(group, smooth).unwrap();
        p.connect_default(smooth, sink).unwrap();
        p.update(sink).unwrap();

        assert_eq!(p.phase_counts(smooth).map(|c| c.data), Some(2));
        let out = p.output_data(smooth, 0).unwrap();
        let blocks = out.payload::<MultiBlock>().unwrap();
        let second = blocks.block(1).and_then(|d| d.payload::<ImageBlock>()).unwrap();
        assert_eq!(second.extent(), Extent::new_2d(0, 2, 0, 0));

        let record = log.last().unwrap();
        assert_eq!(record.kind, DataKind::MultiBlock);
        assert_eq!(record.cells, 16 + 3);

        assert!(p.update(sink).unwrap().executed.is_empty());
    }
}
