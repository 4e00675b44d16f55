//! Fan-in filter that merges every connection on its input.

#[cfg(not(feature = "std"))]
use alloc::{format, string::String, vec, vec::Vec};

use sluice_core::{
    Algorithm, DataKind, DataObjectRequest, DataRequest, Execution, Extent, InformationRequest,
    InputPortSpec, Key, NodeError, OutputPortSpec,
};

use crate::image::ImageBlock;
use crate::params;
use crate::table::Table;

/// Concatenates tables or pastes images from any number of producers.
///
/// Tables are appended in connection order, matching columns by name.
/// Images are pasted onto the union of their extents in connection order,
/// so later connections win where blocks overlap; uncovered cells hold
/// `fill`. All connections must deliver the same kind.
#[derive(Debug, Clone, Default)]
pub struct Append {
    fill: f64,
}

impl Append {
    /// Creates the filter with a fill value of 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Value for image cells no input covers.
    pub fn fill(&self) -> f64 {
        self.fill
    }

    /// Sets the fill value.
    pub fn set_fill(&mut self, fill: f64) {
        self.fill = fill;
    }

    fn append_tables(&self, req: &DataRequest<'_>) -> Result<Table, NodeError> {
        let mut merged: Option<Table> = None;
        for input in req.inputs(0) {
            let Some(table) = input.payload::<Table>() else {
                return Err(NodeError::structural("append: table input without rows"));
            };
            match merged.as_mut() {
                Some(m) => m.append(table),
                None => merged = Some(table.clone()),
            }
        }
        Ok(merged.unwrap_or_default())
    }

    fn append_images(&self, req: &DataRequest<'_>) -> Result<ImageBlock, NodeError> {
        let mut blocks = Vec::with_capacity(req.connection_count(0));
        for input in req.inputs(0) {
            let Some(block) = input.payload::<ImageBlock>() else {
                return Err(NodeError::structural("append: image input without cells"));
            };
            blocks.push(block);
        }
        let extent = blocks
            .iter()
            .fold(Extent::EMPTY, |acc, b| acc.union(&b.extent()));
        let mut out = ImageBlock::new(extent, self.fill);
        for block in blocks {
            out.paste(block);
        }
        Ok(out)
    }
}

impl Algorithm for Append {
    fn name(&self) -> &str {
        "append"
    }

    fn input_ports(&self) -> Vec<InputPortSpec> {
        vec![
            InputPortSpec::new("inputs")
                .accepting(&[DataKind::Table, DataKind::ImageData])
                .repeatable(),
        ]
    }

    fn output_ports(&self) -> Vec<OutputPortSpec> {
        vec![OutputPortSpec::same_as_input("merged", 0)]
    }

    fn set_parameter(&mut self, name: &str, value: &str) -> Result<(), NodeError> {
        match name {
            "fill" => self.fill = params::parse_f64(self.name(), name, value)?,
            _ => return Err(params::unknown(self.name(), name)),
        }
        Ok(())
    }

    fn parameter(&self, name: &str) -> Option<String> {
        match name {
            "fill" => Some(format!("{}", self.fill)),
            _ => None,
        }
    }

    fn request_data_object(&mut self, req: &mut DataObjectRequest) -> Result<(), NodeError> {
        let first = req.input_kind(0, 0);
        for conn in 1..req.connection_count(0) {
            let kind = req.input_kind(0, conn);
            if kind != first {
                return Err(NodeError::structural(format!(
                    "append: connection {conn} delivers {}, expected {}",
                    kind.map_or("nothing", DataKind::name),
                    first.map_or("nothing", DataKind::name),
                )));
            }
        }
        Ok(())
    }

    fn request_information(&mut self, req: &mut InformationRequest) -> Result<(), NodeError> {
        let whole = req
            .inputs(0)
            .iter()
            .filter_map(|info| info.extent(Key::WholeExtent))
            .fold(Extent::EMPTY, |acc, e| acc.union(&e));
        if !whole.is_empty() {
            req.output_mut(0).set(Key::WholeExtent, whole);
        }
        Ok(())
    }

    fn request_data(&mut self, req: &mut DataRequest<'_>) -> Result<Execution, NodeError> {
        let kind = req.input(0, 0).map(|d| d.kind());
        match kind {
            Some(DataKind::Table) => {
                let table = self.append_tables(req)?;
                let Some(output) = req.output_mut(0) else {
                    return Err(NodeError::compute("append: output missing"));
                };
                output.set_payload(table);
            }
            Some(DataKind::ImageData) => {
                let block = self.append_images(req)?;
                let Some(output) = req.output_mut(0) else {
                    return Err(NodeError::compute("append: output missing"));
                };
                output.info_mut().set(Key::DataExtent, block.extent());
                output.set_croppable_payload(block);
            }
            _ => return Err(NodeError::structural("append: unsupported input kind")),
        }
        Ok(Execution::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ImageSource, TableSource};
    use sluice_core::{Pipeline, PipelineError};

    #[test]
    fn test_tables_concatenate_in_connection_order() {
        let mut p = Pipeline::new();
        let a = p.add(TableSource::new(2));
        let b = p.add(TableSource::new(3));
        let app = p.add(Append::new());
        p.connect_default(a, app).unwrap();
        p.connect_default(b, app).unwrap();
        p.update(app).unwrap();

        let data = p.output_data(app, 0).unwrap();
        assert_eq!(data.kind(), DataKind::Table);
        let table = data.payload::<Table>().unwrap();
        assert_eq!(table.column("index").unwrap(), vec![0.0, 1.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_images_paste_onto_union() {
        let mut p = Pipeline::new();
        let a = p.add(ImageSource::new(Extent::new_2d(0, 1, 0, 0)));
        let b = p.add(ImageSource::new(Extent::new_2d(3, 4, 0, 0)));
        let app = p.add(Append::new());
        p.set_parameter(app, "fill", "-1").unwrap();
        p.connect_default(a, app).unwrap();
        p.connect_default(b, app).unwrap();
        p.update(app).unwrap();

        let data = p.output_data(app, 0).unwrap();
        let block = data.payload::<ImageBlock>().unwrap();
        assert_eq!(block.extent(), Extent::new_2d(0, 4, 0, 0));
        assert_eq!(block.values(), &[0.0, 1.0, -1.0, 0.0, 1.0]);
        assert_eq!(
            p.output_information(app, 0).unwrap().extent(Key::WholeExtent),
            Some(Extent::new_2d(0, 4, 0, 0))
        );
    }

    #[test]
    fn test_mixed_kinds_rejected() {
        let mut p = Pipeline::new();
        let a = p.add(TableSource::new(2));
        let b = p.add(ImageSource::new(Extent::new_2d(0, 1, 0, 1)));
        let app = p.add(Append::new());
        p.connect_default(a, app).unwrap();
        p.connect_default(b, app).unwrap();
        let err = p.update(app).unwrap_err();
        assert!(matches!(err, PipelineError::NodeFailed { node, .. } if node == app));
    }
}
