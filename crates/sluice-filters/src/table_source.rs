//! Synthetic table source that splits rows into pieces.

#[cfg(not(feature = "std"))]
use alloc::{format, string::String, vec, vec::Vec};

use sluice_core::{
    Algorithm, Capabilities, DataKind, DataRequest, Execution, InputPortSpec, Key, NodeError,
    OutputPortSpec,
};

use crate::params;
use crate::table::Table;

/// Produces `rows` rows; row `r`, column `c` holds `r * (c + 1)`.
///
/// A piece request selects a contiguous row range. Ghost levels add that
/// many neighbouring rows on both sides.
#[derive(Debug, Clone)]
pub struct TableSource {
    rows: u32,
    columns: Vec<String>,
}

impl Default for TableSource {
    fn default() -> Self {
        Self::new(10)
    }
}

impl TableSource {
    /// Source with `rows` rows and the columns `index` and `double`.
    pub fn new(rows: u32) -> Self {
        Self {
            rows,
            columns: vec![String::from("index"), String::from("double")],
        }
    }

    /// Replaces the column names.
    pub fn with_columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| String::from(*c)).collect();
        self
    }

    /// Total row count.
    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// Half-open row range of `piece`, ghost rows included.
    pub fn piece_rows(&self, piece: u32, num_pieces: u32, ghost_levels: u32) -> (u32, u32) {
        let num_pieces = num_pieces.max(1);
        let piece = piece.min(num_pieces - 1);
        let total = u64::from(self.rows);
        let start = (total * u64::from(piece) / u64::from(num_pieces)) as u32;
        let end = (total * (u64::from(piece) + 1) / u64::from(num_pieces)) as u32;
        if start == end {
            return (start, end);
        }
        (start.saturating_sub(ghost_levels), end.saturating_add(ghost_levels).min(self.rows))
    }
}

impl Algorithm for TableSource {
    fn name(&self) -> &str {
        "table_source"
    }

    fn input_ports(&self) -> Vec<InputPortSpec> {
        Vec::new()
    }

    fn output_ports(&self) -> Vec<OutputPortSpec> {
        vec![OutputPortSpec::new("table", DataKind::Table)]
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::PIECES | Capabilities::GHOST_LEVELS
    }

    fn set_parameter(&mut self, name: &str, value: &str) -> Result<(), NodeError> {
        let node = self.name();
        match name {
            "rows" => self.rows = params::parse_u32(node, name, value)?,
            "columns" => self.columns = params::parse_names(node, name, value)?,
            _ => return Err(params::unknown(node, name)),
        }
        Ok(())
    }

    fn parameter(&self, name: &str) -> Option<String> {
        match name {
            "rows" => Some(format!("{}", self.rows)),
            "columns" => Some(self.columns.join(",")),
            _ => None,
        }
    }

    fn request_data(&mut self, req: &mut DataRequest<'_>) -> Result<Execution, NodeError> {
        let request = req.output_request(0);
        let piece = request.uint(Key::UpdatePieceNumber).unwrap_or(0);
        let num_pieces = request.uint(Key::UpdateNumberOfPieces).unwrap_or(1);
        let ghost = request.uint(Key::UpdateNumberOfGhostLevels).unwrap_or(0);
        let (start, end) = self.piece_rows(piece, num_pieces, ghost);

        let mut table = Table::new(self.columns.clone());
        for r in start..end {
            let row = (0..self.columns.len())
                .map(|c| f64::from(r) * (c as f64 + 1.0))
                .collect();
            table.push_row(row);
        }

        let Some(output) = req.output_mut(0) else {
            return Err(NodeError::compute("table_source: output missing"));
        };
        output.info_mut().set(Key::DataNumberOfGhostLevels, ghost);
        output.set_payload(table);
        Ok(Execution::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_core::{Pipeline, UpdateRequest};

    #[test]
    fn test_piece_rows_cover_table_once() {
        let src = TableSource::new(10);
        let mut covered = Vec::new();
        for piece in 0..3 {
            let (a, b) = src.piece_rows(piece, 3, 0);
            covered.extend(a..b);
        }
        assert_eq!(covered, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_ghost_rows_clamped() {
        let src = TableSource::new(10);
        assert_eq!(src.piece_rows(0, 2, 2), (0, 7));
        assert_eq!(src.piece_rows(1, 2, 2), (3, 10));
        // More pieces than rows: empty pieces stay empty.
        assert_eq!(TableSource::new(2).piece_rows(0, 4, 1), (0, 0));
    }

    #[test]
    fn test_piece_through_pipeline() {
        let mut p = Pipeline::new();
        let src = p.add(TableSource::new(8));
        p.update_with(src, &UpdateRequest::new().with_piece(1, 2).with_ghost_levels(1))
            .unwrap();
        let data = p.output_data(src, 0).unwrap();
        let table = data.payload::<Table>().unwrap();
        assert_eq!(table.column("index").unwrap(), vec![3.0, 4.0, 5.0, 6.0, 7.0]);
        assert_eq!(table.column("double").unwrap()[0], 6.0);
        assert_eq!(data.info().uint(Key::DataPieceNumber), Some(1));
        assert_eq!(data.info().uint(Key::DataNumberOfGhostLevels), Some(1));
    }

    #[test]
    fn test_parameters() {
        let mut src = TableSource::default();
        src.set_parameter("rows", "3").unwrap();
        src.set_parameter("columns", "a,b,c").unwrap();
        assert_eq!(src.parameter("columns").as_deref(), Some("a,b,c"));
        assert!(src.set_parameter("rows", "-3").is_err());
    }
}
