//! Terminal sink that records what reaches it.

use std::sync::{Arc, Mutex, PoisonError};

use sluice_core::{
    Algorithm, DataKind, DataObject, DataRequest, Execution, Extent, InputPortSpec, Key,
    MultiBlock, NodeError, OutputPortSpec,
};

use crate::image::ImageBlock;
use crate::table::Table;

/// Summary of one data object.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeRecord {
    /// Input connection the object arrived on.
    pub connection: usize,
    /// Object kind.
    pub kind: DataKind,
    /// `DATA_EXTENT`, for structured data.
    pub extent: Option<Extent>,
    /// `DATA_PIECE_NUMBER`.
    pub piece: u32,
    /// `DATA_NUMBER_OF_PIECES`.
    pub num_pieces: u32,
    /// `DATA_NUMBER_OF_GHOST_LEVELS`.
    pub ghost_levels: u32,
    /// `DATA_TIME_STEP`.
    pub time: Option<f64>,
    /// Cells for images, rows for tables, 0 otherwise.
    pub cells: usize,
    /// Sum of every finite value.
    pub sum: f64,
}

/// Summarizes `object` as it arrived on `connection`.
pub fn summarize(connection: usize, object: &DataObject) -> ProbeRecord {
    let info = object.info();
    let (cells, sum) = cells_and_sum(object);
    ProbeRecord {
        connection,
        kind: object.kind(),
        extent: info.extent(Key::DataExtent),
        piece: info.uint(Key::DataPieceNumber).unwrap_or(0),
        num_pieces: info.uint(Key::DataNumberOfPieces).unwrap_or(1),
        ghost_levels: info.uint(Key::DataNumberOfGhostLevels).unwrap_or(0),
        time: info.double(Key::DataTimeStep),
        cells,
        sum,
    }
}

/// Cell count and finite sum, totalled over every leaf of a multi-block.
fn cells_and_sum(object: &DataObject) -> (usize, f64) {
    if let Some(block) = object.payload::<ImageBlock>() {
        (block.len(), block.values().iter().filter(|v| v.is_finite()).sum())
    } else if let Some(table) = object.payload::<Table>() {
        (table.row_count(), table.sum())
    } else if let Some(blocks) = object.payload::<MultiBlock>() {
        blocks
            .iter()
            .flatten()
            .map(|block| cells_and_sum(block.as_ref()))
            .fold((0, 0.0), |(c, s), (cells, sum)| (c + cells, s + sum))
    } else {
        (0, 0.0)
    }
}

/// Shared record list. Clones observe the same records.
#[derive(Debug, Clone, Default)]
pub struct ProbeLog(Arc<Mutex<Vec<ProbeRecord>>>);

impl ProbeLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every record, oldest first.
    pub fn records(&self) -> Vec<ProbeRecord> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Most recent record.
    pub fn last(&self) -> Option<ProbeRecord> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).last().cloned()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every record.
    pub fn clear(&self) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    fn push(&self, record: ProbeRecord) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).push(record);
    }
}

/// Records a [`ProbeRecord`] for every connection each time it executes.
///
/// Accepts any kind on any number of connections.
#[derive(Debug, Clone, Default)]
pub struct Probe {
    log: ProbeLog,
}

impl Probe {
    /// Probe with a fresh log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe appending to `log`.
    pub fn with_log(log: ProbeLog) -> Self {
        Self { log }
    }

    /// Handle to the record list.
    pub fn log(&self) -> ProbeLog {
        self.log.clone()
    }
}

impl Algorithm for Probe {
    fn name(&self) -> &str {
        "probe"
    }

    fn input_ports(&self) -> Vec<InputPortSpec> {
        vec![InputPortSpec::new("inputs").repeatable()]
    }

    fn output_ports(&self) -> Vec<OutputPortSpec> {
        Vec::new()
    }

    fn parameter(&self, name: &str) -> Option<String> {
        match name {
            "received" => Some(format!("{}", self.log.len())),
            _ => None,
        }
    }

    fn request_data(&mut self, req: &mut DataRequest<'_>) -> Result<Execution, NodeError> {
        for (connection, input) in req.inputs(0).iter().enumerate() {
            self.log.push(summarize(connection, input));
        }
        Ok(Execution::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ImageSource, TableSource};
    use sluice_core::{Pipeline, UpdateRequest};

    #[test]
    fn test_records_each_connection() {
        let mut p = Pipeline::new();
        let img = p.add(ImageSource::new(Extent::new_2d(0, 3, 0, 3)));
        let tab = p.add(TableSource::new(5));
        let probe = Probe::new();
        let log = probe.log();
        let sink = p.add(probe);
        p.connect_default(img, sink).unwrap();
        p.connect_default(tab, sink).unwrap();
        p.update(sink).unwrap();

        let records = log.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].kind, DataKind::ImageData);
        assert_eq!(records[0].cells, 16);
        assert_eq!(records[0].extent, Some(Extent::new_2d(0, 3, 0, 3)));
        assert_eq!(records[1].kind, DataKind::Table);
        assert_eq!(records[1].cells, 5);
        assert_eq!(p.node(sink).unwrap().parameter("received").as_deref(), Some("2"));
    }

    #[test]
    fn test_sink_request_reaches_source() {
        let mut p = Pipeline::new();
        let img = p.add(ImageSource::new(Extent::new_2d(0, 7, 0, 7)));
        let probe = Probe::new();
        let log = probe.log();
        let sink = p.add(probe);
        p.connect_default(img, sink).unwrap();
        p.update_with(sink, &UpdateRequest::new().with_piece(3, 4).with_ghost_levels(1))
            .unwrap();

        let record = log.last().unwrap();
        assert_eq!(record.piece, 3);
        assert_eq!(record.num_pieces, 4);
        assert_eq!(record.ghost_levels, 1);
        assert!(record.cells < 64);
    }

    #[test]
    fn test_unchanged_sink_request_skips() {
        let mut p = Pipeline::new();
        let img = p.add(ImageSource::new(Extent::new_2d(0, 3, 0, 3)));
        let probe = Probe::new();
        let log = probe.log();
        let sink = p.add(probe);
        p.connect_default(img, sink).unwrap();
        p.update(sink).unwrap();
        p.update(sink).unwrap();
        assert_eq!(log.len(), 1);
        log.clear();
        assert!(log.is_empty());
    }
}
