//! Ordered key/value metadata attached to every port.
//!
//! [`Information`] carries scheduling facts (extents, pieces, ghost levels,
//! time steps, data-object type) between nodes. It never holds the payload
//! itself, only a handle to it under [`Key::DataObject`].
//!
//! Absence of a key is meaningful: a producer without [`Key::TimeSteps`] has
//! no discrete time domain. Lookups never fail; typed accessors return `None`
//! when a key is missing or holds a different variant.

#[cfg(not(feature = "std"))]
use alloc::{collections::BTreeMap, string::String, sync::Arc, vec::Vec};
#[cfg(feature = "std")]
use std::collections::BTreeMap;
#[cfg(feature = "std")]
use std::sync::Arc;

use core::fmt;

use crate::data::DataHandle;
use crate::extent::Extent;

/// Well-known information keys.
///
/// `Custom` keys let a node attach private metadata without widening the
/// closed set. Keys order by declaration, which fixes iteration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    // --- Pipeline metadata ---
    /// Full index-space bounds a structured producer can supply.
    WholeExtent,
    /// Continuous time domain `[t0, t1]`.
    TimeRange,
    /// Sorted discrete time steps.
    TimeSteps,
    /// Producer can translate a piece request into a sub-extent itself.
    CanProduceSubExtent,
    /// Producer can honour piece requests.
    CanHandlePieceRequest,
    /// Concrete output kind name.
    DataTypeName,
    /// Handle to the port's current data object.
    DataObject,

    // --- Requests ---
    /// Requested sub-extent.
    UpdateExtent,
    /// Requested piece index.
    UpdatePieceNumber,
    /// Requested piece count.
    UpdateNumberOfPieces,
    /// Requested ghost levels.
    UpdateNumberOfGhostLevels,
    /// Requested time.
    UpdateTimeStep,
    /// Output must match the update extent exactly; no halo growth.
    ExactExtent,
    /// Set when several consumers' requests were merged in one pass.
    CombinedUpdateExtent,
    /// Update extent before sub-extent translation.
    AllPiecesExtent,
    /// Time requested by the previous execution.
    PreviousUpdateTimeStep,
    /// Split mode name used by the extent translator.
    UpdateSplitMode,
    /// Request to re-enter the compute phase.
    ContinueExecuting,

    // --- Data object description ---
    /// Extent actually held by a data object.
    DataExtent,
    /// Piece held by a data object.
    DataPieceNumber,
    /// Piece count the data object was produced for.
    DataNumberOfPieces,
    /// Ghost levels present in the data object.
    DataNumberOfGhostLevels,
    /// Time the data object represents.
    DataTimeStep,

    /// Node-private key.
    Custom(&'static str),
}

impl Key {
    /// Upper-snake name, e.g. `UPDATE_EXTENT`.
    pub fn name(&self) -> &'static str {
        match self {
            Key::WholeExtent => "WHOLE_EXTENT",
            Key::TimeRange => "TIME_RANGE",
            Key::TimeSteps => "TIME_STEPS",
            Key::CanProduceSubExtent => "CAN_PRODUCE_SUB_EXTENT",
            Key::CanHandlePieceRequest => "CAN_HANDLE_PIECE_REQUEST",
            Key::DataTypeName => "DATA_TYPE_NAME",
            Key::DataObject => "DATA_OBJECT",
            Key::UpdateExtent => "UPDATE_EXTENT",
            Key::UpdatePieceNumber => "UPDATE_PIECE_NUMBER",
            Key::UpdateNumberOfPieces => "UPDATE_NUMBER_OF_PIECES",
            Key::UpdateNumberOfGhostLevels => "UPDATE_NUMBER_OF_GHOST_LEVELS",
            Key::UpdateTimeStep => "UPDATE_TIME_STEP",
            Key::ExactExtent => "EXACT_EXTENT",
            Key::CombinedUpdateExtent => "COMBINED_UPDATE_EXTENT",
            Key::AllPiecesExtent => "ALL_PIECES_EXTENT",
            Key::PreviousUpdateTimeStep => "PREVIOUS_UPDATE_TIME_STEP",
            Key::UpdateSplitMode => "UPDATE_SPLIT_MODE",
            Key::ContinueExecuting => "CONTINUE_EXECUTING",
            Key::DataExtent => "DATA_EXTENT",
            Key::DataPieceNumber => "DATA_PIECE_NUMBER",
            Key::DataNumberOfPieces => "DATA_NUMBER_OF_PIECES",
            Key::DataNumberOfGhostLevels => "DATA_NUMBER_OF_GHOST_LEVELS",
            Key::DataTimeStep => "DATA_TIME_STEP",
            Key::Custom(name) => *name,
        }
    }

    /// Returns `true` for keys that form a downstream request.
    pub fn is_request(&self) -> bool {
        matches!(
            self,
            Key::UpdateExtent
                | Key::UpdatePieceNumber
                | Key::UpdateNumberOfPieces
                | Key::UpdateNumberOfGhostLevels
                | Key::UpdateTimeStep
                | Key::ExactExtent
                | Key::CombinedUpdateExtent
                | Key::AllPiecesExtent
                | Key::UpdateSplitMode
        )
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed information value.
#[derive(Clone, Debug)]
pub enum Value {
    /// Integer scalar.
    Int(i64),
    /// Integer tuple.
    Ints(Vec<i64>),
    /// Floating-point scalar.
    Double(f64),
    /// Floating-point array.
    Doubles(Vec<f64>),
    /// Text.
    Str(String),
    /// Flag.
    Bool(bool),
    /// Structured extent.
    Extent(Extent),
    /// Data-object handle. Compared by identity.
    Data(DataHandle),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Ints(a), Value::Ints(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::Doubles(a), Value::Doubles(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Extent(a), Value::Extent(b)) => a == b,
            (Value::Data(a), Value::Data(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<Vec<i64>> for Value {
    fn from(v: Vec<i64>) -> Self {
        Value::Ints(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Value::Doubles(v)
    }
}

impl From<&[f64]> for Value {
    fn from(v: &[f64]) -> Self {
        Value::Doubles(v.to_vec())
    }
}

impl From<[f64; 2]> for Value {
    fn from(v: [f64; 2]) -> Self {
        Value::Doubles(v.to_vec())
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(String::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<Extent> for Value {
    fn from(v: Extent) -> Self {
        Value::Extent(v)
    }
}

impl From<DataHandle> for Value {
    fn from(v: DataHandle) -> Self {
        Value::Data(v)
    }
}

/// Ordered key/value store.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Information {
    entries: BTreeMap<Key, Value>,
}

impl Information {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key`, replacing any previous value.
    pub fn set(&mut self, key: Key, value: impl Into<Value>) {
        self.entries.insert(key, value.into());
    }

    /// Returns the value under `key`.
    pub fn get(&self, key: Key) -> Option<&Value> {
        self.entries.get(&key)
    }

    /// Returns `true` if `key` is present.
    pub fn has(&self, key: Key) -> bool {
        self.entries.contains_key(&key)
    }

    /// Removes `key`, returning its value.
    pub fn remove(&mut self, key: Key) -> Option<Value> {
        self.entries.remove(&key)
    }

    /// Replaces every entry with a copy of `other`'s.
    pub fn copy_from(&mut self, other: &Information) {
        self.entries.clone_from(&other.entries);
    }

    /// Copies one entry from `other`. Removes it here if `other` lacks it.
    pub fn copy_entry(&mut self, other: &Information, key: Key) {
        match other.get(key) {
            Some(v) => {
                self.entries.insert(key, v.clone());
            }
            None => {
                self.entries.remove(&key);
            }
        }
    }

    /// Copies `Custom` entries from `other` that are not already set here.
    pub fn forward_custom(&mut self, other: &Information) {
        for (key, value) in &other.entries {
            if matches!(key, Key::Custom(_)) && !self.entries.contains_key(key) {
                self.entries.insert(*key, value.clone());
            }
        }
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in order.
    pub fn keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.entries.keys().copied()
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (Key, &Value)> + '_ {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    // --- Typed accessors ---

    /// Integer value.
    pub fn int(&self, key: Key) -> Option<i64> {
        match self.get(key)? {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer value as `u32`, saturating negatives to zero.
    pub fn uint(&self, key: Key) -> Option<u32> {
        self.int(key).map(|v| v.clamp(0, i64::from(u32::MAX)) as u32)
    }

    /// Floating-point value. Integers are widened.
    pub fn double(&self, key: Key) -> Option<f64> {
        match self.get(key)? {
            Value::Double(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Floating-point array.
    pub fn doubles(&self, key: Key) -> Option<&[f64]> {
        match self.get(key)? {
            Value::Doubles(v) => Some(v),
            _ => None,
        }
    }

    /// Integer tuple.
    pub fn ints(&self, key: Key) -> Option<&[i64]> {
        match self.get(key)? {
            Value::Ints(v) => Some(v),
            _ => None,
        }
    }

    /// Extent value.
    pub fn extent(&self, key: Key) -> Option<Extent> {
        match self.get(key)? {
            Value::Extent(v) => Some(*v),
            _ => None,
        }
    }

    /// `true` only if `key` holds `Bool(true)` or a non-zero `Int`.
    pub fn flag(&self, key: Key) -> bool {
        match self.get(key) {
            Some(Value::Bool(v)) => *v,
            Some(Value::Int(v)) => *v != 0,
            _ => false,
        }
    }

    /// Text value.
    pub fn string(&self, key: Key) -> Option<&str> {
        match self.get(key)? {
            Value::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Data-object handle.
    pub fn data(&self, key: Key) -> Option<&DataHandle> {
        match self.get(key)? {
            Value::Data(v) => Some(v),
            _ => None,
        }
    }

    /// `TIME_RANGE` as a pair, if it holds two values.
    pub fn time_range(&self) -> Option<[f64; 2]> {
        match self.doubles(Key::TimeRange)? {
            [t0, t1] => Some([*t0, *t1]),
            _ => None,
        }
    }
}

impl fmt::Display for Information {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.entries {
            write!(f, "{key}: ")?;
            match value {
                Value::Int(v) => writeln!(f, "{v}")?,
                Value::Ints(v) => writeln!(f, "{v:?}")?,
                Value::Double(v) => writeln!(f, "{v}")?,
                Value::Doubles(v) => writeln!(f, "{v:?}")?,
                Value::Str(v) => writeln!(f, "{v}")?,
                Value::Bool(v) => writeln!(f, "{v}")?,
                Value::Extent(v) => writeln!(f, "{v}")?,
                Value::Data(v) => writeln!(f, "<{}>", v.kind())?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataKind, DataObject};

    #[test]
    fn test_set_get_remove() {
        let mut info = Information::new();
        assert!(!info.has(Key::WholeExtent));
        assert!(info.get(Key::WholeExtent).is_none());

        info.set(Key::WholeExtent, Extent::new_2d(0, 9, 0, 9));
        info.set(Key::UpdatePieceNumber, 2u32);
        assert_eq!(info.extent(Key::WholeExtent), Some(Extent::new_2d(0, 9, 0, 9)));
        assert_eq!(info.uint(Key::UpdatePieceNumber), Some(2));

        assert!(info.remove(Key::WholeExtent).is_some());
        assert!(!info.has(Key::WholeExtent));
        assert!(info.remove(Key::WholeExtent).is_none());
    }

    #[test]
    fn test_typed_accessor_mismatch_is_none() {
        let mut info = Information::new();
        info.set(Key::TimeSteps, "not numbers");
        assert!(info.doubles(Key::TimeSteps).is_none());
        assert_eq!(info.string(Key::TimeSteps), Some("not numbers"));
    }

    #[test]
    fn test_copy_from_replaces() {
        let mut a = Information::new();
        a.set(Key::TimeRange, [0.0, 1.0]);
        let mut b = Information::new();
        b.set(Key::WholeExtent, Extent::new_2d(0, 1, 0, 1));
        b.copy_from(&a);
        assert!(!b.has(Key::WholeExtent));
        assert_eq!(b.time_range(), Some([0.0, 1.0]));
    }

    #[test]
    fn test_copy_entry_removes_absent() {
        let src = Information::new();
        let mut dst = Information::new();
        dst.set(Key::TimeSteps, vec![1.0, 2.0]);
        dst.copy_entry(&src, Key::TimeSteps);
        assert!(!dst.has(Key::TimeSteps));
    }

    #[test]
    fn test_forward_custom_keeps_existing() {
        let mut src = Information::new();
        src.set(Key::Custom("color"), "red");
        src.set(Key::Custom("units"), "m");
        src.set(Key::WholeExtent, Extent::new_2d(0, 1, 0, 1));
        let mut dst = Information::new();
        dst.set(Key::Custom("color"), "blue");
        dst.forward_custom(&src);
        assert_eq!(dst.string(Key::Custom("color")), Some("blue"));
        assert_eq!(dst.string(Key::Custom("units")), Some("m"));
        assert!(!dst.has(Key::WholeExtent));
    }

    #[test]
    fn test_iteration_follows_key_order() {
        let mut info = Information::new();
        info.set(Key::DataTimeStep, 1.0);
        info.set(Key::WholeExtent, Extent::EMPTY);
        info.set(Key::UpdateExtent, Extent::EMPTY);
        let keys: Vec<Key> = info.keys().collect();
        assert_eq!(keys, vec![Key::WholeExtent, Key::UpdateExtent, Key::DataTimeStep]);
    }

    #[test]
    fn test_data_values_compare_by_identity() {
        let a = Arc::new(DataObject::new(DataKind::Table));
        let b = Arc::new(DataObject::new(DataKind::Table));
        assert_eq!(Value::Data(a.clone()), Value::Data(a.clone()));
        assert_ne!(Value::Data(a), Value::Data(b));
    }

    #[test]
    fn test_flag() {
        let mut info = Information::new();
        assert!(!info.flag(Key::ExactExtent));
        info.set(Key::ExactExtent, true);
        assert!(info.flag(Key::ExactExtent));
        info.set(Key::ContinueExecuting, 0i64);
        assert!(!info.flag(Key::ContinueExecuting));
    }
}
