//! Data objects produced by pipeline nodes.
//!
//! A [`DataObject`] is an opaque payload plus an [`Information`] block that
//! describes what the payload holds (extent, piece, ghost levels, time). Once
//! an execution publishes an object it is shared downstream as a read-only
//! [`DataHandle`]. Copying an object is shallow: the payload is reference
//! counted and never mutated while shared.
//!
//! A [`MultiBlock`] payload groups independent blocks into one composite
//! object. Nodes that do not accept composites are run once per block.

#[cfg(not(feature = "std"))]
use alloc::{sync::Arc, vec::Vec};
#[cfg(feature = "std")]
use std::sync::Arc;

use core::any::Any;
use core::fmt;

use crate::extent::Extent;
use crate::info::{Information, Key};

/// Shared, read-only handle to a published data object.
pub type DataHandle = Arc<DataObject>;

/// The closed set of data-object families a port can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataKind {
    /// Structured grid of samples addressed by an [`Extent`](crate::Extent).
    ImageData,
    /// Unstructured points, lines and polygons.
    PolyData,
    /// Rows of named columns.
    Table,
    /// Vertices and edges.
    Graph,
    /// Anything else; accepted by ports that declare no kinds.
    Generic,
    /// Composite of independent blocks, carried as a [`MultiBlock`].
    MultiBlock,
}

impl DataKind {
    /// All kinds, in declaration order.
    pub const ALL: [DataKind; 6] = [
        DataKind::ImageData,
        DataKind::PolyData,
        DataKind::Table,
        DataKind::Graph,
        DataKind::Generic,
        DataKind::MultiBlock,
    ];

    /// Type name written as `DATA_TYPE_NAME`.
    pub const fn name(self) -> &'static str {
        match self {
            DataKind::ImageData => "ImageData",
            DataKind::PolyData => "PolyData",
            DataKind::Table => "Table",
            DataKind::Graph => "Graph",
            DataKind::Generic => "DataObject",
            DataKind::MultiBlock => "MultiBlock",
        }
    }

    /// Returns `true` for composite kinds.
    pub const fn is_composite(self) -> bool {
        matches!(self, DataKind::MultiBlock)
    }

    /// Inverse of [`name`](Self::name).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

type Payload = Arc<dyn Any + Send + Sync>;
type CropFn = fn(&(dyn Any + Send + Sync), &Extent) -> Option<Payload>;

/// Payloads that can be reduced to a sub-extent.
///
/// The executive crops outputs of exact-extent requests that carry a
/// croppable payload (see [`DataObject::set_croppable_payload`]).
pub trait Crop: Any + Send + Sync + Sized {
    /// Copy of `self` restricted to `extent`.
    fn crop(&self, extent: &Extent) -> Self;
}

fn crop_as<T: Crop>(payload: &(dyn Any + Send + Sync), extent: &Extent) -> Option<Payload> {
    let cropped: Payload = Arc::new(payload.downcast_ref::<T>()?.crop(extent));
    Some(cropped)
}

/// Opaque payload with descriptive metadata.
#[derive(Clone)]
pub struct DataObject {
    kind: DataKind,
    info: Information,
    payload: Option<Payload>,
    cropper: Option<CropFn>,
}

impl DataObject {
    /// Creates an empty object of the given kind.
    pub fn new(kind: DataKind) -> Self {
        Self {
            kind,
            info: Information::new(),
            payload: None,
            cropper: None,
        }
    }

    /// Creates an object holding `payload`.
    pub fn with_payload<T: Any + Send + Sync>(kind: DataKind, payload: T) -> Self {
        let mut obj = Self::new(kind);
        obj.set_payload(payload);
        obj
    }

    /// The object's kind.
    #[inline]
    pub fn kind(&self) -> DataKind {
        self.kind
    }

    /// Metadata describing the payload.
    #[inline]
    pub fn info(&self) -> &Information {
        &self.info
    }

    /// Mutable metadata.
    #[inline]
    pub fn info_mut(&mut self) -> &mut Information {
        &mut self.info
    }

    /// Returns `true` if a payload is attached.
    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }

    /// Borrows the payload as `T`, if it is one.
    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.payload.as_deref().and_then(|p| p.downcast_ref::<T>())
    }

    /// Replaces the payload.
    pub fn set_payload<T: Any + Send + Sync>(&mut self, payload: T) {
        let payload: Payload = Arc::new(payload);
        self.payload = Some(payload);
        self.cropper = None;
    }

    /// Replaces the payload with one the executive may crop.
    pub fn set_croppable_payload<T: Crop>(&mut self, payload: T) {
        let payload: Payload = Arc::new(payload);
        self.payload = Some(payload);
        self.cropper = Some(crop_as::<T>);
    }

    /// Returns `true` if the payload can be cropped.
    pub fn is_croppable(&self) -> bool {
        self.payload.is_some() && self.cropper.is_some()
    }

    /// Restricts the payload to `extent` and records the new `DATA_EXTENT`.
    ///
    /// Returns `false`, changing nothing, for payloads that cannot be cropped.
    pub fn crop(&mut self, extent: &Extent) -> bool {
        let (Some(payload), Some(cropper)) = (self.payload.as_deref(), self.cropper) else {
            return false;
        };
        let Some(cropped) = cropper(payload, extent) else {
            return false;
        };
        self.payload = Some(cropped);
        let held = self
            .info
            .extent(Key::DataExtent)
            .map_or(*extent, |held| held.intersection(extent));
        self.info.set(Key::DataExtent, held);
        true
    }

    /// Mutable payload access, only while this object is its sole owner.
    pub fn payload_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.payload
            .as_mut()
            .and_then(Arc::get_mut)
            .and_then(|p| p.downcast_mut::<T>())
    }

    /// Drops the payload, keeping kind and metadata.
    pub fn release_data(&mut self) {
        self.payload = None;
        self.cropper = None;
    }

    /// Shares `other`'s payload and copies its metadata.
    ///
    /// The kind of `self` is kept.
    pub fn shallow_copy(&mut self, other: &DataObject) {
        self.payload = other.payload.clone();
        self.cropper = other.cropper;
        self.info.copy_from(&other.info);
    }

    /// Returns `true` if both objects share the same payload allocation.
    pub fn shares_payload_with(&self, other: &DataObject) -> bool {
        match (&self.payload, &other.payload) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for DataObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataObject")
            .field("kind", &self.kind)
            .field("info", &self.info)
            .field("has_payload", &self.payload.is_some())
            .finish()
    }
}

/// Payload of a [`DataKind::MultiBlock`] object.
///
/// Slots may be empty. Blocks may themselves be multi-block objects.
#[derive(Debug, Clone, Default)]
pub struct MultiBlock {
    blocks: Vec<Option<DataHandle>>,
}

impl MultiBlock {
    /// Creates an empty composite.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a composite with `len` empty slots.
    pub fn with_len(len: usize) -> Self {
        Self {
            blocks: (0..len).map(|_| None).collect(),
        }
    }

    /// Appends a slot.
    pub fn push(&mut self, block: Option<DataHandle>) {
        self.blocks.push(block);
    }

    /// Fills slot `index`, growing the composite if needed.
    pub fn set_block(&mut self, index: usize, block: Option<DataHandle>) {
        if index >= self.blocks.len() {
            self.blocks.resize(index + 1, None);
        }
        self.blocks[index] = block;
    }

    /// Block in slot `index`.
    pub fn block(&self, index: usize) -> Option<&DataHandle> {
        self.blocks.get(index)?.as_ref()
    }

    /// Number of slots, empty ones included.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Returns `true` if there are no slots.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Slots in order.
    pub fn iter(&self) -> impl Iterator<Item = Option<&DataHandle>> {
        self.blocks.iter().map(Option::as_ref)
    }

    /// Number of non-composite blocks, counted through nested composites.
    pub fn leaf_count(&self) -> usize {
        self.iter()
            .flatten()
            .map(|block| match block.payload::<MultiBlock>() {
                Some(inner) => inner.leaf_count(),
                None => 1,
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_round_trip() {
        for kind in DataKind::ALL {
            assert_eq!(DataKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(DataKind::from_name("Mesh"), None);
    }

    #[test]
    fn test_payload_downcast() {
        let obj = DataObject::with_payload(DataKind::Table, vec![1.0f64, 2.0]);
        assert_eq!(obj.payload::<Vec<f64>>(), Some(&vec![1.0, 2.0]));
        assert!(obj.payload::<String>().is_none());
    }

    #[test]
    fn test_shallow_copy_shares_payload() {
        let mut src = DataObject::with_payload(DataKind::ImageData, vec![0u8; 4]);
        src.info_mut().set(Key::DataTimeStep, 2.5);
        let mut dst = DataObject::new(DataKind::ImageData);
        dst.shallow_copy(&src);
        assert!(dst.shares_payload_with(&src));
        assert_eq!(dst.info().double(Key::DataTimeStep), Some(2.5));
        // Shared payloads are read-only.
        assert!(dst.payload_mut::<Vec<u8>>().is_none());
    }

    #[test]
    fn test_payload_mut_when_unique() {
        let mut obj = DataObject::with_payload(DataKind::Generic, 3u32);
        *obj.payload_mut::<u32>().unwrap() += 1;
        assert_eq!(obj.payload::<u32>(), Some(&4));
    }

    #[derive(Debug, PartialEq)]
    struct Row(Vec<i32>);

    impl Crop for Row {
        fn crop(&self, extent: &Extent) -> Self {
            let (lo, hi) = extent.axis(0);
            Row(self.0.iter().copied().filter(|x| (lo..=hi).contains(x)).collect())
        }
    }

    #[test]
    fn test_crop_records_data_extent() {
        let mut obj = DataObject::new(DataKind::ImageData);
        obj.set_croppable_payload(Row((0..10).collect()));
        obj.info_mut().set(Key::DataExtent, Extent::new(0, 9, 0, 0, 0, 0));
        assert!(obj.is_croppable());
        assert!(obj.crop(&Extent::new(2, 4, 0, 0, 0, 0)));
        assert_eq!(obj.payload::<Row>(), Some(&Row(vec![2, 3, 4])));
        assert_eq!(obj.info().extent(Key::DataExtent), Some(Extent::new(2, 4, 0, 0, 0, 0)));
    }

    #[test]
    fn test_plain_payload_is_not_croppable() {
        let mut obj = DataObject::with_payload(DataKind::ImageData, Row(vec![1]));
        assert!(!obj.crop(&Extent::new(0, 0, 0, 0, 0, 0)));
        obj.set_croppable_payload(Row(vec![1]));
        obj.set_payload(Row(vec![1]));
        assert!(!obj.is_croppable());
    }

    #[test]
    fn test_multi_block_slots() {
        let leaf: DataHandle = Arc::new(DataObject::new(DataKind::Table));
        let mut inner = MultiBlock::new();
        inner.push(Some(Arc::clone(&leaf)));
        inner.push(Some(Arc::clone(&leaf)));
        let mut outer = MultiBlock::with_len(1);
        outer.set_block(2, Some(Arc::new(DataObject::with_payload(DataKind::MultiBlock, inner))));
        outer.set_block(0, Some(leaf));
        assert_eq!(outer.len(), 3);
        assert!(outer.block(1).is_none());
        assert_eq!(outer.leaf_count(), 3);
        assert!(DataKind::MultiBlock.is_composite());
        assert!(!DataKind::Table.is_composite());
    }
}
