//! Dense scalar image payload.

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

use sluice_core::{Crop, Extent};

/// One scalar per cell of an extent, stored x-fastest.
///
/// This is the payload of every `ImageData` object produced by this crate.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBlock {
    extent: Extent,
    values: Vec<f64>,
}

impl ImageBlock {
    /// Block over `extent` with every cell set to `fill`.
    pub fn new(extent: Extent, fill: f64) -> Self {
        let len = if extent.is_empty() { 0 } else { extent.volume() as usize };
        Self {
            extent: if extent.is_empty() { Extent::EMPTY } else { extent },
            values: vec![fill; len],
        }
    }

    /// Block over `extent` with each cell computed from its index.
    pub fn from_fn(extent: Extent, mut f: impl FnMut(i32, i32, i32) -> f64) -> Self {
        let extent = if extent.is_empty() { Extent::EMPTY } else { extent };
        let mut values = Vec::with_capacity(extent.volume() as usize);
        for_each_index_in(&extent, |i, j, k| values.push(f(i, j, k)));
        Self { extent, values }
    }

    /// Covered extent.
    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// Cell values, x-fastest.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` for a block without cells.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at `(i, j, k)`, if inside.
    pub fn get(&self, i: i32, j: i32, k: i32) -> Option<f64> {
        self.extent.offset_of(i, j, k).map(|o| self.values[o])
    }

    /// Sets the value at `(i, j, k)`. Returns `false` outside the block.
    pub fn set(&mut self, i: i32, j: i32, k: i32, value: f64) -> bool {
        match self.extent.offset_of(i, j, k) {
            Some(o) => {
                self.values[o] = value;
                true
            }
            None => false,
        }
    }

    /// Sum of all cells.
    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Copy of the cells inside `extent`.
    pub fn crop(&self, extent: &Extent) -> ImageBlock {
        let region = self.extent.intersection(extent);
        ImageBlock::from_fn(region, |i, j, k| self.get(i, j, k).unwrap_or(0.0))
    }

    /// Overwrites the cells both blocks cover with `other`'s values.
    ///
    /// Returns the number of cells copied.
    pub fn paste(&mut self, other: &ImageBlock) -> usize {
        let region = self.extent.intersection(&other.extent);
        let mut copied = 0;
        for_each_index_in(&region, |i, j, k| {
            if let Some(v) = other.get(i, j, k) {
                if self.set(i, j, k, v) {
                    copied += 1;
                }
            }
        });
        copied
    }

    /// Calls `f` for every cell index, x-fastest.
    pub fn for_each_index(&self, f: impl FnMut(i32, i32, i32)) {
        for_each_index_in(&self.extent, f);
    }
}

impl Crop for ImageBlock {
    fn crop(&self, extent: &Extent) -> Self {
        ImageBlock::crop(self, extent)
    }
}

/// Calls `f` for every cell index of `extent`, x-fastest.
pub fn for_each_index_in(extent: &Extent, mut f: impl FnMut(i32, i32, i32)) {
    if extent.is_empty() {
        return;
    }
    let e = extent.0;
    for k in e[4]..=e[5] {
        for j in e[2]..=e[3] {
            for i in e[0]..=e[1] {
                f(i, j, k);
            }
        }
    }
}
