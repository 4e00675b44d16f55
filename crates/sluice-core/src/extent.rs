//! Structured index-space extents.
//!
//! An [`Extent`] is six inclusive bounds `[x0, x1, y0, y1, z0, z1]` over cell
//! indices. Any axis with `lo > hi` makes the whole extent empty. 2-D data uses
//! a single z layer (`z0 == z1`).

use core::fmt;
use core::str::FromStr;

/// Inclusive structured extent `[x0, x1, y0, y1, z0, z1]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Extent(pub [i32; 6]);

impl Extent {
    /// The canonical empty extent.
    pub const EMPTY: Self = Self([0, -1, 0, -1, 0, -1]);

    /// Creates an extent from its six bounds.
    pub const fn new(x0: i32, x1: i32, y0: i32, y1: i32, z0: i32, z1: i32) -> Self {
        Self([x0, x1, y0, y1, z0, z1])
    }

    /// Creates a single-layer 2-D extent (`z0 == z1 == 0`).
    pub const fn new_2d(x0: i32, x1: i32, y0: i32, y1: i32) -> Self {
        Self([x0, x1, y0, y1, 0, 0])
    }

    /// Returns `true` if any axis is inverted.
    #[inline]
    pub fn is_empty(&self) -> bool {
        let e = &self.0;
        e[0] > e[1] || e[2] > e[3] || e[4] > e[5]
    }

    /// Returns the `(lo, hi)` bounds of `axis` (0 = x, 1 = y, 2 = z).
    #[inline]
    pub fn axis(&self, axis: usize) -> (i32, i32) {
        (self.0[2 * axis], self.0[2 * axis + 1])
    }

    /// Sets the bounds of one axis.
    #[inline]
    pub fn set_axis(&mut self, axis: usize, lo: i32, hi: i32) {
        self.0[2 * axis] = lo;
        self.0[2 * axis + 1] = hi;
    }

    /// Number of cells along each axis; all zero for an empty extent.
    pub fn dims(&self) -> [u64; 3] {
        if self.is_empty() {
            return [0; 3];
        }
        let mut dims = [0u64; 3];
        for (axis, d) in dims.iter_mut().enumerate() {
            let (lo, hi) = self.axis(axis);
            *d = (i64::from(hi) - i64::from(lo) + 1) as u64;
        }
        dims
    }

    /// Total number of cells covered.
    pub fn volume(&self) -> u64 {
        let [x, y, z] = self.dims();
        x * y * z
    }

    /// Returns `true` if `other` lies entirely inside `self`.
    ///
    /// The empty extent is contained in every extent.
    pub fn contains(&self, other: &Extent) -> bool {
        if other.is_empty() {
            return true;
        }
        if self.is_empty() {
            return false;
        }
        (0..3).all(|axis| {
            let (lo, hi) = self.axis(axis);
            let (olo, ohi) = other.axis(axis);
            olo >= lo && ohi <= hi
        })
    }

    /// Returns `true` if the cell `(i, j, k)` lies inside the extent.
    pub fn contains_index(&self, i: i32, j: i32, k: i32) -> bool {
        let e = &self.0;
        i >= e[0] && i <= e[1] && j >= e[2] && j <= e[3] && k >= e[4] && k <= e[5]
    }

    /// Overlap of two extents, or [`Extent::EMPTY`] when they are disjoint.
    pub fn intersection(&self, other: &Extent) -> Extent {
        let mut out = Extent::EMPTY;
        for axis in 0..3 {
            let (lo, hi) = self.axis(axis);
            let (olo, ohi) = other.axis(axis);
            out.set_axis(axis, lo.max(olo), hi.min(ohi));
        }
        if out.is_empty() { Extent::EMPTY } else { out }
    }

    /// Bounding box of two extents. Empty operands are ignored.
    pub fn union(&self, other: &Extent) -> Extent {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let mut out = *self;
        for axis in 0..3 {
            let (lo, hi) = self.axis(axis);
            let (olo, ohi) = other.axis(axis);
            out.set_axis(axis, lo.min(olo), hi.max(ohi));
        }
        out
    }

    /// Grows every axis by `levels` cells on both sides, never leaving `within`.
    pub fn grow(&self, levels: u32, within: &Extent) -> Extent {
        if self.is_empty() || levels == 0 {
            return *self;
        }
        let levels = levels.min(i32::MAX as u32) as i32;
        let mut out = *self;
        for axis in 0..3 {
            let (lo, hi) = self.axis(axis);
            let (wlo, whi) = within.axis(axis);
            out.set_axis(
                axis,
                lo.saturating_sub(levels).max(wlo),
                hi.saturating_add(levels).min(whi),
            );
        }
        out
    }

    /// Clamps the extent into `whole`. Alias for [`intersection`](Self::intersection).
    #[inline]
    pub fn clamp_to(&self, whole: &Extent) -> Extent {
        self.intersection(whole)
    }

    /// Linear offset of `(i, j, k)` in x-fastest order, if inside.
    pub fn offset_of(&self, i: i32, j: i32, k: i32) -> Option<usize> {
        if !self.contains_index(i, j, k) {
            return None;
        }
        let [nx, ny, _] = self.dims();
        let di = (i - self.0[0]) as u64;
        let dj = (j - self.0[2]) as u64;
        let dk = (k - self.0[4]) as u64;
        Some((di + nx * (dj + ny * dk)) as usize)
    }
}

impl Default for Extent {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl From<[i32; 6]> for Extent {
    fn from(bounds: [i32; 6]) -> Self {
        Self(bounds)
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let e = &self.0;
        write!(f, "[{} {} {} {} {} {}]", e[0], e[1], e[2], e[3], e[4], e[5])
    }
}

/// Error returned when parsing an [`Extent`] from text fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseExtentError;

impl fmt::Display for ParseExtentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected six integers, or four for a 2-D extent")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParseExtentError {}

impl FromStr for Extent {
    type Err = ParseExtentError;

    /// Parses `"x0 x1 y0 y1 z0 z1"` or `"x0 x1 y0 y1"`. Commas and brackets
    /// are accepted as separators.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bounds = [0i32; 6];
        let mut count = 0;
        for token in s
            .split(|c: char| c.is_whitespace() || c == ',' || c == '[' || c == ']')
            .filter(|t| !t.is_empty())
        {
            if count == 6 {
                return Err(ParseExtentError);
            }
            bounds[count] = token.parse().map_err(|_| ParseExtentError)?;
            count += 1;
        }
        match count {
            6 => Ok(Self(bounds)),
            4 => Ok(Self::new_2d(bounds[0], bounds[1], bounds[2], bounds[3])),
            _ => Err(ParseExtentError),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_extent() {
        assert!(Extent::EMPTY.is_empty());
        assert_eq!(Extent::EMPTY.volume(), 0);
        assert!(!Extent::new_2d(0, 0, 0, 0).is_empty());
        assert!(Extent::new(3, 2, 0, 4, 0, 0).is_empty());
    }

    #[test]
    fn test_volume_and_dims() {
        let e = Extent::new(0, 9, 0, 4, 0, 1);
        assert_eq!(e.dims(), [10, 5, 2]);
        assert_eq!(e.volume(), 100);
    }

    #[test]
    fn test_contains() {
        let whole = Extent::new_2d(0, 9, 0, 9);
        assert!(whole.contains(&Extent::new_2d(2, 5, 0, 9)));
        assert!(!whole.contains(&Extent::new_2d(-1, 5, 0, 9)));
        assert!(whole.contains(&Extent::EMPTY));
        assert!(!Extent::EMPTY.contains(&whole));
    }

    #[test]
    fn test_intersection_and_union() {
        let a = Extent::new_2d(0, 5, 0, 5);
        let b = Extent::new_2d(3, 9, 4, 9);
        assert_eq!(a.intersection(&b), Extent::new_2d(3, 5, 4, 5));
        assert_eq!(a.union(&b), Extent::new_2d(0, 9, 0, 9));
        let c = Extent::new_2d(7, 9, 7, 9);
        assert_eq!(a.intersection(&c), Extent::EMPTY);
        assert_eq!(Extent::EMPTY.union(&c), c);
    }

    #[test]
    fn test_grow_is_clamped() {
        let whole = Extent::new_2d(0, 9, 0, 9);
        let piece = Extent::new_2d(0, 4, 5, 9);
        assert_eq!(piece.grow(1, &whole), Extent::new_2d(0, 5, 4, 9));
        assert_eq!(piece.grow(0, &whole), piece);
        assert_eq!(Extent::EMPTY.grow(2, &whole), Extent::EMPTY);
    }

    #[test]
    fn test_offset_of() {
        let e = Extent::new_2d(2, 4, 1, 2);
        assert_eq!(e.offset_of(2, 1, 0), Some(0));
        assert_eq!(e.offset_of(4, 2, 0), Some(5));
        assert_eq!(e.offset_of(5, 2, 0), None);
    }

    #[test]
    fn test_parse() {
        assert_eq!("0 9 0 9 0 0".parse::<Extent>(), Ok(Extent::new_2d(0, 9, 0, 9)));
        assert_eq!("[0, 9, 0, 4]".parse::<Extent>(), Ok(Extent::new_2d(0, 9, 0, 4)));
        assert!("0 9 0".parse::<Extent>().is_err());
        assert!("a b c d".parse::<Extent>().is_err());
    }
}
