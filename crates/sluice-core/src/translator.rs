//! Extent/piece translation for spatial streaming.
//!
//! [`ExtentTranslator`] maps a `(piece, num_pieces, ghost_levels)` request
//! over a whole extent to the sub-extent one producer must compute.
//!
//! # Splitting
//!
//! The whole extent is bisected recursively. Each step cuts one axis so the
//! first `floor(n / 2)` pieces get a proportional share of its cells; the
//! halves are disjoint in index space, so ghost-free pieces tile the whole
//! extent exactly. [`SplitMode::Block`] cuts the longest axis (ties prefer z,
//! then y, then x); the slab modes cut their axis until it is one cell thick.
//! When the remaining region cannot be cut any further, piece 0 of it takes
//! the region and its siblings receive [`Extent::EMPTY`].
//!
//! # Ghost levels
//!
//! A piece grows by `ghost_levels` cells on every side, clamped to the whole
//! extent, so it reaches exactly `ghost_levels` cells into each neighbour.
//! An exact request suppresses the growth.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use core::fmt;
use core::str::FromStr;

use crate::extent::Extent;

/// Tables up to this many pieces are cached per whole extent.
const MAX_CACHED_PIECES: u32 = 4096;

/// Axis-selection policy for splitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum SplitMode {
    /// Cut the longest splittable axis.
    #[default]
    Block,
    /// Prefer cutting x.
    XSlab,
    /// Prefer cutting y.
    YSlab,
    /// Prefer cutting z.
    ZSlab,
}

impl SplitMode {
    /// Lower-case name.
    pub const fn name(self) -> &'static str {
        match self {
            SplitMode::Block => "block",
            SplitMode::XSlab => "x",
            SplitMode::YSlab => "y",
            SplitMode::ZSlab => "z",
        }
    }

    fn preferred_axis(self) -> Option<usize> {
        match self {
            SplitMode::Block => None,
            SplitMode::XSlab => Some(0),
            SplitMode::YSlab => Some(1),
            SplitMode::ZSlab => Some(2),
        }
    }
}

impl fmt::Display for SplitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned for an unknown split-mode name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSplitModeError;

impl fmt::Display for ParseSplitModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected one of: block, x, y, z")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParseSplitModeError {}

impl FromStr for SplitMode {
    type Err = ParseSplitModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const NAMES: [(&str, SplitMode); 10] = [
            ("block", SplitMode::Block),
            ("x", SplitMode::XSlab),
            ("x-slab", SplitMode::XSlab),
            ("xslab", SplitMode::XSlab),
            ("y", SplitMode::YSlab),
            ("y-slab", SplitMode::YSlab),
            ("yslab", SplitMode::YSlab),
            ("z", SplitMode::ZSlab),
            ("z-slab", SplitMode::ZSlab),
            ("zslab", SplitMode::ZSlab),
        ];
        let s = s.trim();
        NAMES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(s))
            .map(|(_, mode)| *mode)
            .ok_or(ParseSplitModeError)
    }
}

/// A piece request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PieceRequest {
    /// Requested piece index.
    pub piece: u32,
    /// Total number of pieces.
    pub num_pieces: u32,
    /// Ghost levels to add around the piece.
    pub ghost_levels: u32,
    /// Suppress ghost growth.
    pub exact: bool,
}

impl PieceRequest {
    /// Ghost-free request for `piece` of `num_pieces`.
    pub const fn new(piece: u32, num_pieces: u32) -> Self {
        Self {
            piece,
            num_pieces,
            ghost_levels: 0,
            exact: false,
        }
    }

    /// Sets the ghost level count.
    pub const fn with_ghost_levels(mut self, ghost_levels: u32) -> Self {
        self.ghost_levels = ghost_levels;
        self
    }

    /// Marks the request exact.
    pub const fn exact(mut self) -> Self {
        self.exact = true;
        self
    }

    /// Clamps the request into range: zero pieces means one, and a piece
    /// index past the end selects the last piece.
    ///
    /// Returns the normalized request and whether anything changed.
    pub fn normalized(self) -> (Self, bool) {
        let mut out = self;
        let mut clamped = false;
        if out.num_pieces == 0 {
            out.num_pieces = 1;
            clamped = true;
        }
        if out.piece >= out.num_pieces {
            out.piece = out.num_pieces - 1;
            clamped = true;
        }
        (out, clamped)
    }
}

/// Ghost-free pieces computed for one whole extent.
#[derive(Debug, Clone)]
struct SplitTable {
    whole: Extent,
    num_pieces: u32,
    mode: SplitMode,
    pieces: Vec<Extent>,
}

/// Piece-to-extent translator with a one-entry cache.
#[derive(Debug, Clone, Default)]
pub struct ExtentTranslator {
    mode: SplitMode,
    cache: Option<SplitTable>,
}

impl ExtentTranslator {
    /// Creates a block-mode translator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a translator with the given split mode.
    pub fn with_mode(mode: SplitMode) -> Self {
        Self { mode, cache: None }
    }

    /// Current split mode.
    pub fn mode(&self) -> SplitMode {
        self.mode
    }

    /// Changes the split mode.
    pub fn set_mode(&mut self, mode: SplitMode) {
        self.mode = mode;
    }

    /// Whole extent of the most recent split, if any.
    pub fn cached_whole_extent(&self) -> Option<Extent> {
        self.cache.as_ref().map(|t| t.whole)
    }

    /// Sub-extent for `request` over `whole`.
    ///
    /// Out-of-range requests are clamped (see [`PieceRequest::normalized`])
    /// and logged.
    pub fn piece_to_extent(&mut self, whole: &Extent, request: PieceRequest) -> Extent {
        let (request, clamped) = request.normalized();
        if clamped {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                piece = request.piece,
                num_pieces = request.num_pieces,
                "piece request out of range, clamped"
            );
        }
        let base = self.ghost_free_piece(whole, request.piece, request.num_pieces);
        if request.exact || base.is_empty() {
            base
        } else {
            base.grow(request.ghost_levels, whole)
        }
    }

    /// All ghost-free pieces of `whole`, in piece order.
    pub fn split(&mut self, whole: &Extent, num_pieces: u32) -> Vec<Extent> {
        let num_pieces = num_pieces.max(1);
        (0..num_pieces)
            .map(|piece| self.ghost_free_piece(whole, piece, num_pieces))
            .collect()
    }

    fn ghost_free_piece(&mut self, whole: &Extent, piece: u32, num_pieces: u32) -> Extent {
        if num_pieces > MAX_CACHED_PIECES {
            return split_extent(whole, piece, num_pieces, self.mode);
        }
        let hit = self.cache.as_ref().is_some_and(|t| {
            t.whole == *whole && t.num_pieces == num_pieces && t.mode == self.mode
        });
        if !hit {
            let pieces = (0..num_pieces)
                .map(|p| split_extent(whole, p, num_pieces, self.mode))
                .collect();
            self.cache = Some(SplitTable {
                whole: *whole,
                num_pieces,
                mode: self.mode,
                pieces,
            });
        }
        self.cache
            .as_ref()
            .and_then(|t| t.pieces.get(piece as usize).copied())
            .unwrap_or(Extent::EMPTY)
    }
}

/// Sub-extent for `request` over `whole`, computed without a cache.
///
/// Matches [`ExtentTranslator::piece_to_extent`] for the same split mode.
pub fn piece_extent(whole: &Extent, request: PieceRequest, mode: SplitMode) -> Extent {
    let (request, _) = request.normalized();
    let base = split_extent(whole, request.piece, request.num_pieces, mode);
    if request.exact || base.is_empty() {
        base
    } else {
        base.grow(request.ghost_levels, whole)
    }
}

/// Ghost-free extent of `piece` out of `num_pieces` over `whole`.
///
/// Pure; `piece` must be below `num_pieces`, otherwise the result is empty.
pub fn split_extent(whole: &Extent, piece: u32, num_pieces: u32, mode: SplitMode) -> Extent {
    if piece >= num_pieces || whole.is_empty() {
        return Extent::EMPTY;
    }
    let mut ext = *whole;
    let mut piece = piece;
    let mut num_pieces = num_pieces;
    while num_pieces > 1 {
        if ext.is_empty() {
            return Extent::EMPTY;
        }
        let Some(axis) = split_axis(&ext, mode) else {
            return if piece == 0 { ext } else { Extent::EMPTY };
        };
        let (lo, hi) = ext.axis(axis);
        let cells = i64::from(hi) - i64::from(lo) + 1;
        let first = num_pieces / 2;
        let mid = lo + (cells * i64::from(first) / i64::from(num_pieces)) as i32;
        if piece < first {
            ext.set_axis(axis, lo, mid - 1);
            num_pieces = first;
        } else {
            ext.set_axis(axis, mid, hi);
            piece -= first;
            num_pieces -= first;
        }
    }
    if ext.is_empty() { Extent::EMPTY } else { ext }
}

fn split_axis(ext: &Extent, mode: SplitMode) -> Option<usize> {
    let dims = ext.dims();
    if let Some(axis) = mode.preferred_axis() {
        if dims[axis] >= 2 {
            return Some(axis);
        }
    }
    let mut best: Option<usize> = None;
    for axis in [2, 1, 0] {
        if dims[axis] < 2 {
            continue;
        }
        match best {
            Some(b) if dims[b] >= dims[axis] => {}
            _ => best = Some(axis),
        }
    }
    best
}
