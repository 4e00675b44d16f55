//! Property-based tests for extent translation and time resolution.
//!
//! Checks piece conservation, pairwise disjointness, bounded ghost growth and
//! the snapping rules using proptest for randomized extents and step lists.

use proptest::prelude::*;
use sluice_core::{Extent, ExtentTranslator, PieceRequest, SplitMode, TimeSnap, resolve, split_extent};

fn arb_extent() -> impl Strategy<Value = Extent> {
    (
        -20i32..20,
        0i32..24,
        -20i32..20,
        0i32..24,
        -4i32..4,
        0i32..6,
    )
        .prop_map(|(x0, dx, y0, dy, z0, dz)| Extent::new(x0, x0 + dx, y0, y0 + dy, z0, z0 + dz))
}

fn arb_mode() -> impl Strategy<Value = SplitMode> {
    prop_oneof![
        Just(SplitMode::Block),
        Just(SplitMode::XSlab),
        Just(SplitMode::YSlab),
        Just(SplitMode::ZSlab),
    ]
}

fn arb_steps() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-100.0f64..100.0, 1..12).prop_map(|mut v| {
        v.sort_by(|a, b| a.total_cmp(b));
        v.dedup();
        v
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Ghost-free pieces cover the whole extent exactly: every piece lies
    /// inside it and their volumes sum to its volume.
    #[test]
    fn pieces_conserve_volume(
        whole in arb_extent(),
        num_pieces in 1u32..40,
        mode in arb_mode(),
    ) {
        let pieces: Vec<Extent> = (0..num_pieces)
            .map(|p| split_extent(&whole, p, num_pieces, mode))
            .collect();
        let total: u64 = pieces.iter().map(Extent::volume).sum();
        prop_assert_eq!(total, whole.volume());
        for piece in &pieces {
            prop_assert!(whole.contains(piece), "{} escapes {}", piece, whole);
        }
    }

    /// Ghost-free pieces never share a cell.
    #[test]
    fn pieces_are_disjoint(
        whole in arb_extent(),
        num_pieces in 1u32..24,
        mode in arb_mode(),
    ) {
        let pieces: Vec<Extent> = (0..num_pieces)
            .map(|p| split_extent(&whole, p, num_pieces, mode))
            .collect();
        for (i, a) in pieces.iter().enumerate() {
            for b in &pieces[i + 1..] {
                prop_assert!(a.intersection(b).is_empty(), "{} overlaps {}", a, b);
            }
        }
    }

    /// Ghost growth keeps the base piece, stays inside the whole extent and
    /// adds at most `g` cells per side.
    #[test]
    fn ghost_growth_is_bounded(
        whole in arb_extent(),
        num_pieces in 1u32..16,
        piece in 0u32..16,
        ghost in 0u32..4,
    ) {
        let piece = piece % num_pieces;
        let mut translator = ExtentTranslator::new();
        let base = translator.piece_to_extent(&whole, PieceRequest::new(piece, num_pieces));
        let grown = translator.piece_to_extent(
            &whole,
            PieceRequest::new(piece, num_pieces).with_ghost_levels(ghost),
        );
        if base.is_empty() {
            prop_assert!(grown.is_empty());
        } else {
            prop_assert!(grown.contains(&base));
            prop_assert!(whole.contains(&grown));
            for axis in 0..3 {
                let (lo, hi) = base.axis(axis);
                let (glo, ghi) = grown.axis(axis);
                prop_assert!(lo - glo <= ghost as i32);
                prop_assert!(ghi - hi <= ghost as i32);
            }
        }
        let exact = translator.piece_to_extent(
            &whole,
            PieceRequest::new(piece, num_pieces).with_ghost_levels(ghost).exact(),
        );
        prop_assert_eq!(exact, base);
    }

    /// Nearest returns a step minimizing the distance, the earliest on ties.
    #[test]
    fn nearest_minimizes_distance(steps in arb_steps(), t in -150.0f64..150.0) {
        let got = resolve(t, &steps, TimeSnap::Nearest);
        let best = steps.iter().map(|s| (s - t).abs()).fold(f64::INFINITY, f64::min);
        prop_assert_eq!((got - t).abs(), best);
        let first_best = steps.iter().copied().find(|s| (s - t).abs() == best);
        prop_assert_eq!(Some(got), first_best);
    }

    /// Directional modes return an exact match, otherwise the neighbour on
    /// the requested side, clamping at the ends.
    #[test]
    fn directional_modes_pick_the_right_side(steps in arb_steps(), t in -150.0f64..150.0) {
        let below = resolve(t, &steps, TimeSnap::NextBelowOrEqual);
        let above = resolve(t, &steps, TimeSnap::NextAboveOrEqual);
        prop_assert!(steps.contains(&below));
        prop_assert!(steps.contains(&above));
        if t >= steps[0] {
            prop_assert!(below <= t);
            prop_assert!(steps.iter().all(|&s| s > t || s <= below));
        } else {
            prop_assert_eq!(below, steps[0]);
        }
        if t <= steps[steps.len() - 1] {
            prop_assert!(above >= t);
            prop_assert!(steps.iter().all(|&s| s < t || s >= above));
        } else {
            prop_assert_eq!(above, steps[steps.len() - 1]);
        }
    }

    /// Empty step lists pass any request through.
    #[test]
    fn continuous_time_passes_through(t in -1.0e6f64..1.0e6) {
        prop_assert_eq!(resolve(t, &[], TimeSnap::Nearest), t);
    }
}
