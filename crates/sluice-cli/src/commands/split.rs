//! Extent split inspection command.

use clap::Args;
use sluice_core::{Extent, ExtentTranslator, PieceRequest, SplitMode};

#[derive(Args)]
pub struct SplitArgs {
    /// Whole extent, "x0 x1 y0 y1 z0 z1"
    #[arg(long, allow_hyphen_values = true)]
    extent: String,

    /// Number of pieces
    #[arg(long)]
    pieces: u32,

    /// Ghost levels added around each piece
    #[arg(long, default_value = "0")]
    ghost: u32,

    /// Split mode: block, x, y or z
    #[arg(long, default_value = "block")]
    mode: String,

    /// Suppress ghost growth
    #[arg(long)]
    exact: bool,

    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

pub fn run(args: SplitArgs) -> anyhow::Result<()> {
    let whole: Extent = args
        .extent
        .parse()
        .map_err(|_| anyhow::anyhow!("'{}' is not an extent \"x0 x1 y0 y1 z0 z1\"", args.extent))?;
    let mode: SplitMode = args
        .mode
        .parse()
        .map_err(|_| anyhow::anyhow!("Unknown split mode '{}' (block, x, y, z)", args.mode))?;
    if args.pieces == 0 {
        anyhow::bail!("--pieces must be at least 1");
    }

    let mut translator = ExtentTranslator::with_mode(mode);
    let ghost_free = translator.split(&whole, args.pieces);
    let pieces: Vec<(u32, Extent, Extent)> = (0..args.pieces)
        .map(|piece| {
            let mut request = PieceRequest::new(piece, args.pieces).with_ghost_levels(args.ghost);
            if args.exact {
                request = request.exact();
            }
            let base = ghost_free[piece as usize];
            (piece, base, translator.piece_to_extent(&whole, request))
        })
        .collect();
    let covered: u64 = ghost_free.iter().map(Extent::volume).sum();

    if args.json {
        let rows: Vec<serde_json::Value> = pieces
            .iter()
            .map(|(piece, base, grown)| {
                serde_json::json!({
                    "piece": piece,
                    "extent": grown.0,
                    "ghost_free": base.0,
                    "cells": grown.volume(),
                    "empty": grown.is_empty(),
                })
            })
            .collect();
        let report = serde_json::json!({
            "whole": whole.0,
            "mode": mode.name(),
            "ghost_levels": args.ghost,
            "exact": args.exact,
            "pieces": rows,
            "covered": covered,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "Split {} into {} piece(s), mode {}, ghost {}{}",
        whole,
        args.pieces,
        mode.name(),
        args.ghost,
        if args.exact { ", exact" } else { "" }
    );
    println!();
    println!("  {:>6}  {:28}  {:28}  {:>8}", "Piece", "Extent", "Ghost-free", "Cells");
    for (piece, base, grown) in &pieces {
        let label = if grown.is_empty() {
            "(empty)".to_string()
        } else {
            grown.to_string()
        };
        println!(
            "  {:>6}  {:28}  {:28}  {:>8}",
            piece,
            label,
            base.to_string(),
            grown.volume()
        );
    }
    println!();
    println!("Ghost-free pieces cover {covered} of {} cells", whole.volume());
    Ok(())
}
