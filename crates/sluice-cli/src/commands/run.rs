//! Pipeline run command.

use super::common::{
    apply_overrides, delivered, extent_label, load_config, node_label, parse_key_val,
};
use anyhow::Context;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use sluice_config::NodeRegistry;
use sluice_core::{Extent, NodeId, Pipeline, UpdateReport};
use sluice_filters::ProbeRecord;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

#[derive(Args)]
pub struct RunArgs {
    /// Pipeline description (TOML)
    file: PathBuf,

    /// Piece to request
    #[arg(long)]
    piece: Option<u32>,

    /// Number of pieces the data is split into
    #[arg(long)]
    pieces: Option<u32>,

    /// Ghost levels around the piece
    #[arg(long)]
    ghost: Option<u32>,

    /// Time to request
    #[arg(long)]
    time: Option<f64>,

    /// Explicit update extent, "x0 x1 y0 y1 z0 z1"
    #[arg(long, allow_hyphen_values = true)]
    extent: Option<String>,

    /// Node to update instead of the file's sink
    #[arg(long)]
    sink: Option<String>,

    /// Override a node parameter (node.param=value, repeatable)
    #[arg(long = "set", value_parser = parse_key_val)]
    overrides: Vec<(String, String)>,

    /// Update this many times; later runs show what the pipeline reuses
    #[arg(long, default_value = "1")]
    repeat: u32,

    /// Print a JSON report instead of text
    #[arg(long)]
    json: bool,

    /// Show a progress bar while nodes compute
    #[arg(long)]
    progress: bool,
}

pub fn run(args: RunArgs) -> anyhow::Result<()> {
    let mut config = load_config(&args.file)?;
    apply_overrides(&mut config, &args.overrides)?;
    if let Some(piece) = args.piece {
        config.update.piece = piece;
    }
    if let Some(pieces) = args.pieces {
        config.update.pieces = pieces;
    }
    if let Some(ghost) = args.ghost {
        config.update.ghost_levels = ghost;
    }
    if args.time.is_some() {
        config.update.time = args.time;
    }
    if args.extent.is_some() {
        config.update.extent.clone_from(&args.extent);
    }
    if args.sink.is_some() {
        config.update.sink.clone_from(&args.sink);
    }

    let registry = NodeRegistry::new();
    let mut built = config
        .build(&registry)
        .with_context(|| format!("cannot build pipeline '{}'", config.name))?;
    tracing::info!(
        pipeline = %config.name,
        nodes = built.pipeline.node_count(),
        edges = built.pipeline.edge_count(),
        "pipeline built"
    );

    // Ctrl+C stops the running update and any remaining repeats
    let interrupted = Arc::new(AtomicBool::new(false));
    let abort = built.pipeline.abort_handle();
    let flag = Arc::clone(&interrupted);
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted, stopping...");
        flag.store(true, Ordering::SeqCst);
        abort.abort();
    })?;

    let pb = if args.progress {
        let pb = ProgressBar::new(1000);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {percent:>3}% {msg}")?
                .progress_chars("##-"),
        );
        let bar = pb.clone();
        built
            .pipeline
            .set_progress_observer(move |_node: NodeId, name: &str, fraction: f64| {
                bar.set_message(name.to_string());
                bar.set_position((fraction * 1000.0).round() as u64);
            });
        Some(pb)
    } else {
        None
    };

    let request = built.request;
    let mut runs = Vec::new();
    for iteration in 1..=args.repeat.max(1) {
        if interrupted.load(Ordering::SeqCst) {
            break;
        }
        let started = Instant::now();
        let reports = built.update_with(&request)?;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        let targets: Vec<TargetRun> = reports
            .into_iter()
            .map(|(target, report)| TargetRun {
                outputs: delivered(&built.pipeline, target),
                target,
                report,
            })
            .collect();
        if args.json {
            runs.push(run_json(&built.pipeline, iteration, elapsed_ms, &targets));
        } else {
            print_run(&built.pipeline, iteration, args.repeat, elapsed_ms, &targets);
        }
    }

    if let Some(pb) = &pb {
        pb.finish_and_clear();
    }

    if args.json {
        let report = serde_json::json!({
            "pipeline": config.name,
            "request": {
                "piece": request.piece,
                "pieces": request.num_pieces,
                "ghost_levels": request.ghost_levels,
                "time": request.time,
                "extent": extent_json(request.extent),
                "exact": request.exact,
            },
            "runs": runs,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if interrupted.load(Ordering::SeqCst) {
        anyhow::bail!("interrupted");
    }
    Ok(())
}

struct TargetRun {
    target: NodeId,
    report: UpdateReport,
    outputs: Vec<(NodeId, ProbeRecord)>,
}

fn labels(pipeline: &Pipeline, nodes: &[NodeId]) -> Vec<String> {
    nodes.iter().map(|&n| node_label(pipeline, n)).collect()
}

fn print_run(
    pipeline: &Pipeline,
    iteration: u32,
    repeat: u32,
    elapsed_ms: f64,
    targets: &[TargetRun],
) {
    if repeat > 1 {
        println!("Run {iteration}/{repeat} ({elapsed_ms:.2} ms)");
    } else {
        println!("Run ({elapsed_ms:.2} ms)");
    }
    for run in targets {
        let report = &run.report;
        println!("  Target: {}", node_label(pipeline, run.target));
        println!("    Executed:  {}", join_or_dash(&labels(pipeline, &report.executed)));
        println!("    Reused:    {}", join_or_dash(&labels(pipeline, &report.skipped)));
        if report.continue_iterations > 0 {
            println!("    Continue:  {} extra iteration(s)", report.continue_iterations);
        }
        if report.is_partial() {
            println!("    Partial:   {}", join_or_dash(&labels(pipeline, &report.partial)));
        }
        for warning in &report.warnings {
            println!("    Warning:   {warning}");
        }
        for (node, record) in &run.outputs {
            println!(
                "    {:14} {:9} extent {:22} piece {}/{} ghost {} time {:>6} cells {:>6} sum {:.4}",
                node_label(pipeline, *node),
                record.kind.name(),
                extent_label(record.extent),
                record.piece,
                record.num_pieces,
                record.ghost_levels,
                record.time.map_or_else(|| "-".to_string(), |t| format!("{t}")),
                record.cells,
                record.sum
            );
        }
    }
}

fn join_or_dash(names: &[String]) -> String {
    if names.is_empty() {
        "-".to_string()
    } else {
        names.join(", ")
    }
}

fn extent_json(extent: Option<Extent>) -> serde_json::Value {
    extent.map_or(serde_json::Value::Null, |e| serde_json::json!(e.0))
}

fn run_json(
    pipeline: &Pipeline,
    iteration: u32,
    elapsed_ms: f64,
    targets: &[TargetRun],
) -> serde_json::Value {
    let targets: Vec<serde_json::Value> = targets
        .iter()
        .map(|run| {
            let outputs: Vec<serde_json::Value> = run
                .outputs
                .iter()
                .map(|(node, record)| {
                    serde_json::json!({
                        "node": node_label(pipeline, *node),
                        "port": record.connection,
                        "kind": record.kind.name(),
                        "extent": extent_json(record.extent),
                        "piece": record.piece,
                        "pieces": record.num_pieces,
                        "ghost_levels": record.ghost_levels,
                        "time": record.time,
                        "cells": record.cells,
                        "sum": record.sum,
                    })
                })
                .collect();
            serde_json::json!({
                "target": node_label(pipeline, run.target),
                "executed": labels(pipeline, &run.report.executed),
                "skipped": labels(pipeline, &run.report.skipped),
                "partial": labels(pipeline, &run.report.partial),
                "continue_iterations": run.report.continue_iterations,
                "warnings": run.report.warnings,
                "outputs": outputs,
            })
        })
        .collect();
    serde_json::json!({
        "iteration": iteration,
        "elapsed_ms": elapsed_ms,
        "targets": targets,
    })
}
