//! Time resolution command.

use super::common::parse_list;
use clap::Args;
use sluice_core::{TimeNegotiator, TimeSnap, snap};

#[derive(Args)]
pub struct ResolveArgs {
    /// Requested time
    #[arg(long, allow_hyphen_values = true)]
    time: f64,

    /// Ascending time steps, "a,b,c"; empty for continuous time
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    steps: String,

    /// Snap mode: nearest, below or above
    #[arg(long, default_value = "nearest")]
    mode: String,

    /// Resolve as a node forcing this time would
    #[arg(long, allow_hyphen_values = true)]
    force: Option<f64>,
}

pub fn run(args: ResolveArgs) -> anyhow::Result<()> {
    let steps = parse_list(&args.steps)?;
    if steps.windows(2).any(|w| w[0] >= w[1]) {
        anyhow::bail!("--steps must be strictly ascending");
    }
    let mode: TimeSnap = args
        .mode
        .parse()
        .map_err(|_| anyhow::anyhow!("Unknown snap mode '{}' (nearest, below, above)", args.mode))?;

    let snapped = snap(args.time, &steps, mode);
    println!("Requested:  {}", args.time);
    if steps.is_empty() {
        println!("Steps:      (continuous)");
    } else {
        let list: Vec<String> = steps.iter().map(|t| format!("{t}")).collect();
        println!("Steps:      {}", list.join(", "));
    }
    println!("Mode:       {}", mode.name());
    println!(
        "Resolved:   {}{}",
        snapped.time,
        if snapped.clamped { " (clamped)" } else { "" }
    );

    if let Some(forced) = args.force {
        let mut negotiator = TimeNegotiator::new(mode);
        negotiator.force(forced);
        let resolution = negotiator.negotiate(Some(args.time), &steps);
        println!(
            "Forced:     {}{}",
            resolution.time.map_or_else(|| "-".to_string(), |t| format!("{t}")),
            if resolution.clamped { " (clamped)" } else { "" }
        );
    }
    Ok(())
}
