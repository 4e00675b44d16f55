//! Pipeline file validation command.

use super::common::{flatten, load_config};
use clap::Args;
use sluice_config::NodeRegistry;
use std::path::PathBuf;

#[derive(Args)]
pub struct ValidateArgs {
    /// Pipeline description (TOML)
    file: PathBuf,
}

pub fn run(args: ValidateArgs) -> anyhow::Result<()> {
    let config = load_config(&args.file)?;
    let registry = NodeRegistry::new();

    match config.validate(&registry) {
        Ok(()) => {
            println!(
                "{}: valid ({} node(s), {} connection(s))",
                args.file.display(),
                config.nodes.len(),
                config.connections.len()
            );
            Ok(())
        }
        Err(err) => {
            let problems = flatten(&err);
            println!("{}: {} problem(s)", args.file.display(), problems.len());
            for problem in &problems {
                println!("  - {problem}");
            }
            anyhow::bail!("validation failed")
        }
    }
}
