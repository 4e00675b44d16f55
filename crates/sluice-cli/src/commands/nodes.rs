//! Node type listing and information command.

#![allow(clippy::print_literal)] // Table headers use literal strings intentionally

use clap::Args;
use sluice_config::{NodeCategory, NodeRegistry};

#[derive(Args)]
pub struct NodesArgs {
    /// Show details for a specific node type
    #[arg(value_name = "NODE")]
    node: Option<String>,
}

const CATEGORIES: [NodeCategory; 5] = [
    NodeCategory::Source,
    NodeCategory::Filter,
    NodeCategory::Temporal,
    NodeCategory::Streaming,
    NodeCategory::Sink,
];

pub fn run(args: NodesArgs) -> anyhow::Result<()> {
    let registry = NodeRegistry::new();

    if let Some(id) = &args.node {
        let node = registry
            .get(id)
            .ok_or_else(|| anyhow::anyhow!("Unknown node type: {}", id))?;

        println!("{} ({})", node.name, node.id);
        println!("{}", "=".repeat(node.name.len() + node.id.len() + 3));
        println!();
        println!("{}", node.description);
        println!("Category: {}", node.category.name());
        println!();

        if node.params.is_empty() {
            println!("No parameters.");
        } else {
            println!("Parameters:");
            println!();
            println!("  {:22}  {:14}  {}", "Name", "Default", "Description");
            println!("  {:22}  {:14}  {}", "----", "-------", "-----------");
            for param in node.params {
                let default = if param.default.is_empty() {
                    "(none)"
                } else {
                    param.default
                };
                println!(
                    "  {:22}  {:14}  {}",
                    param.name, default, param.description
                );
            }
        }

        println!();
        println!("Pipeline file entry:");
        println!();
        println!("  [[nodes]]");
        println!("  id = \"{}\"", node.id);
        println!("  type = \"{}\"", node.id);
        if let Some(param) = node.params.iter().find(|p| !p.default.is_empty()) {
            println!("  [nodes.params]");
            println!("  {} = \"{}\"", param.name, param.default);
        }
    } else {
        println!("Available Nodes");
        println!("===============");

        for category in CATEGORIES {
            let nodes = registry.nodes_in_category(category);
            if nodes.is_empty() {
                continue;
            }
            println!();
            println!("{} - {}", category.name(), category.description());
            for node in nodes {
                println!("  {:20} - {}", node.id, node.description);
            }
        }

        println!();
        println!("Use 'sluice nodes <id>' for detailed parameter info.");
    }

    Ok(())
}
