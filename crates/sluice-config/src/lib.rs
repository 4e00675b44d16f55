//! Pipeline descriptions for sluice.
//!
//! This crate stores pipelines as TOML files, validates them against the
//! node registry and builds live [`sluice_core::Pipeline`]s from them.
//!
//! # Features
//!
//! - **Pipeline Files**: Load and save node, connection and update sections
//! - **Validation**: Every unknown id, bad parameter and broken edge in one report
//! - **Building**: Nodes created through the registry and named by their config id
//!
//! # Example
//!
//! ```rust
//! use sluice_config::{ConnectionConfig, NodeConfig, PipelineConfig};
//! use sluice_registry::NodeRegistry;
//!
//! let config = PipelineConfig::new("rows")
//!     .with_node(NodeConfig::new("table", "table_source").with_param("rows", "6"))
//!     .with_node(NodeConfig::new("probe", "probe"))
//!     .with_connection(ConnectionConfig::new("table", "probe"));
//!
//! let registry = NodeRegistry::new();
//! config.validate(&registry).unwrap();
//!
//! let mut built = config.build(&registry).unwrap();
//! let reports = built.update().unwrap();
//! assert_eq!(reports.len(), 1);
//! ```

mod build;
mod error;
mod node_config;
mod pipeline_config;

/// Pipeline description validation.
pub mod validation;

pub use build::BuiltPipeline;
pub use error::ConfigError;
pub use node_config::{ConnectionConfig, NodeConfig};
pub use pipeline_config::{ExecutiveConfig, PipelineConfig, UpdateConfig};
pub use validation::{
    ValidationError, ValidationResult, validate_config, validate_node,
};

/// Re-export commonly used types from sluice-registry
pub use sluice_registry::{NodeCategory, NodeDescriptor, NodeRegistry, ParamSpec};
