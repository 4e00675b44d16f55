//! Pipeline description validation.
//!
//! Checks node types and parameters against the [`NodeRegistry`], connection
//! endpoints and ports against the created nodes, and the `[executive]` and
//! `[update]` sections against what the executive accepts. All problems are
//! collected, so one run reports every mistake in a file.
//!
//! # Example
//!
//! ```rust
//! use sluice_config::{NodeConfig, PipelineConfig, ValidationError, validate_node};
//! use sluice_registry::NodeRegistry;
//!
//! let registry = NodeRegistry::new();
//! validate_node(&NodeConfig::new("s", "box_smooth").with_param("radius", "2"), &registry)
//!     .expect("radius 2 is valid");
//!
//! let err = validate_node(&NodeConfig::new("s", "blur"), &registry).unwrap_err();
//! assert!(matches!(err, ValidationError::UnknownNodeType { .. }));
//! ```

use sluice_core::Algorithm;
use sluice_registry::NodeRegistry;
use thiserror::Error;

use crate::node_config::NodeConfig;
use crate::pipeline_config::PipelineConfig;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// The description declares no nodes.
    #[error("pipeline declares no nodes")]
    Empty,

    /// A connection or the update section names an undeclared node.
    #[error("unknown node id '{0}'")]
    UnknownNode(String),

    /// Two nodes share an id.
    #[error("duplicate node id '{0}'")]
    DuplicateNode(String),

    /// The registry has no such node type.
    #[error("node '{id}' has unknown type '{node_type}'")]
    UnknownNodeType {
        /// Node id.
        id: String,
        /// Requested type.
        node_type: String,
    },

    /// The node type has no such parameter.
    #[error("unknown parameter '{param}' for node '{node}'")]
    UnknownParameter {
        /// Node id.
        node: String,
        /// Name of the unrecognized parameter.
        param: String,
    },

    /// The node rejected a parameter value.
    #[error("invalid value for parameter '{param}' of node '{node}': {reason}")]
    InvalidParameter {
        /// Node id.
        node: String,
        /// Parameter name.
        param: String,
        /// The node's explanation.
        reason: String,
    },

    /// The graph rejected a connection.
    #[error("cannot connect '{from}' to '{to}': {reason}")]
    InvalidConnection {
        /// Producer id.
        from: String,
        /// Consumer id.
        to: String,
        /// The graph's explanation.
        reason: String,
    },

    /// A required input port is left unconnected.
    #[error("input port {port} ('{port_name}') of node '{node}' is not connected")]
    MissingInput {
        /// Node id.
        node: String,
        /// Input port index.
        port: usize,
        /// Input port name.
        port_name: String,
    },

    /// A value in the `[executive]` section.
    #[error("invalid executive setting '{field}': {reason}")]
    InvalidExecutive {
        /// Setting name.
        field: String,
        /// Description of the problem.
        reason: String,
    },

    /// A value in the `[update]` section.
    #[error("invalid update setting '{field}': {reason}")]
    InvalidUpdate {
        /// Setting name.
        field: String,
        /// Description of the problem.
        reason: String,
    },

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

impl ValidationError {
    /// Collapses a list into `Ok`, the single error, or [`ValidationError::Multiple`].
    pub fn from_list(mut errors: Vec<ValidationError>) -> ValidationResult<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ValidationError::Multiple(errors)),
        }
    }

    /// Number of individual problems this error stands for.
    pub fn count(&self) -> usize {
        match self {
            ValidationError::Multiple(errors) => errors.iter().map(Self::count).sum(),
            _ => 1,
        }
    }
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Creates the node an entry describes, collecting every rejected parameter.
pub(crate) fn instantiate(
    config: &NodeConfig,
    registry: &NodeRegistry,
    errors: &mut Vec<ValidationError>,
) -> Option<Box<dyn Algorithm>> {
    let Some(descriptor) = registry.get(&config.node_type) else {
        errors.push(ValidationError::UnknownNodeType {
            id: config.id.clone(),
            node_type: config.node_type.clone(),
        });
        return None;
    };
    let mut node = registry.create_default(descriptor.id)?;
    let before = errors.len();
    for (param, value) in &config.params {
        if descriptor.param(param).is_none() {
            errors.push(ValidationError::UnknownParameter {
                node: config.id.clone(),
                param: param.clone(),
            });
            continue;
        }
        if let Err(e) = node.set_parameter(param, value) {
            errors.push(ValidationError::InvalidParameter {
                node: config.id.clone(),
                param: param.clone(),
                reason: e.to_string(),
            });
        }
    }
    (errors.len() == before).then_some(node)
}

/// Validate one node entry: its type exists and every parameter is accepted.
pub fn validate_node(config: &NodeConfig, registry: &NodeRegistry) -> ValidationResult<()> {
    let mut errors = Vec::new();
    instantiate(config, registry, &mut errors);
    ValidationError::from_list(errors)
}

/// Validate a whole pipeline description.
///
/// Equivalent to building it and discarding the result.
pub fn validate_config(config: &PipelineConfig, registry: &NodeRegistry) -> ValidationResult<()> {
    crate::build::assemble(config, registry).map(|_| ())
}
