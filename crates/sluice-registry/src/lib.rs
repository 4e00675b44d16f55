//! Node registry and factory for sluice pipelines.
//!
//! This crate provides a centralized registry for discovering and instantiating
//! pipeline nodes. It lets pipeline descriptions name node types by id and
//! provides parameter metadata for tooling.
//!
//! # Features
//!
//! - **Node Discovery**: List all available node types with metadata
//! - **Factory Pattern**: Create configured nodes by id at runtime
//! - **Category System**: Nodes organized by role (source, filter, sink, ...)
//! - **Parameter Info**: Names, defaults and descriptions of every parameter
//!
//! # Example
//!
//! ```rust
//! use sluice_core::Pipeline;
//! use sluice_registry::{NodeCategory, NodeRegistry};
//!
//! let registry = NodeRegistry::new();
//!
//! for node in registry.all_nodes() {
//!     println!("{}: {}", node.id, node.description);
//! }
//!
//! let mut pipeline = Pipeline::new();
//! let source = registry
//!     .create("image_source", [("whole_extent", "0 7 0 7 0 0")])
//!     .unwrap();
//! let source = pipeline.add_node(source);
//! let smooth = pipeline.add_node(registry.create_default("box_smooth").unwrap());
//! pipeline.connect_default(source, smooth).unwrap();
//! pipeline.update(smooth).unwrap();
//!
//! for node in registry.nodes_in_category(NodeCategory::Streaming) {
//!     println!("Streaming node: {}", node.name);
//! }
//! ```

use sluice_core::Algorithm;
use sluice_filters::{
    Append, BoxSmooth, ForceTime, Group, ImageSource, ImageStreamer, PassThrough, Probe,
    TableSource, TemporalDifference,
};
use thiserror::Error;

/// Role of a node type, for organization and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeCategory {
    /// Nodes without inputs that produce data
    Source,
    /// Spatial filters working on a single time step
    Filter,
    /// Nodes that rewrite or iterate over time
    Temporal,
    /// Nodes that split one request into several upstream passes
    Streaming,
    /// Nodes without outputs
    Sink,
}

impl NodeCategory {
    /// Returns a human-readable name for the category.
    pub const fn name(&self) -> &'static str {
        match self {
            NodeCategory::Source => "Source",
            NodeCategory::Filter => "Filter",
            NodeCategory::Temporal => "Temporal",
            NodeCategory::Streaming => "Streaming",
            NodeCategory::Sink => "Sink",
        }
    }

    /// Returns a description of the category.
    pub const fn description(&self) -> &'static str {
        match self {
            NodeCategory::Source => "Image and table generators with piece and time support",
            NodeCategory::Filter => "Smoothing, merging and other per-request filters",
            NodeCategory::Temporal => "Forced-time caches and differences between time steps",
            NodeCategory::Streaming => "Filters that stream divisions through one output buffer",
            NodeCategory::Sink => "Terminal nodes that consume pipeline output",
        }
    }
}

/// One parameter accepted by a node type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    /// Name passed to `set_parameter`.
    pub name: &'static str,
    /// Value a freshly created node holds.
    pub default: &'static str,
    /// What the parameter controls and how it is written.
    pub description: &'static str,
}

/// Describes a node type in the registry.
#[derive(Debug, Clone)]
pub struct NodeDescriptor {
    /// Unique identifier for the node type (lowercase, no spaces).
    pub id: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    /// Brief description of the node.
    pub description: &'static str,
    /// Category for organization.
    pub category: NodeCategory,
    /// Accepted parameters.
    pub params: &'static [ParamSpec],
}

impl NodeDescriptor {
    /// Looks up a parameter by name.
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }
}

/// Errors from creating nodes through the registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No node type is registered under the id.
    #[error("unknown node type '{0}'")]
    UnknownNode(String),

    /// The node rejected a parameter.
    #[error("node type '{node}' rejected parameter '{param}': {message}")]
    InvalidParameter {
        /// Node type id.
        node: String,
        /// Parameter name.
        param: String,
        /// The node's own explanation.
        message: String,
    },
}

/// Factory function type for creating nodes.
type NodeFactory = fn() -> Box<dyn Algorithm>;

/// Internal entry in the registry.
struct RegistryEntry {
    descriptor: NodeDescriptor,
    factory: NodeFactory,
}

/// Registry of all available node types.
///
/// All built-in nodes from `sluice-filters` are registered by [`NodeRegistry::new`].
pub struct NodeRegistry {
    entries: Vec<RegistryEntry>,
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeRegistry {
    /// Creates a registry with all built-in nodes.
    pub fn new() -> Self {
        let mut registry = Self {
            entries: Vec::new(),
        };
        registry.register_builtin_nodes();
        registry
    }

    /// Creates a registry without any nodes.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn register_builtin_nodes(&mut self) {
        // Image source
        self.register(
            NodeDescriptor {
                id: "image_source",
                name: "Image Source",
                description: "Structured image generator with pieces, sub-extents and time steps",
                category: NodeCategory::Source,
                params: &[
                    ParamSpec {
                        name: "whole_extent",
                        default: "0 9 0 9 0 0",
                        description: "Six inclusive bounds \"x0 x1 y0 y1 z0 z1\"",
                    },
                    ParamSpec {
                        name: "time_steps",
                        default: "",
                        description: "Strictly ascending list \"0,1,2\"; empty for continuous time",
                    },
                    ParamSpec {
                        name: "time_range",
                        default: "",
                        description: "Continuous range \"lo,hi\" used without time steps",
                    },
                    ParamSpec {
                        name: "pattern",
                        default: "index",
                        description: "Cell values: index (linear index plus time) or wave",
                    },
                    ParamSpec {
                        name: "scale",
                        default: "1",
                        description: "Factor applied to every value",
                    },
                ],
            },
            || Box::new(ImageSource::default()),
        );

        // Table source
        self.register(
            NodeDescriptor {
                id: "table_source",
                name: "Table Source",
                description: "Unstructured row generator split by piece with ghost rows",
                category: NodeCategory::Source,
                params: &[
                    ParamSpec {
                        name: "rows",
                        default: "10",
                        description: "Total row count across all pieces",
                    },
                    ParamSpec {
                        name: "columns",
                        default: "index,double",
                        description: "Comma separated column names",
                    },
                ],
            },
            || Box::new(TableSource::default()),
        );

        // Box smooth
        self.register(
            NodeDescriptor {
                id: "box_smooth",
                name: "Box Smooth",
                description: "Mean over a cube of neighbours, requests a halo upstream",
                category: NodeCategory::Filter,
                params: &[ParamSpec {
                    name: "radius",
                    default: "1",
                    description: "Neighbourhood radius in cells",
                }],
            },
            || Box::new(BoxSmooth::default()),
        );

        // Append
        self.register(
            NodeDescriptor {
                id: "append",
                name: "Append",
                description: "Concatenates tables or pastes images from every connection",
                category: NodeCategory::Filter,
                params: &[ParamSpec {
                    name: "fill",
                    default: "0",
                    description: "Value for image cells no input covers",
                }],
            },
            || Box::new(Append::new()),
        );

        // Group
        self.register(
            NodeDescriptor {
                id: "group",
                name: "Group",
                description: "Collects every connection into one multi-block object",
                category: NodeCategory::Filter,
                params: &[],
            },
            || Box::new(Group::new()),
        );

        // Pass through
        self.register(
            NodeDescriptor {
                id: "pass_through",
                name: "Pass Through",
                description: "Shares its input unchanged, forwarding custom metadata",
                category: NodeCategory::Filter,
                params: &[],
            },
            || Box::new(PassThrough::new()),
        );

        // Force time
        self.register(
            NodeDescriptor {
                id: "force_time",
                name: "Force Time",
                description: "Pins upstream to one time step and caches the result",
                category: NodeCategory::Temporal,
                params: &[
                    ParamSpec {
                        name: "forced_time",
                        default: "0",
                        description: "Time requested upstream while forcing",
                    },
                    ParamSpec {
                        name: "ignore_pipeline_time",
                        default: "true",
                        description: "Force the time (true) or pass requests through (false)",
                    },
                ],
            },
            || Box::new(ForceTime::default()),
        );

        // Temporal difference
        self.register(
            NodeDescriptor {
                id: "temporal_difference",
                name: "Temporal Difference",
                description: "Image at the requested step minus an earlier step",
                category: NodeCategory::Temporal,
                params: &[ParamSpec {
                    name: "lag",
                    default: "1",
                    description: "Number of time steps back",
                }],
            },
            || Box::new(TemporalDifference::default()),
        );

        // Image streamer
        self.register(
            NodeDescriptor {
                id: "image_streamer",
                name: "Image Streamer",
                description: "Streams its update extent upstream in divisions",
                category: NodeCategory::Streaming,
                params: &[
                    ParamSpec {
                        name: "divisions",
                        default: "4",
                        description: "Number of upstream passes",
                    },
                    ParamSpec {
                        name: "split_mode",
                        default: "z",
                        description: "How divisions are cut: block, x, y or z",
                    },
                ],
            },
            || Box::new(ImageStreamer::default()),
        );

        // Probe
        self.register(
            NodeDescriptor {
                id: "probe",
                name: "Probe",
                description: "Records a summary of every input it receives",
                category: NodeCategory::Sink,
                params: &[],
            },
            || Box::new(Probe::new()),
        );
    }

    /// Registers a node type. A later registration with the same id replaces
    /// the earlier one.
    pub fn register(&mut self, descriptor: NodeDescriptor, factory: NodeFactory) {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.descriptor.id == descriptor.id)
        {
            *entry = RegistryEntry {
                descriptor,
                factory,
            };
            return;
        }
        self.entries.push(RegistryEntry {
            descriptor,
            factory,
        });
    }

    /// Returns all registered node types, in registration order.
    pub fn all_nodes(&self) -> Vec<&NodeDescriptor> {
        self.entries.iter().map(|e| &e.descriptor).collect()
    }

    /// Returns node types in a specific category.
    pub fn nodes_in_category(&self, category: NodeCategory) -> Vec<&NodeDescriptor> {
        self.entries
            .iter()
            .filter(|e| e.descriptor.category == category)
            .map(|e| &e.descriptor)
            .collect()
    }

    /// Gets a node descriptor by id.
    pub fn get(&self, id: &str) -> Option<&NodeDescriptor> {
        self.entries
            .iter()
            .find(|e| e.descriptor.id == id)
            .map(|e| &e.descriptor)
    }

    /// Creates a node with default parameters.
    ///
    /// Returns `None` if the id is not found.
    pub fn create_default(&self, id: &str) -> Option<Box<dyn Algorithm>> {
        self.entries
            .iter()
            .find(|e| e.descriptor.id == id)
            .map(|e| (e.factory)())
    }

    /// Creates a node and applies `params` in iteration order.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownNode`] for an unregistered id,
    /// [`RegistryError::InvalidParameter`] for the first parameter the node
    /// rejects.
    pub fn create<I, K, V>(&self, id: &str, params: I) -> Result<Box<dyn Algorithm>, RegistryError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut node = self
            .create_default(id)
            .ok_or_else(|| RegistryError::UnknownNode(id.to_string()))?;
        for (name, value) in params {
            let (name, value) = (name.as_ref(), value.as_ref());
            node.set_parameter(name, value)
                .map_err(|e| RegistryError::InvalidParameter {
                    node: id.to_string(),
                    param: name.to_string(),
                    message: e.to_string(),
                })?;
        }
        Ok(node)
    }

    /// Returns the number of registered node types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no node types are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
