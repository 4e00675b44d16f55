//! Pipeline description file format and operations.

use serde::{Deserialize, Serialize};
use sluice_core::{
    DEFAULT_MAX_CONTINUE_ITERATIONS, ExecutiveOptions, Extent, SplitMode, TimeSnap, UpdateRequest,
};
use sluice_registry::NodeRegistry;
use std::path::Path;

use crate::build::BuiltPipeline;
use crate::error::ConfigError;
use crate::node_config::{ConnectionConfig, NodeConfig};
use crate::validation::{ValidationError, ValidationResult};

/// A pipeline stored as TOML: nodes, connections, executive options and the
/// request to update with.
///
/// # TOML Format
///
/// ```toml
/// name = "Smoothed slabs"
/// description = "Streams a smoothed image in four z slabs"
///
/// [executive]
/// max_continue_iterations = 100
/// split_mode = "block"
///
/// [update]
/// sink = "probe"
/// time = 1.5
///
/// [[nodes]]
/// id = "src"
/// type = "image_source"
/// [nodes.params]
/// whole_extent = "0 31 0 31 0 7"
/// time_steps = "0,1,2"
///
/// [[nodes]]
/// id = "smooth"
/// type = "box_smooth"
///
/// [[nodes]]
/// id = "probe"
/// type = "probe"
///
/// [[connections]]
/// from = "src"
/// to = "smooth"
///
/// [[connections]]
/// from = "smooth"
/// to = "probe"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    /// Name of the pipeline.
    pub name: String,

    /// Optional description of the pipeline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Executive options.
    #[serde(default)]
    pub executive: ExecutiveConfig,

    /// Request applied when the pipeline is updated.
    #[serde(default)]
    pub update: UpdateConfig,

    /// Nodes, in creation order.
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,

    /// Edges, applied in order.
    #[serde(default)]
    pub connections: Vec<ConnectionConfig>,
}

/// The `[executive]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExecutiveConfig {
    /// Continue requests accepted from one node per update.
    pub max_continue_iterations: u32,
    /// Split mode for sub-extent translation: block, x, y or z.
    pub split_mode: String,
    /// How requested times snap to time steps: nearest, below or above.
    pub time_snap: String,
}

impl Default for ExecutiveConfig {
    fn default() -> Self {
        Self {
            max_continue_iterations: DEFAULT_MAX_CONTINUE_ITERATIONS,
            split_mode: "block".to_string(),
            time_snap: "nearest".to_string(),
        }
    }
}

impl ExecutiveConfig {
    /// Parses the section into executive options.
    pub fn to_options(&self) -> ValidationResult<ExecutiveOptions> {
        let mut errors = Vec::new();
        let split_mode = self.split_mode.parse::<SplitMode>().map_err(|_| {
            errors.push(ValidationError::InvalidExecutive {
                field: "split_mode".to_string(),
                reason: format!("'{}' is not one of block, x, y, z", self.split_mode),
            });
        });
        let time_snap = self.time_snap.parse::<TimeSnap>().map_err(|_| {
            errors.push(ValidationError::InvalidExecutive {
                field: "time_snap".to_string(),
                reason: format!("'{}' is not one of nearest, below, above", self.time_snap),
            });
        });
        match (split_mode, time_snap) {
            (Ok(split_mode), Ok(time_snap)) => Ok(ExecutiveOptions {
                max_continue_iterations: self.max_continue_iterations,
                split_mode,
                time_snap,
                ..ExecutiveOptions::default()
            }),
            _ => ValidationError::from_list(errors).map(|()| ExecutiveOptions::default()),
        }
    }
}

/// The `[update]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UpdateConfig {
    /// Node to update. Without it the pipeline's sinks are updated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sink: Option<String>,
    /// Piece index.
    pub piece: u32,
    /// Piece count.
    pub pieces: u32,
    /// Ghost levels around the piece.
    pub ghost_levels: u32,
    /// Requested time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
    /// Explicit update extent, `"x0 x1 y0 y1 z0 z1"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extent: Option<String>,
    /// Forbid ghost growth beyond the requested extent.
    pub exact: bool,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            sink: None,
            piece: 0,
            pieces: 1,
            ghost_levels: 0,
            time: None,
            extent: None,
            exact: false,
        }
    }
}

impl UpdateConfig {
    /// Parses the section into an update request.
    pub fn to_request(&self) -> ValidationResult<UpdateRequest> {
        let mut errors = Vec::new();
        if self.pieces == 0 {
            errors.push(ValidationError::InvalidUpdate {
                field: "pieces".to_string(),
                reason: "must be at least 1".to_string(),
            });
        } else if self.piece >= self.pieces {
            errors.push(ValidationError::InvalidUpdate {
                field: "piece".to_string(),
                reason: format!("piece {} of {} is out of range", self.piece, self.pieces),
            });
        }
        if let Some(t) = self.time
            && !t.is_finite()
        {
            errors.push(ValidationError::InvalidUpdate {
                field: "time".to_string(),
                reason: format!("{t} is not a finite time"),
            });
        }
        let extent = match self.extent.as_deref().map(str::parse::<Extent>) {
            Some(Ok(extent)) => Some(extent),
            Some(Err(_)) => {
                errors.push(ValidationError::InvalidUpdate {
                    field: "extent".to_string(),
                    reason: format!(
                        "'{}' is not \"x0 x1 y0 y1 z0 z1\"",
                        self.extent.as_deref().unwrap_or_default()
                    ),
                });
                None
            }
            None => None,
        };
        ValidationError::from_list(errors)?;

        let mut request = UpdateRequest::new()
            .with_piece(self.piece, self.pieces)
            .with_ghost_levels(self.ghost_levels);
        if let Some(extent) = extent {
            request = request.with_extent(extent);
        }
        if let Some(t) = self.time {
            request = request.with_time(t);
        }
        if self.exact {
            request = request.exact();
        }
        Ok(request)
    }
}

impl PipelineConfig {
    /// Create a new empty pipeline description.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            executive: ExecutiveConfig::default(),
            update: UpdateConfig::default(),
            nodes: Vec::new(),
            connections: Vec::new(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a node.
    pub fn with_node(mut self, node: NodeConfig) -> Self {
        self.nodes.push(node);
        self
    }

    /// Add a connection.
    pub fn with_connection(mut self, connection: ConnectionConfig) -> Self {
        self.connections.push(connection);
        self
    }

    /// Replace the update section.
    pub fn with_update(mut self, update: UpdateConfig) -> Self {
        self.update = update;
        self
    }

    /// Load a description from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read(path, e))?;
        Self::from_toml_str(&content)
    }

    /// Load a description from a TOML string.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the description to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = self.to_toml_string()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write(path, e))?;
        Ok(())
    }

    /// Convert the description to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Get a node entry by id.
    pub fn node(&self, id: &str) -> Option<&NodeConfig> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Check every node, connection and setting against `registry`.
    pub fn validate(&self, registry: &NodeRegistry) -> ValidationResult<()> {
        crate::validation::validate_config(self, registry)
    }

    /// Create the live pipeline.
    pub fn build(&self, registry: &NodeRegistry) -> Result<BuiltPipeline, ConfigError> {
        Ok(crate::build::assemble(self, registry)?)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
name = "sample"

[executive]
max_continue_iterations = 8
split_mode = "z"

[update]
sink = "probe"
piece = 1
pieces = 4
ghost_levels = 2
time = 0.5

[[nodes]]
id = "src"
type = "image_source"
[nodes.params]
whole_extent = "0 7 0 7 0 0"

[[nodes]]
id = "probe"
type = "probe"

[[connections]]
from = "src"
to = "probe"
"#;

    #[test]
    fn test_parse_sample() {
        let config = PipelineConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.name, "sample");
        assert!(config.description.is_none());
        assert_eq!(config.nodes.len(), 2);
        assert_eq!(config.node("src").unwrap().get_param("whole_extent"), Some("0 7 0 7 0 0"));
        assert_eq!(config.connections[0], ConnectionConfig::new("src", "probe"));
        assert_eq!(config.update.sink.as_deref(), Some("probe"));
        assert_eq!(config.executive.time_snap, "nearest");
    }

    #[test]
    fn test_sections_default() {
        let config = PipelineConfig::from_toml_str("name = \"bare\"").unwrap();
        assert_eq!(config.executive, ExecutiveConfig::default());
        assert_eq!(config.update, UpdateConfig::default());
        assert!(config.nodes.is_empty());
    }

    #[test]
    fn test_executive_to_options() {
        let config = PipelineConfig::from_toml_str(SAMPLE).unwrap();
        let options = config.executive.to_options().unwrap();
        assert_eq!(options.max_continue_iterations, 8);
        assert_eq!(options.split_mode, SplitMode::ZSlab);
        assert_eq!(options.time_snap, TimeSnap::Nearest);

        let bad = ExecutiveConfig {
            split_mode: "diagonal".to_string(),
            time_snap: "sideways".to_string(),
            ..ExecutiveConfig::default()
        };
        assert_eq!(bad.to_options().unwrap_err().count(), 2);
    }

    #[test]
    fn test_update_to_request() {
        let config = PipelineConfig::from_toml_str(SAMPLE).unwrap();
        let request = config.update.to_request().unwrap();
        assert_eq!(
            request,
            UpdateRequest::new().with_piece(1, 4).with_ghost_levels(2).with_time(0.5)
        );

        let update = UpdateConfig {
            extent: Some("0 3 0 3 0 0".to_string()),
            exact: true,
            ..UpdateConfig::default()
        };
        let request = update.to_request().unwrap();
        assert_eq!(request.extent, Some(Extent::new_2d(0, 3, 0, 3)));
        assert!(request.exact);
    }

    #[test]
    fn test_update_rejects_bad_values() {
        let update = UpdateConfig {
            piece: 4,
            pieces: 4,
            extent: Some("0 1 2".to_string()),
            ..UpdateConfig::default()
        };
        let err = update.to_request().unwrap_err();
        assert_eq!(err.count(), 2);

        let update = UpdateConfig {
            pieces: 0,
            ..UpdateConfig::default()
        };
        assert!(matches!(
            update.to_request(),
            Err(ValidationError::InvalidUpdate { field, .. }) if field == "pieces"
        ));
    }

    #[test]
    fn test_toml_string_round_trip() {
        let config = PipelineConfig::new("built")
            .with_description("made in code")
            .with_node(NodeConfig::new("t", "table_source").with_param("rows", "3"))
            .with_node(NodeConfig::new("p", "probe"))
            .with_connection(ConnectionConfig::new("t", "p"));
        let text = config.to_toml_string().unwrap();
        assert_eq!(PipelineConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            PipelineConfig::from_toml_str("name = "),
            Err(ConfigError::Parse(_))
        ));
    }
}
