//! Node and connection entries of a pipeline description.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One node of a pipeline.
///
/// # Example
///
/// ```rust
/// use sluice_config::NodeConfig;
///
/// let config = NodeConfig::new("smooth", "box_smooth").with_param("radius", "2");
///
/// assert_eq!(config.node_type, "box_smooth");
/// assert_eq!(config.get_param("radius"), Some("2"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeConfig {
    /// Name other entries refer to this node by.
    pub id: String,

    /// Registry id of the node type (e.g., "image_source").
    #[serde(rename = "type")]
    pub node_type: String,

    /// Parameters as key-value pairs, applied in key order.
    /// Values are strings parsed by the node (numbers, lists, extents).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
}

impl NodeConfig {
    /// Create a node entry without parameters.
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            params: BTreeMap::new(),
        }
    }

    /// Add a parameter to the entry.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Raw string value of `key`, if set.
    pub fn get_param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Sets or replaces `key`.
    pub fn set_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), value.into());
    }
}

/// One edge of a pipeline, from an output port to an input port.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Producing node id.
    pub from: String,

    /// Consuming node id.
    pub to: String,

    /// Output port on the producer.
    #[serde(default)]
    pub from_port: usize,

    /// Input port on the consumer.
    #[serde(default)]
    pub to_port: usize,
}

impl ConnectionConfig {
    /// Connection between port 0 of both nodes.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            from_port: 0,
            to_port: 0,
        }
    }

    /// Use other ports.
    pub fn with_ports(mut self, from_port: usize, to_port: usize) -> Self {
        self.from_port = from_port;
        self.to_port = to_port;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_config_params() {
        let mut config = NodeConfig::new("src", "image_source").with_param("scale", "2");
        assert_eq!(config.get_param("scale"), Some("2"));
        config.set_param("scale", "3");
        assert_eq!(config.get_param("scale"), Some("3"));
        assert_eq!(config.get_param("pattern"), None);
    }

    #[test]
    fn test_node_config_serde_uses_type_key() {
        let config = NodeConfig::new("src", "table_source").with_param("rows", "4");
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("type = \"table_source\""), "got: {toml_str}");

        let parsed: NodeConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_connection_ports_default_to_zero() {
        let conn: ConnectionConfig = toml::from_str("from = \"a\"\nto = \"b\"").unwrap();
        assert_eq!(conn, ConnectionConfig::new("a", "b"));
        let conn = ConnectionConfig::new("a", "b").with_ports(1, 2);
        assert_eq!((conn.from_port, conn.to_port), (1, 2));
    }
}
