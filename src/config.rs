//! Proxy configuration.

use serde::{Deserialize, Serialize};

/// Annotation names the registry recognises.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationKeys {
    /// Logical service name.
    pub name: String,
    /// Logical name of the owning parent.
    pub parent: String,
    /// Whitespace-separated list of owned child names.
    pub children: String,
    /// Replica ordinal written by the registry.
    pub id: String,
}

impl Default for AnnotationKeys {
    fn default() -> Self {
        Self {
            name: "Name".to_string(),
            parent: "Parent".to_string(),
            children: "Children".to_string(),
            id: "ID".to_string(),
        }
    }
}

/// Configuration for a [`DiscoveryProxy`](crate::DiscoveryProxy).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Annotation names to read and write.
    pub keys: AnnotationKeys,
    /// Drop a previous top-level endpoint with the same `Name` when a new one
    /// announces at a different address.
    pub supersede_by_name: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            keys: AnnotationKeys::default(),
            supersede_by_name: true,
        }
    }
}

impl ProxyConfig {
    /// Replace the annotation names. Default: `Name`, `Parent`, `Children`, `ID`.
    pub fn keys(mut self, keys: AnnotationKeys) -> Self {
        self.keys = keys;
        self
    }

    /// Toggle name-based supersession. Default: `true`.
    pub fn supersede_by_name(mut self, enabled: bool) -> Self {
        self.supersede_by_name = enabled;
        self
    }
}
