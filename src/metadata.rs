//! Endpoint metadata as handed over by the protocol layer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A network address identifying a discoverable endpoint.
///
/// Compared as an opaque string; the protocol layer is responsible for
/// normalising URIs before they reach the registry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndpointAddress(String);

impl EndpointAddress {
    /// Create an address from any string-like value.
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    /// The address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EndpointAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EndpointAddress {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for EndpointAddress {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A single name/value extension element attached to an announcement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// Local name of the element.
    pub name: String,
    /// Text content of the element.
    pub value: String,
}

impl Annotation {
    /// Create an annotation.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Everything the registry knows about one announced endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointMetadata {
    /// Nominal address from the announcement.
    pub address: EndpointAddress,
    /// Addresses the endpoint actually listens on, if declared.
    #[serde(default)]
    pub listen_addresses: Vec<EndpointAddress>,
    /// Qualified contract type names, in announcement order.
    #[serde(default)]
    pub contract_types: Vec<String>,
    /// Scope URIs the endpoint belongs to.
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Open extension elements, in announcement order.
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl EndpointMetadata {
    /// Create metadata with only a nominal address.
    pub fn new(address: impl Into<EndpointAddress>) -> Self {
        Self {
            address: address.into(),
            listen_addresses: Vec::new(),
            contract_types: Vec::new(),
            scopes: Vec::new(),
            annotations: Vec::new(),
        }
    }

    /// Add a listen address.
    pub fn with_listen_address(mut self, address: impl Into<EndpointAddress>) -> Self {
        self.listen_addresses.push(address.into());
        self
    }

    /// Add a contract type name.
    pub fn with_contract_type(mut self, contract: impl Into<String>) -> Self {
        self.contract_types.push(contract.into());
        self
    }

    /// Add a scope URI.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scopes.push(scope.into());
        self
    }

    /// Add an annotation.
    pub fn with_annotation(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.push(Annotation::new(name, value));
        self
    }

    /// The address the registry keys this endpoint under.
    ///
    /// A first listen address that differs from the nominal address wins;
    /// otherwise the nominal address is used.
    pub fn effective_address(&self) -> &EndpointAddress {
        match self.listen_addresses.first() {
            Some(listen) if *listen != self.address => listen,
            _ => &self.address,
        }
    }

    /// First contract type, used to label log events.
    pub fn primary_contract(&self) -> Option<&str> {
        self.contract_types.first().map(String::as_str)
    }

    /// Value of the first annotation with the given name.
    pub fn annotation(&self, name: &str) -> Option<&str> {
        self.annotations
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// True if any annotation carries exactly this value, whatever its name.
    pub fn has_annotation_value(&self, value: &str) -> bool {
        self.annotations.iter().any(|a| a.value == value)
    }
}
