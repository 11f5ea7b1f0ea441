//! In-memory discovery proxy: absorbs online/offline announcements, numbers
//! replicated child services under their parent, and answers find and
//! resolve queries.

#![deny(missing_docs)]

pub mod annotations;
pub mod config;
mod counters;
pub mod error;
pub mod matcher;
pub mod metadata;
pub mod registry;
pub mod service;

// Re-export key types
pub use annotations::ServiceAnnotations;
pub use config::{AnnotationKeys, ProxyConfig};
pub use error::{Error, Result};
pub use matcher::{FindCriteria, Matches, ResolveCriteria, ScopeMatchBy};
pub use metadata::{Annotation, EndpointAddress, EndpointMetadata};
pub use registry::DiscoveryProxy;
pub use service::DiscoveryService;
