//! Async boundary for hosting frameworks.
//!
//! Dispatch layers that expect asynchronous handlers can drive a
//! [`DiscoveryProxy`] through [`DiscoveryService`]. Every call completes on
//! first poll with the registry's synchronous result.
//!
//! ```
//! use std::sync::Arc;
//! use discovery_proxy::{DiscoveryProxy, DiscoveryService, EndpointMetadata, ResolveCriteria};
//!
//! # async fn run() -> discovery_proxy::Result<()> {
//! let proxy = Arc::new(DiscoveryProxy::new());
//! let hello = EndpointMetadata::new("http://host/calc").with_annotation("Name", "Calc");
//! proxy.on_online_announcement(hello).await?;
//!
//! let found = proxy.on_resolve(ResolveCriteria::new("http://host/calc")).await;
//! assert!(found.is_some());
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;

use crate::error::Result;
use crate::matcher::{Matches, ResolveCriteria};
use crate::metadata::EndpointMetadata;
use crate::registry::DiscoveryProxy;

/// Handler trait for decoded discovery messages.
///
/// Implemented by [`DiscoveryProxy`]; hosts may wrap it to add their own
/// fault translation.
#[async_trait]
pub trait DiscoveryService: Send + Sync {
    /// A Hello message arrived.
    async fn on_online_announcement(&self, metadata: EndpointMetadata) -> Result<()>;

    /// A Bye message arrived. `None` when the message carried no endpoint.
    async fn on_offline_announcement(&self, metadata: Option<EndpointMetadata>);

    /// A Probe arrived.
    async fn on_find(&self, criteria: &dyn Matches) -> Vec<EndpointMetadata>;

    /// A Resolve arrived.
    async fn on_resolve(&self, criteria: ResolveCriteria) -> Option<EndpointMetadata>;
}

#[async_trait]
impl DiscoveryService for DiscoveryProxy {
    async fn on_online_announcement(&self, metadata: EndpointMetadata) -> Result<()> {
        self.register_online(metadata)
    }

    async fn on_offline_announcement(&self, metadata: Option<EndpointMetadata>) {
        if let Some(metadata) = metadata {
            self.register_offline(&metadata);
        }
    }

    async fn on_find(&self, criteria: &dyn Matches) -> Vec<EndpointMetadata> {
        self.find(criteria)
    }

    async fn on_resolve(&self, criteria: ResolveCriteria) -> Option<EndpointMetadata> {
        self.resolve(&criteria)
    }
}
