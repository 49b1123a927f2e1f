//! Scaleway Provider
//!
//! Scaleway REST API provider built on the reconciliation engine of
//! `scw-core`.
//!
//! ## Module Structure
//!
//! - `config` - Credentials, defaults, and the Scaleway config file
//! - `client` - HTTP client and API error mapping
//! - `api` - Typed endpoints per Scaleway product
//! - `resources` - One resource handler per supported resource type
//! - `provider` - ScwProvider, dispatching to the handlers
//! - `util` - Naming and ownership helpers shared by handlers

pub mod api;
pub mod client;
pub mod config;
pub mod provider;
pub mod resources;
pub mod util;

// Re-export main types
pub use client::ScwClient;
pub use config::{ConfigError, ScwConfig};
pub use provider::ScwProvider;

use scw_core::provider::{BoxFuture, Provider, ProviderResult, ResourceType};
use scw_core::resource::{Resource, ResourceId, State};

// =============================================================================
// Provider Trait Implementation
// =============================================================================

impl Provider for ScwProvider {
    fn name(&self) -> &'static str {
        "scaleway"
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        self.supported_types()
    }

    fn read<'a>(&'a self, state: &'a mut State) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            let reconciler = self
                .reconciler(&state.id.resource_type)
                .map_err(|e| e.for_resource(state.id.clone()))?;
            reconciler.read(state).await
        })
    }

    fn lookup<'a>(&'a self, resource: &'a Resource) -> BoxFuture<'a, ProviderResult<State>> {
        Box::pin(async move {
            let reconciler = self
                .reconciler(&resource.id.resource_type)
                .map_err(|e| e.for_resource(resource.id.clone()))?;
            reconciler.lookup(resource).await
        })
    }

    fn create<'a>(
        &'a self,
        resource: &'a Resource,
        state: &'a mut State,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            let reconciler = self
                .reconciler(&resource.id.resource_type)
                .map_err(|e| e.for_resource(resource.id.clone()))?;
            reconciler.create(resource, state).await
        })
    }

    fn update<'a>(
        &'a self,
        to: &'a Resource,
        changed: &'a [String],
        state: &'a mut State,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            let reconciler = self
                .reconciler(&to.id.resource_type)
                .map_err(|e| e.for_resource(to.id.clone()))?;
            reconciler.update(to, changed, state).await
        })
    }

    fn delete<'a>(&'a self, state: &'a mut State) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            let reconciler = self
                .reconciler(&state.id.resource_type)
                .map_err(|e| e.for_resource(state.id.clone()))?;
            reconciler.delete(state).await
        })
    }

    fn import<'a>(
        &'a self,
        id: &'a ResourceId,
        identifier: &'a str,
    ) -> BoxFuture<'a, ProviderResult<State>> {
        Box::pin(async move {
            let reconciler = self
                .reconciler(&id.resource_type)
                .map_err(|e| e.for_resource(id.clone()))?;
            reconciler.import(id, identifier).await
        })
    }
}
