//! Scaleway Provider implementation
//!
//! Dispatches each resource to the reconciler of its type.

use std::collections::HashMap;

use scw_core::provider::{ProviderError, ProviderResult, ResourceType};
use scw_core::reconciler::Lifecycle;
use scw_core::schema::ResourceSchema;
use tokio_util::sync::CancellationToken;

use crate::client::ScwClient;
use crate::config::ScwConfig;
use crate::resources::reconcilers;

/// Resource type backed by a reconciler's schema
struct ScwResourceType {
    name: &'static str,
    schema: ResourceSchema,
}

impl ResourceType for ScwResourceType {
    fn name(&self) -> &'static str {
        self.name
    }

    fn schema(&self) -> ResourceSchema {
        self.schema.clone()
    }
}

/// Scaleway Provider
pub struct ScwProvider {
    config: ScwConfig,
    reconcilers: HashMap<&'static str, Box<dyn Lifecycle>>,
    cancel: CancellationToken,
}

impl ScwProvider {
    pub fn new(config: ScwConfig) -> ProviderResult<Self> {
        Self::with_cancellation(config, CancellationToken::new())
    }

    /// Waits in progress end with a `Cancelled` error once `cancel` fires
    pub fn with_cancellation(config: ScwConfig, cancel: CancellationToken) -> ProviderResult<Self> {
        config.validate()?;
        let client = ScwClient::new(&config)?;
        let reconcilers = reconcilers(&client, &config, &cancel)
            .into_iter()
            .map(|r| (r.resource_type(), r))
            .collect();
        log::debug!(
            "scaleway provider ready (region {}, zone {})",
            config.default_region,
            config.default_zone
        );
        Ok(Self {
            config,
            reconcilers,
            cancel,
        })
    }

    /// Provider built from the environment and the Scaleway config file
    pub fn from_env() -> ProviderResult<Self> {
        Self::new(ScwConfig::load()?)
    }

    pub fn config(&self) -> &ScwConfig {
        &self.config
    }

    /// Abort every wait in progress
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Schemas of every supported resource type, keyed by type name
    pub fn schemas(&self) -> HashMap<String, ResourceSchema> {
        self.reconcilers
            .iter()
            .map(|(name, r)| (name.to_string(), r.schema()))
            .collect()
    }

    pub(crate) fn reconciler(&self, resource_type: &str) -> ProviderResult<&dyn Lifecycle> {
        self.reconcilers
            .get(resource_type)
            .map(|r| r.as_ref())
            .ok_or_else(|| {
                ProviderError::validation(format!("unsupported resource type: {}", resource_type))
            })
    }

    pub(crate) fn supported_types(&self) -> Vec<Box<dyn ResourceType>> {
        let mut types: Vec<Box<dyn ResourceType>> = self
            .reconcilers
            .values()
            .map(|r| {
                Box::new(ScwResourceType {
                    name: r.resource_type(),
                    schema: r.schema(),
                }) as Box<dyn ResourceType>
            })
            .collect();
        types.sort_by_key(|t| t.name());
        types
    }
}
