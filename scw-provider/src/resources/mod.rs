//! Resource handlers for Scaleway products
//!
//! Each submodule implements [`ResourceHandler`] for one resource type:
//! its schema, its remote calls, and how its entity flattens into tracked
//! attributes. The shared create / read / update / delete control flow lives
//! in [`Reconciler`].

use std::collections::HashMap;

use scw_core::identifier::CompositeId;
use scw_core::locality::{Locality, Region, Zone};
use scw_core::provider::{ErrorKind, ProviderError, ProviderResult};
use scw_core::reconciler::{Lifecycle, Reconciler, ResourceHandler};
use scw_core::resource::Value;
use tokio_util::sync::CancellationToken;

use crate::client::ScwClient;
use crate::config::ScwConfig;
use crate::util::Ownership;

pub mod documentdb_database;
pub mod flexible_ip;
pub mod iam_application;
pub mod instance_server;
pub mod instance_volume;
pub mod k8s_cluster;
pub mod kafka_cluster;
pub mod lb;
pub mod vpc_private_network;
pub mod vpc_public_gateway;

/// One type-erased reconciler per supported resource type
pub fn reconcilers(
    client: &ScwClient,
    config: &ScwConfig,
    cancel: &CancellationToken,
) -> Vec<Box<dyn Lifecycle>> {
    let ownership = Ownership::from_config(config);

    fn wrap<H: ResourceHandler + 'static>(
        handler: H,
        config: &ScwConfig,
        cancel: &CancellationToken,
    ) -> Box<dyn Lifecycle> {
        Box::new(
            Reconciler::new(handler, config.locality_defaults())
                .with_wait_config(config.wait_config())
                .with_cancellation(cancel.clone()),
        )
    }

    vec![
        wrap(
            instance_server::ServerHandler::new(client.clone(), ownership.clone()),
            config,
            cancel,
        ),
        wrap(
            instance_volume::VolumeHandler::new(client.clone(), ownership.clone()),
            config,
            cancel,
        ),
        wrap(
            vpc_public_gateway::PublicGatewayHandler::new(client.clone(), ownership.clone()),
            config,
            cancel,
        ),
        wrap(
            flexible_ip::FlexibleIpHandler::new(client.clone(), ownership.clone()),
            config,
            cancel,
        ),
        wrap(
            vpc_private_network::PrivateNetworkHandler::new(client.clone(), ownership.clone()),
            config,
            cancel,
        ),
        wrap(
            k8s_cluster::ClusterHandler::new(client.clone(), ownership.clone()),
            config,
            cancel,
        ),
        wrap(
            kafka_cluster::KafkaClusterHandler::new(client.clone(), ownership.clone()),
            config,
            cancel,
        ),
        wrap(
            lb::LbHandler::new(client.clone(), ownership.clone()),
            config,
            cancel,
        ),
        wrap(
            iam_application::ApplicationHandler::new(client.clone(), ownership),
            config,
            cancel,
        ),
        wrap(
            documentdb_database::DatabaseHandler::new(client.clone()),
            config,
            cancel,
        ),
    ]
}

// =============================================================================
// Locality helpers
// =============================================================================

/// Zone a zonal create was resolved to
pub(crate) fn zone_arg(locality: Option<&Locality>) -> ProviderResult<Zone> {
    locality
        .and_then(Locality::zone)
        .cloned()
        .ok_or_else(|| ProviderError::with_kind(ErrorKind::State, "zonal resource without a zone"))
}

/// Region a regional create was resolved to
pub(crate) fn region_arg(locality: Option<&Locality>) -> ProviderResult<Region> {
    locality.map(Locality::region).ok_or_else(|| {
        ProviderError::with_kind(ErrorKind::State, "regional resource without a region")
    })
}

pub(crate) fn zone_of(id: &CompositeId) -> ProviderResult<Zone> {
    match id.locality() {
        Some(Locality::Zonal(zone)) => Ok(zone),
        _ => Err(ProviderError::with_kind(
            ErrorKind::MalformedIdentifier,
            format!("'{}' is not a zonal identifier", id),
        )),
    }
}

pub(crate) fn region_of(id: &CompositeId) -> ProviderResult<Region> {
    id.locality().map(|l| l.region()).ok_or_else(|| {
        ProviderError::with_kind(
            ErrorKind::MalformedIdentifier,
            format!("'{}' carries no region", id),
        )
    })
}

// =============================================================================
// Flattening helpers
// =============================================================================

/// Attribute map builder used by the `flatten` implementations
#[derive(Default)]
pub(crate) struct Flattened(HashMap<String, Value>);

impl Flattened {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn string(mut self, key: &str, value: impl Into<String>) -> Self {
        self.0.insert(key.to_string(), Value::String(value.into()));
        self
    }

    /// Skips the attribute when `value` is `None` or empty
    pub fn optional(mut self, key: &str, value: Option<&str>) -> Self {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            self.0.insert(key.to_string(), Value::string(value));
        }
        self
    }

    pub fn int(mut self, key: &str, value: i64) -> Self {
        self.0.insert(key.to_string(), Value::Int(value));
        self
    }

    pub fn bool(mut self, key: &str, value: bool) -> Self {
        self.0.insert(key.to_string(), Value::Bool(value));
        self
    }

    pub fn strings(mut self, key: &str, values: &[String]) -> Self {
        self.0.insert(key.to_string(), crate::util::strings_value(values));
        self
    }

    pub fn build(self) -> HashMap<String, Value> {
        self.0
    }
}
