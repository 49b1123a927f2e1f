//! kafka_cluster - Managed Kafka clusters (regional, asynchronous)
//!
//! Only `name` and `tags` change in place. The admin `user_name` and
//! `password` are sent at create time and never read back.

use std::collections::HashMap;
use std::time::Duration;

use scw_core::datasource::ListFilter;
use scw_core::identifier::{CompositeId, IdScope};
use scw_core::locality::Locality;
use scw_core::provider::{BoxFuture, ProviderError, ProviderResult};
use scw_core::reconciler::ResourceHandler;
use scw_core::resource::{Attributes, Resource, Value};
use scw_core::schema::{AttributeSchema, AttributeType, ResourceSchema, suppress, types};
use scw_core::waiter::TerminalStatuses;

use super::{Flattened, region_arg, region_of};
use crate::api::kafka::{
    CreateKafkaClusterRequest, KafkaApi, KafkaCluster, KafkaEndpoint, KafkaStatus, KafkaVolume,
    PrivateNetworkRef,
};
use crate::client::ScwClient;
use crate::util::{Ownership, expanded_id, name_or_generate, patch_field, string_list};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20 * 60);
const RETRY_INTERVAL: Duration = Duration::from_secs(15);

const DEFAULT_VOLUME_TYPE: &str = "sbs_5k";
const BYTES_PER_GB: u64 = 1_000_000_000;

fn required<'r>(resource: &'r Resource, key: &str) -> ProviderResult<&'r str> {
    resource
        .get_str(key)
        .ok_or_else(|| ProviderError::validation(format!("{} is required", key)))
}

fn node_amount(resource: &Resource) -> ProviderResult<u32> {
    let amount = resource
        .get_int("node_amount")
        .ok_or_else(|| ProviderError::validation("node_amount is required"))?;
    u32::try_from(amount)
        .map_err(|_| ProviderError::validation(format!("invalid node_amount {}", amount)))
}

fn volume_bytes(resource: &Resource) -> ProviderResult<u64> {
    let gb = resource
        .get_int("volume_size_in_gb")
        .ok_or_else(|| ProviderError::validation("volume_size_in_gb is required"))?;
    u64::try_from(gb)
        .ok()
        .and_then(|gb| gb.checked_mul(BYTES_PER_GB))
        .ok_or_else(|| ProviderError::validation(format!("invalid volume size {} GB", gb)))
}

pub struct KafkaClusterHandler {
    api: KafkaApi,
    ownership: Ownership,
}

impl KafkaClusterHandler {
    pub fn new(client: ScwClient, ownership: Ownership) -> Self {
        Self {
            api: KafkaApi::new(client),
            ownership,
        }
    }

    fn request(&self, resource: &Resource) -> ProviderResult<CreateKafkaClusterRequest> {
        let endpoints = expanded_id(resource, "private_network_id")
            .map(|private_network_id| KafkaEndpoint {
                private_network: Some(PrivateNetworkRef { private_network_id }),
                dns_records: Vec::new(),
                port: 0,
            })
            .into_iter()
            .collect();
        Ok(CreateKafkaClusterRequest {
            project_id: self.ownership.project_id(resource)?,
            name: name_or_generate(resource, "kafka"),
            version: required(resource, "version")?.to_string(),
            tags: string_list(resource, "tags"),
            node_amount: node_amount(resource)?,
            node_type: required(resource, "node_type")?.to_string(),
            user_name: required(resource, "user_name")?.to_string(),
            password: required(resource, "password")?.to_string(),
            volume: KafkaVolume {
                volume_type: resource
                    .get_str("volume_type")
                    .unwrap_or(DEFAULT_VOLUME_TYPE)
                    .to_string(),
                size_bytes: volume_bytes(resource)?,
            },
            endpoints,
        })
    }
}

impl ResourceHandler for KafkaClusterHandler {
    type Entity = KafkaCluster;

    fn resource_type(&self) -> &'static str {
        "kafka_cluster"
    }

    fn scope(&self) -> IdScope {
        IdScope::Regional
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new("kafka_cluster")
            .with_description("Managed Kafka cluster")
            .attribute(AttributeSchema::new("name", AttributeType::String))
            .attribute(AttributeSchema::new("version", AttributeType::String).required().force_new())
            .attribute(
                AttributeSchema::new("node_amount", types::positive_int())
                    .required()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("node_type", AttributeType::String)
                    .required()
                    .force_new()
                    .with_diff_suppress(suppress::ignore_case),
            )
            .attribute(
                AttributeSchema::new("volume_type", AttributeType::String)
                    .force_new()
                    .with_default(Value::string(DEFAULT_VOLUME_TYPE)),
            )
            .attribute(
                AttributeSchema::new("volume_size_in_gb", types::positive_int())
                    .required()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("user_name", AttributeType::String)
                    .required()
                    .force_new()
                    .write_only(),
            )
            .attribute(
                AttributeSchema::new("password", AttributeType::String)
                    .required()
                    .force_new()
                    .write_only(),
            )
            .attribute(AttributeSchema::new("tags", types::string_list()))
            .attribute(
                AttributeSchema::new("private_network_id", types::uuid_or_localized_uuid())
                    .force_new()
                    .with_diff_suppress(suppress::ignore_locality),
            )
            .attribute(AttributeSchema::new("region", types::region()).force_new())
            .attribute(AttributeSchema::new("project_id", types::uuid()).force_new())
            .attribute(AttributeSchema::new("organization_id", AttributeType::String).computed())
            .attribute(AttributeSchema::new("status", AttributeType::String).computed())
            .attribute(AttributeSchema::new("created_at", AttributeType::String).computed())
            .attribute(AttributeSchema::new("updated_at", AttributeType::String).computed())
    }

    fn timeout(&self) -> Duration {
        DEFAULT_TIMEOUT
    }

    fn retry_interval(&self) -> Duration {
        RETRY_INTERVAL
    }

    fn terminal_statuses(&self) -> Option<TerminalStatuses<KafkaStatus>> {
        Some(TerminalStatuses::new(
            vec![KafkaStatus::Ready, KafkaStatus::Stopped],
            vec![KafkaStatus::Error, KafkaStatus::Locked],
        ))
    }

    fn create<'a>(
        &'a self,
        locality: Option<&'a Locality>,
        resource: &'a Resource,
    ) -> BoxFuture<'a, ProviderResult<KafkaCluster>> {
        Box::pin(async move {
            let region = region_arg(locality)?;
            let request = self.request(resource)?;
            self.api.create_cluster(&region, &request).await
        })
    }

    fn get<'a>(&'a self, id: &'a CompositeId) -> BoxFuture<'a, ProviderResult<KafkaCluster>> {
        Box::pin(async move { self.api.get_cluster(&region_of(id)?, id.id()).await })
    }

    fn update<'a>(
        &'a self,
        id: &'a CompositeId,
        to: &'a Resource,
        changed: &'a [String],
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            let mut patch = serde_json::Map::new();
            patch_field(&mut patch, changed, "name", "name", || {
                serde_json::json!(name_or_generate(to, "kafka"))
            });
            patch_field(&mut patch, changed, "tags", "tags", || {
                serde_json::json!(string_list(to, "tags"))
            });
            if patch.is_empty() {
                return Ok(());
            }
            self.api
                .update_cluster(&region_of(id)?, id.id(), &serde_json::Value::Object(patch))
                .await?;
            Ok(())
        })
    }

    fn delete<'a>(&'a self, id: &'a CompositeId) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move { self.api.delete_cluster(&region_of(id)?, id.id()).await })
    }

    fn flatten(&self, id: &CompositeId, cluster: &KafkaCluster) -> HashMap<String, Value> {
        let mut attributes = Flattened::new()
            .string("name", &cluster.name)
            .string("version", &cluster.version)
            .int("node_amount", i64::from(cluster.node_amount))
            .string("node_type", &cluster.node_type)
            .strings("tags", &cluster.tags)
            .optional(
                "private_network_id",
                cluster
                    .private_network_id()
                    .map(|pn| format!("{}/{}", cluster.region, pn))
                    .as_deref(),
            )
            .optional("region", id.locality().as_ref().map(|l| l.as_str()))
            .string("project_id", &cluster.project_id)
            .string("organization_id", &cluster.organization_id)
            .string("status", cluster.status.as_str())
            .optional("created_at", cluster.created_at.as_deref())
            .optional("updated_at", cluster.updated_at.as_deref());
        if let Some(volume) = &cluster.volume {
            attributes = attributes.string("volume_type", &volume.volume_type).int(
                "volume_size_in_gb",
                i64::try_from(volume.size_bytes / BYTES_PER_GB).unwrap_or(i64::MAX),
            );
        }
        attributes.build()
    }

    fn lookup_id_attribute(&self) -> Option<&'static str> {
        Some("cluster_id")
    }

    fn list<'a>(
        &'a self,
        locality: Option<&'a Locality>,
        filter: ListFilter<'a>,
    ) -> BoxFuture<'a, ProviderResult<Vec<KafkaCluster>>> {
        Box::pin(async move { self.api.list_clusters(&region_arg(locality)?, &filter).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScwConfig;

    fn handler() -> KafkaClusterHandler {
        let config = ScwConfig::default().with_default_project_id("p");
        KafkaClusterHandler::new(
            ScwClient::new(&config).unwrap(),
            Ownership::from_config(&config),
        )
    }

    #[test]
    fn request_attaches_the_private_network_endpoint() {
        let resource = Resource::new("kafka_cluster", "events")
            .with_attribute("version", Value::string("3.7.1"))
            .with_attribute("node_amount", Value::Int(1))
            .with_attribute("node_type", Value::string("BASIC-BASE-1"))
            .with_attribute("volume_size_in_gb", Value::Int(10))
            .with_attribute("user_name", Value::string("admin"))
            .with_attribute("password", Value::string("s3cret!"))
            .with_attribute(
                "private_network_id",
                Value::string("fr-par/22222222-2222-2222-2222-222222222222"),
            );

        let request = handler().request(&resource).unwrap();
        assert_eq!(request.project_id, "p");
        assert_eq!(request.volume.size_bytes, 10_000_000_000);
        assert_eq!(request.volume.volume_type, DEFAULT_VOLUME_TYPE);
        assert_eq!(
            request.endpoints[0]
                .private_network
                .as_ref()
                .map(|pn| pn.private_network_id.as_str()),
            Some("22222222-2222-2222-2222-222222222222")
        );
    }

    #[test]
    fn missing_password_is_rejected_before_any_call() {
        let resource = Resource::new("kafka_cluster", "events")
            .with_attribute("version", Value::string("3.7.1"))
            .with_attribute("node_amount", Value::Int(1))
            .with_attribute("node_type", Value::string("BASIC-BASE-1"))
            .with_attribute("volume_size_in_gb", Value::Int(10))
            .with_attribute("user_name", Value::string("admin"));
        let err = handler().request(&resource).unwrap_err();
        assert_eq!(err.message, "password is required");
    }
}
