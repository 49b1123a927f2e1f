//! vpc_private_network - Private networks (regional, synchronous)

use std::collections::HashMap;
use std::time::Duration;

use scw_core::datasource::ListFilter;
use scw_core::identifier::{CompositeId, IdScope};
use scw_core::locality::Locality;
use scw_core::provider::{BoxFuture, ProviderResult};
use scw_core::reconciler::ResourceHandler;
use scw_core::resource::{Resource, Value};
use scw_core::schema::{AttributeSchema, AttributeType, ResourceSchema, suppress, types};

use super::{Flattened, region_arg, region_of};
use crate::api::vpc::{CreatePrivateNetworkRequest, PrivateNetwork, VpcApi};
use crate::client::ScwClient;
use crate::util::{Ownership, expanded_id, name_or_generate, patch_field, string_list};

pub struct PrivateNetworkHandler {
    api: VpcApi,
    ownership: Ownership,
}

impl PrivateNetworkHandler {
    pub fn new(client: ScwClient, ownership: Ownership) -> Self {
        Self {
            api: VpcApi::new(client),
            ownership,
        }
    }
}

impl ResourceHandler for PrivateNetworkHandler {
    type Entity = PrivateNetwork;

    fn resource_type(&self) -> &'static str {
        "vpc_private_network"
    }

    fn scope(&self) -> IdScope {
        IdScope::Regional
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new("vpc_private_network")
            .with_description("Private network")
            .attribute(AttributeSchema::new("name", AttributeType::String))
            .attribute(AttributeSchema::new("tags", types::string_list()))
            .attribute(
                AttributeSchema::new("subnets", AttributeType::List(Box::new(types::cidr())))
                    .force_new()
                    .with_description("IPv4 subnets; allocated by the API when omitted"),
            )
            .attribute(
                AttributeSchema::new("vpc_id", types::uuid_or_localized_uuid())
                    .force_new()
                    .with_diff_suppress(suppress::ignore_locality),
            )
            .attribute(AttributeSchema::new("region", types::region()).force_new())
            .attribute(AttributeSchema::new("project_id", types::uuid()).force_new())
            .attribute(AttributeSchema::new("organization_id", AttributeType::String).computed())
            .attribute(AttributeSchema::new("created_at", AttributeType::String).computed())
            .attribute(AttributeSchema::new("updated_at", AttributeType::String).computed())
    }

    // Mutations apply synchronously; the waiter never runs
    fn timeout(&self) -> Duration {
        Duration::from_secs(60)
    }

    fn retry_interval(&self) -> Duration {
        Duration::from_secs(5)
    }

    fn create<'a>(
        &'a self,
        locality: Option<&'a Locality>,
        resource: &'a Resource,
    ) -> BoxFuture<'a, ProviderResult<PrivateNetwork>> {
        Box::pin(async move {
            let region = region_arg(locality)?;
            let request = CreatePrivateNetworkRequest {
                name: name_or_generate(resource, "pn"),
                project_id: self.ownership.project_id(resource)?,
                tags: string_list(resource, "tags"),
                subnets: string_list(resource, "subnets"),
                vpc_id: expanded_id(resource, "vpc_id"),
            };
            self.api.create_private_network(&region, &request).await
        })
    }

    fn get<'a>(&'a self, id: &'a CompositeId) -> BoxFuture<'a, ProviderResult<PrivateNetwork>> {
        Box::pin(async move { self.api.get_private_network(&region_of(id)?, id.id()).await })
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
                serde_json::json!(name_or_generate(to, "pn"))
            });
            patch_field(&mut patch, changed, "tags", "tags", || {
                serde_json::json!(string_list(to, "tags"))
            });
            self.api
                .update_private_network(&region_of(id)?, id.id(), &serde_json::Value::Object(patch))
                .await?;
            Ok(())
        })
    }

    fn delete<'a>(&'a self, id: &'a CompositeId) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            self.api
                .delete_private_network(&region_of(id)?, id.id())
                .await
        })
    }

    fn flatten(&self, id: &CompositeId, network: &PrivateNetwork) -> HashMap<String, Value> {
        let subnets: Vec<String> = network.subnets.iter().map(|s| s.subnet.clone()).collect();
        Flattened::new()
            .string("name", &network.name)
            .strings("tags", &network.tags)
            .strings("subnets", &subnets)
            .optional(
                "vpc_id",
                (!network.vpc_id.is_empty())
                    .then(|| format!("{}/{}", network.region, network.vpc_id))
                    .as_deref(),
            )
            .optional("region", id.locality().as_ref().map(|l| l.as_str()))
            .string("project_id", &network.project_id)
            .string("organization_id", &network.organization_id)
            .optional("created_at", network.created_at.as_deref())
            .optional("updated_at", network.updated_at.as_deref())
            .build()
    }

    fn lookup_id_attribute(&self) -> Option<&'static str> {
        Some("private_network_id")
    }

    fn list<'a>(
        &'a self,
        locality: Option<&'a Locality>,
        filter: ListFilter<'a>,
    ) -> BoxFuture<'a, ProviderResult<Vec<PrivateNetwork>>> {
        Box::pin(async move {
            self.api
                .list_private_networks(&region_arg(locality)?, &filter)
                .await
        })
    }
}
