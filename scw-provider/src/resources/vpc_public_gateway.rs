//! vpc_public_gateway - Public gateways (zonal, asynchronous)

use std::collections::HashMap;
use std::time::Duration;

use scw_core::datasource::ListFilter;
use scw_core::identifier::{CompositeId, IdScope};
use scw_core::locality::Locality;
use scw_core::provider::{BoxFuture, ProviderResult};
use scw_core::reconciler::ResourceHandler;
use scw_core::resource::{Attributes, Resource, Value};
use scw_core::schema::{AttributeSchema, AttributeType, ResourceSchema, suppress, types};
use scw_core::waiter::TerminalStatuses;

use super::{Flattened, zone_arg, zone_of};
use crate::api::vpcgw::{CreateGatewayRequest, Gateway, GatewayStatus, VpcGwApi};
use crate::client::ScwClient;
use crate::util::{Ownership, expanded_id, name_or_generate, patch_field, string_list};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10 * 60);
const RETRY_INTERVAL: Duration = Duration::from_secs(5);

const DEFAULT_GATEWAY_TYPE: &str = "VPC-GW-S";
const DEFAULT_BASTION_PORT: i64 = 61000;

pub struct PublicGatewayHandler {
    api: VpcGwApi,
    ownership: Ownership,
}

impl PublicGatewayHandler {
    pub fn new(client: ScwClient, ownership: Ownership) -> Self {
        Self {
            api: VpcGwApi::new(client),
            ownership,
        }
    }
}

impl ResourceHandler for PublicGatewayHandler {
    type Entity = Gateway;

    fn resource_type(&self) -> &'static str {
        "vpc_public_gateway"
    }

    fn scope(&self) -> IdScope {
        IdScope::Zonal
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new("vpc_public_gateway")
            .with_description("Public gateway")
            .attribute(AttributeSchema::new("name", AttributeType::String))
            .attribute(
                AttributeSchema::new("type", AttributeType::String)
                    .force_new()
                    .with_default(Value::string(DEFAULT_GATEWAY_TYPE))
                    .with_diff_suppress(suppress::ignore_case),
            )
            .attribute(AttributeSchema::new("tags", types::string_list()))
            .attribute(AttributeSchema::new("upstream_dns_servers", types::string_list()))
            .attribute(
                AttributeSchema::new("ip_id", types::uuid_or_localized_uuid())
                    .force_new()
                    .with_description("Flexible IP to use instead of allocating one")
                    .with_diff_suppress(suppress::ignore_locality),
            )
            .attribute(
                AttributeSchema::new("bastion_enabled", AttributeType::Bool)
                    .with_default(Value::Bool(false)),
            )
            .attribute(
                AttributeSchema::new("bastion_port", types::port())
                    .with_default(Value::Int(DEFAULT_BASTION_PORT)),
            )
            .attribute(
                AttributeSchema::new("enable_smtp", AttributeType::Bool)
                    .with_default(Value::Bool(false)),
            )
            .attribute(AttributeSchema::new("zone", types::zone()).force_new())
            .attribute(AttributeSchema::new("project_id", types::uuid()).force_new())
            .attribute(AttributeSchema::new("organization_id", AttributeType::String).computed())
            .attribute(AttributeSchema::new("ip_address", AttributeType::String).computed())
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

    fn terminal_statuses(&self) -> Option<TerminalStatuses<GatewayStatus>> {
        Some(TerminalStatuses::new(
            vec![GatewayStatus::Running, GatewayStatus::Stopped],
            vec![GatewayStatus::Failed, GatewayStatus::Locked],
        ))
    }

    fn deleted_statuses(&self) -> Vec<GatewayStatus> {
        vec![GatewayStatus::Deleted]
    }

    fn create<'a>(
        &'a self,
        locality: Option<&'a Locality>,
        resource: &'a Resource,
    ) -> BoxFuture<'a, ProviderResult<Gateway>> {
        Box::pin(async move {
            let zone = zone_arg(locality)?;
            let request = CreateGatewayRequest {
                name: name_or_generate(resource, "gw"),
                project_id: self.ownership.project_id(resource)?,
                gateway_type: resource
                    .get_str("type")
                    .unwrap_or(DEFAULT_GATEWAY_TYPE)
                    .to_string(),
                tags: string_list(resource, "tags"),
                upstream_dns_servers: string_list(resource, "upstream_dns_servers"),
                ip_id: expanded_id(resource, "ip_id"),
                enable_smtp: resource.get_bool("enable_smtp").unwrap_or(false),
                enable_bastion: resource.get_bool("bastion_enabled").unwrap_or(false),
                bastion_port: resource.get_int("bastion_port"),
            };
            self.api.create_gateway(&zone, &request).await
        })
    }

    fn get<'a>(&'a self, id: &'a CompositeId) -> BoxFuture<'a, ProviderResult<Gateway>> {
        Box::pin(async move { self.api.get_gateway(&zone_of(id)?, id.id()).await })
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
                serde_json::json!(name_or_generate(to, "gw"))
            });
            patch_field(&mut patch, changed, "tags", "tags", || {
                serde_json::json!(string_list(to, "tags"))
            });
            patch_field(
                &mut patch,
                changed,
                "upstream_dns_servers",
                "upstream_dns_servers",
                || serde_json::json!(string_list(to, "upstream_dns_servers")),
            );
            patch_field(&mut patch, changed, "bastion_enabled", "enable_bastion", || {
                serde_json::json!(to.get_bool("bastion_enabled").unwrap_or(false))
            });
            patch_field(&mut patch, changed, "bastion_port", "bastion_port", || {
                serde_json::json!(to.get_int("bastion_port").unwrap_or(DEFAULT_BASTION_PORT))
            });
            patch_field(&mut patch, changed, "enable_smtp", "enable_smtp", || {
                serde_json::json!(to.get_bool("enable_smtp").unwrap_or(false))
            });
            self.api
                .update_gateway(&zone_of(id)?, id.id(), &serde_json::Value::Object(patch))
                .await?;
            Ok(())
        })
    }

    fn delete<'a>(&'a self, id: &'a CompositeId) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move { self.api.delete_gateway(&zone_of(id)?, id.id()).await })
    }

    fn flatten(&self, id: &CompositeId, gateway: &Gateway) -> HashMap<String, Value> {
        let mut attributes = Flattened::new()
            .string("name", &gateway.name)
            .string("type", &gateway.gateway_type.name)
            .strings("tags", &gateway.tags)
            .strings("upstream_dns_servers", &gateway.upstream_dns_servers)
            .bool("bastion_enabled", gateway.bastion_enabled)
            .int("bastion_port", gateway.bastion_port)
            .bool("enable_smtp", gateway.smtp_enabled)
            .optional("zone", id.locality().as_ref().map(|l| l.as_str()))
            .string("project_id", &gateway.project_id)
            .string("organization_id", &gateway.organization_id)
            .string("status", gateway.status.as_str())
            .optional("created_at", gateway.created_at.as_deref())
            .optional("updated_at", gateway.updated_at.as_deref());
        if let Some(ip) = &gateway.ip {
            attributes = attributes
                .string("ip_id", format!("{}/{}", gateway.zone, ip.id))
                .string("ip_address", &ip.address);
        }
        attributes.build()
    }

    fn lookup_id_attribute(&self) -> Option<&'static str> {
        Some("gateway_id")
    }

    fn list<'a>(
        &'a self,
        locality: Option<&'a Locality>,
        filter: ListFilter<'a>,
    ) -> BoxFuture<'a, ProviderResult<Vec<Gateway>>> {
        Box::pin(async move { self.api.list_gateways(&zone_arg(locality)?, &filter).await })
    }
}
