//! flexible_ip - Flexible IPs (zonal, asynchronous)
//!
//! Attachment to a server is not part of the patch: a change of `server_id`
//! goes through the attach and detach endpoints.

use std::collections::HashMap;
use std::time::Duration;

use scw_core::identifier::{CompositeId, IdScope};
use scw_core::locality::Locality;
use scw_core::provider::{BoxFuture, ProviderResult};
use scw_core::reconciler::ResourceHandler;
use scw_core::resource::{Attributes, Resource, Value};
use scw_core::schema::{AttributeSchema, AttributeType, ResourceSchema, suppress, types};
use scw_core::waiter::TerminalStatuses;

use super::{Flattened, zone_arg, zone_of};
use crate::api::flexibleip::{CreateFlexibleIpRequest, FlexibleIp, FlexibleIpApi, FlexibleIpStatus};
use crate::client::ScwClient;
use crate::util::{Ownership, expanded_id, patch_field, string_list};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const RETRY_INTERVAL: Duration = Duration::from_secs(5);

pub struct FlexibleIpHandler {
    api: FlexibleIpApi,
    ownership: Ownership,
}

impl FlexibleIpHandler {
    pub fn new(client: ScwClient, ownership: Ownership) -> Self {
        Self {
            api: FlexibleIpApi::new(client),
            ownership,
        }
    }
}

impl ResourceHandler for FlexibleIpHandler {
    type Entity = FlexibleIp;

    fn resource_type(&self) -> &'static str {
        "flexible_ip"
    }

    fn scope(&self) -> IdScope {
        IdScope::Zonal
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new("flexible_ip")
            .with_description("Flexible IP for dedibox servers")
            .attribute(AttributeSchema::new("description", AttributeType::String))
            .attribute(AttributeSchema::new("tags", types::string_list()))
            .attribute(AttributeSchema::new("reverse", AttributeType::String))
            .attribute(
                AttributeSchema::new("server_id", types::uuid_or_localized_uuid())
                    .with_diff_suppress(suppress::ignore_locality),
            )
            .attribute(
                AttributeSchema::new("is_ipv6", AttributeType::Bool)
                    .force_new()
                    .with_default(Value::Bool(false)),
            )
            .attribute(AttributeSchema::new("zone", types::zone()).force_new())
            .attribute(AttributeSchema::new("project_id", types::uuid()).force_new())
            .attribute(AttributeSchema::new("organization_id", AttributeType::String).computed())
            .attribute(AttributeSchema::new("ip_address", AttributeType::String).computed())
            .attribute(AttributeSchema::new("status", AttributeType::String).computed())
    }

    fn timeout(&self) -> Duration {
        DEFAULT_TIMEOUT
    }

    fn retry_interval(&self) -> Duration {
        RETRY_INTERVAL
    }

    fn terminal_statuses(&self) -> Option<TerminalStatuses<FlexibleIpStatus>> {
        Some(TerminalStatuses::new(
            vec![FlexibleIpStatus::Ready, FlexibleIpStatus::Attached],
            vec![FlexibleIpStatus::Error, FlexibleIpStatus::Locked],
        ))
    }

    fn create<'a>(
        &'a self,
        locality: Option<&'a Locality>,
        resource: &'a Resource,
    ) -> BoxFuture<'a, ProviderResult<FlexibleIp>> {
        Box::pin(async move {
            let zone = zone_arg(locality)?;
            let request = CreateFlexibleIpRequest {
                project_id: self.ownership.project_id(resource)?,
                description: resource.get_str("description").unwrap_or_default().to_string(),
                tags: string_list(resource, "tags"),
                server_id: expanded_id(resource, "server_id"),
                reverse: resource.get_str("reverse").map(str::to_string),
                is_ipv6: resource.get_bool("is_ipv6").unwrap_or(false),
            };
            self.api.create_flexible_ip(&zone, &request).await
        })
    }

    fn get<'a>(&'a self, id: &'a CompositeId) -> BoxFuture<'a, ProviderResult<FlexibleIp>> {
        Box::pin(async move { self.api.get_flexible_ip(&zone_of(id)?, id.id()).await })
    }

    fn update<'a>(
        &'a self,
        id: &'a CompositeId,
        to: &'a Resource,
        changed: &'a [String],
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            let zone = zone_of(id)?;
            let mut patch = serde_json::Map::new();
            patch_field(&mut patch, changed, "description", "description", || {
                serde_json::json!(to.get_str("description").unwrap_or_default())
            });
            patch_field(&mut patch, changed, "tags", "tags", || {
                serde_json::json!(string_list(to, "tags"))
            });
            patch_field(&mut patch, changed, "reverse", "reverse", || {
                serde_json::json!(to.get_str("reverse").unwrap_or_default())
            });
            if !patch.is_empty() {
                self.api
                    .update_flexible_ip(&zone, id.id(), &serde_json::Value::Object(patch))
                    .await?;
            }

            if changed.iter().any(|c| c == "server_id") {
                match expanded_id(to, "server_id") {
                    Some(server_id) => {
                        log::debug!("attaching {} to server {}", id, server_id);
                        self.api.attach(&zone, id.id(), &server_id).await?;
                    }
                    None => {
                        log::debug!("detaching {}", id);
                        self.api.detach(&zone, id.id()).await?;
                    }
                }
            }
            Ok(())
        })
    }

    fn delete<'a>(&'a self, id: &'a CompositeId) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move { self.api.delete_flexible_ip(&zone_of(id)?, id.id()).await })
    }

    fn flatten(&self, id: &CompositeId, ip: &FlexibleIp) -> HashMap<String, Value> {
        Flattened::new()
            .string("description", &ip.description)
            .strings("tags", &ip.tags)
            .optional("reverse", Some(ip.reverse.as_str()))
            .optional(
                "server_id",
                ip.server_id
                    .as_ref()
                    .map(|server| format!("{}/{}", ip.zone, server))
                    .as_deref(),
            )
            .bool("is_ipv6", ip.ip_address.contains(':'))
            .optional("zone", id.locality().as_ref().map(|l| l.as_str()))
            .string("project_id", &ip.project_id)
            .string("organization_id", &ip.organization_id)
            .string("ip_address", &ip.ip_address)
            .string("status", ip.status.as_str())
            .build()
    }
}
