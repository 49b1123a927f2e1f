//! lb - Load balancers (zonal, asynchronous)
//!
//! A new `type` migrates the load balancer in place instead of replacing
//! it, so its flexible IP survives the change.

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

use super::{Flattened, zone_arg, zone_of};
use crate::api::lb::{CreateLbRequest, LbApi, LbStatus, LoadBalancer, UpdateLbRequest};
use crate::client::ScwClient;
use crate::util::{Ownership, expanded_id, name_or_generate, string_list};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10 * 60);
const RETRY_INTERVAL: Duration = Duration::from_secs(5);

const DEFAULT_SSL_LEVEL: &str = "ssl_compatibility_level_intermediate";
const SSL_LEVELS: [&str; 3] = [
    "ssl_compatibility_level_intermediate",
    "ssl_compatibility_level_modern",
    "ssl_compatibility_level_old",
];

pub struct LbHandler {
    api: LbApi,
    ownership: Ownership,
}

impl LbHandler {
    pub fn new(client: ScwClient, ownership: Ownership) -> Self {
        Self {
            api: LbApi::new(client),
            ownership,
        }
    }

    fn declared_type(resource: &Resource) -> ProviderResult<&str> {
        resource
            .get_str("type")
            .ok_or_else(|| ProviderError::validation("type is required"))
    }

    fn ssl_level(resource: &Resource) -> String {
        resource
            .get_str("ssl_compatibility_level")
            .unwrap_or(DEFAULT_SSL_LEVEL)
            .to_string()
    }
}

impl ResourceHandler for LbHandler {
    type Entity = LoadBalancer;

    fn resource_type(&self) -> &'static str {
        "lb"
    }

    fn scope(&self) -> IdScope {
        IdScope::Zonal
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new("lb")
            .with_description("Load balancer")
            .attribute(AttributeSchema::new("name", AttributeType::String))
            .attribute(AttributeSchema::new("description", AttributeType::String))
            .attribute(
                AttributeSchema::new("type", AttributeType::String)
                    .required()
                    .with_description("Offer, e.g. LB-S; changing it migrates the load balancer")
                    .with_diff_suppress(suppress::ignore_case),
            )
            .attribute(
                AttributeSchema::new("ip_id", types::uuid_or_localized_uuid())
                    .force_new()
                    .with_diff_suppress(suppress::ignore_locality),
            )
            .attribute(
                AttributeSchema::new(
                    "ssl_compatibility_level",
                    AttributeType::Enum(SSL_LEVELS.iter().map(|s| s.to_string()).collect()),
                )
                .with_default(Value::string(DEFAULT_SSL_LEVEL)),
            )
            .attribute(AttributeSchema::new("tags", types::string_list()))
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

    fn terminal_statuses(&self) -> Option<TerminalStatuses<LbStatus>> {
        Some(TerminalStatuses::new(
            vec![LbStatus::Ready, LbStatus::Stopped],
            vec![LbStatus::Error, LbStatus::Locked],
        ))
    }

    fn create<'a>(
        &'a self,
        locality: Option<&'a Locality>,
        resource: &'a Resource,
    ) -> BoxFuture<'a, ProviderResult<LoadBalancer>> {
        Box::pin(async move {
            let zone = zone_arg(locality)?;
            let request = CreateLbRequest {
                project_id: self.ownership.project_id(resource)?,
                name: name_or_generate(resource, "lb"),
                description: resource.get_str("description").unwrap_or_default().to_string(),
                ip_ids: expanded_id(resource, "ip_id").into_iter().collect(),
                tags: string_list(resource, "tags"),
                lb_type: Self::declared_type(resource)?.to_string(),
                ssl_compatibility_level: Self::ssl_level(resource),
            };
            self.api.create_lb(&zone, &request).await
        })
    }

    fn get<'a>(&'a self, id: &'a CompositeId) -> BoxFuture<'a, ProviderResult<LoadBalancer>> {
        Box::pin(async move { self.api.get_lb(&zone_of(id)?, id.id()).await })
    }

    fn update<'a>(
        &'a self,
        id: &'a CompositeId,
        to: &'a Resource,
        changed: &'a [String],
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            let zone = zone_of(id)?;
            if changed.iter().any(|c| c == "type") {
                let lb_type = Self::declared_type(to)?;
                log::info!("migrating load balancer {} to {}", id, lb_type);
                self.api.migrate_lb(&zone, id.id(), lb_type).await?;
            }

            let in_place = ["name", "description", "tags", "ssl_compatibility_level"];
            if changed.iter().any(|c| in_place.contains(&c.as_str())) {
                let request = UpdateLbRequest {
                    name: name_or_generate(to, "lb"),
                    description: to.get_str("description").unwrap_or_default().to_string(),
                    tags: string_list(to, "tags"),
                    ssl_compatibility_level: Self::ssl_level(to),
                };
                self.api.update_lb(&zone, id.id(), &request).await?;
            }
            Ok(())
        })
    }

    fn delete<'a>(&'a self, id: &'a CompositeId) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move { self.api.delete_lb(&zone_of(id)?, id.id()).await })
    }

    fn flatten(&self, id: &CompositeId, lb: &LoadBalancer) -> HashMap<String, Value> {
        let mut attributes = Flattened::new()
            .string("name", &lb.name)
            .string("description", &lb.description)
            .string("type", &lb.lb_type)
            .optional("ssl_compatibility_level", Some(lb.ssl_compatibility_level.as_str()))
            .strings("tags", &lb.tags)
            .optional("zone", id.locality().as_ref().map(|l| l.as_str()))
            .string("project_id", &lb.project_id)
            .string("organization_id", &lb.organization_id)
            .string("status", lb.status.as_str())
            .optional("created_at", lb.created_at.as_deref())
            .optional("updated_at", lb.updated_at.as_deref());
        if let Some(ip) = lb.ip.first() {
            attributes = attributes
                .string("ip_id", format!("{}/{}", lb.zone, ip.id))
                .string("ip_address", &ip.ip_address);
        }
        attributes.build()
    }

    fn lookup_id_attribute(&self) -> Option<&'static str> {
        Some("lb_id")
    }

    fn list<'a>(
        &'a self,
        locality: Option<&'a Locality>,
        filter: ListFilter<'a>,
    ) -> BoxFuture<'a, ProviderResult<Vec<LoadBalancer>>> {
        Box::pin(async move { self.api.list_lbs(&zone_arg(locality)?, &filter).await })
    }
}
