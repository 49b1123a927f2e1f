//! instance_volume - Block and local volumes (zonal, asynchronous)

use std::collections::HashMap;
use std::time::Duration;

use scw_core::identifier::{CompositeId, IdScope};
use scw_core::locality::Locality;
use scw_core::provider::{BoxFuture, ProviderError, ProviderResult};
use scw_core::reconciler::ResourceHandler;
use scw_core::resource::{Attributes, Resource, Value};
use scw_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};
use scw_core::waiter::TerminalStatuses;

use super::{Flattened, zone_arg, zone_of};
use crate::api::instance::{CreateVolumeRequest, InstanceApi, Volume, VolumeState};
use crate::client::ScwClient;
use crate::util::{Ownership, name_or_generate, patch_field, string_list};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10 * 60);
const RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Volume sizes are decimal gigabytes
const BYTES_PER_GB: u64 = 1_000_000_000;

fn size_in_bytes(resource: &Resource) -> ProviderResult<u64> {
    let gb = resource
        .get_int("size_in_gb")
        .ok_or_else(|| ProviderError::validation("size_in_gb is required"))?;
    u64::try_from(gb)
        .ok()
        .and_then(|gb| gb.checked_mul(BYTES_PER_GB))
        .ok_or_else(|| ProviderError::validation(format!("invalid volume size {} GB", gb)))
}

fn size_in_gb(bytes: u64) -> i64 {
    i64::try_from(bytes / BYTES_PER_GB).unwrap_or(i64::MAX)
}

pub struct VolumeHandler {
    api: InstanceApi,
    ownership: Ownership,
}

impl VolumeHandler {
    pub fn new(client: ScwClient, ownership: Ownership) -> Self {
        Self {
            api: InstanceApi::new(client),
            ownership,
        }
    }
}

impl ResourceHandler for VolumeHandler {
    type Entity = Volume;

    fn resource_type(&self) -> &'static str {
        "instance_volume"
    }

    fn scope(&self) -> IdScope {
        IdScope::Zonal
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new("instance_volume")
            .with_description("Instance volume")
            .attribute(AttributeSchema::new("name", AttributeType::String))
            .attribute(
                AttributeSchema::new(
                    "type",
                    AttributeType::Enum(vec!["l_ssd".to_string(), "b_ssd".to_string()]),
                )
                .required()
                .force_new(),
            )
            .attribute(AttributeSchema::new("size_in_gb", types::positive_int()).required())
            .attribute(AttributeSchema::new("tags", types::string_list()))
            .attribute(AttributeSchema::new("zone", types::zone()).force_new())
            .attribute(AttributeSchema::new("project_id", types::uuid()).force_new())
            .attribute(AttributeSchema::new("organization_id", AttributeType::String).computed())
            .attribute(AttributeSchema::new("server_id", AttributeType::String).computed())
    }

    fn timeout(&self) -> Duration {
        DEFAULT_TIMEOUT
    }

    fn retry_interval(&self) -> Duration {
        RETRY_INTERVAL
    }

    fn terminal_statuses(&self) -> Option<TerminalStatuses<VolumeState>> {
        Some(TerminalStatuses::new(
            vec![VolumeState::Available],
            vec![VolumeState::Error],
        ))
    }

    fn create<'a>(
        &'a self,
        locality: Option<&'a Locality>,
        resource: &'a Resource,
    ) -> BoxFuture<'a, ProviderResult<Volume>> {
        Box::pin(async move {
            let zone = zone_arg(locality)?;
            let request = CreateVolumeRequest {
                name: name_or_generate(resource, "vol"),
                volume_type: resource.get_str("type").unwrap_or_default().to_string(),
                size: size_in_bytes(resource)?,
                project: self.ownership.project_id(resource)?,
                tags: string_list(resource, "tags"),
            };
            self.api.create_volume(&zone, &request).await
        })
    }

    fn get<'a>(&'a self, id: &'a CompositeId) -> BoxFuture<'a, ProviderResult<Volume>> {
        Box::pin(async move { self.api.get_volume(&zone_of(id)?, id.id()).await })
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
                serde_json::json!(name_or_generate(to, "vol"))
            });
            patch_field(&mut patch, changed, "tags", "tags", || {
                serde_json::json!(string_list(to, "tags"))
            });
            if changed.iter().any(|c| c == "size_in_gb") {
                patch.insert("size".to_string(), serde_json::json!(size_in_bytes(to)?));
            }
            self.api
                .update_volume(&zone_of(id)?, id.id(), &serde_json::Value::Object(patch))
                .await
        })
    }

    fn delete<'a>(&'a self, id: &'a CompositeId) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move { self.api.delete_volume(&zone_of(id)?, id.id()).await })
    }

    fn flatten(&self, id: &CompositeId, volume: &Volume) -> HashMap<String, Value> {
        Flattened::new()
            .string("name", &volume.name)
            .string("type", &volume.volume_type)
            .int("size_in_gb", size_in_gb(volume.size))
            .strings("tags", &volume.tags)
            .optional("zone", id.locality().as_ref().map(|l| l.as_str()))
            .string("project_id", &volume.project)
            .string("organization_id", &volume.organization)
            .optional("server_id", volume.server.as_ref().map(|s| s.id.as_str()))
            .build()
    }
}
