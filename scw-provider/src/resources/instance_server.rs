//! instance_server - Instance servers (zonal, asynchronous)

use std::collections::HashMap;
use std::time::Duration;

use scw_core::datasource::ListFilter;
use scw_core::identifier::{CompositeId, IdScope};
use scw_core::locality::Locality;
use scw_core::provider::{BoxFuture, ProviderResult};
use scw_core::reconciler::ResourceHandler;
use scw_core::resource::{Attributes, Resource, Value};
use scw_core::schema::{AttributeSchema, AttributeType, ResourceSchema, suppress, types, validate_uuid};
use scw_core::waiter::TerminalStatuses;

use super::{Flattened, zone_arg, zone_of};
use crate::api::instance::{CreateServerRequest, InstanceApi, Server, ServerAction, ServerState};
use crate::client::ScwClient;
use crate::util::{Ownership, expanded_id, name_or_generate, patch_field, string_list};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20 * 60);
const RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Declared power state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PowerState {
    Started,
    Stopped,
    Standby,
}

impl PowerState {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "started" => Some(PowerState::Started),
            "stopped" => Some(PowerState::Stopped),
            "standby" => Some(PowerState::Standby),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            PowerState::Started => "started",
            PowerState::Stopped => "stopped",
            PowerState::Standby => "standby",
        }
    }

    fn of(state: ServerState) -> Option<Self> {
        match state {
            ServerState::Running => Some(PowerState::Started),
            ServerState::Stopped => Some(PowerState::Stopped),
            ServerState::StoppedInPlace => Some(PowerState::Standby),
            _ => None,
        }
    }

    fn action(&self) -> ServerAction {
        match self {
            PowerState::Started => ServerAction::Poweron,
            PowerState::Stopped => ServerAction::Poweroff,
            PowerState::Standby => ServerAction::StopInPlace,
        }
    }
}

/// A marketplace label (e.g. `ubuntu_jammy`) resolves to an image id the
/// server reports back; the two cannot be compared.
fn suppress_image_label(desired: &Value, current: &Value) -> bool {
    if suppress::ignore_locality(desired, current) {
        return true;
    }
    match (desired, current) {
        (Value::String(label), Value::String(id)) => {
            validate_uuid(label).is_err() && validate_uuid(id).is_ok()
        }
        _ => false,
    }
}

pub struct ServerHandler {
    api: InstanceApi,
    ownership: Ownership,
}

impl ServerHandler {
    pub fn new(client: ScwClient, ownership: Ownership) -> Self {
        Self {
            api: InstanceApi::new(client),
            ownership,
        }
    }

    fn declared_power(resource: &Resource) -> PowerState {
        resource
            .get_str("state")
            .and_then(PowerState::parse)
            .unwrap_or(PowerState::Started)
    }

    /// Request the power action leading to `desired`, unless already there
    async fn converge_power(&self, id: &CompositeId, desired: PowerState) -> ProviderResult<()> {
        let zone = zone_of(id)?;
        let current = self.api.get_server(&zone, id.id()).await?;
        if PowerState::of(current.state) == Some(desired) {
            return Ok(());
        }
        log::debug!(
            "server {} is {}, requesting {}",
            id,
            current.state.as_str(),
            desired.as_str()
        );
        self.api
            .server_action(&zone, id.id(), desired.action())
            .await
    }
}

impl ResourceHandler for ServerHandler {
    type Entity = Server;

    fn resource_type(&self) -> &'static str {
        "instance_server"
    }

    fn scope(&self) -> IdScope {
        IdScope::Zonal
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new("instance_server")
            .with_description("Instance server")
            .attribute(AttributeSchema::new("name", AttributeType::String))
            .attribute(
                AttributeSchema::new("type", AttributeType::String)
                    .required()
                    .force_new()
                    .with_description("Commercial type, e.g. DEV1-S")
                    .with_diff_suppress(suppress::ignore_case),
            )
            .attribute(
                AttributeSchema::new("image", AttributeType::String)
                    .required()
                    .force_new()
                    .with_description("Image id or marketplace label")
                    .with_diff_suppress(suppress_image_label),
            )
            .attribute(AttributeSchema::new("tags", types::string_list()))
            .attribute(
                AttributeSchema::new(
                    "state",
                    AttributeType::Enum(vec![
                        "started".to_string(),
                        "stopped".to_string(),
                        "standby".to_string(),
                    ]),
                )
                .with_default(Value::string("started")),
            )
            .attribute(
                AttributeSchema::new("enable_ipv6", AttributeType::Bool)
                    .with_default(Value::Bool(false)),
            )
            .attribute(AttributeSchema::new("zone", types::zone()).force_new())
            .attribute(AttributeSchema::new("project_id", types::uuid()).force_new())
            .attribute(AttributeSchema::new("organization_id", AttributeType::String).computed())
            .attribute(AttributeSchema::new("public_ip", AttributeType::String).computed())
            .attribute(AttributeSchema::new("private_ip", AttributeType::String).computed())
    }

    fn timeout(&self) -> Duration {
        DEFAULT_TIMEOUT
    }

    fn retry_interval(&self) -> Duration {
        RETRY_INTERVAL
    }

    fn terminal_statuses(&self) -> Option<TerminalStatuses<ServerState>> {
        Some(TerminalStatuses::new(
            vec![
                ServerState::Running,
                ServerState::Stopped,
                ServerState::StoppedInPlace,
            ],
            vec![ServerState::Locked],
        ))
    }

    fn create<'a>(
        &'a self,
        locality: Option<&'a Locality>,
        resource: &'a Resource,
    ) -> BoxFuture<'a, ProviderResult<Server>> {
        Box::pin(async move {
            let zone = zone_arg(locality)?;
            let request = CreateServerRequest {
                name: name_or_generate(resource, "srv"),
                commercial_type: resource.get_str("type").unwrap_or_default().to_string(),
                image: expanded_id(resource, "image").unwrap_or_default(),
                project: self.ownership.project_id(resource)?,
                tags: string_list(resource, "tags"),
                dynamic_ip_required: false,
                enable_ipv6: resource.get_bool("enable_ipv6").unwrap_or(false),
            };
            self.api.create_server(&zone, &request).await
        })
    }

    /// New servers are created stopped
    fn after_create<'a>(
        &'a self,
        id: &'a CompositeId,
        resource: &'a Resource,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move { self.converge_power(id, Self::declared_power(resource)).await })
    }

    fn get<'a>(&'a self, id: &'a CompositeId) -> BoxFuture<'a, ProviderResult<Server>> {
        Box::pin(async move { self.api.get_server(&zone_of(id)?, id.id()).await })
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
            patch_field(&mut patch, changed, "name", "name", || {
                serde_json::json!(name_or_generate(to, "srv"))
            });
            patch_field(&mut patch, changed, "tags", "tags", || {
                serde_json::json!(string_list(to, "tags"))
            });
            patch_field(&mut patch, changed, "enable_ipv6", "enable_ipv6", || {
                serde_json::json!(to.get_bool("enable_ipv6").unwrap_or(false))
            });
            if !patch.is_empty() {
                self.api
                    .update_server(&zone, id.id(), &serde_json::Value::Object(patch))
                    .await?;
            }

            if changed.iter().any(|c| c == "state") {
                self.converge_power(id, Self::declared_power(to)).await?;
            }
            Ok(())
        })
    }

    fn delete<'a>(&'a self, id: &'a CompositeId) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            let zone = zone_of(id)?;
            let server = self.api.get_server(&zone, id.id()).await?;
            if server.state == ServerState::Stopped {
                self.api.delete_server(&zone, id.id()).await
            } else {
                self.api
                    .server_action(&zone, id.id(), ServerAction::Terminate)
                    .await
            }
        })
    }

    fn flatten(&self, id: &CompositeId, server: &Server) -> HashMap<String, Value> {
        let state = PowerState::of(server.state)
            .map(|p| p.as_str())
            .unwrap_or(server.state.as_str());
        Flattened::new()
            .string("name", &server.name)
            .string("type", &server.commercial_type)
            .optional("image", server.image.as_ref().map(|i| i.id.as_str()))
            .strings("tags", &server.tags)
            .string("state", state)
            .bool("enable_ipv6", server.enable_ipv6)
            .optional("zone", id.locality().as_ref().map(|l| l.as_str()))
            .string("project_id", &server.project)
            .string("organization_id", &server.organization)
            .optional("public_ip", server.public_ip.as_ref().map(|ip| ip.address.as_str()))
            .optional("private_ip", server.private_ip.as_deref())
            .build()
    }

    fn lookup_id_attribute(&self) -> Option<&'static str> {
        Some("server_id")
    }

    fn list<'a>(
        &'a self,
        locality: Option<&'a Locality>,
        filter: ListFilter<'a>,
    ) -> BoxFuture<'a, ProviderResult<Vec<Server>>> {
        Box::pin(async move { self.api.list_servers(&zone_arg(locality)?, &filter).await })
    }
}
