//! Instance API: servers and volumes (zonal)

use scw_core::datasource::ListFilter;
use scw_core::locality::Zone;
use scw_core::provider::ProviderResult;
use scw_core::waiter::RemoteEntity;
use serde::{Deserialize, Serialize};

use crate::client::ScwClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerState {
    #[serde(rename = "running")]
    Running,
    #[serde(rename = "stopped")]
    Stopped,
    #[serde(rename = "stopped in place")]
    StoppedInPlace,
    #[serde(rename = "starting")]
    Starting,
    #[serde(rename = "stopping")]
    Stopping,
    #[serde(rename = "locked")]
    Locked,
    #[serde(other)]
    Unknown,
}

impl ServerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerState::Running => "running",
            ServerState::Stopped => "stopped",
            ServerState::StoppedInPlace => "stopped in place",
            ServerState::Starting => "starting",
            ServerState::Stopping => "stopping",
            ServerState::Locked => "locked",
            ServerState::Unknown => "unknown",
        }
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, ServerState::Stopped | ServerState::StoppedInPlace)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerIp {
    pub address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub id: String,
    pub name: String,
    pub commercial_type: String,
    pub state: ServerState,
    #[serde(default)]
    pub state_detail: String,
    #[serde(default)]
    pub image: Option<ImageRef>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub project: String,
    pub organization: String,
    pub zone: String,
    #[serde(default)]
    pub public_ip: Option<ServerIp>,
    #[serde(default)]
    pub private_ip: Option<String>,
    #[serde(default)]
    pub enable_ipv6: bool,
    #[serde(default)]
    pub creation_date: Option<String>,
    #[serde(default)]
    pub modification_date: Option<String>,
}

impl RemoteEntity for Server {
    type Status = ServerState;

    fn remote_id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> ServerState {
        self.state
    }

    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn failure_detail(&self) -> Option<String> {
        (!self.state_detail.is_empty()).then(|| self.state_detail.clone())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateServerRequest {
    pub name: String,
    pub commercial_type: String,
    pub image: String,
    pub project: String,
    pub tags: Vec<String>,
    pub dynamic_ip_required: bool,
    pub enable_ipv6: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerAction {
    Poweron,
    Poweroff,
    /// Stop without releasing the hypervisor slot (standby)
    StopInPlace,
    /// Stop, then delete the server with its local volumes
    Terminate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeState {
    Available,
    Snapshotting,
    Fetching,
    Resizing,
    Saving,
    Hotsyncing,
    Error,
    #[serde(other)]
    Unknown,
}

impl VolumeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            VolumeState::Available => "available",
            VolumeState::Snapshotting => "snapshotting",
            VolumeState::Fetching => "fetching",
            VolumeState::Resizing => "resizing",
            VolumeState::Saving => "saving",
            VolumeState::Hotsyncing => "hotsyncing",
            VolumeState::Error => "error",
            VolumeState::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttachedServer {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Volume {
    pub id: String,
    pub name: String,
    pub volume_type: String,
    /// Bytes
    pub size: u64,
    pub state: VolumeState,
    #[serde(default)]
    pub tags: Vec<String>,
    pub project: String,
    pub organization: String,
    pub zone: String,
    #[serde(default)]
    pub server: Option<AttachedServer>,
}

impl RemoteEntity for Volume {
    type Status = VolumeState;

    fn remote_id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> VolumeState {
        self.state
    }

    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateVolumeRequest {
    pub name: String,
    pub volume_type: String,
    pub size: u64,
    pub project: String,
    pub tags: Vec<String>,
}

#[derive(Deserialize)]
struct ServerResponse {
    server: Server,
}

#[derive(Deserialize)]
struct ServersResponse {
    #[serde(default)]
    servers: Vec<Server>,
}

#[derive(Deserialize)]
struct VolumeResponse {
    volume: Volume,
}

#[derive(Clone)]
pub struct InstanceApi {
    client: ScwClient,
}

impl InstanceApi {
    pub fn new(client: ScwClient) -> Self {
        Self { client }
    }

    fn servers_path(zone: &Zone) -> String {
        format!("/instance/v1/zones/{}/servers", zone)
    }

    fn volumes_path(zone: &Zone) -> String {
        format!("/instance/v1/zones/{}/volumes", zone)
    }

    pub async fn create_server(
        &self,
        zone: &Zone,
        request: &CreateServerRequest,
    ) -> ProviderResult<Server> {
        let response: ServerResponse = self
            .client
            .post(&Self::servers_path(zone), request)
            .await?;
        Ok(response.server)
    }

    pub async fn get_server(&self, zone: &Zone, id: &str) -> ProviderResult<Server> {
        let response: ServerResponse = self
            .client
            .get(&format!("{}/{}", Self::servers_path(zone), id))
            .await?;
        Ok(response.server)
    }

    pub async fn list_servers(
        &self,
        zone: &Zone,
        filter: &ListFilter<'_>,
    ) -> ProviderResult<Vec<Server>> {
        let response: ServersResponse = self
            .client
            .get_with_query(&Self::servers_path(zone), &super::list_query(filter, "project"))
            .await?;
        Ok(response.servers)
    }

    pub async fn update_server(
        &self,
        zone: &Zone,
        id: &str,
        patch: &serde_json::Value,
    ) -> ProviderResult<Server> {
        let response: ServerResponse = self
            .client
            .patch(&format!("{}/{}", Self::servers_path(zone), id), patch)
            .await?;
        Ok(response.server)
    }

    pub async fn server_action(
        &self,
        zone: &Zone,
        id: &str,
        action: ServerAction,
    ) -> ProviderResult<()> {
        let _: serde_json::Value = self
            .client
            .post(
                &format!("{}/{}/action", Self::servers_path(zone), id),
                &serde_json::json!({ "action": action }),
            )
            .await?;
        Ok(())
    }

    pub async fn delete_server(&self, zone: &Zone, id: &str) -> ProviderResult<()> {
        self.client
            .delete(&format!("{}/{}", Self::servers_path(zone), id))
            .await
    }

    pub async fn create_volume(
        &self,
        zone: &Zone,
        request: &CreateVolumeRequest,
    ) -> ProviderResult<Volume> {
        let response: VolumeResponse = self
            .client
            .post(&Self::volumes_path(zone), request)
            .await?;
        Ok(response.volume)
    }

    pub async fn get_volume(&self, zone: &Zone, id: &str) -> ProviderResult<Volume> {
        let response: VolumeResponse = self
            .client
            .get(&format!("{}/{}", Self::volumes_path(zone), id))
            .await?;
        Ok(response.volume)
    }

    pub async fn update_volume(
        &self,
        zone: &Zone,
        id: &str,
        patch: &serde_json::Value,
    ) -> ProviderResult<()> {
        let _: VolumeResponse = self
            .client
            .patch(&format!("{}/{}", Self::volumes_path(zone), id), patch)
            .await?;
        Ok(())
    }

    pub async fn delete_volume(&self, zone: &Zone, id: &str) -> ProviderResult<()> {
        self.client
            .delete(&format!("{}/{}", Self::volumes_path(zone), id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn server_states_deserialize() {
        let server: Server = serde_json::from_value(json!({
            "id": "11111111-1111-1111-1111-111111111111",
            "name": "web",
            "commercial_type": "DEV1-S",
            "state": "stopped in place",
            "project": "p",
            "organization": "o",
            "zone": "fr-par-1",
            "image": {"id": "img", "name": "Ubuntu"}
        }))
        .unwrap();
        assert_eq!(server.state, ServerState::StoppedInPlace);
        assert!(server.state.is_stopped());

        let state: ServerState = serde_json::from_value(json!("rebooting")).unwrap();
        assert_eq!(state, ServerState::Unknown);
    }

    #[test]
    fn actions_serialize_as_snake_case() {
        assert_eq!(
            serde_json::to_value(ServerAction::Poweron).unwrap(),
            json!("poweron")
        );
    }
}
