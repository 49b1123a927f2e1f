//! Public Gateway API (zonal)

use scw_core::datasource::ListFilter;
use scw_core::locality::Zone;
use scw_core::provider::ProviderResult;
use scw_core::waiter::RemoteEntity;
use serde::{Deserialize, Serialize};

use crate::client::ScwClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayStatus {
    Stopped,
    Allocating,
    Configuring,
    Running,
    Stopping,
    Failed,
    Deleting,
    Deleted,
    Locked,
    #[serde(other)]
    Unknown,
}

impl GatewayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayStatus::Stopped => "stopped",
            GatewayStatus::Allocating => "allocating",
            GatewayStatus::Configuring => "configuring",
            GatewayStatus::Running => "running",
            GatewayStatus::Stopping => "stopping",
            GatewayStatus::Failed => "failed",
            GatewayStatus::Deleting => "deleting",
            GatewayStatus::Deleted => "deleted",
            GatewayStatus::Locked => "locked",
            GatewayStatus::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayType {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayIp {
    pub id: String,
    pub address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Gateway {
    pub id: String,
    pub name: String,
    pub organization_id: String,
    pub project_id: String,
    #[serde(rename = "type")]
    pub gateway_type: GatewayType,
    pub status: GatewayStatus,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub ip: Option<GatewayIp>,
    #[serde(default)]
    pub upstream_dns_servers: Vec<String>,
    pub zone: String,
    #[serde(default)]
    pub bastion_enabled: bool,
    #[serde(default)]
    pub bastion_port: i64,
    #[serde(default)]
    pub smtp_enabled: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl RemoteEntity for Gateway {
    type Status = GatewayStatus;

    fn remote_id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> GatewayStatus {
        self.status
    }

    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateGatewayRequest {
    pub name: String,
    pub project_id: String,
    #[serde(rename = "type")]
    pub gateway_type: String,
    pub tags: Vec<String>,
    pub upstream_dns_servers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_id: Option<String>,
    pub enable_smtp: bool,
    pub enable_bastion: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bastion_port: Option<i64>,
}

#[derive(Deserialize)]
struct GatewaysResponse {
    #[serde(default)]
    gateways: Vec<Gateway>,
}

#[derive(Clone)]
pub struct VpcGwApi {
    client: ScwClient,
}

impl VpcGwApi {
    pub fn new(client: ScwClient) -> Self {
        Self { client }
    }

    fn path(zone: &Zone) -> String {
        format!("/vpc-gw/v1/zones/{}/gateways", zone)
    }

    pub async fn create_gateway(
        &self,
        zone: &Zone,
        request: &CreateGatewayRequest,
    ) -> ProviderResult<Gateway> {
        self.client.post(&Self::path(zone), request).await
    }

    pub async fn get_gateway(&self, zone: &Zone, id: &str) -> ProviderResult<Gateway> {
        self.client.get(&format!("{}/{}", Self::path(zone), id)).await
    }

    pub async fn list_gateways(
        &self,
        zone: &Zone,
        filter: &ListFilter<'_>,
    ) -> ProviderResult<Vec<Gateway>> {
        let response: GatewaysResponse = self
            .client
            .get_with_query(&Self::path(zone), &super::list_query(filter, "project_id"))
            .await?;
        Ok(response.gateways)
    }

    pub async fn update_gateway(
        &self,
        zone: &Zone,
        id: &str,
        patch: &serde_json::Value,
    ) -> ProviderResult<Gateway> {
        self.client
            .patch(&format!("{}/{}", Self::path(zone), id), patch)
            .await
    }

    pub async fn delete_gateway(&self, zone: &Zone, id: &str) -> ProviderResult<()> {
        self.client
            .delete_with_query(
                &format!("{}/{}", Self::path(zone), id),
                &[("cleanup_dhcp", "false".to_string())],
            )
            .await
    }
}
