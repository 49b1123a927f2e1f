//! Flexible IP API (zonal)

use scw_core::locality::Zone;
use scw_core::provider::ProviderResult;
use scw_core::waiter::RemoteEntity;
use serde::{Deserialize, Serialize};

use crate::client::ScwClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlexibleIpStatus {
    Ready,
    Updating,
    Attached,
    Error,
    Detaching,
    Locked,
    #[serde(other)]
    Unknown,
}

impl FlexibleIpStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlexibleIpStatus::Ready => "ready",
            FlexibleIpStatus::Updating => "updating",
            FlexibleIpStatus::Attached => "attached",
            FlexibleIpStatus::Error => "error",
            FlexibleIpStatus::Detaching => "detaching",
            FlexibleIpStatus::Locked => "locked",
            FlexibleIpStatus::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlexibleIp {
    pub id: String,
    pub organization_id: String,
    pub project_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub status: FlexibleIpStatus,
    pub ip_address: String,
    #[serde(default)]
    pub reverse: String,
    #[serde(default)]
    pub server_id: Option<String>,
    pub zone: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl RemoteEntity for FlexibleIp {
    type Status = FlexibleIpStatus;

    fn remote_id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> FlexibleIpStatus {
        self.status
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateFlexibleIpRequest {
    pub project_id: String,
    pub description: String,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reverse: Option<String>,
    pub is_ipv6: bool,
}

#[derive(Clone)]
pub struct FlexibleIpApi {
    client: ScwClient,
}

impl FlexibleIpApi {
    pub fn new(client: ScwClient) -> Self {
        Self { client }
    }

    fn path(zone: &Zone) -> String {
        format!("/flexible-ip/v1alpha1/zones/{}/fips", zone)
    }

    pub async fn create_flexible_ip(
        &self,
        zone: &Zone,
        request: &CreateFlexibleIpRequest,
    ) -> ProviderResult<FlexibleIp> {
        self.client.post(&Self::path(zone), request).await
    }

    pub async fn get_flexible_ip(&self, zone: &Zone, id: &str) -> ProviderResult<FlexibleIp> {
        self.client.get(&format!("{}/{}", Self::path(zone), id)).await
    }

    pub async fn update_flexible_ip(
        &self,
        zone: &Zone,
        id: &str,
        patch: &serde_json::Value,
    ) -> ProviderResult<FlexibleIp> {
        self.client
            .patch(&format!("{}/{}", Self::path(zone), id), patch)
            .await
    }

    pub async fn attach(&self, zone: &Zone, id: &str, server_id: &str) -> ProviderResult<()> {
        let _: serde_json::Value = self
            .client
            .post(
                &format!("{}/attach", Self::path(zone)),
                &serde_json::json!({ "fips_ids": [id], "server_id": server_id }),
            )
            .await?;
        Ok(())
    }

    pub async fn detach(&self, zone: &Zone, id: &str) -> ProviderResult<()> {
        let _: serde_json::Value = self
            .client
            .post(
                &format!("{}/detach", Self::path(zone)),
                &serde_json::json!({ "fips_ids": [id] }),
            )
            .await?;
        Ok(())
    }

    pub async fn delete_flexible_ip(&self, zone: &Zone, id: &str) -> ProviderResult<()> {
        self.client
            .delete(&format!("{}/{}", Self::path(zone), id))
            .await
    }
}
