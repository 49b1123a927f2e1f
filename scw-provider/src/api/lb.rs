//! Load Balancer API (zonal)

use scw_core::datasource::ListFilter;
use scw_core::locality::Zone;
use scw_core::provider::ProviderResult;
use scw_core::waiter::RemoteEntity;
use serde::{Deserialize, Serialize};

use crate::client::ScwClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LbStatus {
    Ready,
    Pending,
    Stopped,
    Error,
    Locked,
    Migrating,
    ToCreate,
    Creating,
    ToDelete,
    Deleting,
    #[serde(other)]
    Unknown,
}

impl LbStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LbStatus::Ready => "ready",
            LbStatus::Pending => "pending",
            LbStatus::Stopped => "stopped",
            LbStatus::Error => "error",
            LbStatus::Locked => "locked",
            LbStatus::Migrating => "migrating",
            LbStatus::ToCreate => "to_create",
            LbStatus::Creating => "creating",
            LbStatus::ToDelete => "to_delete",
            LbStatus::Deleting => "deleting",
            LbStatus::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LbIp {
    pub id: String,
    pub ip_address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoadBalancer {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub status: LbStatus,
    #[serde(rename = "type")]
    pub lb_type: String,
    #[serde(default)]
    pub ip: Vec<LbIp>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub ssl_compatibility_level: String,
    pub project_id: String,
    pub organization_id: String,
    pub zone: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl RemoteEntity for LoadBalancer {
    type Status = LbStatus;

    fn remote_id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> LbStatus {
        self.status
    }

    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateLbRequest {
    pub project_id: String,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ip_ids: Vec<String>,
    pub tags: Vec<String>,
    #[serde(rename = "type")]
    pub lb_type: String,
    pub ssl_compatibility_level: String,
}

/// Body of the PUT update; every field is sent, changed or not
#[derive(Debug, Clone, Serialize)]
pub struct UpdateLbRequest {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub ssl_compatibility_level: String,
}

#[derive(Deserialize)]
struct LbsResponse {
    #[serde(default)]
    lbs: Vec<LoadBalancer>,
}

#[derive(Clone)]
pub struct LbApi {
    client: ScwClient,
}

impl LbApi {
    pub fn new(client: ScwClient) -> Self {
        Self { client }
    }

    fn path(zone: &Zone) -> String {
        format!("/lb/v1/zones/{}/lbs", zone)
    }

    pub async fn create_lb(&self, zone: &Zone, request: &CreateLbRequest) -> ProviderResult<LoadBalancer> {
        self.client.post(&Self::path(zone), request).await
    }

    pub async fn get_lb(&self, zone: &Zone, id: &str) -> ProviderResult<LoadBalancer> {
        self.client.get(&format!("{}/{}", Self::path(zone), id)).await
    }

    pub async fn list_lbs(
        &self,
        zone: &Zone,
        filter: &ListFilter<'_>,
    ) -> ProviderResult<Vec<LoadBalancer>> {
        let response: LbsResponse = self
            .client
            .get_with_query(&Self::path(zone), &super::list_query(filter, "project_id"))
            .await?;
        Ok(response.lbs)
    }

    pub async fn update_lb(
        &self,
        zone: &Zone,
        id: &str,
        request: &UpdateLbRequest,
    ) -> ProviderResult<LoadBalancer> {
        self.client
            .put(&format!("{}/{}", Self::path(zone), id), request)
            .await
    }

    /// Move the load balancer to another offer, keeping its IPs
    pub async fn migrate_lb(&self, zone: &Zone, id: &str, lb_type: &str) -> ProviderResult<LoadBalancer> {
        self.client
            .post(
                &format!("{}/{}/migrate", Self::path(zone), id),
                &serde_json::json!({ "type": lb_type }),
            )
            .await
    }

    /// Flexible IPs stay allocated to the project
    pub async fn delete_lb(&self, zone: &Zone, id: &str) -> ProviderResult<()> {
        self.client
            .delete_with_query(
                &format!("{}/{}", Self::path(zone), id),
                &[("release_ip", "false".to_string())],
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lb_deserializes_with_its_ips() {
        let lb: LoadBalancer = serde_json::from_value(json!({
            "id": "11111111-1111-1111-1111-111111111111",
            "name": "front",
            "status": "to_create",
            "type": "LB-S",
            "ip": [{"id": "ip-1", "ip_address": "51.15.0.2", "lb_id": "x"}],
            "project_id": "p",
            "organization_id": "o",
            "zone": "fr-par-1"
        }))
        .unwrap();
        assert_eq!(lb.status, LbStatus::ToCreate);
        assert_eq!(lb.ip[0].ip_address, "51.15.0.2");
        assert!(lb.description.is_empty());
    }
}
