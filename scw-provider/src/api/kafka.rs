//! Managed Kafka API: clusters (regional)

use scw_core::datasource::ListFilter;
use scw_core::locality::Region;
use scw_core::provider::ProviderResult;
use scw_core::waiter::RemoteEntity;
use serde::{Deserialize, Serialize};

use crate::client::ScwClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KafkaStatus {
    Ready,
    Creating,
    Configuring,
    Initializing,
    Deleting,
    Error,
    Locked,
    Stopped,
    #[serde(other)]
    Unknown,
}

impl KafkaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            KafkaStatus::Ready => "ready",
            KafkaStatus::Creating => "creating",
            KafkaStatus::Configuring => "configuring",
            KafkaStatus::Initializing => "initializing",
            KafkaStatus::Deleting => "deleting",
            KafkaStatus::Error => "error",
            KafkaStatus::Locked => "locked",
            KafkaStatus::Stopped => "stopped",
            KafkaStatus::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KafkaVolume {
    #[serde(rename = "type")]
    pub volume_type: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivateNetworkRef {
    pub private_network_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KafkaEndpoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_network: Option<PrivateNetworkRef>,
    #[serde(default, skip_serializing)]
    pub dns_records: Vec<String>,
    #[serde(default, skip_serializing)]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KafkaCluster {
    pub id: String,
    pub name: String,
    pub status: KafkaStatus,
    pub version: String,
    pub node_amount: u32,
    pub node_type: String,
    #[serde(default)]
    pub volume: Option<KafkaVolume>,
    #[serde(default)]
    pub endpoints: Vec<KafkaEndpoint>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub project_id: String,
    pub organization_id: String,
    pub region: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl KafkaCluster {
    /// Private network of the first endpoint attached to one
    pub fn private_network_id(&self) -> Option<&str> {
        self.endpoints
            .iter()
            .find_map(|e| e.private_network.as_ref())
            .map(|pn| pn.private_network_id.as_str())
    }
}

impl RemoteEntity for KafkaCluster {
    type Status = KafkaStatus;

    fn remote_id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> KafkaStatus {
        self.status
    }

    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateKafkaClusterRequest {
    pub project_id: String,
    pub name: String,
    pub version: String,
    pub tags: Vec<String>,
    pub node_amount: u32,
    pub node_type: String,
    pub user_name: String,
    pub password: String,
    pub volume: KafkaVolume,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub endpoints: Vec<KafkaEndpoint>,
}

#[derive(Deserialize)]
struct ClustersResponse {
    #[serde(default)]
    clusters: Vec<KafkaCluster>,
}

#[derive(Clone)]
pub struct KafkaApi {
    client: ScwClient,
}

impl KafkaApi {
    pub fn new(client: ScwClient) -> Self {
        Self { client }
    }

    fn path(region: &Region) -> String {
        format!("/kafka/v1alpha1/regions/{}/clusters", region)
    }

    pub async fn create_cluster(
        &self,
        region: &Region,
        request: &CreateKafkaClusterRequest,
    ) -> ProviderResult<KafkaCluster> {
        self.client.post(&Self::path(region), request).await
    }

    pub async fn get_cluster(&self, region: &Region, id: &str) -> ProviderResult<KafkaCluster> {
        self.client
            .get(&format!("{}/{}", Self::path(region), id))
            .await
    }

    pub async fn list_clusters(
        &self,
        region: &Region,
        filter: &ListFilter<'_>,
    ) -> ProviderResult<Vec<KafkaCluster>> {
        let response: ClustersResponse = self
            .client
            .get_with_query(&Self::path(region), &super::list_query(filter, "project_id"))
            .await?;
        Ok(response.clusters)
    }

    pub async fn update_cluster(
        &self,
        region: &Region,
        id: &str,
        patch: &serde_json::Value,
    ) -> ProviderResult<KafkaCluster> {
        self.client
            .patch(&format!("{}/{}", Self::path(region), id), patch)
            .await
    }

    pub async fn delete_cluster(&self, region: &Region, id: &str) -> ProviderResult<()> {
        self.client
            .delete(&format!("{}/{}", Self::path(region), id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn endpoint_exposes_its_private_network() {
        let cluster: KafkaCluster = serde_json::from_value(json!({
            "id": "11111111-1111-1111-1111-111111111111",
            "name": "events",
            "status": "initializing",
            "version": "3.7.1",
            "node_amount": 1,
            "node_type": "BASIC-BASE-1",
            "volume": {"type": "sbs_5k", "size_bytes": 10_000_000_000u64},
            "endpoints": [
                {"dns_records": ["a.kafka.internal"], "port": 9092, "public_network": {}},
                {"dns_records": ["b.kafka.internal"], "port": 9092,
                 "private_network": {"private_network_id": "pn"}}
            ],
            "project_id": "p",
            "organization_id": "o",
            "region": "fr-par"
        }))
        .unwrap();
        assert_eq!(cluster.status, KafkaStatus::Initializing);
        assert_eq!(cluster.private_network_id(), Some("pn"));

        let status: KafkaStatus = serde_json::from_value(json!("unknown_status")).unwrap();
        assert_eq!(status, KafkaStatus::Unknown);
    }

    #[test]
    fn create_request_omits_missing_endpoints() {
        let request = CreateKafkaClusterRequest {
            project_id: "p".to_string(),
            name: "events".to_string(),
            version: "3.7.1".to_string(),
            tags: Vec::new(),
            node_amount: 1,
            node_type: "BASIC-BASE-1".to_string(),
            user_name: "admin".to_string(),
            password: "secret".to_string(),
            volume: KafkaVolume {
                volume_type: "sbs_5k".to_string(),
                size_bytes: 10_000_000_000,
            },
            endpoints: Vec::new(),
        };
        let body = serde_json::to_value(&request).unwrap();
        assert!(body.get("endpoints").is_none());
        assert_eq!(body["volume"]["type"], json!("sbs_5k"));
    }
}
