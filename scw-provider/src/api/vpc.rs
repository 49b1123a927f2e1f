//! VPC API: private networks (regional, synchronous)

use scw_core::datasource::ListFilter;
use scw_core::locality::Region;
use scw_core::provider::ProviderResult;
use scw_core::waiter::{RemoteEntity, Synchronous};
use serde::{Deserialize, Serialize};

use crate::client::ScwClient;

#[derive(Debug, Clone, Deserialize)]
pub struct Subnet {
    pub id: String,
    pub subnet: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrivateNetwork {
    pub id: String,
    pub name: String,
    pub organization_id: String,
    pub project_id: String,
    pub region: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub subnets: Vec<Subnet>,
    #[serde(default)]
    pub vpc_id: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl RemoteEntity for PrivateNetwork {
    type Status = Synchronous;

    fn remote_id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> Synchronous {
        Synchronous::Settled
    }

    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatePrivateNetworkRequest {
    pub name: String,
    pub project_id: String,
    pub tags: Vec<String>,
    pub subnets: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
}

#[derive(Deserialize)]
struct PrivateNetworksResponse {
    #[serde(default)]
    private_networks: Vec<PrivateNetwork>,
}

#[derive(Clone)]
pub struct VpcApi {
    client: ScwClient,
}

impl VpcApi {
    pub fn new(client: ScwClient) -> Self {
        Self { client }
    }

    fn path(region: &Region) -> String {
        format!("/vpc/v2/regions/{}/private-networks", region)
    }

    pub async fn create_private_network(
        &self,
        region: &Region,
        request: &CreatePrivateNetworkRequest,
    ) -> ProviderResult<PrivateNetwork> {
        self.client.post(&Self::path(region), request).await
    }

    pub async fn get_private_network(
        &self,
        region: &Region,
        id: &str,
    ) -> ProviderResult<PrivateNetwork> {
        self.client
            .get(&format!("{}/{}", Self::path(region), id))
            .await
    }

    pub async fn list_private_networks(
        &self,
        region: &Region,
        filter: &ListFilter<'_>,
    ) -> ProviderResult<Vec<PrivateNetwork>> {
        let response: PrivateNetworksResponse = self
            .client
            .get_with_query(&Self::path(region), &super::list_query(filter, "project_id"))
            .await?;
        Ok(response.private_networks)
    }

    pub async fn update_private_network(
        &self,
        region: &Region,
        id: &str,
        patch: &serde_json::Value,
    ) -> ProviderResult<PrivateNetwork> {
        self.client
            .patch(&format!("{}/{}", Self::path(region), id), patch)
            .await
    }

    pub async fn delete_private_network(&self, region: &Region, id: &str) -> ProviderResult<()> {
        self.client
            .delete(&format!("{}/{}", Self::path(region), id))
            .await
    }
}
