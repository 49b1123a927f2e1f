//! Kubernetes Kapsule API: clusters and versions (regional)

use scw_core::datasource::ListFilter;
use scw_core::locality::Region;
use scw_core::provider::{ProviderError, ProviderResult};
use scw_core::waiter::RemoteEntity;
use serde::{Deserialize, Serialize};

use crate::client::ScwClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterStatus {
    Creating,
    Ready,
    Deleting,
    Deleted,
    Updating,
    Locked,
    PoolRequired,
    #[serde(other)]
    Unknown,
}

impl ClusterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterStatus::Creating => "creating",
            ClusterStatus::Ready => "ready",
            ClusterStatus::Deleting => "deleting",
            ClusterStatus::Deleted => "deleted",
            ClusterStatus::Updating => "updating",
            ClusterStatus::Locked => "locked",
            ClusterStatus::PoolRequired => "pool_required",
            ClusterStatus::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Cluster {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub cluster_type: String,
    pub status: ClusterStatus,
    pub version: String,
    pub cni: String,
    pub region: String,
    pub organization_id: String,
    pub project_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub cluster_url: String,
    #[serde(default)]
    pub wildcard_dns: String,
    #[serde(default)]
    pub upgrade_available: bool,
    #[serde(default)]
    pub private_network_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl RemoteEntity for Cluster {
    type Status = ClusterStatus;

    fn remote_id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> ClusterStatus {
        self.status
    }

    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateClusterRequest {
    pub project_id: String,
    #[serde(rename = "type")]
    pub cluster_type: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub version: String,
    pub cni: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_network_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Version {
    pub name: String,
}

#[derive(Deserialize)]
struct ClustersResponse {
    #[serde(default)]
    clusters: Vec<Cluster>,
}

#[derive(Deserialize)]
struct VersionsResponse {
    #[serde(default)]
    versions: Vec<Version>,
}

/// `x.y` part of a full `x.y.z` version
pub fn minor_version(version: &str) -> Option<String> {
    let parts: Vec<&str> = version.split('.').collect();
    match parts.as_slice() {
        [major, minor, _patch] => Some(format!("{}.{}", major, minor)),
        _ => None,
    }
}

/// Whether `version` names only a minor version (`x.y`)
pub fn is_minor_version(version: &str) -> bool {
    let parts: Vec<&str> = version.split('.').collect();
    parts.len() == 2 && parts.iter().all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}

/// First full version of `available` within the minor version `minor`.
///
/// The versions endpoint lists newest first.
pub fn latest_patch_of(minor: &str, available: &[Version]) -> ProviderResult<String> {
    if !is_minor_version(minor) {
        return Err(ProviderError::validation(format!(
            "minor version should be like x.y not {}",
            minor
        )));
    }
    available
        .iter()
        .find(|v| minor_version(&v.name).as_deref() == Some(minor))
        .map(|v| v.name.clone())
        .ok_or_else(|| {
            ProviderError::validation(format!("no available upstream version found for {}", minor))
        })
}

#[derive(Clone)]
pub struct K8sApi {
    client: ScwClient,
}

impl K8sApi {
    pub fn new(client: ScwClient) -> Self {
        Self { client }
    }

    fn path(region: &Region) -> String {
        format!("/k8s/v1/regions/{}/clusters", region)
    }

    pub async fn create_cluster(
        &self,
        region: &Region,
        request: &CreateClusterRequest,
    ) -> ProviderResult<Cluster> {
        self.client.post(&Self::path(region), request).await
    }

    pub async fn get_cluster(&self, region: &Region, id: &str) -> ProviderResult<Cluster> {
        self.client
            .get(&format!("{}/{}", Self::path(region), id))
            .await
    }

    pub async fn list_clusters(
        &self,
        region: &Region,
        filter: &ListFilter<'_>,
    ) -> ProviderResult<Vec<Cluster>> {
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
    ) -> ProviderResult<Cluster> {
        self.client
            .patch(&format!("{}/{}", Self::path(region), id), patch)
            .await
    }

    /// Upgrade the control plane and every pool to `version`
    pub async fn upgrade_cluster(
        &self,
        region: &Region,
        id: &str,
        version: &str,
    ) -> ProviderResult<Cluster> {
        self.client
            .post(
                &format!("{}/{}/upgrade", Self::path(region), id),
                &serde_json::json!({ "version": version, "upgrade_pools": true }),
            )
            .await
    }

    pub async fn delete_cluster(&self, region: &Region, id: &str) -> ProviderResult<()> {
        self.client
            .delete_with_query(
                &format!("{}/{}", Self::path(region), id),
                &[("with_additional_resources", "false".to_string())],
            )
            .await
    }

    pub async fn list_versions(&self, region: &Region) -> ProviderResult<Vec<Version>> {
        let response: VersionsResponse = self
            .client
            .get(&format!("/k8s/v1/regions/{}/versions", region))
            .await?;
        Ok(response.versions)
    }

    /// Full version for a declared `x.y` or `x.y.z` version
    pub async fn resolve_version(&self, region: &Region, declared: &str) -> ProviderResult<String> {
        if !is_minor_version(declared) {
            return Ok(declared.to_string());
        }
        let available = self.list_versions(region).await?;
        latest_patch_of(declared, &available)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn versions(names: &[&str]) -> Vec<Version> {
        names
            .iter()
            .map(|n| Version {
                name: n.to_string(),
            })
            .collect()
    }

    #[test]
    fn minor_of_full_version() {
        assert_eq!(minor_version("1.28.2").as_deref(), Some("1.28"));
        assert_eq!(minor_version("1.28"), None);
        assert!(is_minor_version("1.28"));
        assert!(!is_minor_version("1.28.2"));
        assert!(!is_minor_version("1."));
    }

    #[test]
    fn latest_patch_picks_first_listed_match() {
        let available = versions(&["1.29.1", "1.28.4", "1.28.3"]);
        assert_eq!(latest_patch_of("1.28", &available).unwrap(), "1.28.4");
        assert!(latest_patch_of("1.27", &available).is_err());
        assert!(latest_patch_of("1.28.4", &available).is_err());
    }

    #[test]
    fn pool_required_deserializes() {
        let status: ClusterStatus = serde_json::from_str("\"pool_required\"").unwrap();
        assert_eq!(status, ClusterStatus::PoolRequired);
        assert_eq!(status.as_str(), "pool_required");
    }
}
