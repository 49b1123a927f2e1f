//! k8s_cluster - Kubernetes Kapsule clusters (regional, asynchronous)
//!
//! `version` may be declared as a minor version (`1.28`); it resolves to the
//! newest available patch at create and upgrade time, and a tracked
//! `1.28.x` is not a change against a declared `1.28`.

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

use super::{Flattened, region_arg, region_of};
use crate::api::k8s::{
    Cluster, ClusterStatus, CreateClusterRequest, K8sApi, is_minor_version, minor_version,
};
use crate::client::ScwClient;
use crate::util::{Ownership, expanded_id, name_or_generate, patch_field, string_list};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15 * 60);
const RETRY_INTERVAL: Duration = Duration::from_secs(5);

const DEFAULT_CLUSTER_TYPE: &str = "kapsule";

fn suppress_version_prefix(desired: &Value, current: &Value) -> bool {
    match (desired, current) {
        (Value::String(desired), Value::String(current)) => {
            desired == current
                || (is_minor_version(desired)
                    && minor_version(current).as_deref() == Some(desired.as_str()))
        }
        _ => false,
    }
}

pub struct ClusterHandler {
    api: K8sApi,
    ownership: Ownership,
}

impl ClusterHandler {
    pub fn new(client: ScwClient, ownership: Ownership) -> Self {
        Self {
            api: K8sApi::new(client),
            ownership,
        }
    }

    fn declared_version(resource: &Resource) -> ProviderResult<&str> {
        resource
            .get_str("version")
            .ok_or_else(|| ProviderError::validation("version is required"))
    }
}

impl ResourceHandler for ClusterHandler {
    type Entity = Cluster;

    fn resource_type(&self) -> &'static str {
        "k8s_cluster"
    }

    fn scope(&self) -> IdScope {
        IdScope::Regional
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new("k8s_cluster")
            .with_description("Kubernetes cluster")
            .attribute(AttributeSchema::new("name", AttributeType::String))
            .attribute(
                AttributeSchema::new("type", AttributeType::String)
                    .force_new()
                    .with_default(Value::string(DEFAULT_CLUSTER_TYPE))
                    .with_diff_suppress(suppress::ignore_case),
            )
            .attribute(
                AttributeSchema::new("version", AttributeType::String)
                    .required()
                    .with_description("x.y.z, or x.y for the newest patch")
                    .with_diff_suppress(suppress_version_prefix),
            )
            .attribute(
                AttributeSchema::new(
                    "cni",
                    AttributeType::Enum(
                        ["cilium", "calico", "kilo", "flannel"]
                            .iter()
                            .map(|s| s.to_string())
                            .collect(),
                    ),
                )
                .required()
                .force_new(),
            )
            .attribute(AttributeSchema::new("description", AttributeType::String))
            .attribute(AttributeSchema::new("tags", types::string_list()))
            .attribute(
                AttributeSchema::new("private_network_id", types::uuid_or_localized_uuid())
                    .force_new()
                    .with_diff_suppress(suppress::ignore_locality),
            )
            .attribute(AttributeSchema::new("region", types::region()).force_new())
            .attribute(AttributeSchema::new("project_id", types::uuid()).force_new())
            .attribute(AttributeSchema::new("organization_id", AttributeType::String).computed())
            .attribute(AttributeSchema::new("status", AttributeType::String).computed())
            .attribute(AttributeSchema::new("apiserver_url", AttributeType::String).computed())
            .attribute(AttributeSchema::new("wildcard_dns", AttributeType::String).computed())
            .attribute(AttributeSchema::new("upgrade_available", AttributeType::Bool).computed())
            .attribute(AttributeSchema::new("created_at", AttributeType::String).computed())
            .attribute(AttributeSchema::new("updated_at", AttributeType::String).computed())
    }

    fn timeout(&self) -> Duration {
        DEFAULT_TIMEOUT
    }

    fn retry_interval(&self) -> Duration {
        RETRY_INTERVAL
    }

    fn terminal_statuses(&self) -> Option<TerminalStatuses<ClusterStatus>> {
        Some(TerminalStatuses::new(
            vec![ClusterStatus::Ready, ClusterStatus::PoolRequired],
            vec![ClusterStatus::Locked],
        ))
    }

    fn deleted_statuses(&self) -> Vec<ClusterStatus> {
        vec![ClusterStatus::Deleted]
    }

    fn create<'a>(
        &'a self,
        locality: Option<&'a Locality>,
        resource: &'a Resource,
    ) -> BoxFuture<'a, ProviderResult<Cluster>> {
        Box::pin(async move {
            let region = region_arg(locality)?;
            let version = self
                .api
                .resolve_version(&region, Self::declared_version(resource)?)
                .await?;
            let request = CreateClusterRequest {
                project_id: self.ownership.project_id(resource)?,
                cluster_type: resource
                    .get_str("type")
                    .unwrap_or(DEFAULT_CLUSTER_TYPE)
                    .to_string(),
                name: name_or_generate(resource, "k8s"),
                description: resource.get_str("description").unwrap_or_default().to_string(),
                tags: string_list(resource, "tags"),
                version,
                cni: resource.get_str("cni").unwrap_or_default().to_string(),
                private_network_id: expanded_id(resource, "private_network_id"),
            };
            self.api.create_cluster(&region, &request).await
        })
    }

    fn get<'a>(&'a self, id: &'a CompositeId) -> BoxFuture<'a, ProviderResult<Cluster>> {
        Box::pin(async move { self.api.get_cluster(&region_of(id)?, id.id()).await })
    }

    fn update<'a>(
        &'a self,
        id: &'a CompositeId,
        to: &'a Resource,
        changed: &'a [String],
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            let region = region_of(id)?;
            let mut patch = serde_json::Map::new();
            patch_field(&mut patch, changed, "name", "name", || {
                serde_json::json!(name_or_generate(to, "k8s"))
            });
            patch_field(&mut patch, changed, "description", "description", || {
                serde_json::json!(to.get_str("description").unwrap_or_default())
            });
            patch_field(&mut patch, changed, "tags", "tags", || {
                serde_json::json!(string_list(to, "tags"))
            });
            if !patch.is_empty() {
                self.api
                    .update_cluster(&region, id.id(), &serde_json::Value::Object(patch))
                    .await?;
            }

            if changed.iter().any(|c| c == "version") {
                let version = self
                    .api
                    .resolve_version(&region, Self::declared_version(to)?)
                    .await?;
                log::info!("upgrading cluster {} to {}", id, version);
                self.api.upgrade_cluster(&region, id.id(), &version).await?;
            }
            Ok(())
        })
    }

    fn delete<'a>(&'a self, id: &'a CompositeId) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move { self.api.delete_cluster(&region_of(id)?, id.id()).await })
    }

    fn flatten(&self, id: &CompositeId, cluster: &Cluster) -> HashMap<String, Value> {
        Flattened::new()
            .string("name", &cluster.name)
            .string("type", &cluster.cluster_type)
            .string("version", &cluster.version)
            .string("cni", &cluster.cni)
            .string("description", &cluster.description)
            .strings("tags", &cluster.tags)
            .optional(
                "private_network_id",
                cluster
                    .private_network_id
                    .as_ref()
                    .map(|pn| format!("{}/{}", cluster.region, pn))
                    .as_deref(),
            )
            .optional("region", id.locality().as_ref().map(|l| l.as_str()))
            .string("project_id", &cluster.project_id)
            .string("organization_id", &cluster.organization_id)
            .string("status", cluster.status.as_str())
            .optional("apiserver_url", Some(cluster.cluster_url.as_str()))
            .optional("wildcard_dns", Some(cluster.wildcard_dns.as_str()))
            .bool("upgrade_available", cluster.upgrade_available)
            .optional("created_at", cluster.created_at.as_deref())
            .optional("updated_at", cluster.updated_at.as_deref())
            .build()
    }

    fn lookup_id_attribute(&self) -> Option<&'static str> {
        Some("cluster_id")
    }

    fn list<'a>(
        &'a self,
        locality: Option<&'a Locality>,
        filter: ListFilter<'a>,
    ) -> BoxFuture<'a, ProviderResult<Vec<Cluster>>> {
        Box::pin(async move { self.api.list_clusters(&region_arg(locality)?, &filter).await })
    }
}
