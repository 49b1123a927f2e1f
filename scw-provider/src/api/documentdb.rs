//! Document Database API: logical databases of an instance (regional)
//!
//! Databases have no id of their own and no get endpoint; they are named
//! within their instance and fetched by listing.

use scw_core::datasource::find_exact;
use scw_core::locality::Region;
use scw_core::provider::ProviderResult;
use scw_core::waiter::{RemoteEntity, Synchronous};
use serde::Deserialize;

use crate::client::ScwClient;

#[derive(Debug, Clone, Deserialize)]
pub struct Database {
    pub name: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub managed: bool,
    /// Bytes
    #[serde(default)]
    pub size: u64,
}

impl RemoteEntity for Database {
    type Status = Synchronous;

    fn remote_id(&self) -> &str {
        &self.name
    }

    fn status(&self) -> Synchronous {
        Synchronous::Settled
    }

    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }
}

#[derive(Deserialize)]
struct DatabasesResponse {
    #[serde(default)]
    databases: Vec<Database>,
}

#[derive(Clone)]
pub struct DocumentDbApi {
    client: ScwClient,
}

impl DocumentDbApi {
    pub fn new(client: ScwClient) -> Self {
        Self { client }
    }

    fn path(region: &Region, instance_id: &str) -> String {
        format!(
            "/document-db/v1beta1/regions/{}/instances/{}/databases",
            region, instance_id
        )
    }

    pub async fn create_database(
        &self,
        region: &Region,
        instance_id: &str,
        name: &str,
    ) -> ProviderResult<Database> {
        self.client
            .post(
                &Self::path(region, instance_id),
                &serde_json::json!({ "name": name }),
            )
            .await
    }

    pub async fn list_databases(
        &self,
        region: &Region,
        instance_id: &str,
        name: &str,
    ) -> ProviderResult<Vec<Database>> {
        let response: DatabasesResponse = self
            .client
            .get_with_query(&Self::path(region, instance_id), &super::name_query(name))
            .await?;
        Ok(response.databases)
    }

    /// The database named exactly `name`; `NotFound` when absent
    pub async fn get_database(
        &self,
        region: &Region,
        instance_id: &str,
        name: &str,
    ) -> ProviderResult<Database> {
        let candidates = self.list_databases(region, instance_id, name).await?;
        find_exact(candidates, |db| Some(db.name.as_str()), name, "database")
    }

    pub async fn delete_database(
        &self,
        region: &Region,
        instance_id: &str,
        name: &str,
    ) -> ProviderResult<()> {
        self.client
            .delete(&Self::database_path(region, instance_id, name))
            .await
    }

    /// Database names may hold characters that are not path-safe
    fn database_path(region: &Region, instance_id: &str, name: &str) -> String {
        format!(
            "{}/{}",
            Self::path(region, instance_id),
            urlencoding::encode(name)
        )
    }
}
