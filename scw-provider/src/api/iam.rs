//! IAM API: applications (global, synchronous)

use scw_core::provider::ProviderResult;
use scw_core::waiter::{RemoteEntity, Synchronous};
use serde::{Deserialize, Serialize};

use crate::client::ScwClient;

const APPLICATIONS_PATH: &str = "/iam/v1alpha1/applications";

#[derive(Debug, Clone, Deserialize)]
pub struct Application {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub organization_id: String,
    #[serde(default)]
    pub editable: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl RemoteEntity for Application {
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
pub struct CreateApplicationRequest {
    pub name: String,
    pub organization_id: String,
    pub description: String,
    pub tags: Vec<String>,
}

#[derive(Clone)]
pub struct IamApi {
    client: ScwClient,
}

impl IamApi {
    pub fn new(client: ScwClient) -> Self {
        Self { client }
    }

    pub async fn create_application(
        &self,
        request: &CreateApplicationRequest,
    ) -> ProviderResult<Application> {
        self.client.post(APPLICATIONS_PATH, request).await
    }

    pub async fn get_application(&self, id: &str) -> ProviderResult<Application> {
        self.client
            .get(&format!("{}/{}", APPLICATIONS_PATH, id))
            .await
    }

    pub async fn update_application(
        &self,
        id: &str,
        patch: &serde_json::Value,
    ) -> ProviderResult<Application> {
        self.client
            .patch(&format!("{}/{}", APPLICATIONS_PATH, id), patch)
            .await
    }

    pub async fn delete_application(&self, id: &str) -> ProviderResult<()> {
        self.client
            .delete(&format!("{}/{}", APPLICATIONS_PATH, id))
            .await
    }
}
