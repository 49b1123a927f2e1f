//! iam_application - IAM applications (global, synchronous)

use std::collections::HashMap;
use std::time::Duration;

use scw_core::identifier::{CompositeId, IdScope};
use scw_core::locality::Locality;
use scw_core::provider::{BoxFuture, ProviderResult};
use scw_core::reconciler::ResourceHandler;
use scw_core::resource::{Attributes, Resource, Value};
use scw_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::Flattened;
use crate::api::iam::{Application, CreateApplicationRequest, IamApi};
use crate::client::ScwClient;
use crate::util::{Ownership, name_or_generate, patch_field, string_list};

pub struct ApplicationHandler {
    api: IamApi,
    ownership: Ownership,
}

impl ApplicationHandler {
    pub fn new(client: ScwClient, ownership: Ownership) -> Self {
        Self {
            api: IamApi::new(client),
            ownership,
        }
    }
}

impl ResourceHandler for ApplicationHandler {
    type Entity = Application;

    fn resource_type(&self) -> &'static str {
        "iam_application"
    }

    fn scope(&self) -> IdScope {
        IdScope::Global
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new("iam_application")
            .with_description("IAM application")
            .attribute(AttributeSchema::new("name", AttributeType::String))
            .attribute(AttributeSchema::new("description", AttributeType::String))
            .attribute(AttributeSchema::new("tags", types::string_list()))
            .attribute(AttributeSchema::new("organization_id", types::uuid()).force_new())
            .attribute(AttributeSchema::new("editable", AttributeType::Bool).computed())
            .attribute(AttributeSchema::new("created_at", AttributeType::String).computed())
            .attribute(AttributeSchema::new("updated_at", AttributeType::String).computed())
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(60)
    }

    fn retry_interval(&self) -> Duration {
        Duration::from_secs(5)
    }

    fn create<'a>(
        &'a self,
        _locality: Option<&'a Locality>,
        resource: &'a Resource,
    ) -> BoxFuture<'a, ProviderResult<Application>> {
        Box::pin(async move {
            let request = CreateApplicationRequest {
                name: name_or_generate(resource, "app"),
                organization_id: self.ownership.organization_id(resource)?,
                description: resource.get_str("description").unwrap_or_default().to_string(),
                tags: string_list(resource, "tags"),
            };
            self.api.create_application(&request).await
        })
    }

    fn get<'a>(&'a self, id: &'a CompositeId) -> BoxFuture<'a, ProviderResult<Application>> {
        Box::pin(async move { self.api.get_application(id.id()).await })
    }

    fn update<'a>(
        &'a self,
        id: &'a CompositeId,
        to: &'a Resource,
        changed: &'a [String],
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            let mut patch = serde_json::Map::new();
            patch_field(&mut patch, changed, "name", "name", || {
                serde_json::json!(name_or_generate(to, "app"))
            });
            patch_field(&mut patch, changed, "description", "description", || {
                serde_json::json!(to.get_str("description").unwrap_or_default())
            });
            patch_field(&mut patch, changed, "tags", "tags", || {
                serde_json::json!(string_list(to, "tags"))
            });
            self.api
                .update_application(id.id(), &serde_json::Value::Object(patch))
                .await?;
            Ok(())
        })
    }

    fn delete<'a>(&'a self, id: &'a CompositeId) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move { self.api.delete_application(id.id()).await })
    }

    fn flatten(&self, _id: &CompositeId, application: &Application) -> HashMap<String, Value> {
        Flattened::new()
            .string("name", &application.name)
            .string("description", &application.description)
            .strings("tags", &application.tags)
            .string("organization_id", &application.organization_id)
            .bool("editable", application.editable)
            .optional("created_at", application.created_at.as_deref())
            .optional("updated_at", application.updated_at.as_deref())
            .build()
    }
}
