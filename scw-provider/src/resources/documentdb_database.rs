//! documentdb_database - Logical databases of a Document Database instance
//!
//! Identified by `region/instance_id/name`. Nothing about a database can be
//! changed in place.

use std::collections::HashMap;
use std::time::Duration;

use scw_core::identifier::{CompositeId, IdScope, MultiPartId, expand_id};
use scw_core::locality::{Locality, Region};
use scw_core::provider::{BoxFuture, ErrorKind, ProviderError, ProviderResult};
use scw_core::reconciler::ResourceHandler;
use scw_core::resource::{Attributes, Resource, Value};
use scw_core::schema::{AttributeSchema, AttributeType, ResourceSchema, suppress, types};

use super::{Flattened, region_arg};
use crate::api::documentdb::{Database, DocumentDbApi};
use crate::client::ScwClient;

const KEYS: &[&str] = &["region", "instance_id", "name"];

/// Parts of a database identifier
struct DatabaseRef<'a> {
    region: Region,
    instance_id: &'a str,
    name: &'a str,
}

impl<'a> DatabaseRef<'a> {
    fn from_id(id: &'a CompositeId) -> ProviderResult<Self> {
        let CompositeId::MultiPart(multi) = id else {
            return Err(ProviderError::with_kind(
                ErrorKind::MalformedIdentifier,
                format!("'{}' is not a region/instance_id/name identifier", id),
            ));
        };
        let part = move |key: &str| {
            multi.get(key).ok_or_else(|| {
                ProviderError::with_kind(
                    ErrorKind::MalformedIdentifier,
                    format!("'{}' has no {}", id, key),
                )
            })
        };
        Ok(Self {
            region: Region::parse(part("region")?)?,
            instance_id: part("instance_id")?,
            name: part("name")?,
        })
    }
}

pub struct DatabaseHandler {
    api: DocumentDbApi,
}

impl DatabaseHandler {
    pub fn new(client: ScwClient) -> Self {
        Self {
            api: DocumentDbApi::new(client),
        }
    }

    fn instance_id(resource: &Resource) -> ProviderResult<&str> {
        resource
            .get_str("instance_id")
            .map(expand_id)
            .ok_or_else(|| ProviderError::validation("instance_id is required"))
    }
}

impl ResourceHandler for DatabaseHandler {
    type Entity = Database;

    fn resource_type(&self) -> &'static str {
        "documentdb_database"
    }

    fn scope(&self) -> IdScope {
        IdScope::MultiPart(KEYS)
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new("documentdb_database")
            .with_description("Document Database logical database")
            .attribute(
                AttributeSchema::new("instance_id", types::uuid_or_localized_uuid())
                    .required()
                    .force_new()
                    .with_diff_suppress(suppress::ignore_locality),
            )
            .attribute(AttributeSchema::new("name", AttributeType::String).required().force_new())
            .attribute(AttributeSchema::new("region", types::region()).force_new())
            .attribute(AttributeSchema::new("owner", AttributeType::String).computed())
            .attribute(AttributeSchema::new("managed", AttributeType::Bool).computed())
            .attribute(AttributeSchema::new("size", AttributeType::Int).computed())
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(60)
    }

    fn retry_interval(&self) -> Duration {
        Duration::from_secs(5)
    }

    fn create<'a>(
        &'a self,
        locality: Option<&'a Locality>,
        resource: &'a Resource,
    ) -> BoxFuture<'a, ProviderResult<Database>> {
        Box::pin(async move {
            let region = region_arg(locality)?;
            let name = resource
                .get_str("name")
                .ok_or_else(|| ProviderError::validation("name is required"))?;
            self.api
                .create_database(&region, Self::instance_id(resource)?, name)
                .await
        })
    }

    fn identify(
        &self,
        locality: Option<&Locality>,
        resource: &Resource,
        database: &Database,
    ) -> ProviderResult<CompositeId> {
        let region = region_arg(locality)?;
        let values = HashMap::from([
            ("region".to_string(), region.to_string()),
            ("instance_id".to_string(), Self::instance_id(resource)?.to_string()),
            ("name".to_string(), database.name.clone()),
        ]);
        Ok(CompositeId::MultiPart(MultiPartId::new(KEYS, values)))
    }

    fn get<'a>(&'a self, id: &'a CompositeId) -> BoxFuture<'a, ProviderResult<Database>> {
        Box::pin(async move {
            let db = DatabaseRef::from_id(id)?;
            self.api
                .get_database(&db.region, db.instance_id, db.name)
                .await
        })
    }

    fn update<'a>(
        &'a self,
        id: &'a CompositeId,
        _to: &'a Resource,
        changed: &'a [String],
    ) -> BoxFuture<'a, ProviderResult<()>> {
        let message = format!(
            "database {} cannot be changed in place ({})",
            id,
            changed.join(", ")
        );
        Box::pin(async move { Err(ProviderError::validation(message)) })
    }

    fn delete<'a>(&'a self, id: &'a CompositeId) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            let db = DatabaseRef::from_id(id)?;
            self.api
                .delete_database(&db.region, db.instance_id, db.name)
                .await
        })
    }

    fn flatten(&self, id: &CompositeId, database: &Database) -> HashMap<String, Value> {
        let mut attributes = Flattened::new()
            .string("name", &database.name)
            .string("owner", &database.owner)
            .bool("managed", database.managed)
            .int("size", i64::try_from(database.size).unwrap_or(i64::MAX));
        if let Ok(db) = DatabaseRef::from_id(id) {
            attributes = attributes
                .string("region", db.region.as_str())
                .string("instance_id", format!("{}/{}", db.region, db.instance_id));
        }
        attributes.build()
    }
}
