//! Reconciler - One create / read / update / delete driver for every resource type
//!
//! A resource type only describes itself through [`ResourceHandler`]: its
//! remote calls, its terminal statuses, how its entity flattens into
//! attributes, and how its identifier is shaped. [`Reconciler`] owns the
//! control flow:
//!
//! - create: validate, resolve locality, create, bind identity, follow-up
//!   calls, wait, flatten
//! - read: parse identifier, fetch, clear state if gone, flatten
//! - update: wait, patch changed fields, wait, read
//! - delete: wait, delete, wait until gone, clear state
//!
//! Every verb mutates the tracked [`State`] in place. The identifier of a new
//! entity is bound as soon as the create call returns, so a failed follow-up
//! call or wait never loses track of an entity that exists remotely. Such a
//! state keeps `exists == false` and the next create resumes it.

use std::collections::HashMap;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::datasource::{ListFilter, find_exact};
use crate::identifier::{CompositeId, IdScope, expand_id, parse_localized_id};
use crate::identity::{self, Identity, IdentitySchema};
use crate::locality::{Locality, LocalityDefaults, Region, Zone};
use crate::provider::{BoxFuture, ErrorKind, ProviderError, ProviderResult};
use crate::resource::{Attributes, Resource, ResourceId, State, Value};
use crate::schema::ResourceSchema;
use crate::waiter::{RemoteEntity, TerminalStatuses, WaitConfig, Waiter};

type StatusOf<H> = <<H as ResourceHandler>::Entity as RemoteEntity>::Status;

/// What a resource type supplies to be driven by a [`Reconciler`]
pub trait ResourceHandler: Send + Sync {
    type Entity: RemoteEntity;

    /// Resource type name (e.g., "instance_server")
    fn resource_type(&self) -> &'static str;

    fn scope(&self) -> IdScope;

    fn schema(&self) -> ResourceSchema;

    /// Deadline of each wait
    fn timeout(&self) -> Duration;

    /// Interval between polls, unless overridden by [`WaitConfig`]
    fn retry_interval(&self) -> Duration;

    /// Terminal statuses after a mutation, or `None` when the API applies
    /// mutations synchronously.
    fn terminal_statuses(&self) -> Option<TerminalStatuses<StatusOf<Self>>> {
        None
    }

    /// Statuses meaning the entity is gone although still listed
    fn deleted_statuses(&self) -> Vec<StatusOf<Self>> {
        Vec::new()
    }

    fn create<'a>(
        &'a self,
        locality: Option<&'a Locality>,
        resource: &'a Resource,
    ) -> BoxFuture<'a, ProviderResult<Self::Entity>>;

    fn get<'a>(&'a self, id: &'a CompositeId) -> BoxFuture<'a, ProviderResult<Self::Entity>>;

    /// Patch the entity, touching only the `changed` attributes of `to`
    fn update<'a>(
        &'a self,
        id: &'a CompositeId,
        to: &'a Resource,
        changed: &'a [String],
    ) -> BoxFuture<'a, ProviderResult<()>>;

    fn delete<'a>(&'a self, id: &'a CompositeId) -> BoxFuture<'a, ProviderResult<()>>;

    /// Follow-up calls on a new entity, made once its identifier is tracked
    /// (e.g., powering on a server). Also runs when a create resumes, so it
    /// must check the entity before acting.
    fn after_create<'a>(
        &'a self,
        _id: &'a CompositeId,
        _resource: &'a Resource,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async { Ok(()) })
    }

    /// Tracked attributes of `entity`
    fn flatten(&self, id: &CompositeId, entity: &Self::Entity) -> HashMap<String, Value>;

    /// Composite identifier of a freshly created or looked-up entity
    fn identify(
        &self,
        locality: Option<&Locality>,
        _resource: &Resource,
        entity: &Self::Entity,
    ) -> ProviderResult<CompositeId> {
        let id = entity.remote_id().to_string();
        match (self.scope(), locality) {
            (IdScope::Zonal, Some(Locality::Zonal(zone))) => Ok(CompositeId::zonal(zone.clone(), id)),
            (IdScope::Regional, Some(locality)) => Ok(CompositeId::regional(locality.region(), id)),
            (IdScope::Global, _) => Ok(CompositeId::global(id)),
            (scope, _) => Err(ProviderError::with_kind(
                ErrorKind::State,
                format!(
                    "{} cannot derive a {} identifier",
                    self.resource_type(),
                    scope.name()
                ),
            )),
        }
    }

    /// Data-source attribute that names the entity by id (e.g., "server_id")
    fn lookup_id_attribute(&self) -> Option<&'static str> {
        None
    }

    /// Candidates for a lookup by name
    fn list<'a>(
        &'a self,
        _locality: Option<&'a Locality>,
        _filter: ListFilter<'a>,
    ) -> BoxFuture<'a, ProviderResult<Vec<Self::Entity>>> {
        let message = format!("{} cannot be looked up by name", self.resource_type());
        Box::pin(async move { Err(ProviderError::validation(message)) })
    }
}

/// Drives one resource type through its lifecycle
pub struct Reconciler<H: ResourceHandler> {
    handler: H,
    defaults: LocalityDefaults,
    wait: WaitConfig,
    cancel: CancellationToken,
}

impl<H: ResourceHandler> Reconciler<H> {
    pub fn new(handler: H, defaults: LocalityDefaults) -> Self {
        Self {
            handler,
            defaults,
            wait: WaitConfig::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_wait_config(mut self, wait: WaitConfig) -> Self {
        self.wait = wait;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    fn identity_schema(&self) -> IdentitySchema {
        IdentitySchema::for_scope(&self.handler.scope())
    }

    fn waiter(&self) -> Waiter {
        Waiter::new(self.handler.timeout(), self.handler.retry_interval())
            .with_config(&self.wait)
            .with_cancellation(self.cancel.clone())
    }

    fn describe(&self, id: &CompositeId) -> String {
        format!("{} {}", self.handler.resource_type(), id)
    }

    fn validate(&self, schema: &ResourceSchema, resource: &Resource) -> ProviderResult<Resource> {
        schema
            .validate(&resource.attributes)
            .map_err(|errors| ProviderError::invalid_attributes(&errors))?;
        Ok(Resource {
            attributes: schema.with_defaults(&resource.attributes),
            ..resource.clone()
        })
    }

    /// Declared `zone` / `region`, else the configured default
    fn resolve_locality(&self, resource: &Resource) -> ProviderResult<Option<Locality>> {
        let zonal = |resource: &Resource| -> ProviderResult<Locality> {
            let zone = match resource.get_str("zone") {
                Some(zone) => Zone::parse(zone)?,
                None => self.defaults.zone.clone(),
            };
            Ok(Locality::Zonal(zone))
        };
        let regional = |resource: &Resource| -> ProviderResult<Locality> {
            let region = match resource.get_str("region") {
                Some(region) => Region::parse(region)?,
                None => self.defaults.region.clone(),
            };
            Ok(Locality::Regional(region))
        };

        match self.handler.scope() {
            IdScope::Zonal => zonal(resource).map(Some),
            IdScope::Regional => regional(resource).map(Some),
            IdScope::Global => Ok(None),
            IdScope::MultiPart(keys) if keys.contains(&"zone") => zonal(resource).map(Some),
            IdScope::MultiPart(keys) if keys.contains(&"region") => regional(resource).map(Some),
            IdScope::MultiPart(_) => Ok(None),
        }
    }

    fn parse_identifier(&self, state: &State) -> ProviderResult<Option<CompositeId>> {
        match state.identifier.as_deref() {
            Some(identifier) => Ok(Some(CompositeId::parse(
                identifier,
                &self.handler.scope(),
            )?)),
            None => Ok(None),
        }
    }

    /// Identifier for a data source that references an entity by id, bare or
    /// prefixed with its locality
    fn reference_id(&self, raw: &str, locality: Option<&Locality>) -> ProviderResult<CompositeId> {
        let prefixed = parse_localized_id(raw).ok().map(|(locality, _)| locality);
        let locality = prefixed.as_ref().or(locality);
        match (self.handler.scope(), locality) {
            (IdScope::Zonal, Some(Locality::Zonal(zone))) => {
                Ok(CompositeId::zonal(zone.clone(), expand_id(raw)))
            }
            (IdScope::Regional, Some(locality)) => {
                Ok(CompositeId::regional(locality.region(), expand_id(raw)))
            }
            (IdScope::Global, _) => Ok(CompositeId::global(raw)),
            (scope @ IdScope::MultiPart(_), _) => Ok(CompositeId::parse(raw, &scope)?),
            (scope, _) => Err(ProviderError::validation(format!(
                "'{}' does not name a {} {}",
                raw,
                scope.name(),
                self.handler.resource_type()
            ))),
        }
    }

    /// Bind identity and flatten `entity` into `state`
    fn record(&self, state: &mut State, id: &CompositeId, entity: &H::Entity) -> ProviderResult<()> {
        state.identity.adopt_schema(self.identity_schema());
        identity::bind(state, id)?;
        state.attributes = self.handler.flatten(id, entity);
        state.exists = true;
        Ok(())
    }

    async fn wait_stable(
        &self,
        id: &CompositeId,
        statuses: &TerminalStatuses<StatusOf<H>>,
    ) -> ProviderResult<H::Entity> {
        self.waiter()
            .until_stable(&self.describe(id), statuses, || self.handler.get(id))
            .await
    }

    /// Current entity once it is no longer transitioning
    async fn settle(&self, id: &CompositeId) -> ProviderResult<H::Entity> {
        match self.handler.terminal_statuses() {
            Some(statuses) => self.wait_stable(id, &statuses).await,
            None => self.handler.get(id).await,
        }
    }

    /// Create the remote entity and record it in `state`.
    ///
    /// When `state` already carries an identifier (an earlier create whose
    /// wait did not finish), the existing entity is awaited instead of
    /// creating a second one.
    pub async fn create(&self, resource: &Resource, state: &mut State) -> ProviderResult<()> {
        self.create_entity(resource, state)
            .await
            .map_err(|e| e.for_resource(resource.id.clone()))
    }

    async fn create_entity(&self, resource: &Resource, state: &mut State) -> ProviderResult<()> {
        let schema = self.handler.schema();
        let declared = self.validate(&schema, resource)?;
        state.identity.adopt_schema(self.identity_schema());

        if let Some(id) = self.parse_identifier(state)? {
            log::info!("{} is already tracked, resuming", self.describe(&id));
            match self.settle(&id).await {
                Ok(_) => return self.finish_create(&id, &declared, state).await,
                Err(e) if e.is_not_found() => {
                    log::warn!("{} vanished before settling, creating anew", self.describe(&id));
                    state.clear();
                }
                Err(e) => return Err(e),
            }
        }

        let locality = self.resolve_locality(&declared)?;
        let entity = self.handler.create(locality.as_ref(), &declared).await?;
        let id = self
            .handler
            .identify(locality.as_ref(), &declared, &entity)?;
        // Tracked but not yet existing until recorded: a failure past this
        // point leaves a pending create that the next create resumes.
        identity::bind(state, &id)?;
        log::info!("created {}", self.describe(&id));

        self.finish_create(&id, &declared, state).await
    }

    async fn finish_create(
        &self,
        id: &CompositeId,
        declared: &Resource,
        state: &mut State,
    ) -> ProviderResult<()> {
        self.handler.after_create(id, declared).await?;
        let entity = self.settle(id).await?;
        self.record(state, id, &entity)
    }

    /// Refresh `state` from the remote entity. A vanished entity clears it.
    pub async fn read(&self, state: &mut State) -> ProviderResult<()> {
        let resource_id = state.id.clone();
        self.read_entity(state)
            .await
            .map_err(|e| e.for_resource(resource_id))
    }

    async fn read_entity(&self, state: &mut State) -> ProviderResult<()> {
        let Some(id) = self.parse_identifier(state)? else {
            state.clear();
            return Ok(());
        };

        match self.handler.get(&id).await {
            Ok(entity) => self.record(state, &id, &entity),
            Err(e) if e.is_not_found() => {
                log::warn!(
                    "{} no longer exists, clearing tracked state",
                    self.describe(&id)
                );
                state.clear();
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Apply the `changed` attributes of `to`, then read back
    pub async fn update(
        &self,
        to: &Resource,
        changed: &[String],
        state: &mut State,
    ) -> ProviderResult<()> {
        self.update_entity(to, changed, state)
            .await
            .map_err(|e| e.for_resource(to.id.clone()))
    }

    async fn update_entity(
        &self,
        to: &Resource,
        changed: &[String],
        state: &mut State,
    ) -> ProviderResult<()> {
        let schema = self.handler.schema();
        let declared = self.validate(&schema, to)?;

        let forced: Vec<&str> = changed
            .iter()
            .map(String::as_str)
            .filter(|name| schema.is_force_new(name))
            .collect();
        if !forced.is_empty() {
            return Err(ProviderError::validation(format!(
                "changing {} requires replacing the resource",
                forced.join(", ")
            )));
        }

        let id = self
            .parse_identifier(state)?
            .ok_or_else(|| ProviderError::not_found("resource is not tracked"))?;

        if !changed.is_empty() {
            let statuses = self.handler.terminal_statuses();
            if let Some(statuses) = &statuses {
                self.wait_stable(&id, statuses).await?;
            }
            self.handler.update(&id, &declared, changed).await?;
            log::info!("updated {} ({})", self.describe(&id), changed.join(", "));
            if let Some(statuses) = &statuses {
                self.wait_stable(&id, statuses).await?;
            }
        }

        self.read_entity(state).await
    }

    /// Delete the remote entity, wait until it is gone, and clear `state`
    pub async fn delete(&self, state: &mut State) -> ProviderResult<()> {
        let resource_id = state.id.clone();
        self.delete_entity(state)
            .await
            .map_err(|e| e.for_resource(resource_id))
    }

    async fn delete_entity(&self, state: &mut State) -> ProviderResult<()> {
        let Some(id) = self.parse_identifier(state)? else {
            state.clear();
            return Ok(());
        };
        let statuses = self.handler.terminal_statuses();
        let deleted = self.handler.deleted_statuses();

        // A failed entity is still deletable, only transitions are awaited
        if let Some(statuses) = &statuses {
            match self.wait_stable(&id, &statuses.settled(&deleted)).await {
                Ok(entity) if statuses.is_failure(&entity.status()) => {
                    log::warn!(
                        "{} is in a failure status, deleting it anyway",
                        self.describe(&id)
                    );
                }
                Ok(entity) if !deleted.contains(&entity.status()) => {}
                Ok(_) => {
                    log::info!("{} is already deleted", self.describe(&id));
                    state.clear();
                    return Ok(());
                }
                Err(e) if e.is_not_found() => {
                    log::info!("{} is already gone", self.describe(&id));
                    state.clear();
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        }

        match self.handler.delete(&id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        if let Some(statuses) = &statuses {
            self.waiter()
                .until_deleted(&self.describe(&id), &statuses.with_success(deleted), || {
                    self.handler.get(&id)
                })
                .await?;
        }

        log::info!("deleted {}", self.describe(&id));
        state.clear();
        Ok(())
    }

    /// Start tracking the entity named by `identifier`
    pub async fn import(&self, id: &ResourceId, identifier: &str) -> ProviderResult<State> {
        let mut state = State::not_found(id.clone())
            .with_identity(Identity::new(self.identity_schema()))
            .with_identifier(identifier);

        self.read_entity(&mut state)
            .await
            .map_err(|e| e.for_resource(id.clone()))?;

        if !state.exists {
            return Err(ProviderError::not_found(format!(
                "cannot import {}: no {} with identifier {}",
                id,
                self.handler.resource_type(),
                identifier
            ))
            .for_resource(id.clone()));
        }
        Ok(state)
    }

    /// Resolve a data source by id attribute or by exact `name`
    pub async fn lookup(&self, resource: &Resource) -> ProviderResult<State> {
        self.lookup_entity(resource)
            .await
            .map_err(|e| e.for_resource(resource.id.clone()))
    }

    async fn lookup_entity(&self, resource: &Resource) -> ProviderResult<State> {
        let locality = self.resolve_locality(resource)?;
        let id_attribute = self.handler.lookup_id_attribute();
        let by_id = id_attribute.and_then(|attr| resource.get_str(attr));

        let (id, entity) = match (by_id, resource.get_str("name")) {
            (Some(raw), _) => {
                let id = self.reference_id(raw, locality.as_ref())?;
                let entity = self.handler.get(&id).await?;
                (id, entity)
            }
            (None, Some(name)) => {
                let filter =
                    ListFilter::by_name(name).in_project(resource.get_str("project_id"));
                let candidates = self.handler.list(locality.as_ref(), filter).await?;
                let found = find_exact(
                    candidates,
                    |entity| entity.name(),
                    name,
                    self.handler.resource_type(),
                )?;
                let id = self.handler.identify(locality.as_ref(), resource, &found)?;
                let entity = self.handler.get(&id).await?;
                (id, entity)
            }
            (None, None) => {
                return Err(ProviderError::validation(format!(
                    "{} lookup needs {}name",
                    self.handler.resource_type(),
                    id_attribute
                        .map(|attr| format!("{} or ", attr))
                        .unwrap_or_default()
                )));
            }
        };

        let mut state = State::not_found(resource.id.clone());
        self.record(&mut state, &id, &entity)?;
        if let Some(attr) = id_attribute {
            state
                .attributes
                .insert(attr.to_string(), Value::String(id.to_string()));
        }
        log::debug!("resolved data source {} to {}", resource.id, id);
        Ok(state)
    }
}

/// Object-safe view of a [`Reconciler`], for providers that dispatch on the
/// resource type at runtime
pub trait Lifecycle: Send + Sync {
    fn resource_type(&self) -> &'static str;

    fn schema(&self) -> ResourceSchema;

    fn create<'a>(
        &'a self,
        resource: &'a Resource,
        state: &'a mut State,
    ) -> BoxFuture<'a, ProviderResult<()>>;

    fn read<'a>(&'a self, state: &'a mut State) -> BoxFuture<'a, ProviderResult<()>>;

    fn update<'a>(
        &'a self,
        to: &'a Resource,
        changed: &'a [String],
        state: &'a mut State,
    ) -> BoxFuture<'a, ProviderResult<()>>;

    fn delete<'a>(&'a self, state: &'a mut State) -> BoxFuture<'a, ProviderResult<()>>;

    fn import<'a>(
        &'a self,
        id: &'a ResourceId,
        identifier: &'a str,
    ) -> BoxFuture<'a, ProviderResult<State>>;

    fn lookup<'a>(&'a self, resource: &'a Resource) -> BoxFuture<'a, ProviderResult<State>>;
}

impl<H: ResourceHandler> Lifecycle for Reconciler<H> {
    fn resource_type(&self) -> &'static str {
        self.handler.resource_type()
    }

    fn schema(&self) -> ResourceSchema {
        self.handler.schema()
    }

    fn create<'a>(
        &'a self,
        resource: &'a Resource,
        state: &'a mut State,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(Reconciler::create(self, resource, state))
    }

    fn read<'a>(&'a self, state: &'a mut State) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(Reconciler::read(self, state))
    }

    fn update<'a>(
        &'a self,
        to: &'a Resource,
        changed: &'a [String],
        state: &'a mut State,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(Reconciler::update(self, to, changed, state))
    }

    fn delete<'a>(&'a self, state: &'a mut State) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(Reconciler::delete(self, state))
    }

    fn import<'a>(
        &'a self,
        id: &'a ResourceId,
        identifier: &'a str,
    ) -> BoxFuture<'a, ProviderResult<State>> {
        Box::pin(Reconciler::import(self, id, identifier))
    }

    fn lookup<'a>(&'a self, resource: &'a Resource) -> BoxFuture<'a, ProviderResult<State>> {
        Box::pin(Reconciler::lookup(self, resource))
    }
}
