//! State file structures for persisting tracked resources

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use scw_core::identity::Identity;
use scw_core::resource::{ResourceId, State};

use crate::backend::{BackendError, BackendResult};
use crate::convert::{attributes_from_json, attributes_to_json};

/// The persisted document holding every tracked resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    /// State file format version
    pub version: u32,
    /// Monotonically increasing number for each state modification
    pub serial: u64,
    /// Unique identifier for this state lineage
    pub lineage: String,
    /// Version of the provider that last wrote this state
    pub tool_version: String,
    pub resources: Vec<ResourceState>,
}

impl StateFile {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn new() -> Self {
        Self::with_lineage(uuid::Uuid::new_v4().to_string())
    }

    pub fn with_lineage(lineage: String) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            serial: 0,
            lineage,
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            resources: Vec::new(),
        }
    }

    pub fn increment_serial(&mut self) {
        self.serial += 1;
        self.tool_version = env!("CARGO_PKG_VERSION").to_string();
    }

    /// Reject files written by a newer format version
    pub fn check_version(&self) -> BackendResult<()> {
        if self.version > Self::CURRENT_VERSION {
            return Err(BackendError::InvalidState(format!(
                "state format version {} is newer than supported version {}",
                self.version,
                Self::CURRENT_VERSION
            )));
        }
        Ok(())
    }

    /// Whether `self` may overwrite `stored`
    pub fn check_lineage(&self, stored: &StateFile) -> BackendResult<()> {
        if self.lineage != stored.lineage {
            return Err(BackendError::LineageMismatch {
                expected: stored.lineage.clone(),
                actual: self.lineage.clone(),
            });
        }
        Ok(())
    }

    pub fn find_resource(&self, resource_type: &str, name: &str) -> Option<&ResourceState> {
        self.resources
            .iter()
            .find(|r| r.resource_type == resource_type && r.name == name)
    }

    pub fn find_resource_mut(
        &mut self,
        resource_type: &str,
        name: &str,
    ) -> Option<&mut ResourceState> {
        self.resources
            .iter_mut()
            .find(|r| r.resource_type == resource_type && r.name == name)
    }

    pub fn upsert_resource(&mut self, resource: ResourceState) {
        if let Some(existing) = self.find_resource_mut(&resource.resource_type, &resource.name) {
            *existing = resource;
        } else {
            self.resources.push(resource);
        }
    }

    pub fn remove_resource(&mut self, resource_type: &str, name: &str) -> Option<ResourceState> {
        let pos = self
            .resources
            .iter()
            .position(|r| r.resource_type == resource_type && r.name == name)?;
        Some(self.resources.remove(pos))
    }

    /// Tracked states keyed by resource, ready for planning
    pub fn to_tracked(&self) -> HashMap<ResourceId, State> {
        self.resources
            .iter()
            .map(|r| {
                let state = r.to_state();
                (state.id.clone(), state)
            })
            .collect()
    }

    /// Replace the stored resources with `tracked`.
    ///
    /// The `protected` flag of resources that remain tracked is preserved.
    /// Resources are kept in a stable order so that successive writes diff
    /// cleanly.
    pub fn sync_from(&mut self, tracked: &HashMap<ResourceId, State>, provider: &str) {
        let mut resources: Vec<ResourceState> = tracked
            .values()
            .filter(|state| state.exists || state.identifier.is_some())
            .map(|state| {
                let protected = self
                    .find_resource(&state.id.resource_type, &state.id.name)
                    .is_some_and(|r| r.protected);
                ResourceState::from_state(state, provider).with_protected(protected)
            })
            .collect();
        resources.sort_by(|a, b| {
            (&a.resource_type, &a.name).cmp(&(&b.resource_type, &b.name))
        });
        self.resources = resources;
    }
}

impl Default for StateFile {
    fn default() -> Self {
        Self::new()
    }
}

/// State of a single tracked resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    /// Resource type (e.g., "instance_server")
    pub resource_type: String,
    pub name: String,
    /// Provider name (e.g., "scaleway")
    pub provider: String,
    /// Composite identifier, present once the remote entity was created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    /// Identity attributes (zone/region/id or multi-part keys)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub identity: BTreeMap<String, String>,
    pub attributes: HashMap<String, serde_json::Value>,
    /// Created remotely but never seen settled; the next create resumes it
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub pending: bool,
    /// Whether this resource is protected from deletion
    #[serde(default)]
    pub protected: bool,
}

impl ResourceState {
    pub fn new(
        resource_type: impl Into<String>,
        name: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
            provider: provider.into(),
            identifier: None,
            identity: BTreeMap::new(),
            attributes: HashMap::new(),
            pending: false,
            protected: false,
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn with_protected(mut self, protected: bool) -> Self {
        self.protected = protected;
        self
    }

    pub fn from_state(state: &State, provider: &str) -> Self {
        Self {
            resource_type: state.id.resource_type.clone(),
            name: state.id.name.clone(),
            provider: provider.to_string(),
            identifier: state.identifier.clone(),
            identity: state.identity.values().clone(),
            attributes: attributes_to_json(&state.attributes),
            pending: !state.exists && state.identifier.is_some(),
            protected: false,
        }
    }

    /// Core state for this record.
    ///
    /// A record without an identifier is loaded as not existing, a pending
    /// one as not existing but still identified. The identity carries no
    /// schema yet; the reconciler adopts the resource type's schema before
    /// binding.
    pub fn to_state(&self) -> State {
        let id = ResourceId::new(&self.resource_type, &self.name);
        let Some(identifier) = &self.identifier else {
            return State::not_found(id);
        };
        let state = if self.pending {
            State::not_found(id)
        } else {
            State::existing(id, attributes_from_json(&self.attributes))
        };
        state
            .with_identifier(identifier.clone())
            .with_identity(Identity::from_values(self.identity.clone()))
    }
}
