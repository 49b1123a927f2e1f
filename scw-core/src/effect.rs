//! Effect - A single side effect to be performed against a provider

use crate::resource::{Resource, ResourceId, State};

/// One step of a [`crate::plan::Plan`]
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Resolve a data source
    Read(Resource),
    Create(Resource),
    /// In-place patch of `changed` attributes
    Update {
        id: ResourceId,
        from: State,
        to: Resource,
        changed: Vec<String>,
    },
    /// Delete then create, because a `force_new` attribute changed
    Replace {
        id: ResourceId,
        from: State,
        to: Resource,
        forced_by: Vec<String>,
    },
    Delete(State),
}

impl Effect {
    /// Whether this Effect changes remote infrastructure
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Effect::Read(_))
    }

    pub fn resource_id(&self) -> &ResourceId {
        match self {
            Effect::Read(resource) | Effect::Create(resource) => &resource.id,
            Effect::Update { id, .. } | Effect::Replace { id, .. } => id,
            Effect::Delete(state) => &state.id,
        }
    }
}
