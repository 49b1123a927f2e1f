//! Identity - Binding composite identifiers and identity attributes to state
//!
//! Every resource type declares a fixed set of identity attributes (`id` plus
//! `zone` or `region`, or one attribute per multi-part key). After a remote
//! mutation the identifier and these attributes are written together: all of
//! them are staged, checked against the declared schema, and only then
//! committed. A failed bind leaves the state exactly as it was.

use std::collections::{BTreeMap, HashMap};

use crate::identifier::{
    CompositeId, IdScope, IdentifierError, encode_multi_part, encode_regional, encode_zonal,
};
use crate::locality::{Region, Zone};
use crate::resource::State;

/// Error raised when identity attributes cannot be written
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("identity attribute '{key}' is not declared (declared: {})", declared.join(", "))]
    UndeclaredAttribute { key: String, declared: Vec<String> },

    #[error(transparent)]
    Identifier(#[from] IdentifierError),
}

/// Names of the identity attributes a resource type declares
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentitySchema {
    keys: Vec<String>,
}

impl IdentitySchema {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    pub fn zonal() -> Self {
        Self::new(["id", "zone"])
    }

    pub fn regional() -> Self {
        Self::new(["id", "region"])
    }

    pub fn global() -> Self {
        Self::new(["id"])
    }

    pub fn multi_part(key_order: &[&str]) -> Self {
        Self::new(key_order.iter().copied())
    }

    pub fn for_scope(scope: &IdScope) -> Self {
        match scope {
            IdScope::Zonal => Self::zonal(),
            IdScope::Regional => Self::regional(),
            IdScope::Global => Self::global(),
            IdScope::MultiPart(keys) => Self::multi_part(keys),
        }
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn declares(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }
}

/// Identity attribute values, constrained by an [`IdentitySchema`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    schema: IdentitySchema,
    values: BTreeMap<String, String>,
}

impl Identity {
    pub fn new(schema: IdentitySchema) -> Self {
        Self {
            schema,
            values: BTreeMap::new(),
        }
    }

    /// Restore previously persisted identity values. Keys are declared from
    /// the values themselves; the owning resource type re-declares its schema
    /// on the next bind.
    pub fn from_values(values: BTreeMap<String, String>) -> Self {
        Self {
            schema: IdentitySchema::new(values.keys().cloned()),
            values,
        }
    }

    pub fn schema(&self) -> &IdentitySchema {
        &self.schema
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Write one attribute. Undeclared keys are rejected.
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> Result<(), IdentityError> {
        if !self.schema.declares(key) {
            return Err(IdentityError::UndeclaredAttribute {
                key: key.to_string(),
                declared: self.schema.keys.clone(),
            });
        }
        self.values.insert(key.to_string(), value.into());
        Ok(())
    }

    /// Switch to `schema`, keeping values of keys it still declares
    pub fn adopt_schema(&mut self, schema: IdentitySchema) {
        if self.schema == schema {
            return;
        }
        self.values.retain(|key, _| schema.declares(key));
        self.schema = schema;
    }
}

/// Stage `pairs` on a copy of the state's identity and commit it together
/// with `identifier`, or leave the state untouched.
fn commit(
    state: &mut State,
    identifier: String,
    pairs: &[(&str, &str)],
) -> Result<(), IdentityError> {
    let mut staged = state.identity.clone();
    for (key, value) in pairs {
        staged.set(key, *value)?;
    }
    state.identity = staged;
    state.identifier = Some(identifier);
    Ok(())
}

/// Record a zonal entity: identity `zone` and `id`, identifier `{zone}/{id}`
pub fn bind_zonal(state: &mut State, zone: &Zone, id: &str) -> Result<(), IdentityError> {
    let identifier = encode_zonal(zone, id)?;
    commit(state, identifier, &[("zone", zone.as_str()), ("id", id)])
}

/// Record a regional entity: identity `region` and `id`, identifier `{region}/{id}`
pub fn bind_regional(state: &mut State, region: &Region, id: &str) -> Result<(), IdentityError> {
    let identifier = encode_regional(region, id)?;
    commit(state, identifier, &[("region", region.as_str()), ("id", id)])
}

/// Record a global entity: identity `id`, identifier is the bare id
pub fn bind_global(state: &mut State, id: &str) -> Result<(), IdentityError> {
    if id.is_empty() {
        return Err(IdentifierError::EmptyId.into());
    }
    commit(state, id.to_string(), &[("id", id)])
}

/// Record a multi-part entity: one identity attribute per value
pub fn bind_multi_part(
    state: &mut State,
    values: &HashMap<String, String>,
    key_order: &[&str],
) -> Result<(), IdentityError> {
    let identifier = encode_multi_part(values, key_order);
    let pairs: Vec<(&str, &str)> = values
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    commit(state, identifier, &pairs)
}

/// Bind whichever shape `id` has
pub fn bind(state: &mut State, id: &CompositeId) -> Result<(), IdentityError> {
    match id {
        CompositeId::Zonal { zone, id } => bind_zonal(state, zone, id),
        CompositeId::Regional { region, id } => bind_regional(state, region, id),
        CompositeId::Global(id) => bind_global(state, id),
        CompositeId::MultiPart(multi) => {
            bind_multi_part(state, multi.values(), multi.key_order())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceId;

    const UUID: &str = "11111111-1111-1111-1111-111111111111";

    fn state_with(schema: IdentitySchema) -> State {
        State::not_found(ResourceId::new("test", "example")).with_identity(Identity::new(schema))
    }

    #[test]
    fn bind_zonal_sets_identifier_and_identity() {
        let mut state = state_with(IdentitySchema::zonal());
        let zone = Zone::parse("fr-par-2").unwrap();

        bind_zonal(&mut state, &zone, UUID).unwrap();

        assert_eq!(state.identifier, Some(format!("fr-par-2/{}", UUID)));
        assert_eq!(state.identity.get("zone"), Some("fr-par-2"));
        assert_eq!(state.identity.get("id"), Some(UUID));
    }

    #[test]
    fn bind_regional_sets_identifier_and_identity() {
        let mut state = state_with(IdentitySchema::regional());
        let region = Region::parse("nl-ams").unwrap();

        bind_regional(&mut state, &region, UUID).unwrap();

        assert_eq!(state.identifier, Some(format!("nl-ams/{}", UUID)));
        assert_eq!(state.identity.get("region"), Some("nl-ams"));
        assert_eq!(state.identity.get("id"), Some(UUID));
    }

    #[test]
    fn bind_global_uses_bare_id() {
        let mut state = state_with(IdentitySchema::global());

        bind_global(&mut state, UUID).unwrap();

        assert_eq!(state.identifier.as_deref(), Some(UUID));
        assert_eq!(state.identity.values().len(), 1);
        assert!(bind_global(&mut state, "").is_err());
    }

    #[test]
    fn bind_multi_part_sets_one_attribute_per_key() {
        const KEYS: &[&str] = &["region", "instance_id", "name"];
        let mut state = state_with(IdentitySchema::multi_part(KEYS));
        let values = HashMap::from([
            ("region".to_string(), "fr-par".to_string()),
            ("instance_id".to_string(), UUID.to_string()),
            ("name".to_string(), "my-db".to_string()),
        ]);

        bind_multi_part(&mut state, &values, KEYS).unwrap();

        assert_eq!(state.identifier, Some(format!("fr-par/{}/my-db", UUID)));
        assert_eq!(state.identity.get("instance_id"), Some(UUID));
        assert_eq!(state.identity.get("name"), Some("my-db"));
    }

    #[test]
    fn failed_bind_leaves_state_untouched() {
        // A global schema does not declare `zone`.
        let mut state = state_with(IdentitySchema::global());
        let before = state.clone();
        let zone = Zone::parse("fr-par-1").unwrap();

        let err = bind_zonal(&mut state, &zone, UUID).unwrap_err();

        assert!(matches!(
            err,
            IdentityError::UndeclaredAttribute { ref key, .. } if key == "zone"
        ));
        assert_eq!(state, before);
    }

    #[test]
    fn rebinding_replaces_previous_values() {
        let mut state = state_with(IdentitySchema::zonal());
        let zone = Zone::parse("fr-par-1").unwrap();
        bind_zonal(&mut state, &zone, "old").unwrap();
        bind_zonal(&mut state, &zone, UUID).unwrap();

        assert_eq!(state.identity.get("id"), Some(UUID));
        assert_eq!(state.identifier, Some(format!("fr-par-1/{}", UUID)));
    }

    #[test]
    fn adopt_schema_keeps_declared_values() {
        let mut identity = Identity::from_values(BTreeMap::from([
            ("id".to_string(), UUID.to_string()),
            ("zone".to_string(), "fr-par-1".to_string()),
        ]));

        identity.adopt_schema(IdentitySchema::regional());

        assert_eq!(identity.get("id"), Some(UUID));
        assert_eq!(identity.get("zone"), None);
        assert!(identity.set("region", "fr-par").is_ok());
        assert!(identity.set("zone", "fr-par-1").is_err());
    }

    #[test]
    fn bind_dispatches_on_shape() {
        let mut state = state_with(IdentitySchema::regional());
        let id = CompositeId::regional(Region::parse("pl-waw").unwrap(), UUID);

        bind(&mut state, &id).unwrap();

        assert_eq!(state.identifier, Some(id.to_string()));
    }
}
