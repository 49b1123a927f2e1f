//! Differ - Compare desired state with current state to generate a Plan
//!
//! Compares the declared configuration with the tracked state and decides, per
//! resource, whether it must be created, patched in place, replaced, deleted,
//! or left alone. Replacement is driven purely by the schema: a change to any
//! `force_new` attribute turns an update into a replace.

use std::collections::HashMap;

use crate::effect::Effect;
use crate::plan::Plan;
use crate::resource::{Resource, ResourceId, State, Value};
use crate::schema::ResourceSchema;

/// Result of a diff operation
#[derive(Debug, Clone, PartialEq)]
pub enum Diff {
    /// Resource does not exist -> needs creation
    Create(Resource),
    /// Resource exists with differences -> needs update
    Update {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// An immutable attribute changed -> delete and recreate
    Replace {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
        forced_by: Vec<String>,
    },
    /// Resource exists with no differences -> no action needed
    NoChange(ResourceId),
}

impl Diff {
    /// Returns whether this Diff involves a change
    pub fn is_change(&self) -> bool {
        !matches!(self, Diff::NoChange(_))
    }
}

/// Compare desired state with current state to compute a Diff
pub fn diff(desired: &Resource, current: &State, schema: Option<&ResourceSchema>) -> Diff {
    if !current.exists {
        return Diff::Create(desired.clone());
    }

    let desired_attributes = match schema {
        Some(schema) => schema.with_defaults(&desired.attributes),
        None => desired.attributes.clone(),
    };
    let changed = find_changed_attributes(&desired_attributes, &current.attributes, schema);

    if changed.is_empty() {
        return Diff::NoChange(desired.id.clone());
    }

    let forced_by: Vec<String> = changed
        .iter()
        .filter(|name| schema.is_some_and(|s| s.is_force_new(name)))
        .cloned()
        .collect();

    if forced_by.is_empty() {
        Diff::Update {
            id: desired.id.clone(),
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
        }
    } else {
        Diff::Replace {
            id: desired.id.clone(),
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
            forced_by,
        }
    }
}

/// Find changed attributes between desired and current state, sorted by name
fn find_changed_attributes(
    desired: &HashMap<String, Value>,
    current: &HashMap<String, Value>,
    schema: Option<&ResourceSchema>,
) -> Vec<String> {
    let mut changed = Vec::new();

    for (key, desired_value) in desired {
        // Skip internal attributes (starting with _)
        if key.starts_with('_') {
            continue;
        }

        let attribute = schema.and_then(|s| s.get(key));
        if attribute.is_some_and(|a| a.write_only) {
            continue;
        }
        match current.get(key) {
            Some(current_value) => {
                let equal = match attribute {
                    Some(attribute) => attribute.values_equal(desired_value, current_value),
                    None => desired_value == current_value,
                };
                if !equal {
                    changed.push(key.clone());
                }
            }
            None => changed.push(key.clone()),
        }
    }

    changed.sort();
    changed
}

/// Compute Diff for multiple resources and generate a Plan.
///
/// Data sources become `Read` effects. Tracked resources that are no longer
/// declared become `Delete` effects, ordered after every other effect.
pub fn create_plan(
    desired: &[Resource],
    current_states: &HashMap<ResourceId, State>,
    schemas: &HashMap<String, ResourceSchema>,
) -> Plan {
    let mut plan = Plan::new();

    for resource in desired {
        if resource.is_data_source() {
            plan.add(Effect::Read(resource.clone()));
            continue;
        }

        let current = current_states
            .get(&resource.id)
            .cloned()
            .unwrap_or_else(|| State::not_found(resource.id.clone()));

        match diff(resource, &current, schemas.get(&resource.id.resource_type)) {
            Diff::Create(r) => plan.add(Effect::Create(r)),
            Diff::Update {
                id,
                from,
                to,
                changed_attributes,
            } => plan.add(Effect::Update {
                id,
                from,
                to,
                changed: changed_attributes,
            }),
            Diff::Replace {
                id,
                from,
                to,
                forced_by,
                ..
            } => plan.add(Effect::Replace {
                id,
                from,
                to,
                forced_by,
            }),
            Diff::NoChange(_) => {}
        }
    }

    let mut orphans: Vec<&State> = current_states
        .values()
        .filter(|state| {
            (state.exists || state.identifier.is_some())
                && !desired.iter().any(|r| r.id == state.id)
        })
        .collect();
    orphans.sort_by(|a, b| a.id.cmp(&b.id));
    for state in orphans {
        plan.add(Effect::Delete(state.clone()));
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeSchema, AttributeType, suppress, types};

    fn server_schema() -> ResourceSchema {
        ResourceSchema::new("instance_server")
            .attribute(AttributeSchema::new("name", AttributeType::String))
            .attribute(AttributeSchema::new("image", AttributeType::String).force_new())
            .attribute(AttributeSchema::new("tags", types::string_list()))
            .attribute(
                AttributeSchema::new("private_network_id", types::uuid_or_localized_uuid())
                    .with_diff_suppress(suppress::ignore_locality),
            )
            .attribute(
                AttributeSchema::new("state", AttributeType::String)
                    .with_default(Value::string("started")),
            )
            .attribute(
                AttributeSchema::new("admin_password", AttributeType::String)
                    .force_new()
                    .write_only(),
            )
    }

    fn tracked(attrs: &[(&str, Value)]) -> State {
        State::existing(
            ResourceId::new("instance_server", "web"),
            attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
        .with_identifier("fr-par-1/11111111-1111-1111-1111-111111111111")
    }

    #[test]
    fn diff_create_when_not_exists() {
        let desired = Resource::new("instance_server", "web");
        let current = State::not_found(ResourceId::new("instance_server", "web"));

        let result = diff(&desired, &current, None);
        assert!(matches!(result, Diff::Create(_)));
    }

    #[test]
    fn diff_no_change_when_same() {
        let desired = Resource::new("instance_server", "web")
            .with_attribute("name", Value::string("web"));
        let current = tracked(&[
            ("name", Value::string("web")),
            ("state", Value::string("started")),
            ("status", Value::string("running")),
        ]);

        let result = diff(&desired, &current, Some(&server_schema()));
        assert!(matches!(result, Diff::NoChange(_)));
    }

    #[test]
    fn diff_update_when_mutable_attribute_changes() {
        let desired = Resource::new("instance_server", "web")
            .with_attribute("tags", Value::string_list(["prod"]));
        let current = tracked(&[
            ("tags", Value::string_list(["dev"])),
            ("state", Value::string("started")),
        ]);

        match diff(&desired, &current, Some(&server_schema())) {
            Diff::Update {
                changed_attributes, ..
            } => assert_eq!(changed_attributes, vec!["tags".to_string()]),
            other => panic!("Expected Update, got {:?}", other),
        }
    }

    #[test]
    fn diff_replace_when_force_new_attribute_changes() {
        let desired = Resource::new("instance_server", "web")
            .with_attribute("image", Value::string("debian_bookworm"))
            .with_attribute("tags", Value::string_list(["prod"]));
        let current = tracked(&[
            ("image", Value::string("ubuntu_jammy")),
            ("tags", Value::string_list(["dev"])),
            ("state", Value::string("started")),
        ]);

        match diff(&desired, &current, Some(&server_schema())) {
            Diff::Replace {
                changed_attributes,
                forced_by,
                ..
            } => {
                assert_eq!(changed_attributes, vec!["image", "tags"]);
                assert_eq!(forced_by, vec!["image"]);
            }
            other => panic!("Expected Replace, got {:?}", other),
        }
    }

    #[test]
    fn diff_respects_suppression() {
        let desired = Resource::new("instance_server", "web").with_attribute(
            "private_network_id",
            Value::string("fr-par/11111111-1111-1111-1111-111111111111"),
        );
        let current = tracked(&[
            (
                "private_network_id",
                Value::string("11111111-1111-1111-1111-111111111111"),
            ),
            ("state", Value::string("started")),
        ]);

        assert!(!diff(&desired, &current, Some(&server_schema())).is_change());
    }

    #[test]
    fn diff_applies_schema_defaults() {
        let desired = Resource::new("instance_server", "web");
        let current = tracked(&[("state", Value::string("stopped"))]);

        match diff(&desired, &current, Some(&server_schema())) {
            Diff::Update {
                changed_attributes, ..
            } => assert_eq!(changed_attributes, vec!["state".to_string()]),
            other => panic!("Expected Update, got {:?}", other),
        }
    }

    #[test]
    fn write_only_attributes_are_not_compared() {
        let desired = Resource::new("instance_server", "web")
            .with_attribute("admin_password", Value::string("hunter2hunter2"));
        let current = tracked(&[("state", Value::string("started"))]);

        assert!(!diff(&desired, &current, Some(&server_schema())).is_change());
    }

    #[test]
    fn pending_create_diffs_as_create() {
        let desired = Resource::new("instance_server", "web");
        let mut pending = State::not_found(ResourceId::new("instance_server", "web"));
        pending.identifier = Some("fr-par-1/11111111-1111-1111-1111-111111111111".to_string());

        assert!(matches!(
            diff(&desired, &pending, Some(&server_schema())),
            Diff::Create(_)
        ));
    }

    #[test]
    fn undeclared_pending_create_is_deleted() {
        let mut pending = State::not_found(ResourceId::new("instance_server", "half"));
        pending.identifier = Some("fr-par-1/11111111-1111-1111-1111-111111111111".to_string());
        let current_states = HashMap::from([(pending.id.clone(), pending)]);

        let plan = create_plan(&[], &current_states, &HashMap::new());

        assert_eq!(plan.effects().len(), 1);
        assert!(matches!(plan.effects()[0], Effect::Delete(_)));
    }

    #[test]
    fn create_plan_from_resources() {
        let resources = vec![
            Resource::new("instance_server", "new").with_attribute("name", Value::string("new")),
            Resource::new("instance_server", "web")
                .with_attribute("tags", Value::string_list(["prod"])),
            Resource::new("k8s_cluster", "shared")
                .with_attribute("name", Value::string("shared"))
                .with_read_only(true),
        ];

        let mut current_states = HashMap::new();
        current_states.insert(
            ResourceId::new("instance_server", "web"),
            tracked(&[("state", Value::string("started"))]),
        );
        let mut orphan = tracked(&[]);
        orphan.id = ResourceId::new("instance_server", "old");
        current_states.insert(orphan.id.clone(), orphan);

        let schemas = HashMap::from([("instance_server".to_string(), server_schema())]);
        let plan = create_plan(&resources, &current_states, &schemas);

        assert_eq!(plan.effects().len(), 4);
        assert!(matches!(plan.effects()[0], Effect::Create(_)));
        assert!(matches!(plan.effects()[1], Effect::Update { .. }));
        assert!(matches!(plan.effects()[2], Effect::Read(_)));
        match &plan.effects()[3] {
            Effect::Delete(state) => assert_eq!(state.id.name, "old"),
            other => panic!("Expected Delete, got {:?}", other),
        }
    }
}
