//! Helpers shared by the resource handlers

use scw_core::identifier::expand_id;
use scw_core::provider::{ProviderError, ProviderResult};
use scw_core::resource::{Attributes, Resource, Value};

use crate::config::ScwConfig;

/// Declared `name`, else a generated `tf-<prefix>-<suffix>`
pub fn name_or_generate(resource: &Resource, prefix: &str) -> String {
    match resource.get_str("name") {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => generate_name(prefix),
    }
}

pub fn generate_name(prefix: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("tf-{}-{}", prefix, &suffix[..8])
}

/// Project and organization fallbacks from the provider configuration
#[derive(Debug, Clone, Default)]
pub struct Ownership {
    pub default_project_id: Option<String>,
    pub default_organization_id: Option<String>,
}

impl Ownership {
    pub fn from_config(config: &ScwConfig) -> Self {
        Self {
            default_project_id: config.default_project_id.clone(),
            default_organization_id: config.default_organization_id.clone(),
        }
    }

    /// Declared `project_id`, else the configured default
    pub fn project_id(&self, resource: &Resource) -> ProviderResult<String> {
        resource
            .get_str("project_id")
            .map(str::to_string)
            .or_else(|| self.default_project_id.clone())
            .ok_or_else(|| {
                ProviderError::validation(
                    "project_id is not set and no default project is configured",
                )
            })
    }

    /// Declared `organization_id`, else the configured default
    pub fn organization_id(&self, resource: &Resource) -> ProviderResult<String> {
        resource
            .get_str("organization_id")
            .map(str::to_string)
            .or_else(|| self.default_organization_id.clone())
            .ok_or_else(|| {
                ProviderError::validation(
                    "organization_id is not set and no default organization is configured",
                )
            })
    }
}

/// Bare id of a declared reference that may carry a locality prefix
pub fn expanded_id(resource: &Resource, key: &str) -> Option<String> {
    resource.get_str(key).map(|raw| expand_id(raw).to_string())
}

/// Declared string list, empty when absent
pub fn string_list(resource: &Resource, key: &str) -> Vec<String> {
    resource.get_string_list(key).unwrap_or_default()
}

pub fn strings_value(items: &[String]) -> Value {
    Value::string_list(items.iter().cloned())
}

/// Insert `value` into a JSON patch only when `key` is among `changed`
pub fn patch_field(
    patch: &mut serde_json::Map<String, serde_json::Value>,
    changed: &[String],
    key: &str,
    field: &str,
    value: impl FnOnce() -> serde_json::Value,
) {
    if changed.iter().any(|c| c == key) {
        patch.insert(field.to_string(), value());
    }
}
