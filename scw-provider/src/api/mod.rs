//! Typed models and endpoints of the Scaleway APIs in use
//!
//! Each module wraps one product API: request bodies, response models with
//! their status enums, and one method per endpoint. Status enums implement
//! [`scw_core::waiter::RemoteEntity`] so the generic waiter can poll them.

use scw_core::datasource::ListFilter;

pub mod documentdb;
pub mod flexibleip;
pub mod iam;
pub mod instance;
pub mod k8s;
pub mod kafka;
pub mod lb;
pub mod vpc;
pub mod vpcgw;

/// Query parameters of a list call filtered by name
pub(crate) fn name_query(name: &str) -> Vec<(&'static str, String)> {
    vec![
        ("name", name.to_string()),
        ("page_size", "100".to_string()),
    ]
}

/// Query parameters of a lookup list call. The project parameter is named
/// `project` by the Instance API and `project_id` elsewhere.
pub(crate) fn list_query(
    filter: &ListFilter<'_>,
    project_key: &'static str,
) -> Vec<(&'static str, String)> {
    let mut query = name_query(filter.name);
    if let Some(project_id) = filter.project_id {
        query.push((project_key, project_id.to_string()));
    }
    query
}
