//! Datasource - Resolving existing entities by name

use crate::provider::{ProviderError, ProviderResult};

/// Server-side filters of a list call made for a lookup by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListFilter<'a> {
    pub name: &'a str,
    /// Declared project; `None` lists across every project the key can see
    pub project_id: Option<&'a str>,
}

impl<'a> ListFilter<'a> {
    pub fn by_name(name: &'a str) -> Self {
        Self {
            name,
            project_id: None,
        }
    }

    pub fn in_project(mut self, project_id: Option<&'a str>) -> Self {
        self.project_id = project_id;
        self
    }
}

/// Pick the single item whose name is exactly `name`.
///
/// List endpoints filter by name prefix, so the candidates may contain near
/// matches; only exact matches count. Zero or several exact matches are
/// errors.
pub fn find_exact<T>(
    items: Vec<T>,
    name_of: impl Fn(&T) -> Option<&str>,
    name: &str,
    kind: &str,
) -> ProviderResult<T> {
    let mut matches = items
        .into_iter()
        .filter(|item| name_of(item) == Some(name));

    let found = matches
        .next()
        .ok_or_else(|| ProviderError::not_found(format!("no {} found with the name {}", kind, name)))?;

    if matches.next().is_some() {
        return Err(ProviderError::validation(format!(
            "more than one {} found with the name {}",
            kind, name
        )));
    }

    Ok(found)
}
