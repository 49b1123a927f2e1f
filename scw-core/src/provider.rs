//! Provider - Trait abstracting resource operations
//!
//! A Provider maps declared resources onto a remote API. It is responsible for
//! turning Effects into actual API calls and for keeping tracked state in sync
//! with what those calls observed.

use std::future::Future;
use std::pin::Pin;

use crate::identifier::IdentifierError;
use crate::identity::IdentityError;
use crate::resource::{Resource, ResourceId, State};
use crate::schema::{ResourceSchema, TypeError};

/// Classification of a [`ProviderError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A composite identifier did not match its expected grammar
    MalformedIdentifier,
    /// The remote entity does not exist
    NotFound,
    /// A wait deadline passed; the remote operation may still complete
    Timeout,
    /// The remote entity entered a terminal error status
    RemoteFailure,
    /// Declared configuration violates a static constraint
    Validation,
    /// The caller cancelled the operation
    Cancelled,
    /// Tracked state could not be written
    State,
    /// The remote API rejected a request or could not be reached
    Api,
    /// Provider configuration is missing or invalid
    Configuration,
}

impl ErrorKind {
    /// Whether re-running the same reconciliation step can succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Timeout)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MalformedIdentifier => "malformed identifier",
            ErrorKind::NotFound => "not found",
            ErrorKind::Timeout => "timeout",
            ErrorKind::RemoteFailure => "remote failure",
            ErrorKind::Validation => "validation",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::State => "state",
            ErrorKind::Api => "api",
            ErrorKind::Configuration => "configuration",
        }
    }
}

/// Error type for Provider operations
#[derive(Debug)]
pub struct ProviderError {
    pub kind: ErrorKind,
    pub message: String,
    pub resource_id: Option<ResourceId>,
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref id) = self.resource_id {
            write!(f, "[{}.{}] {}", id.resource_type, id.name, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|e| e.as_ref() as &dyn std::error::Error)
    }
}

impl ProviderError {
    /// Remote API error
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Api, message)
    }

    pub fn with_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            resource_id: None,
            cause: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::NotFound, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Timeout, message)
    }

    pub fn remote_failure(message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::RemoteFailure, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Validation, message)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Cancelled, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Configuration, message)
    }

    /// Collect schema violations into a single pre-flight error
    pub fn invalid_attributes(errors: &[TypeError]) -> Self {
        let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
        Self::validation(format!("invalid configuration: {}", details.join("; ")))
    }

    pub fn for_resource(mut self, id: ResourceId) -> Self {
        self.resource_id = Some(id);
        self
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl From<IdentifierError> for ProviderError {
    fn from(err: IdentifierError) -> Self {
        ProviderError::with_kind(ErrorKind::MalformedIdentifier, err.to_string()).with_cause(err)
    }
}

impl From<IdentityError> for ProviderError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Identifier(inner) => inner.into(),
            other => ProviderError::with_kind(ErrorKind::State, other.to_string()).with_cause(other),
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Return type for async operations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Definition of resource types that a Provider can handle
pub trait ResourceType: Send + Sync {
    /// Resource type name (e.g., "instance_server")
    fn name(&self) -> &'static str;

    /// Attribute schema for this resource type
    fn schema(&self) -> ResourceSchema;
}

/// Main Provider trait
///
/// Every verb works on the tracked [`State`] in place, so whatever a verb
/// managed to record before failing (typically the identifier of a freshly
/// created entity whose wait timed out) survives into the next run.
pub trait Provider: Send + Sync {
    /// Name of this Provider (e.g., "scaleway")
    fn name(&self) -> &'static str;

    /// List of resource types this Provider can handle
    fn resource_types(&self) -> Vec<Box<dyn ResourceType>>;

    /// Refresh `state` from the remote entity named by its identifier.
    ///
    /// A vanished entity clears the state instead of failing.
    fn read<'a>(&'a self, state: &'a mut State) -> BoxFuture<'a, ProviderResult<()>>;

    /// Resolve a data source by id or by exact name
    fn lookup<'a>(&'a self, resource: &'a Resource) -> BoxFuture<'a, ProviderResult<State>>;

    /// Create the remote entity and wait for it to settle
    fn create<'a>(
        &'a self,
        resource: &'a Resource,
        state: &'a mut State,
    ) -> BoxFuture<'a, ProviderResult<()>>;

    /// Patch only `changed` attributes of the remote entity
    fn update<'a>(
        &'a self,
        to: &'a Resource,
        changed: &'a [String],
        state: &'a mut State,
    ) -> BoxFuture<'a, ProviderResult<()>>;

    /// Delete the remote entity and wait until it is gone
    fn delete<'a>(&'a self, state: &'a mut State) -> BoxFuture<'a, ProviderResult<()>>;

    /// Start tracking an existing entity given its composite identifier
    fn import<'a>(
        &'a self,
        id: &'a ResourceId,
        identifier: &'a str,
    ) -> BoxFuture<'a, ProviderResult<State>>;
}

/// Provider implementation for Box<dyn Provider>
/// This enables dynamic dispatch for Providers
impl Provider for Box<dyn Provider> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        (**self).resource_types()
    }

    fn read<'a>(&'a self, state: &'a mut State) -> BoxFuture<'a, ProviderResult<()>> {
        (**self).read(state)
    }

    fn lookup<'a>(&'a self, resource: &'a Resource) -> BoxFuture<'a, ProviderResult<State>> {
        (**self).lookup(resource)
    }

    fn create<'a>(
        &'a self,
        resource: &'a Resource,
        state: &'a mut State,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        (**self).create(resource, state)
    }

    fn update<'a>(
        &'a self,
        to: &'a Resource,
        changed: &'a [String],
        state: &'a mut State,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        (**self).update(to, changed, state)
    }

    fn delete<'a>(&'a self, state: &'a mut State) -> BoxFuture<'a, ProviderResult<()>> {
        (**self).delete(state)
    }

    fn import<'a>(
        &'a self,
        id: &'a ResourceId,
        identifier: &'a str,
    ) -> BoxFuture<'a, ProviderResult<State>> {
        (**self).import(id, identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locality::Zone;

    #[test]
    fn only_timeouts_are_retryable() {
        assert!(ProviderError::timeout("waited too long").is_retryable());
        for err in [
            ProviderError::not_found("gone"),
            ProviderError::remote_failure("error status"),
            ProviderError::validation("bad cidr"),
            ProviderError::cancelled("stop"),
            ProviderError::new("500"),
        ] {
            assert!(!err.is_retryable(), "{} should not be retryable", err.kind.as_str());
        }
    }

    #[test]
    fn display_includes_resource() {
        let err = ProviderError::not_found("server is gone")
            .for_resource(ResourceId::new("instance_server", "web"));
        assert_eq!(err.to_string(), "[instance_server.web] server is gone");
        assert!(err.is_not_found());
    }

    #[test]
    fn identifier_errors_are_malformed() {
        let err: ProviderError = Zone::parse("nowhere").unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::MalformedIdentifier);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn identity_errors_are_state_errors() {
        let err: ProviderError = IdentityError::UndeclaredAttribute {
            key: "zone".to_string(),
            declared: vec!["id".to_string()],
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::State);

        let err: ProviderError = IdentityError::Identifier(IdentifierError::EmptyId).into();
        assert_eq!(err.kind(), ErrorKind::MalformedIdentifier);
    }
}
