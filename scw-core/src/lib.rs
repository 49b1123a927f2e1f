//! Scaleway Core
//!
//! Locality-aware identity and reconciliation engine for Scaleway resources.
//! Resources are addressed by composite identifiers that carry their zone or
//! region, asynchronous operations are awaited with a generic waiter, and every
//! resource type is driven through the same create / read / update / delete
//! protocol.

pub mod datasource;
pub mod differ;
pub mod effect;
pub mod identifier;
pub mod identity;
pub mod interpreter;
pub mod locality;
pub mod plan;
pub mod provider;
pub mod reconciler;
pub mod resource;
pub mod schema;
pub mod waiter;
