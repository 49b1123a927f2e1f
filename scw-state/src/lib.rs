//! Tracked-state persistence for the Scaleway provider
//!
//! Between runs, every managed resource is remembered by its composite
//! identifier, its identity attributes, and the attributes last observed
//! remotely. This crate stores that record and guards it with a lock.
//!
//! - **StateFile**: the persisted document with all tracked resources
//! - **StateBackend**: storage for a [`StateFile`] plus lock management
//! - **LockInfo**: who holds the lock, for which operation, until when
//!
//! # Example
//!
//! ```ignore
//! use scw_state::{create_backend, BackendConfig, StateFile};
//!
//! let backend = create_backend(&BackendConfig::local("infra/scw.state.json"))?;
//! let lock = backend.acquire_lock("apply").await?;
//!
//! let mut file = backend.read_state().await?.unwrap_or_default();
//! let mut tracked = file.to_tracked();
//! // ... apply a plan against `tracked` ...
//! file.sync_from(&tracked, "scaleway");
//! file.increment_serial();
//! backend.write_state(&file).await?;
//!
//! backend.release_lock(&lock).await?;
//! ```

pub mod backend;
pub mod backends;
pub mod convert;
pub mod lock;
pub mod state;

pub use backend::{BackendConfig, BackendError, BackendResult, StateBackend};
pub use backends::create_backend;
pub use lock::{LockHolder, LockInfo};
pub use state::{ResourceState, StateFile};
