//! Advisory lock held on a state file while an operation rewrites it
//!
//! A lock is a small JSON record next to the state. It names the holder and
//! carries a deadline, after which any other process may take it over.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// How long a lock stays valid when the backend does not say otherwise
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(15 * 60);

/// Process that acquired a lock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockHolder {
    pub user: String,
    pub host: String,
    pub pid: u32,
}

impl LockHolder {
    /// The current process; `unknown` stands in for what cannot be read
    pub fn current() -> Self {
        let user = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string());
        let host = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "unknown".to_string());
        Self {
            user,
            host,
            pid: std::process::id(),
        }
    }
}

impl fmt::Display for LockHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} (pid {})", self.user, self.host, self.pid)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockInfo {
    pub id: String,
    /// e.g., "apply", "refresh", "import"
    pub operation: String,
    pub holder: LockHolder,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl LockInfo {
    pub fn new(operation: impl Into<String>) -> Self {
        Self::with_ttl(operation, DEFAULT_LOCK_TTL)
    }

    /// A fresh lock for the current process, valid for `ttl`
    pub fn with_ttl(operation: impl Into<String>, ttl: Duration) -> Self {
        let acquired_at = Utc::now();
        let expires_at = TimeDelta::from_std(ttl)
            .ok()
            .and_then(|ttl| acquired_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            operation: operation.into(),
            holder: LockHolder::current(),
            acquired_at,
            expires_at,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expired_at(Utc::now())
    }

    pub fn expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Whether `lock_id` names this lock
    pub fn is(&self, lock_id: &str) -> bool {
        self.id == lock_id
    }
}

impl fmt::Display for LockInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "lock {} for {} held by {} until {}",
            self.id,
            self.operation,
            self.holder,
            self.expires_at.to_rfc3339()
        )
    }
}
