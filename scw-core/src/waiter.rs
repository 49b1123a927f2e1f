//! Waiter - Poll a remote entity until it settles
//!
//! Most Scaleway mutations are asynchronous: the API accepts the request and
//! the entity moves through transient statuses (`creating`, `starting`, ...)
//! before reaching a terminal one. The waiter polls at a fixed interval until
//! the entity reaches a status in the success set, a status in the failure
//! set, or the deadline.
//!
//! Polls happen at `t = 0, i, 2i, ...`. A further poll is only scheduled when
//! it would land no later than the deadline. Cancellation is observed between
//! polls, never in the middle of a fetch.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::provider::{ProviderError, ProviderResult};

/// A remote object whose status the waiter can observe
pub trait RemoteEntity: Send + Sync {
    type Status: Copy + PartialEq + fmt::Debug + Send + Sync;

    /// Bare remote id (UUID for most entities)
    fn remote_id(&self) -> &str;

    fn status(&self) -> Self::Status;

    /// Name of the entity, for lookups by name
    fn name(&self) -> Option<&str> {
        None
    }

    /// Diagnostic attached by the API to an entity in an error status
    fn failure_detail(&self) -> Option<String> {
        None
    }
}

/// Status of an entity whose mutations complete synchronously
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Synchronous {
    Settled,
}

/// Success and failure status sets of one resource type
#[derive(Debug, Clone, PartialEq)]
pub struct TerminalStatuses<S> {
    success: Vec<S>,
    failure: Vec<S>,
}

impl<S: PartialEq> TerminalStatuses<S> {
    pub fn new(success: Vec<S>, failure: Vec<S>) -> Self {
        Self { success, failure }
    }

    pub fn is_success(&self, status: &S) -> bool {
        self.success.contains(status)
    }

    pub fn is_failure(&self, status: &S) -> bool {
        self.failure.contains(status)
    }

    /// Same failures, different success set
    pub fn with_success(&self, success: Vec<S>) -> Self
    where
        S: Clone,
    {
        Self {
            success,
            failure: self.failure.clone(),
        }
    }

    /// Same failures, success set extended with `extra`
    pub fn or_success(&self, extra: &[S]) -> Self
    where
        S: Clone,
    {
        let mut success = self.success.clone();
        success.extend_from_slice(extra);
        self.with_success(success)
    }

    /// Every terminal status, failures included, plus `extra` as success.
    /// For waits that only need the entity to stop transitioning.
    pub fn settled(&self, extra: &[S]) -> Self
    where
        S: Clone,
    {
        let mut success = self.success.clone();
        success.extend_from_slice(&self.failure);
        success.extend_from_slice(extra);
        Self {
            success,
            failure: Vec::new(),
        }
    }
}

/// Wait settings threaded from provider configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WaitConfig {
    /// Replaces every per-resource retry interval when set
    pub retry_interval_override: Option<Duration>,
}

impl WaitConfig {
    pub fn with_retry_interval(interval: Duration) -> Self {
        Self {
            retry_interval_override: Some(interval),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaitMode {
    Stable,
    Deletion,
}

/// Polls a remote entity until it reaches a terminal status
#[derive(Debug, Clone)]
pub struct Waiter {
    timeout: Duration,
    retry_interval: Duration,
    cancel: CancellationToken,
}

impl Waiter {
    pub fn new(timeout: Duration, retry_interval: Duration) -> Self {
        Self {
            timeout,
            retry_interval,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_config(mut self, config: &WaitConfig) -> Self {
        if let Some(interval) = config.retry_interval_override {
            self.retry_interval = interval;
        }
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn retry_interval(&self) -> Duration {
        self.retry_interval
    }

    /// Poll until the entity reaches a success status.
    ///
    /// A failure status ends the wait with `RemoteFailure` carrying the
    /// entity's failure detail. A fetch error ends it with that error.
    pub async fn until_stable<E, F, Fut>(
        &self,
        description: &str,
        statuses: &TerminalStatuses<E::Status>,
        fetch: F,
    ) -> ProviderResult<E>
    where
        E: RemoteEntity,
        F: FnMut() -> Fut,
        Fut: Future<Output = ProviderResult<E>>,
    {
        match self.poll(description, statuses, WaitMode::Stable, fetch).await? {
            Some(entity) => Ok(entity),
            None => Err(ProviderError::not_found(format!("{} not found", description))),
        }
    }

    /// Poll until the entity is gone.
    ///
    /// A `NotFound` fetch is success and yields `None`. Reaching a status in the
    /// success set (e.g. `deleted`) yields the last entity.
    pub async fn until_deleted<E, F, Fut>(
        &self,
        description: &str,
        statuses: &TerminalStatuses<E::Status>,
        fetch: F,
    ) -> ProviderResult<Option<E>>
    where
        E: RemoteEntity,
        F: FnMut() -> Fut,
        Fut: Future<Output = ProviderResult<E>>,
    {
        self.poll(description, statuses, WaitMode::Deletion, fetch)
            .await
    }

    async fn poll<E, F, Fut>(
        &self,
        description: &str,
        statuses: &TerminalStatuses<E::Status>,
        mode: WaitMode,
        mut fetch: F,
    ) -> ProviderResult<Option<E>>
    where
        E: RemoteEntity,
        F: FnMut() -> Fut,
        Fut: Future<Output = ProviderResult<E>>,
    {
        let deadline = Instant::now() + self.timeout;
        let mut attempt: u32 = 0;

        loop {
            if self.cancel.is_cancelled() {
                return Err(cancelled(description, attempt));
            }

            attempt += 1;
            let entity = match fetch().await {
                Ok(entity) => entity,
                Err(e) if mode == WaitMode::Deletion && e.is_not_found() => {
                    log::info!("{} is gone after {} poll(s)", description, attempt);
                    return Ok(None);
                }
                Err(e) => return Err(e),
            };

            let status = entity.status();
            log::debug!(
                "{}: poll {} observed status {:?}",
                description,
                attempt,
                status
            );

            if statuses.is_success(&status) {
                log::info!(
                    "{} reached status {:?} after {} poll(s)",
                    description,
                    status,
                    attempt
                );
                return Ok(Some(entity));
            }

            if statuses.is_failure(&status) {
                let detail = entity
                    .failure_detail()
                    .unwrap_or_else(|| "no detail reported".to_string());
                log::info!("{} failed with status {:?}: {}", description, status, detail);
                return Err(ProviderError::remote_failure(format!(
                    "{} ({}) entered status {:?}: {}",
                    description,
                    entity.remote_id(),
                    status,
                    detail
                )));
            }

            if Instant::now() + self.retry_interval > deadline {
                log::info!(
                    "{} timed out after {} poll(s) in status {:?}",
                    description,
                    attempt,
                    status
                );
                return Err(ProviderError::timeout(format!(
                    "timeout after {:?} waiting for {} (last status {:?})",
                    self.timeout, description, status
                )));
            }

            tokio::select! {
                _ = self.cancel.cancelled() => return Err(cancelled(description, attempt)),
                _ = tokio::time::sleep(self.retry_interval) => {}
            }
        }
    }
}

fn cancelled(description: &str, attempts: u32) -> ProviderError {
    log::info!("wait for {} cancelled after {} poll(s)", description, attempts);
    ProviderError::cancelled(format!("wait for {} cancelled", description))
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::provider::ErrorKind;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Status {
        Pending,
        Ready,
        Error,
        Deleted,
    }

    #[derive(Debug)]
    struct Entity {
        status: Status,
    }

    impl RemoteEntity for Entity {
        type Status = Status;

        fn remote_id(&self) -> &str {
            "11111111-1111-1111-1111-111111111111"
        }

        fn status(&self) -> Status {
            self.status
        }

        fn failure_detail(&self) -> Option<String> {
            (self.status == Status::Error).then(|| "out of stock".to_string())
        }
    }

    /// Replays a fixed sequence of fetch results, repeating the last one
    #[derive(Clone)]
    struct Script {
        steps: Arc<Mutex<VecDeque<Option<Status>>>>,
        polls: Arc<Mutex<u32>>,
    }

    impl Script {
        fn new(steps: &[Option<Status>]) -> Self {
            Self {
                steps: Arc::new(Mutex::new(steps.iter().copied().collect())),
                polls: Arc::new(Mutex::new(0)),
            }
        }

        async fn fetch(&self) -> ProviderResult<Entity> {
            *self.polls.lock().unwrap() += 1;
            let mut steps = self.steps.lock().unwrap();
            let step = if steps.len() > 1 {
                steps.pop_front().flatten()
            } else {
                steps.front().copied().flatten()
            };
            match step {
                Some(status) => Ok(Entity { status }),
                None => Err(ProviderError::not_found("entity not found")),
            }
        }

        fn polls(&self) -> u32 {
            *self.polls.lock().unwrap()
        }
    }

    fn statuses() -> TerminalStatuses<Status> {
        TerminalStatuses::new(vec![Status::Ready], vec![Status::Error])
    }

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[tokio::test(start_paused = true)]
    async fn returns_ready_entity_after_three_polls() {
        init_logger();
        let script = Script::new(&[
            Some(Status::Pending),
            Some(Status::Pending),
            Some(Status::Ready),
        ]);
        let waiter = Waiter::new(Duration::from_secs(60), Duration::from_secs(5));

        let start = Instant::now();
        let entity = waiter
            .until_stable("server", &statuses(), || script.fetch())
            .await
            .unwrap();

        assert_eq!(entity.status, Status::Ready);
        assert_eq!(script.polls(), 3);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(10), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(11), "elapsed {:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_before_terminal_status() {
        let script = Script::new(&[
            Some(Status::Pending),
            Some(Status::Pending),
            Some(Status::Ready),
        ]);
        // Reaching the third poll needs 2 intervals; the deadline allows 1.5.
        let waiter = Waiter::new(Duration::from_millis(1500), Duration::from_secs(1));

        let err = waiter
            .until_stable("server", &statuses(), || script.fetch())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(err.is_retryable());
        assert_eq!(script.polls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn poll_landing_on_deadline_is_allowed() {
        let script = Script::new(&[Some(Status::Pending), Some(Status::Ready)]);
        let waiter = Waiter::new(Duration::from_secs(1), Duration::from_secs(1));

        let entity = waiter
            .until_stable("server", &statuses(), || script.fetch())
            .await
            .unwrap();

        assert_eq!(entity.status, Status::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_status_stops_immediately() {
        let script = Script::new(&[Some(Status::Pending), Some(Status::Error)]);
        let waiter = Waiter::new(Duration::from_secs(60), Duration::from_secs(1));

        let err = waiter
            .until_stable("server", &statuses(), || script.fetch())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::RemoteFailure);
        assert!(!err.is_retryable());
        assert!(err.message.contains("out of stock"));
        assert_eq!(script.polls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn settled_set_returns_failed_entity() {
        let script = Script::new(&[Some(Status::Pending), Some(Status::Error)]);
        let waiter = Waiter::new(Duration::from_secs(60), Duration::from_secs(1));
        let settled = statuses().settled(&[Status::Deleted]);

        let entity = waiter
            .until_stable("gateway", &settled, || script.fetch())
            .await
            .unwrap();

        assert_eq!(entity.status, Status::Error);
        assert!(settled.is_success(&Status::Deleted));
        assert!(!settled.is_failure(&Status::Error));
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_while_waiting_for_deletion_is_success() {
        let script = Script::new(&[Some(Status::Pending), Some(Status::Pending), None]);
        let waiter = Waiter::new(Duration::from_secs(60), Duration::from_secs(1));

        let last = waiter
            .until_deleted("server", &statuses().with_success(vec![]), || {
                script.fetch()
            })
            .await
            .unwrap();

        assert!(last.is_none());
        assert_eq!(script.polls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn deleted_status_ends_deletion_wait() {
        let script = Script::new(&[Some(Status::Pending), Some(Status::Deleted)]);
        let waiter = Waiter::new(Duration::from_secs(60), Duration::from_secs(1));

        let last = waiter
            .until_deleted(
                "cluster",
                &statuses().with_success(vec![Status::Deleted]),
                || script.fetch(),
            )
            .await
            .unwrap();

        assert_eq!(last.map(|e| e.status), Some(Status::Deleted));
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_while_waiting_for_stability_is_an_error() {
        let script = Script::new(&[None]);
        let waiter = Waiter::new(Duration::from_secs(60), Duration::from_secs(1));

        let err = waiter
            .until_stable("server", &statuses(), || script.fetch())
            .await
            .unwrap_err();

        assert!(err.is_not_found());
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_between_polls() {
        let script = Script::new(&[Some(Status::Pending)]);
        let cancel = CancellationToken::new();
        let waiter = Waiter::new(Duration::from_secs(3600), Duration::from_secs(1))
            .with_cancellation(cancel.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            cancel.cancel();
        });

        let err = waiter
            .until_stable("server", &statuses(), || script.fetch())
            .await
            .unwrap_err();
        canceller.await.unwrap();

        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert_eq!(script.polls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_first_poll() {
        let script = Script::new(&[Some(Status::Ready)]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let waiter =
            Waiter::new(Duration::from_secs(60), Duration::from_secs(1)).with_cancellation(cancel);

        let err = waiter
            .until_stable("server", &statuses(), || script.fetch())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert_eq!(script.polls(), 0);
    }

    #[test]
    fn config_overrides_retry_interval() {
        let waiter = Waiter::new(Duration::from_secs(60), Duration::from_secs(5));
        assert_eq!(
            waiter
                .clone()
                .with_config(&WaitConfig::default())
                .retry_interval(),
            Duration::from_secs(5)
        );
        assert_eq!(
            waiter
                .with_config(&WaitConfig::with_retry_interval(Duration::from_millis(1)))
                .retry_interval(),
            Duration::from_millis(1)
        );
    }
}
