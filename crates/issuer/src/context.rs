//! Request deadlines, cancellation and the wall clock used for validity windows.

use std::future::{Future, pending};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::watch;
use tokio::time::{Instant, sleep_until};

use crate::error::{IssuerError, RegistryError};

/// Deadline and cancellation state of one caller request.
///
/// Every call that may block takes the context explicitly. Dropping the returned
/// future cancels as well.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    deadline: Option<Instant>,
    cancel: Option<watch::Receiver<bool>>,
}

/// Cancels every clone of the [`RequestContext`] it was created with.
#[derive(Debug)]
pub struct CancelHandle {
    sender: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }
}

impl RequestContext {
    /// Context without deadline or cancellation.
    #[must_use]
    pub fn background() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::background().deadline(Instant::now() + timeout)
    }

    #[must_use]
    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        });
        self
    }

    #[must_use]
    pub fn cancellable(mut self) -> (Self, CancelHandle) {
        let (sender, receiver) = watch::channel(false);
        self.cancel = Some(receiver);
        (self, CancelHandle { sender })
    }

    #[must_use]
    pub const fn expires_at(&self) -> Option<Instant> {
        self.deadline
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|receiver| *receiver.borrow())
    }

    /// Drive `fut` until it completes, the deadline passes or the request is cancelled.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, RegistryError>
    where
        F: Future<Output = Result<T, RegistryError>>,
    {
        if self.is_cancelled() {
            return Err(RegistryError::Cancelled);
        }
        if self.deadline.is_some_and(|deadline| deadline <= Instant::now()) {
            return Err(RegistryError::DeadlineExceeded);
        }

        tokio::select! {
            result = fut => result,
            () = wait_cancelled(self.cancel.clone()) => Err(RegistryError::Cancelled),
            () = wait_deadline(self.deadline) => Err(RegistryError::DeadlineExceeded),
        }
    }
}

async fn wait_cancelled(cancel: Option<watch::Receiver<bool>>) {
    let Some(mut receiver) = cancel else {
        return pending().await;
    };
    // Sender dropped without cancelling: the request can no longer be cancelled.
    let closed = receiver.wait_for(|cancelled| *cancelled).await.is_err();
    if closed {
        pending::<()>().await;
    }
}

async fn wait_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}

/// Source of the current time for issuance windows.
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(SystemTime);

impl FixedClock {
    #[must_use]
    pub const fn new(at: SystemTime) -> Self {
        Self(at)
    }

    #[must_use]
    pub fn from_unix_millis(millis: u64) -> Self {
        Self(UNIX_EPOCH + Duration::from_millis(millis))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> SystemTime {
        self.0
    }
}

/// Milliseconds since the Unix epoch, the ledger's timestamp unit.
pub(crate) fn unix_millis(at: SystemTime) -> Result<u64, IssuerError> {
    let since_epoch = at
        .duration_since(UNIX_EPOCH)
        .map_err(|_| IssuerError::ClockBeforeEpoch)?;
    u64::try_from(since_epoch.as_millis()).map_err(|_| IssuerError::ClockBeforeEpoch)
}

/// Validity duration in whole milliseconds; must be positive.
pub(crate) fn ttl_millis(ttl: Duration) -> Result<u64, IssuerError> {
    match u64::try_from(ttl.as_millis()) {
        Ok(millis) if millis > 0 => Ok(millis),
        _ => Err(IssuerError::InvalidTtl(ttl)),
    }
}
