//! Bounded polling primitive. Every blocking wait in the engine goes
//! through [`poll_until`]: frame presence probes, clickability checks,
//! overlay invisibility, readiness and success-state stabilization.

use futures::future::BoxFuture;
use keyturn_common::SessionError;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{Instant, sleep};

/// One bounded wait: a total budget and the pause between probe attempts.
///
/// Invariant: `poll_interval <= timeout`, enforced at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitSpec {
    timeout: Duration,
    poll_interval: Duration,
}

impl WaitSpec {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval: poll_interval.min(timeout),
        }
    }

    pub fn from_millis(timeout_ms: u64, poll_interval_ms: u64) -> Self {
        Self::new(
            Duration::from_millis(timeout_ms),
            Duration::from_millis(poll_interval_ms),
        )
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

#[derive(Debug, Error)]
pub enum WaitError {
    /// The condition never held within the budget. Carries the elapsed
    /// duration; never converted into a silent default value.
    #[error("condition not met within {elapsed:?}")]
    TimedOut { elapsed: Duration },

    /// The probe itself failed. Propagated immediately, not retried.
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl WaitError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, WaitError::TimedOut { .. })
    }
}

/// A probe evaluated against some context. `Ok(Some(_))` means ready,
/// `Ok(None)` means not yet, `Err(_)` aborts the wait immediately.
pub type Probe<'a, T> = BoxFuture<'a, Result<Option<T>, SessionError>>;

/// Identity helper that pins down the higher-ranked closure type expected
/// by [`poll_until`], so call sites can pass plain closures.
pub fn probe<C, T, F>(f: F) -> F
where
    C: ?Sized,
    F: for<'a> FnMut(&'a mut C) -> Probe<'a, T>,
{
    f
}

/// Repeatedly evaluate `probe` against `ctx` until it yields a value or
/// the budget elapses. The first evaluation happens immediately, with no
/// initial sleep.
pub async fn poll_until<C, T, F>(
    spec: &WaitSpec,
    ctx: &mut C,
    mut probe: F,
) -> Result<T, WaitError>
where
    C: ?Sized + Send,
    F: for<'a> FnMut(&'a mut C) -> Probe<'a, T> + Send,
{
    let started = Instant::now();
    loop {
        if let Some(value) = probe(ctx).await? {
            return Ok(value);
        }
        if started.elapsed() >= spec.timeout {
            return Err(WaitError::TimedOut {
                elapsed: started.elapsed(),
            });
        }
        sleep(spec.poll_interval).await;
    }
}
