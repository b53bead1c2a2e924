//! Periodic refresh with an overlap guard.
//!
//! Passes are serialized through a [`PassGuard`]. A tick that fires while a
//! pass holds the guard is skipped rather than queued; callers that must run
//! a pass wait for the guard instead.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Admits one refresh pass at a time. Clones share the same guard.
#[derive(Debug, Clone, Default)]
pub struct PassGuard {
    lock: Arc<Mutex<()>>,
}

/// Held for the duration of a pass; releases the guard on drop.
#[derive(Debug)]
pub struct PassToken {
    _held: OwnedMutexGuard<()>,
}

impl PassGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the guard, or `None` if a pass is already running.
    pub fn try_begin(&self) -> Option<PassToken> {
        self.lock
            .clone()
            .try_lock_owned()
            .ok()
            .map(|held| PassToken { _held: held })
    }

    /// Wait for the running pass, if any, then claim the guard.
    pub async fn begin(&self) -> PassToken {
        PassToken {
            _held: self.lock.clone().lock_owned().await,
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock.try_lock().is_err()
    }
}

/// Fires a refresh pass every `period`, never more than one at a time.
#[derive(Debug, Clone)]
pub struct RefreshScheduler {
    period: Duration,
    guard: PassGuard,
}

impl RefreshScheduler {
    /// Ticks are skipped while anything else holds `guard`.
    pub fn new(period: Duration, guard: PassGuard) -> Self {
        Self { period, guard }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn guard(&self) -> &PassGuard {
        &self.guard
    }

    /// Spawn the ticking loop. The first tick fires one period from now.
    ///
    /// Each pass runs on the loop's own task and receives the token it must
    /// hold while running. Aborting the returned handle stops the loop and
    /// cancels the pass in flight.
    pub fn spawn<F, Fut>(self, mut pass: F) -> JoinHandle<()>
    where
        F: FnMut(PassToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + self.period, self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let Some(token) = self.guard.try_begin() else {
                    log::debug!("another refresh is running; skipping tick");
                    continue;
                };

                let started = Instant::now();
                pass(token).await;
                let took = started.elapsed();
                if took >= self.period {
                    log::debug!("refresh took {:?}; skipping ticks that fell inside it", took);
                }
            }
        })
    }
}
