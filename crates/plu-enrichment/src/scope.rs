//! Lifetime scope for timers and tasks owned by one view
//!
//! Every task and timer registered on a [`ViewScope`] stops when the scope is
//! cancelled. Tasks must also check [`ViewScope::is_live`] before committing
//! state, since a fetch may resolve between cancellation and abort.

use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;

/// Cancellation scope of a mounted view
#[derive(Debug, Clone, Default)]
pub struct ViewScope {
    token: CancellationToken,
    tasks: Arc<Mutex<Vec<AbortHandle>>>,
}

impl ViewScope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope cancelled together with `self`, but cancellable on its own
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            tasks: Arc::default(),
        }
    }

    /// Liveness flag, false once torn down
    #[inline]
    #[must_use]
    pub fn is_live(&self) -> bool {
        !self.token.is_cancelled()
    }

    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Resolves once the scope is cancelled
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// Spawn `future` bound to this scope.
    ///
    /// Returns `false` without spawning when the scope is already cancelled.
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(&self, future: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if !self.is_live() {
            return false;
        }
        let token = self.token.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {}
                () = future => {}
            }
        });

        let mut tasks = self.tasks.lock();
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle.abort_handle());
        true
    }

    /// Run `action` once after `delay`, unless the timer or the scope is
    /// cancelled first.
    pub fn schedule_after<F>(&self, delay: Duration, action: F) -> TimerHandle
    where
        F: FnOnce() + Send + 'static,
    {
        let timer = TimerHandle {
            token: self.token.child_token(),
        };
        let token = timer.token.clone();
        self.spawn(async move {
            tokio::select! {
                () = token.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    if !token.is_cancelled() {
                        action();
                    }
                }
            }
        });
        timer
    }

    /// Tear down: cancel the token and abort every task.
    pub fn cancel(&self) {
        self.token.cancel();
        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            task.abort();
        }
    }
}

/// Cancellation handle of one scheduled timer
#[derive(Debug, Clone)]
pub struct TimerHandle {
    token: CancellationToken,
}

impl TimerHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}
