use crate::lifecycle::{validate_transition, BuildState};
use crate::CoreError;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, OnceLock, PoisonError};
use tracing::debug;

struct Inner {
    state: BuildState,
    error: Option<Arc<CoreError>>,
}

/// Runs a piece of work at most once and shares its outcome.
///
/// The first caller moves the state to `Building` and runs the work without
/// holding the lock; later callers block on the condition variable until
/// the state is terminal. A success is published into a `OnceLock` under
/// the same mutex that gates the waiters, so `get` never observes a
/// half-built value. A failure is stored as an `Arc` and handed to every
/// caller, and stays: a failed flight never runs again.
pub struct SingleFlight<T> {
    inner: Mutex<Inner>,
    cond: Condvar,
    value: OnceLock<T>,
}

impl<T> Default for SingleFlight<T> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: BuildState::Idle,
                error: None,
            }),
            cond: Condvar::new(),
            value: OnceLock::new(),
        }
    }
}

/// Moves the flight to `Failed` if the work unwinds, so waiters wake up.
struct PanicGuard<'a, T> {
    flight: &'a SingleFlight<T>,
    armed: bool,
}

impl<T> Drop for PanicGuard<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            self.flight.finish_failed(CoreError::Internal(
                "build panicked before completing".to_owned(),
            ));
        }
    }
}

impl<T> SingleFlight<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The published value, without locking.
    pub fn get(&self) -> Option<&T> {
        self.value.get()
    }

    pub fn state(&self) -> BuildState {
        self.lock_recover().state
    }

    /// Run `work` unless it already ran, then return the shared outcome.
    ///
    /// `published` is called only by the thread that ran `work`, after the
    /// value is visible and waiters were woken.
    pub fn run<W, P>(&self, work: W, published: P) -> Result<&T, Arc<CoreError>>
    where
        W: FnOnce() -> Result<T, CoreError>,
        P: FnOnce(&T),
    {
        if let Some(value) = self.value.get() {
            return Ok(value);
        }

        {
            let mut inner = self
                .inner
                .lock()
                .map_err(|e| Arc::new(CoreError::InterruptedWait(e.to_string())))?;
            loop {
                match inner.state {
                    BuildState::Building => {
                        debug!("waiting for concurrent build");
                        inner = self
                            .cond
                            .wait(inner)
                            .map_err(|e| Arc::new(CoreError::InterruptedWait(e.to_string())))?;
                    }
                    BuildState::Completed => {
                        return self.value.get().ok_or_else(|| {
                            Arc::new(CoreError::Internal(
                                "build completed without publishing a value".to_owned(),
                            ))
                        });
                    }
                    BuildState::Failed => {
                        return Err(inner.error.clone().unwrap_or_else(|| {
                            Arc::new(CoreError::Internal(
                                "build failed without recording an error".to_owned(),
                            ))
                        }));
                    }
                    BuildState::Idle => {
                        validate_transition(inner.state, BuildState::Building)
                            .map_err(Arc::new)?;
                        inner.state = BuildState::Building;
                        break;
                    }
                }
            }
        }

        let mut guard = PanicGuard {
            flight: self,
            armed: true,
        };
        let result = work();
        guard.armed = false;

        match result {
            Ok(value) => {
                let value = self.finish_completed(value)?;
                published(value);
                Ok(value)
            }
            Err(e) => Err(self.finish_failed(e)),
        }
    }

    fn lock_recover(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish_completed(&self, value: T) -> Result<&T, Arc<CoreError>> {
        let mut inner = self.lock_recover();
        if let Err(e) = validate_transition(inner.state, BuildState::Completed) {
            drop(inner);
            return Err(self.finish_failed(e));
        }
        if self.value.set(value).is_err() {
            drop(inner);
            return Err(self.finish_failed(CoreError::Internal(
                "value published twice".to_owned(),
            )));
        }
        inner.state = BuildState::Completed;
        drop(inner);
        self.cond.notify_all();
        self.value.get().ok_or_else(|| {
            Arc::new(CoreError::Internal(
                "published value disappeared".to_owned(),
            ))
        })
    }

    fn finish_failed(&self, error: CoreError) -> Arc<CoreError> {
        let error = Arc::new(error);
        let mut inner = self.lock_recover();
        if validate_transition(inner.state, BuildState::Failed).is_ok() {
            inner.state = BuildState::Failed;
            inner.error = Some(Arc::clone(&error));
        }
        drop(inner);
        self.cond.notify_all();
        error
    }
}
