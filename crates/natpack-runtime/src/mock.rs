use crate::initializer::{LaunchRequest, RuntimeInitializer};
use crate::RuntimeError;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// What a [`MockInitializer`] was called with.
#[derive(Debug, Clone, PartialEq)]
pub struct MockHandle<S> {
    /// 1 for the first call, 2 for the second, and so on.
    pub serial: usize,
    pub install_dir: PathBuf,
    pub args: Vec<String>,
    pub settings: S,
}

/// Test initializer: records its inputs, counts calls, and can be told to
/// fail or to take a while.
pub struct MockInitializer<S> {
    calls: AtomicUsize,
    fail_with: Option<String>,
    delay: Option<Duration>,
    _settings: PhantomData<fn() -> S>,
}

impl<S> Default for MockInitializer<S> {
    fn default() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_with: None,
            delay: None,
            _settings: PhantomData,
        }
    }
}

impl<S> MockInitializer<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_owned()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<S: Clone + Send + Sync> RuntimeInitializer for MockInitializer<S> {
    type Settings = S;
    type Handle = MockHandle<S>;

    fn name(&self) -> &'static str {
        "mock"
    }

    fn initialize(&self, request: &LaunchRequest<'_, S>) -> Result<MockHandle<S>, RuntimeError> {
        let serial = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if let Some(ref message) = self.fail_with {
            return Err(RuntimeError::InitFailed(message.clone()));
        }
        Ok(MockHandle {
            serial,
            install_dir: request.install_dir.to_path_buf(),
            args: request.args.clone(),
            settings: request.settings.clone(),
        })
    }
}
