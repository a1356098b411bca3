use serde::Serialize;
use std::fmt;
use std::sync::Mutex;
use tracing::{debug, info};

pub use natpack_remote::Estimate;

/// Stages of a build, in the order they are reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStage {
    Locating,
    Downloading,
    Extracting,
    Installing,
    Initializing,
    Initialized,
}

impl ProgressStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Locating => "locating",
            Self::Downloading => "downloading",
            Self::Extracting => "extracting",
            Self::Installing => "installing",
            Self::Initializing => "initializing",
            Self::Initialized => "initialized",
        }
    }
}

impl fmt::Display for ProgressStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives progress reports. Purely observational: nothing a sink does
/// affects the build.
pub trait ProgressSink: Send + Sync {
    fn report(&self, stage: ProgressStage, estimate: Estimate);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressStage, Estimate) + Send + Sync,
{
    fn report(&self, stage: ProgressStage, estimate: Estimate) {
        self(stage, estimate);
    }
}

/// Logs each stage once at info level, and fractions at debug level.
#[derive(Debug, Default)]
pub struct LogProgress {
    last: Mutex<Option<ProgressStage>>,
}

impl LogProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressSink for LogProgress {
    fn report(&self, stage: ProgressStage, estimate: Estimate) {
        let entered = match self.last.lock() {
            Ok(mut last) => last.replace(stage) != Some(stage),
            Err(_) => true,
        };
        if entered {
            info!("{stage}");
        }
        if let Estimate::Fraction(f) = estimate {
            debug!("{stage}: {:.0}%", f * 100.0);
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn report(&self, _stage: ProgressStage, _estimate: Estimate) {}
}
