//! Install orchestration for natpack native bundles.
//!
//! The `Orchestrator` ties the pieces together: it checks the install
//! directory, installs from a shipped bundle or a download when needed,
//! hardens and marks the install, then hands the directory to a
//! `RuntimeInitializer`. Any number of threads may call `build()`; the
//! work runs once and every caller observes the same handle or the same
//! failure.

pub mod config;
pub mod flight;
pub mod lifecycle;
pub mod orchestrator;
pub mod progress;

pub use config::BuildConfig;
pub use flight::SingleFlight;
pub use lifecycle::{validate_transition, BuildState};
pub use orchestrator::Orchestrator;
pub use progress::{Estimate, LogProgress, NullProgress, ProgressSink, ProgressStage};

use natpack_remote::RemoteError;
use natpack_runtime::RuntimeError;
use natpack_schema::SchemaError;
use natpack_store::StoreError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
    #[error("interrupted while waiting for a concurrent build: {0}")]
    InterruptedWait(String),
    #[error("internal error: {0}")]
    Internal(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of a [`CoreError`], stable across wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnsupportedPlatform,
    /// Disk or network.
    Io,
    DownloadedArtifactInvalid,
    Extraction,
    Initialization,
    InterruptedWait,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnsupportedPlatform => "unsupported_platform",
            Self::Io => "io",
            Self::DownloadedArtifactInvalid => "downloaded_artifact_invalid",
            Self::Extraction => "extraction",
            Self::Initialization => "initialization",
            Self::InterruptedWait => "interrupted_wait",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn schema_kind(e: &SchemaError) -> ErrorKind {
    match e {
        SchemaError::UnsupportedPlatform { .. } | SchemaError::UnknownPlatform(_) => {
            ErrorKind::UnsupportedPlatform
        }
        SchemaError::Io(_)
        | SchemaError::ParseJson(_)
        | SchemaError::ParseToml(_)
        | SchemaError::InvalidBuildInfo(_) => ErrorKind::Io,
    }
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Schema(e) => schema_kind(e),
            Self::Store(e) => match e {
                StoreError::ArtifactInvalid(_) => ErrorKind::DownloadedArtifactInvalid,
                StoreError::Extraction(_) | StoreError::PathTraversal { .. } => {
                    ErrorKind::Extraction
                }
                StoreError::Schema(inner) => schema_kind(inner),
                StoreError::Io(_) | StoreError::PathIo { .. } | StoreError::MarkerExists(_) => {
                    ErrorKind::Io
                }
            },
            Self::Remote(_) | Self::Io(_) => ErrorKind::Io,
            Self::Runtime(_) => ErrorKind::Initialization,
            Self::InterruptedWait(_) => ErrorKind::InterruptedWait,
            Self::InvalidTransition { .. } | Self::Internal(_) => ErrorKind::Internal,
        }
    }
}
