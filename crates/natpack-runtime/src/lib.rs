//! The boundary between a prepared bundle and the native runtime.
//!
//! `RuntimeInitializer` is the seam the orchestrator calls once the bundle
//! is installed; `plan_launch_args` computes the arguments it receives;
//! `PlatformHardener` applies OS-specific fixups to a fresh install.

pub mod harden;
pub mod initializer;
pub mod launch;
pub mod mock;
pub mod probe;

pub use harden::{select_hardener, NoopHardener, PlatformHardener, QuarantineHardener};
pub use initializer::{LaunchRequest, RuntimeInitializer};
pub use launch::{plan_launch_args, reserved_args, RESERVED_MACOS_KEYS};
pub use mock::{MockHandle, MockInitializer};
pub use probe::{probe, ProbeHandle, ProbeInitializer};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("runtime initialization failed: {0}")]
    InitFailed(String),
    #[error("platform hardening failed: {0}")]
    HardeningFailed(String),
    #[error("installed bundle is incomplete: {0}")]
    BundleIncomplete(String),
}
