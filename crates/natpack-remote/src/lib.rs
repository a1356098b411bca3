//! Fetching native bundle artifacts from remote mirrors.
//!
//! `ArtifactFetcher` is the download seam used by the orchestrator;
//! `HttpFetcher` implements it over plain HTTP(S) with ordered mirror
//! fallback, streaming into a temporary file that only lands at the
//! destination once the whole body has been received.

pub mod config;
pub mod http;

pub use config::{RemoteConfig, DEFAULT_MIRROR, DEFAULT_URL_TEMPLATE};
pub use http::HttpFetcher;

use natpack_schema::{BuildInfo, Platform};
use std::path::Path;
use thiserror::Error;

/// Sent as `User-Agent` on every request.
pub const USER_AGENT: &str = concat!("natpack/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("remote config error: {0}")]
    Config(String),
    #[error("download failed on every mirror: {}", .0.join("; "))]
    AllMirrorsFailed(Vec<String>),
}

/// How far along a stage is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Estimate {
    Unknown,
    /// Completed share in `[0, 1]`.
    Fraction(f32),
}

impl Estimate {
    /// Estimate from a byte count and an optional expected total.
    pub fn from_bytes(done: u64, total: Option<u64>) -> Self {
        match total {
            Some(0) => Self::Fraction(1.0),
            Some(total) => Self::Fraction((done as f64 / total as f64).clamp(0.0, 1.0) as f32),
            None => Self::Unknown,
        }
    }

    pub fn fraction(self) -> Option<f32> {
        match self {
            Self::Unknown => None,
            Self::Fraction(f) => Some(f),
        }
    }
}

/// Downloads the artifact for one release and platform.
pub trait ArtifactFetcher: Send + Sync {
    /// Write the artifact to `dest`, reporting progress as it streams.
    /// Returns the number of bytes written. On error `dest` is left
    /// untouched.
    fn fetch(
        &self,
        info: &BuildInfo,
        platform: Platform,
        dest: &Path,
        progress: &mut dyn FnMut(Estimate),
    ) -> Result<u64, RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_from_bytes() {
        assert_eq!(Estimate::from_bytes(5, None), Estimate::Unknown);
        assert_eq!(Estimate::from_bytes(50, Some(100)), Estimate::Fraction(0.5));
        assert_eq!(Estimate::from_bytes(0, Some(0)), Estimate::Fraction(1.0));
    }

    #[test]
    fn estimate_clamps_overrun() {
        assert_eq!(Estimate::from_bytes(200, Some(100)), Estimate::Fraction(1.0));
    }

    #[test]
    fn all_mirrors_failed_lists_attempts() {
        let e = RemoteError::AllMirrorsFailed(vec![
            "http://a/x: not found".to_owned(),
            "http://b/x: HTTP 500".to_owned(),
        ]);
        let msg = e.to_string();
        assert!(msg.contains("http://a/x"));
        assert!(msg.contains("HTTP 500"));
    }

    #[test]
    fn user_agent_names_crate() {
        assert!(USER_AGENT.starts_with("natpack/"));
    }
}
