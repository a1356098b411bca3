use crate::{ArtifactFetcher, Estimate, RemoteConfig, RemoteError};
use natpack_schema::{BuildInfo, Platform};
use std::io::{Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

const CHUNK_SIZE: usize = 64 * 1024;

/// Downloads artifacts over HTTP(S), trying each configured mirror in order.
///
/// The body is streamed into a temporary file next to the destination and
/// renamed into place after it was fully read and synced, so a dropped
/// connection never leaves a truncated artifact at the destination.
pub struct HttpFetcher {
    config: RemoteConfig,
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new(config: RemoteConfig) -> Self {
        let agent = ureq::Agent::new_with_defaults();
        Self { config, agent }
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    fn download(
        &self,
        url: &str,
        dest: &Path,
        progress: &mut dyn FnMut(Estimate),
    ) -> Result<u64, RemoteError> {
        let mut req = self.agent.get(url).header("User-Agent", crate::USER_AGENT);
        if let Some(ref token) = self.config.auth_token {
            req = req.header("Authorization", &format!("Bearer {token}"));
        }
        let resp = match req.call() {
            Ok(r) => r,
            Err(ureq::Error::StatusCode(404)) => {
                return Err(RemoteError::NotFound(url.to_owned()));
            }
            Err(ureq::Error::StatusCode(code)) => {
                return Err(RemoteError::Http(format!("HTTP {code} for {url}")));
            }
            Err(e) => {
                return Err(RemoteError::Http(e.to_string()));
            }
        };

        let code = resp.status().as_u16();
        if code == 404 {
            return Err(RemoteError::NotFound(url.to_owned()));
        }
        if code >= 400 {
            return Err(RemoteError::Http(format!("HTTP {code} for {url}")));
        }

        let total = resp.body().content_length();
        let mut reader = resp.into_body().into_reader();

        let parent = match dest.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(parent)?;
        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut done: u64 = 0;
        let mut last = -1.0_f32;
        progress(Estimate::from_bytes(0, total));
        loop {
            let n = reader
                .read(&mut buf)
                .map_err(|e| RemoteError::Http(format!("reading {url}: {e}")))?;
            if n == 0 {
                break;
            }
            tmp.write_all(&buf[..n])?;
            done += n as u64;
            match Estimate::from_bytes(done, total) {
                Estimate::Fraction(f) if f > last => {
                    last = f;
                    progress(Estimate::Fraction(f));
                }
                Estimate::Fraction(_) => {}
                Estimate::Unknown => progress(Estimate::Unknown),
            }
        }

        if let Some(expected) = total {
            if done != expected {
                return Err(RemoteError::Http(format!(
                    "truncated body for {url}: got {done} of {expected} bytes"
                )));
            }
        }

        tmp.as_file().sync_all()?;
        tmp.persist(dest).map_err(|e| RemoteError::Io(e.error))?;
        if total.is_some() && last < 1.0 {
            progress(Estimate::Fraction(1.0));
        }
        Ok(done)
    }
}

impl ArtifactFetcher for HttpFetcher {
    fn fetch(
        &self,
        info: &BuildInfo,
        platform: Platform,
        dest: &Path,
        progress: &mut dyn FnMut(Estimate),
    ) -> Result<u64, RemoteError> {
        if self.config.mirrors.is_empty() {
            return Err(RemoteError::Config("no mirrors configured".to_owned()));
        }
        let mut attempts = Vec::with_capacity(self.config.mirrors.len());
        // High-water mark across mirrors: a retry restarts at zero bytes,
        // but reported progress never moves backwards.
        let mut high: Option<f32> = None;
        let mut forward = |estimate: Estimate| match estimate {
            Estimate::Fraction(f) if high.is_none_or(|h| f > h) => {
                high = Some(f);
                progress(estimate);
            }
            Estimate::Fraction(_) => {}
            Estimate::Unknown => {
                if high.is_none() {
                    progress(estimate);
                }
            }
        };
        for mirror in &self.config.mirrors {
            let url = self.config.artifact_url(mirror, info, platform);
            debug!("GET {url}");
            match self.download(&url, dest, &mut forward) {
                Ok(bytes) => {
                    info!("downloaded {bytes} bytes from {url}");
                    return Ok(bytes);
                }
                Err(e) => {
                    warn!("mirror {mirror} failed: {e}");
                    attempts.push(format!("{url}: {e}"));
                }
            }
        }
        Err(RemoteError::AllMirrorsFailed(attempts))
    }
}
