use crate::initializer::{LaunchRequest, RuntimeInitializer};
use crate::RuntimeError;
use natpack_schema::{BuildInfo, Platform};
use natpack_store::InstallLayout;
use serde::Serialize;
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// Summary of a prepared bundle, produced without loading native code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeHandle {
    pub install_dir: PathBuf,
    pub platform: String,
    pub release_tag: Option<String>,
    pub runtime_version: Option<String>,
    pub args: Vec<String>,
    pub files: u64,
    pub bytes: u64,
}

/// Verifies the install and describes it. Used where a bundle must be
/// prepared ahead of time by a process that never loads it.
pub struct ProbeInitializer<S> {
    _settings: PhantomData<fn() -> S>,
}

impl<S> Default for ProbeInitializer<S> {
    fn default() -> Self {
        Self {
            _settings: PhantomData,
        }
    }
}

impl<S> ProbeInitializer<S> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: Clone + Send + Sync> RuntimeInitializer for ProbeInitializer<S> {
    type Settings = S;
    type Handle = ProbeHandle;

    fn name(&self) -> &'static str {
        "probe"
    }

    fn initialize(&self, request: &LaunchRequest<'_, S>) -> Result<ProbeHandle, RuntimeError> {
        probe(request.install_dir, request.platform, &request.args)
    }
}

/// Describe the install at `install_dir`; fails unless it is marked complete.
pub fn probe(
    install_dir: &Path,
    platform: Platform,
    args: &[String],
) -> Result<ProbeHandle, RuntimeError> {
    let layout = InstallLayout::new(install_dir);
    if !install_dir.is_dir() {
        return Err(RuntimeError::BundleIncomplete(format!(
            "{} does not exist",
            install_dir.display()
        )));
    }
    if !layout.is_marked() {
        return Err(RuntimeError::BundleIncomplete(format!(
            "{} has no install marker",
            install_dir.display()
        )));
    }
    let info = BuildInfo::load(&layout.build_meta()).ok();
    let (files, bytes) = tally(install_dir)?;
    Ok(ProbeHandle {
        install_dir: install_dir.to_path_buf(),
        platform: platform.identifier(),
        release_tag: info.as_ref().map(|i| i.release_tag.clone()),
        runtime_version: info.and_then(|i| i.runtime_version),
        args: args.to_vec(),
        files,
        bytes,
    })
}

fn tally(dir: &Path) -> Result<(u64, u64), RuntimeError> {
    let mut files = 0;
    let mut bytes = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let ft = entry.file_type()?;
        if ft.is_dir() {
            let (f, b) = tally(&entry.path())?;
            files += f;
            bytes += b;
        } else if ft.is_file() {
            files += 1;
            bytes += entry.metadata()?.len();
        }
    }
    Ok((files, bytes))
}
