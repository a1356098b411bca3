use crate::StoreError;
use natpack_schema::{BuildInfo, Platform, DEFAULT_ARTIFACT};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::PathBuf;
use tracing::debug;

/// Finds a bundle shipped alongside the caller, so the download can be skipped.
///
/// `Ok(None)` is the normal "not bundled" answer and makes the caller fall
/// back to downloading. The returned stream is a raw tar+gzip archive.
pub trait BundleLocator: Send + Sync {
    fn locate(
        &self,
        info: &BuildInfo,
        platform: Platform,
    ) -> Result<Option<Box<dyn Read + Send>>, StoreError>;
}

/// File name a shipped bundle is expected under, e.g.
/// `jcef-natives-linux-amd64-r100.tar.gz`.
pub fn bundle_file_name(artifact: &str, platform: Platform, info: &BuildInfo) -> String {
    format!("{artifact}-{}-{}.tar.gz", platform.identifier(), info.release_tag)
}

/// Looks for a bundle file in a list of directories.
#[derive(Debug, Clone)]
pub struct LocalBundleLocator {
    search_dirs: Vec<PathBuf>,
    artifact: String,
}

impl LocalBundleLocator {
    pub fn new(search_dirs: Vec<PathBuf>, artifact: &str) -> Self {
        Self {
            search_dirs,
            artifact: artifact.to_owned(),
        }
    }

    /// Search the executable's directory and its `bundles/` subdirectory.
    pub fn beside_executable(artifact: &str) -> Self {
        let search_dirs = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(std::path::Path::to_path_buf))
            .map(|dir| vec![dir.join("bundles"), dir])
            .unwrap_or_default();
        Self::new(search_dirs, artifact)
    }

    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }
}

impl Default for LocalBundleLocator {
    fn default() -> Self {
        Self::beside_executable(DEFAULT_ARTIFACT)
    }
}

impl BundleLocator for LocalBundleLocator {
    fn locate(
        &self,
        info: &BuildInfo,
        platform: Platform,
    ) -> Result<Option<Box<dyn Read + Send>>, StoreError> {
        let name = bundle_file_name(&self.artifact, platform, info);
        for dir in &self.search_dirs {
            let candidate = dir.join(&name);
            if candidate.is_file() {
                debug!("found shipped bundle at {}", candidate.display());
                let file = File::open(&candidate)
                    .map_err(|e| StoreError::path_io("failed to open", &candidate, e))?;
                return Ok(Some(Box::new(BufReader::new(file))));
            }
        }
        debug!("no shipped bundle named {name}");
        Ok(None)
    }
}

/// Never finds anything; forces the download path.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBundleLocator;

impl BundleLocator for NoBundleLocator {
    fn locate(
        &self,
        _info: &BuildInfo,
        _platform: Platform,
    ) -> Result<Option<Box<dyn Read + Send>>, StoreError> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use natpack_schema::{Arch, Os};
    use std::fs;

    const LINUX: Platform = Platform::new(Os::Linux, Arch::Amd64);

    #[test]
    fn file_name_format() {
        assert_eq!(
            bundle_file_name("jcef-natives", LINUX, &BuildInfo::new("r100")),
            "jcef-natives-linux-amd64-r100.tar.gz"
        );
    }

    #[test]
    fn locates_in_second_search_dir() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        fs::write(b.path().join("jcef-natives-linux-amd64-r1.tar.gz"), b"gz").unwrap();
        let locator =
            LocalBundleLocator::new(vec![a.path().to_path_buf(), b.path().to_path_buf()], "jcef-natives");
        let mut stream = locator
            .locate(&BuildInfo::new("r1"), LINUX)
            .unwrap()
            .expect("bundle should be found");
        let mut content = Vec::new();
        stream.read_to_end(&mut content).unwrap();
        assert_eq!(content, b"gz");
    }

    #[test]
    fn absent_bundle_is_none() {
        let a = tempfile::tempdir().unwrap();
        let locator = LocalBundleLocator::new(vec![a.path().to_path_buf()], "jcef-natives");
        assert!(locator.locate(&BuildInfo::new("r1"), LINUX).unwrap().is_none());
    }

    #[test]
    fn other_platform_bundle_is_ignored() {
        let a = tempfile::tempdir().unwrap();
        fs::write(a.path().join("jcef-natives-linux-arm64-r1.tar.gz"), b"gz").unwrap();
        let locator = LocalBundleLocator::new(vec![a.path().to_path_buf()], "jcef-natives");
        assert!(locator.locate(&BuildInfo::new("r1"), LINUX).unwrap().is_none());
    }

    #[test]
    fn default_searches_beside_executable() {
        let locator = LocalBundleLocator::default();
        assert!(locator
            .search_dirs()
            .iter()
            .any(|d| d.ends_with("bundles")));
    }

    #[test]
    fn no_locator_finds_nothing() {
        assert!(NoBundleLocator
            .locate(&BuildInfo::new("r1"), LINUX)
            .unwrap()
            .is_none());
    }
}
