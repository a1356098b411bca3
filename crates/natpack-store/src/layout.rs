use crate::StoreError;
use natpack_schema::{BuildInfo, BUILD_META_FILE};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Zero-byte marker whose presence means the install completed.
pub const INSTALL_MARKER: &str = "install.lock";
/// Transient download target inside the install directory.
pub const DOWNLOAD_TEMP_FILE: &str = "download.zip.temp";

/// Paths inside one install directory.
///
/// The directory is either absent, partially populated by an install in
/// progress, or complete with [`INSTALL_MARKER`] present. Anything without
/// the marker is untrusted and gets wiped by [`reset`](Self::reset).
#[derive(Debug, Clone)]
pub struct InstallLayout {
    root: PathBuf,
}

impl InstallLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[inline]
    pub fn marker(&self) -> PathBuf {
        self.root.join(INSTALL_MARKER)
    }

    #[inline]
    pub fn download_temp(&self) -> PathBuf {
        self.root.join(DOWNLOAD_TEMP_FILE)
    }

    #[inline]
    pub fn build_meta(&self) -> PathBuf {
        self.root.join(BUILD_META_FILE)
    }

    pub fn is_marked(&self) -> bool {
        self.marker().is_file()
    }

    /// Remove whatever is at the install path and recreate it empty.
    pub fn reset(&self) -> Result<(), StoreError> {
        if self.root.symlink_metadata().is_ok() {
            debug!("wiping install directory {}", self.root.display());
            remove_tree(&self.root)
                .map_err(|e| StoreError::path_io("failed to wipe", &self.root, e))?;
        }
        fs::create_dir_all(&self.root)
            .map_err(|e| StoreError::path_io("failed to create", &self.root, e))?;
        Ok(())
    }

    /// Delete the install directory entirely. Absent is fine.
    pub fn remove(&self) -> Result<bool, StoreError> {
        if self.root.symlink_metadata().is_err() {
            return Ok(false);
        }
        remove_tree(&self.root)
            .map_err(|e| StoreError::path_io("failed to remove", &self.root, e))?;
        Ok(true)
    }

    pub fn remove_download_temp(&self) -> Result<(), StoreError> {
        let path = self.download_temp();
        fs::remove_file(&path).map_err(|e| StoreError::path_io("failed to remove", &path, e))
    }

    /// Write `build_meta.json` unless the extracted bundle already carries one.
    ///
    /// A shipped descriptor must name the expected release; otherwise every
    /// later check would reject the install and force a reinstall.
    pub fn ensure_build_meta(&self, info: &BuildInfo) -> Result<(), StoreError> {
        let path = self.build_meta();
        if !path.is_file() {
            info.write_to_dir(&self.root)?;
            return Ok(());
        }
        let shipped = BuildInfo::load(&path).map_err(|e| {
            StoreError::ArtifactInvalid(format!("unreadable {BUILD_META_FILE} in bundle: {e}"))
        })?;
        if shipped.release_tag != info.release_tag {
            warn!(
                "bundle descriptor names release {}, expected {}",
                shipped.release_tag, info.release_tag
            );
            return Err(StoreError::ArtifactInvalid(format!(
                "bundle is release {}, expected {}",
                shipped.release_tag, info.release_tag
            )));
        }
        Ok(())
    }

    /// Create the install marker. Fails if it already exists.
    pub fn write_marker(&self) -> Result<(), StoreError> {
        let path = self.marker();
        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| {
                if e.kind() == io::ErrorKind::AlreadyExists {
                    StoreError::MarkerExists(path.clone())
                } else {
                    StoreError::path_io("failed to create marker", &path, e)
                }
            })?;
        file.sync_all()?;
        crate::fsync_dir(&self.root)?;
        Ok(())
    }
}

/// `remove_dir_all` that first restores owner write access, since bundles
/// can ship read-only directories.
fn remove_tree(path: &Path) -> io::Result<()> {
    let meta = path.symlink_metadata()?;
    if !meta.is_dir() {
        return fs::remove_file(path);
    }
    match fs::remove_dir_all(path) {
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            make_writable(path)?;
            fs::remove_dir_all(path)
        }
        other => other,
    }
}

fn make_writable(dir: &Path) -> io::Result<()> {
    let mut perms = fs::metadata(dir)?.permissions();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        perms.set_mode(perms.mode() | 0o700);
    }
    #[cfg(not(unix))]
    #[allow(clippy::permissions_set_readonly_false)]
    perms.set_readonly(false);
    fs::set_permissions(dir, perms)?;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            make_writable(&entry.path())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths_are_correct() {
        let layout = InstallLayout::new("/tmp/natpack-test");
        assert_eq!(layout.marker(), PathBuf::from("/tmp/natpack-test/install.lock"));
        assert_eq!(
            layout.download_temp(),
            PathBuf::from("/tmp/natpack-test/download.zip.temp")
        );
        assert_eq!(
            layout.build_meta(),
            PathBuf::from("/tmp/natpack-test/build_meta.json")
        );
    }

    #[test]
    fn reset_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let layout = InstallLayout::new(dir.path().join("a").join("b"));
        layout.reset().unwrap();
        assert!(layout.root().is_dir());
    }

    #[test]
    fn reset_wipes_partial_install() {
        let dir = tempfile::tempdir().unwrap();
        let layout = InstallLayout::new(dir.path().join("bundle"));
        fs::create_dir_all(layout.root().join("lib")).unwrap();
        fs::write(layout.root().join("lib").join("stale.so"), b"old").unwrap();
        layout.reset().unwrap();
        assert!(layout.root().is_dir());
        assert_eq!(fs::read_dir(layout.root()).unwrap().count(), 0);
    }

    #[test]
    fn reset_replaces_plain_file() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("bundle");
        fs::write(&root, b"not a dir").unwrap();
        let layout = InstallLayout::new(&root);
        layout.reset().unwrap();
        assert!(root.is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn reset_handles_read_only_subdirectory() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let layout = InstallLayout::new(dir.path().join("bundle"));
        let locked = layout.root().join("locked");
        fs::create_dir_all(&locked).unwrap();
        fs::write(locked.join("file"), b"x").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o500)).unwrap();
        layout.reset().unwrap();
        assert!(!locked.exists());
    }

    #[test]
    fn remove_deletes_install_and_tolerates_absence() {
        let dir = tempfile::tempdir().unwrap();
        let layout = InstallLayout::new(dir.path().join("bundle"));
        assert!(!layout.remove().unwrap());
        layout.reset().unwrap();
        layout.write_marker().unwrap();
        assert!(layout.remove().unwrap());
        assert!(!layout.root().exists());
    }

    #[test]
    fn write_marker_is_create_new() {
        let dir = tempfile::tempdir().unwrap();
        let layout = InstallLayout::new(dir.path());
        assert!(!layout.is_marked());
        layout.write_marker().unwrap();
        assert!(layout.is_marked());
        assert_eq!(fs::metadata(layout.marker()).unwrap().len(), 0);
        let err = layout.write_marker().unwrap_err();
        assert!(matches!(err, StoreError::MarkerExists(_)));
    }

    #[test]
    fn write_marker_fails_without_directory() {
        let dir = tempfile::tempdir().unwrap();
        let layout = InstallLayout::new(dir.path().join("missing"));
        assert!(matches!(
            layout.write_marker(),
            Err(StoreError::PathIo { .. })
        ));
    }

    #[test]
    fn remove_download_temp_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let layout = InstallLayout::new(dir.path());
        assert!(layout.remove_download_temp().is_err());
        fs::write(layout.download_temp(), b"zip").unwrap();
        layout.remove_download_temp().unwrap();
        assert!(!layout.download_temp().exists());
    }

    #[test]
    fn ensure_build_meta_keeps_matching_shipped_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let layout = InstallLayout::new(dir.path());
        let mut shipped = BuildInfo::new("r3");
        shipped.runtime_version = Some("122.1.10".to_owned());
        shipped.write_to_dir(dir.path()).unwrap();
        layout.ensure_build_meta(&BuildInfo::new("r3")).unwrap();
        let on_disk = BuildInfo::load(&layout.build_meta()).unwrap();
        assert_eq!(on_disk, shipped);
    }

    #[test]
    fn ensure_build_meta_rejects_mismatched_shipped_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let layout = InstallLayout::new(dir.path());
        BuildInfo::new("shipped").write_to_dir(dir.path()).unwrap();
        let err = layout
            .ensure_build_meta(&BuildInfo::new("expected"))
            .unwrap_err();
        assert!(matches!(err, StoreError::ArtifactInvalid(_)));
    }

    #[test]
    fn ensure_build_meta_rejects_corrupt_shipped_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let layout = InstallLayout::new(dir.path());
        fs::write(layout.build_meta(), b"{not json").unwrap();
        let err = layout.ensure_build_meta(&BuildInfo::new("r1")).unwrap_err();
        assert!(matches!(err, StoreError::ArtifactInvalid(_)));
    }

    #[test]
    fn ensure_build_meta_writes_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let layout = InstallLayout::new(dir.path());
        layout.ensure_build_meta(&BuildInfo::new("r9")).unwrap();
        let on_disk = BuildInfo::load(&layout.build_meta()).unwrap();
        assert_eq!(on_disk.release_tag, "r9");
    }
}
