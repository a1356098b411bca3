use crate::InstallLayout;
use natpack_schema::BuildInfo;
use std::path::Path;
use tracing::debug;

/// Whether `dir` holds a complete install of `expected`.
///
/// True only when the directory exists, carries the install marker, and
/// its `build_meta.json` parses and names the same release tag. Never
/// touches the network and never modifies the directory.
pub fn check_installation(dir: &Path, expected: &BuildInfo) -> bool {
    let layout = InstallLayout::new(dir);
    if !dir.is_dir() {
        debug!("no install at {}", dir.display());
        return false;
    }
    if !layout.is_marked() {
        debug!("install at {} has no marker", dir.display());
        return false;
    }
    match BuildInfo::load(&layout.build_meta()) {
        Ok(installed) if installed.release_tag == expected.release_tag => true,
        Ok(installed) => {
            debug!(
                "installed release {} does not match expected {}",
                installed.release_tag, expected.release_tag
            );
            false
        }
        Err(e) => {
            debug!("unreadable build descriptor in {}: {e}", dir.display());
            false
        }
    }
}
