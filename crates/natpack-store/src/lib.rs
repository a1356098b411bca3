//! On-disk side of a natpack install.
//!
//! `InstallLayout` owns the install directory paths and the `install.lock`
//! marker, `check_installation` decides whether an existing install can be
//! trusted, `BundleLocator` finds a bundle shipped next to the caller, and
//! `extract_tar_gz` / `open_inner_archive` unpack the bundle safely.

pub mod artifact;
pub mod check;
pub mod extract;
pub mod layout;
pub mod locate;

pub use artifact::{open_inner_archive, InnerArchive, INNER_ARCHIVE_SUFFIX};
pub use check::check_installation;
pub use extract::{extract_tar, extract_tar_gz, ExtractReport};
pub use layout::{InstallLayout, DOWNLOAD_TEMP_FILE, INSTALL_MARKER};
pub use locate::{bundle_file_name, BundleLocator, LocalBundleLocator, NoBundleLocator};

use natpack_schema::SchemaError;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fsync a directory so a preceding create or rename is durable.
pub(crate) fn fsync_dir(dir: &Path) -> Result<(), std::io::Error> {
    let f = std::fs::File::open(dir)?;
    f.sync_all()
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{action} '{}': {source}", path.display())]
    PathIo {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("downloaded artifact is invalid: {0}")]
    ArtifactInvalid(String),
    #[error("extraction failed: {0}")]
    Extraction(String),
    #[error("archive entry escapes the install directory: {entry}")]
    PathTraversal { entry: String },
    #[error("install marker already exists at '{}'", .0.display())]
    MarkerExists(PathBuf),
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl StoreError {
    pub(crate) fn path_io(action: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::PathIo {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}
