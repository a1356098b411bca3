use crate::StoreError;
use flate2::read::GzDecoder;
use std::fs;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// Counts of what an extraction wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractReport {
    pub files: u64,
    pub directories: u64,
    pub symlinks: u64,
    /// Hard links, device nodes, FIFOs and other entries not written.
    pub skipped: u64,
    pub bytes: u64,
}

/// Stream a gzip-compressed tar from `source` into `dest`.
pub fn extract_tar_gz<R: Read>(source: R, dest: &Path) -> Result<ExtractReport, StoreError> {
    extract_tar(GzDecoder::new(source), dest)
}

/// Stream an uncompressed tar from `source` into `dest`.
///
/// Relative paths and permission bits are preserved. Absolute entry paths,
/// entries that normalize to a location outside `dest`, and symlinks whose
/// target is absolute or resolves outside `dest` fail with
/// [`StoreError::PathTraversal`] before anything is written for that entry.
pub fn extract_tar<R: Read>(source: R, dest: &Path) -> Result<ExtractReport, StoreError> {
    fs::create_dir_all(dest).map_err(|e| StoreError::path_io("failed to create", dest, e))?;
    let root = resolve(dest)?;

    let mut ar = tar::Archive::new(source);
    // Keeps rwx bits, drops setuid/setgid.
    ar.set_preserve_permissions(false);
    ar.set_preserve_mtime(true);
    ar.set_unpack_xattrs(false);
    ar.set_overwrite(true);

    let mut report = ExtractReport::default();
    for entry in ar.entries().map_err(extraction)? {
        let mut entry = entry.map_err(extraction)?;
        let raw = entry.path().map_err(extraction)?.into_owned();
        let rel = sanitize_entry_path(&raw)?;
        if rel.as_os_str().is_empty() {
            continue;
        }
        let target = root.join(&rel);
        let kind = entry.header().entry_type();

        if kind.is_dir() || kind.is_file() || kind.is_symlink() {
            check_existing_components(&root, &rel, &raw)?;
        }

        if kind.is_dir() {
            fs::create_dir_all(&target)
                .map_err(|e| StoreError::path_io("failed to create", &target, e))?;
            ensure_inside(&root, &target, &raw)?;
            report.directories += 1;
        } else if kind.is_file() || kind.is_symlink() {
            if kind.is_symlink() {
                let link = entry
                    .link_name()
                    .map_err(extraction)?
                    .ok_or_else(|| {
                        StoreError::Extraction(format!("symlink without target: {}", raw.display()))
                    })?
                    .into_owned();
                check_symlink_target(&rel, &link, &raw)?;
            }
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .map_err(|e| StoreError::path_io("failed to create", parent, e))?;
                ensure_inside(&root, parent, &raw)?;
            }
            entry.unpack(&target).map_err(|e| {
                StoreError::Extraction(format!("failed to unpack {}: {e}", raw.display()))
            })?;
            if kind.is_symlink() {
                report.symlinks += 1;
            } else {
                report.files += 1;
                report.bytes += entry.size();
            }
        } else {
            warn!("skipping unsupported archive entry {} ({kind:?})", raw.display());
            report.skipped += 1;
        }
    }

    debug!(
        "extracted {} files, {} dirs, {} symlinks ({} bytes) into {}",
        report.files,
        report.directories,
        report.symlinks,
        report.bytes,
        dest.display()
    );
    Ok(report)
}

#[allow(clippy::needless_pass_by_value)]
fn extraction(e: std::io::Error) -> StoreError {
    StoreError::Extraction(e.to_string())
}

fn traversal(entry: &Path) -> StoreError {
    StoreError::PathTraversal {
        entry: entry.display().to_string(),
    }
}

/// Lexically normalize an entry path to a relative path below the root.
fn sanitize_entry_path(raw: &Path) -> Result<PathBuf, StoreError> {
    let mut out = PathBuf::new();
    for component in raw.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return Err(traversal(raw));
                }
            }
            Component::RootDir | Component::Prefix(_) => return Err(traversal(raw)),
        }
    }
    Ok(out)
}

fn check_symlink_target(link_rel: &Path, target: &Path, raw: &Path) -> Result<(), StoreError> {
    if target.has_root() {
        return Err(traversal(raw));
    }
    let base = link_rel.parent().unwrap_or_else(|| Path::new(""));
    sanitize_entry_path(&base.join(target)).map_err(|_| traversal(raw))?;
    Ok(())
}

/// Canonicalize a path the extractor is about to write under.
fn resolve(path: &Path) -> Result<PathBuf, StoreError> {
    fs::canonicalize(path)
        .map_err(|e| StoreError::Extraction(format!("failed to resolve {}: {e}", path.display())))
}

/// Follow every already-existing component of `rel` below `root` and
/// reject the entry if one resolves outside `root`. Runs before anything
/// is created for the entry, so earlier symlinks cannot redirect a write.
fn check_existing_components(root: &Path, rel: &Path, raw: &Path) -> Result<(), StoreError> {
    let mut current = root.to_path_buf();
    for component in rel.components() {
        current.push(component);
        match fs::symlink_metadata(&current) {
            Ok(meta) if meta.file_type().is_symlink() => {
                if !resolve(&current)?.starts_with(root) {
                    return Err(traversal(raw));
                }
            }
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => break,
            Err(e) => {
                return Err(StoreError::Extraction(format!(
                    "failed to inspect {}: {e}",
                    current.display()
                )))
            }
        }
    }
    Ok(())
}

/// Reject writes whose real location left `root` through an earlier symlink.
fn ensure_inside(root: &Path, path: &Path, raw: &Path) -> Result<(), StoreError> {
    let real = resolve(path)?;
    if real.starts_with(root) {
        Ok(())
    } else {
        Err(traversal(raw))
    }
}
