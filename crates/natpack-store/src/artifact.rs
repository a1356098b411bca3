use crate::{extract_tar_gz, ExtractReport, StoreError};
use std::fs::File;
use std::path::Path;
use tracing::{debug, warn};

/// Suffix of the bundle member inside a downloaded artifact.
pub const INNER_ARCHIVE_SUFFIX: &str = ".tar.gz";

/// The tar+gzip member found inside a downloaded zip artifact.
pub struct InnerArchive {
    archive: zip::ZipArchive<File>,
    index: usize,
    name: String,
}

impl std::fmt::Debug for InnerArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InnerArchive")
            .field("index", &self.index)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Open the zip at `zip_path` and find the first member whose name ends in
/// `suffix`. A file that is not a zip, or a zip without such a member, is
/// [`StoreError::ArtifactInvalid`].
pub fn open_inner_archive(zip_path: &Path, suffix: &str) -> Result<InnerArchive, StoreError> {
    let file =
        File::open(zip_path).map_err(|e| StoreError::path_io("failed to open", zip_path, e))?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| StoreError::ArtifactInvalid(format!("not a zip archive: {e}")))?;

    let mut found: Option<(usize, String)> = None;
    for index in 0..archive.len() {
        let member = archive
            .by_index(index)
            .map_err(|e| StoreError::ArtifactInvalid(format!("unreadable zip entry: {e}")))?;
        if member.is_dir() || !member.name().ends_with(suffix) {
            continue;
        }
        match found {
            None => found = Some((index, member.name().to_owned())),
            Some((_, ref first)) => {
                warn!("ignoring extra bundle member {} after {first}", member.name());
            }
        }
    }

    let (index, name) = found.ok_or_else(|| {
        StoreError::ArtifactInvalid(format!(
            "no member ending in '{suffix}' in {}",
            zip_path.display()
        ))
    })?;
    debug!("found bundle member {name} in {}", zip_path.display());
    Ok(InnerArchive {
        archive,
        index,
        name,
    })
}

impl InnerArchive {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stream the member through the tar+gzip extractor into `dest`.
    pub fn extract_to(&mut self, dest: &Path) -> Result<ExtractReport, StoreError> {
        let member = self
            .archive
            .by_index(self.index)
            .map_err(|e| StoreError::ArtifactInvalid(format!("unreadable zip entry: {e}")))?;
        extract_tar_gz(member, dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;

    fn bundle_tar_gz() -> Vec<u8> {
        let enc = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::fast());
        let mut builder = tar::Builder::new(enc);
        let mut h = tar::Header::new_gnu();
        h.set_size(4);
        h.set_mode(0o644);
        h.set_cksum();
        builder.append_data(&mut h, "libcef.so", &b"\x7fELF"[..]).unwrap();
        builder.into_inner().unwrap().finish().unwrap()
    }

    fn write_zip(path: &Path, members: &[(&str, &[u8])]) {
        let mut zip = zip::ZipWriter::new(fs::File::create(path).unwrap());
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        for (name, data) in members {
            zip.start_file(*name, options).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn finds_and_extracts_member() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("download.zip.temp");
        let bundle = bundle_tar_gz();
        write_zip(
            &zip_path,
            &[
                ("README.md", b"readme"),
                ("linux-amd64.tar.gz", bundle.as_slice()),
            ],
        );
        let mut inner = open_inner_archive(&zip_path, INNER_ARCHIVE_SUFFIX).unwrap();
        assert_eq!(inner.name(), "linux-amd64.tar.gz");
        let out = dir.path().join("out");
        let report = inner.extract_to(&out).unwrap();
        assert_eq!(report.files, 1);
        assert_eq!(fs::read(out.join("libcef.so")).unwrap(), b"\x7fELF");
    }

    #[test]
    fn first_matching_member_wins() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("a.zip");
        let bundle = bundle_tar_gz();
        write_zip(
            &zip_path,
            &[("first.tar.gz", bundle.as_slice()), ("second.tar.gz", bundle.as_slice())],
        );
        let inner = open_inner_archive(&zip_path, INNER_ARCHIVE_SUFFIX).unwrap();
        assert_eq!(inner.name(), "first.tar.gz");
    }

    #[test]
    fn missing_member_is_invalid_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("a.zip");
        write_zip(&zip_path, &[("notes.txt", b"nothing here")]);
        let err = open_inner_archive(&zip_path, INNER_ARCHIVE_SUFFIX).unwrap_err();
        assert!(matches!(err, StoreError::ArtifactInvalid(_)));
    }

    #[test]
    fn non_zip_file_is_invalid_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("a.zip");
        fs::write(&zip_path, b"<html>404</html>").unwrap();
        let err = open_inner_archive(&zip_path, INNER_ARCHIVE_SUFFIX).unwrap_err();
        assert!(matches!(err, StoreError::ArtifactInvalid(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = open_inner_archive(&dir.path().join("nope.zip"), INNER_ARCHIVE_SUFFIX)
            .unwrap_err();
        assert!(matches!(err, StoreError::PathIo { .. }));
    }
}
