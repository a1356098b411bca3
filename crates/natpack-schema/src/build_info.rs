use crate::SchemaError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// File name of the build descriptor, both next to the caller and inside an install.
pub const BUILD_META_FILE: &str = "build_meta.json";

/// Identifies one published release of the native bundle.
///
/// The caller ships a `build_meta.json` naming the release it was built
/// against; the same descriptor is written into the install directory so a
/// later run can tell whether the installed bundle matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInfo {
    pub release_tag: String,
    #[serde(default)]
    pub release_url: Option<String>,
    #[serde(default)]
    pub runtime_version: Option<String>,
}

impl BuildInfo {
    pub fn new(release_tag: &str) -> Self {
        Self {
            release_tag: release_tag.to_owned(),
            release_url: None,
            runtime_version: None,
        }
    }

    pub fn from_json_str(input: &str) -> Result<Self, SchemaError> {
        let info: Self = serde_json::from_str(input)?;
        info.validate()?;
        Ok(info)
    }

    pub fn load(path: &Path) -> Result<Self, SchemaError> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        let tag = self.release_tag.trim();
        if tag.is_empty() {
            return Err(SchemaError::InvalidBuildInfo(
                "release_tag must not be empty".to_owned(),
            ));
        }
        // The tag is spliced into URLs and file names.
        if tag.contains(['/', '\\']) || tag == ".." {
            return Err(SchemaError::InvalidBuildInfo(format!(
                "release_tag contains a path separator: '{tag}'"
            )));
        }
        Ok(())
    }

    /// Write the descriptor atomically into `dir/build_meta.json`.
    pub fn write_to_dir(&self, dir: &Path) -> Result<(), SchemaError> {
        let content = serde_json::to_string_pretty(self)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(dir.join(BUILD_META_FILE))
            .map_err(|e| SchemaError::Io(e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_descriptor() {
        let info = BuildInfo::from_json_str(
            r#"{
                "release_tag": "jcef-1770317+cef-122.1.10",
                "release_url": "https://example.com/releases/1770317",
                "runtime_version": "122.1.10"
            }"#,
        )
        .unwrap();
        assert_eq!(info.release_tag, "jcef-1770317+cef-122.1.10");
        assert_eq!(info.runtime_version.as_deref(), Some("122.1.10"));
    }

    #[test]
    fn optional_fields_default_to_none() {
        let info = BuildInfo::from_json_str(r#"{"release_tag": "r1"}"#).unwrap();
        assert!(info.release_url.is_none());
        assert!(info.runtime_version.is_none());
    }

    #[test]
    fn rejects_empty_tag() {
        assert!(BuildInfo::from_json_str(r#"{"release_tag": "  "}"#).is_err());
    }

    #[test]
    fn rejects_tag_with_separator() {
        assert!(BuildInfo::from_json_str(r#"{"release_tag": "../etc"}"#).is_err());
    }

    #[test]
    fn rejects_malformed_json() {
        let err = BuildInfo::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, SchemaError::ParseJson(_)));
    }

    #[test]
    fn write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let info = BuildInfo::new("r42");
        info.write_to_dir(dir.path()).unwrap();
        let loaded = BuildInfo::load(&dir.path().join(BUILD_META_FILE)).unwrap();
        assert_eq!(loaded, info);
    }
}
