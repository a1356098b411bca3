use crate::{BuildInfo, Platform, SchemaError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Install directory used when neither the config nor the caller names one.
pub const DEFAULT_INSTALL_DIR: &str = "natpack-bundle";

/// Artifact name of the published native bundles.
pub const DEFAULT_ARTIFACT: &str = "jcef-natives";

/// Parsed `natpack.toml`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default = "default_install_dir")]
    pub install_dir: PathBuf,
    /// Extra runtime arguments, passed through in order. May contain spaces.
    #[serde(default)]
    pub args: Vec<String>,
    /// Path of the build descriptor, relative to the config file.
    #[serde(default)]
    pub build_meta: Option<PathBuf>,
    /// Inline release tag, used when no descriptor file is given.
    #[serde(default)]
    pub release_tag: Option<String>,
    /// Platform override, e.g. `linux-arm64`. Detected when absent.
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub remote: RemoteSection,
    /// Opaque runtime settings handed to the initializer unchanged.
    #[serde(default)]
    pub settings: toml::Table,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RemoteSection {
    #[serde(default)]
    pub mirrors: Vec<String>,
    #[serde(default)]
    pub artifact: Option<String>,
    #[serde(default)]
    pub url_template: Option<String>,
    #[serde(default)]
    pub auth_token: Option<String>,
}

fn default_install_dir() -> PathBuf {
    PathBuf::from(DEFAULT_INSTALL_DIR)
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            install_dir: default_install_dir(),
            args: Vec::new(),
            build_meta: None,
            release_tag: None,
            platform: None,
            remote: RemoteSection::default(),
            settings: toml::Table::new(),
        }
    }
}

impl ConfigFile {
    pub fn artifact(&self) -> &str {
        self.remote.artifact.as_deref().unwrap_or(DEFAULT_ARTIFACT)
    }

    /// Resolve the build descriptor: a descriptor file wins over an inline tag.
    /// Relative paths are taken relative to `base_dir`.
    pub fn build_info(&self, base_dir: &Path) -> Result<BuildInfo, SchemaError> {
        if let Some(ref meta) = self.build_meta {
            return BuildInfo::load(&base_dir.join(meta));
        }
        match self.release_tag {
            Some(ref tag) => {
                let info = BuildInfo::new(tag);
                info.validate()?;
                Ok(info)
            }
            None => BuildInfo::load(&base_dir.join(crate::BUILD_META_FILE)),
        }
    }

    pub fn platform(&self) -> Result<Platform, SchemaError> {
        match self.platform {
            Some(ref id) => id.parse(),
            None => Platform::current(),
        }
    }

    /// Install directory resolved against `base_dir` when relative.
    pub fn install_dir(&self, base_dir: &Path) -> PathBuf {
        if self.install_dir.is_absolute() {
            self.install_dir.clone()
        } else {
            base_dir.join(&self.install_dir)
        }
    }
}

pub fn parse_config_str(input: &str) -> Result<ConfigFile, SchemaError> {
    Ok(toml::from_str(input)?)
}

pub fn parse_config_file(path: impl AsRef<Path>) -> Result<ConfigFile, SchemaError> {
    let content = fs::read_to_string(path)?;
    parse_config_str(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Arch, Os};

    #[test]
    fn parses_full_config() {
        let input = r#"
install_dir = "/opt/app/bundle"
args = ["--disable-gpu", "--lang=en US"]
release_tag = "r100"
platform = "linux-arm64"

[remote]
mirrors = ["https://mirror-a.example.com", "https://mirror-b.example.com"]
artifact = "jcef-natives"
auth_token = "secret"

[settings]
windowless_rendering_enabled = true
log_severity = "warning"
"#;
        let config = parse_config_str(input).expect("should parse");
        assert_eq!(config.install_dir, PathBuf::from("/opt/app/bundle"));
        assert_eq!(config.args, vec!["--disable-gpu", "--lang=en US"]);
        assert_eq!(config.remote.mirrors.len(), 2);
        assert_eq!(config.remote.auth_token.as_deref(), Some("secret"));
        assert_eq!(
            config.platform().unwrap(),
            Platform::new(Os::Linux, Arch::Arm64)
        );
        assert_eq!(
            config.settings.get("windowless_rendering_enabled"),
            Some(&toml::Value::Boolean(true))
        );
    }

    #[test]
    fn parses_empty_config_with_defaults() {
        let config = parse_config_str("").expect("should parse");
        assert_eq!(config, ConfigFile::default());
        assert_eq!(config.install_dir, PathBuf::from(DEFAULT_INSTALL_DIR));
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(parse_config_str("install_directory = \"x\"").is_err());
        assert!(parse_config_str("[remote]\nmirror = \"x\"").is_err());
    }

    #[test]
    fn settings_accept_arbitrary_keys() {
        let config = parse_config_str("[settings]\nanything_goes = 3\n[settings.nested]\nk = 1")
            .expect("should parse");
        assert!(config.settings.contains_key("anything_goes"));
        assert!(config.settings.contains_key("nested"));
    }

    #[test]
    fn inline_tag_resolves_build_info() {
        let config = parse_config_str("release_tag = \"r7\"").unwrap();
        let info = config.build_info(Path::new("/nonexistent")).unwrap();
        assert_eq!(info.release_tag, "r7");
    }

    #[test]
    fn descriptor_file_wins_over_inline_tag() {
        let dir = tempfile::tempdir().unwrap();
        BuildInfo::new("from-file").write_to_dir(dir.path()).unwrap();
        let config =
            parse_config_str("release_tag = \"inline\"\nbuild_meta = \"build_meta.json\"").unwrap();
        let info = config.build_info(dir.path()).unwrap();
        assert_eq!(info.release_tag, "from-file");
    }

    #[test]
    fn missing_descriptor_and_tag_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigFile::default();
        assert!(config.build_info(dir.path()).is_err());
    }

    #[test]
    fn relative_install_dir_resolves_against_base() {
        let config = ConfigFile::default();
        assert_eq!(
            config.install_dir(Path::new("/srv/app")),
            PathBuf::from("/srv/app").join(DEFAULT_INSTALL_DIR)
        );
    }
}
