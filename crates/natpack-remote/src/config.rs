use crate::RemoteError;
use natpack_schema::{BuildInfo, Platform, RemoteSection, DEFAULT_ARTIFACT};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_MIRROR: &str = "https://repo.maven.apache.org/maven2/me/friwi";

/// Maven repository layout; the artifact is a zip (jar) holding the bundle.
pub const DEFAULT_URL_TEMPLATE: &str =
    "{mirror}/{artifact}-{platform}/{tag}/{artifact}-{platform}-{tag}.jar";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Tried in order until one serves the artifact.
    #[serde(default = "default_mirrors")]
    pub mirrors: Vec<String>,
    #[serde(default = "default_artifact")]
    pub artifact: String,
    /// Placeholders: `{mirror}`, `{artifact}`, `{platform}`, `{tag}`.
    #[serde(default = "default_url_template")]
    pub url_template: String,
    #[serde(default)]
    pub auth_token: Option<String>,
}

fn default_mirrors() -> Vec<String> {
    vec![DEFAULT_MIRROR.to_owned()]
}

fn default_artifact() -> String {
    DEFAULT_ARTIFACT.to_owned()
}

fn default_url_template() -> String {
    DEFAULT_URL_TEMPLATE.to_owned()
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            mirrors: default_mirrors(),
            artifact: default_artifact(),
            url_template: default_url_template(),
            auth_token: None,
        }
    }
}

impl RemoteConfig {
    /// Config with a single mirror and default naming.
    pub fn new(mirror: &str) -> Self {
        Self {
            mirrors: vec![mirror.trim_end_matches('/').to_owned()],
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_mirror(mut self, mirror: &str) -> Self {
        self.mirrors.push(mirror.trim_end_matches('/').to_owned());
        self
    }

    #[must_use]
    pub fn with_token(mut self, token: &str) -> Self {
        self.auth_token = Some(token.to_owned());
        self
    }

    #[must_use]
    pub fn with_url_template(mut self, template: &str) -> Self {
        self.url_template = template.to_owned();
        self
    }

    /// Build from the `[remote]` table of `natpack.toml`; absent keys keep
    /// their defaults.
    pub fn from_section(section: &RemoteSection) -> Self {
        let mut config = Self::default();
        if !section.mirrors.is_empty() {
            config.mirrors = section
                .mirrors
                .iter()
                .map(|m| m.trim_end_matches('/').to_owned())
                .collect();
        }
        if let Some(ref artifact) = section.artifact {
            config.artifact.clone_from(artifact);
        }
        if let Some(ref template) = section.url_template {
            config.url_template.clone_from(template);
        }
        config.auth_token.clone_from(&section.auth_token);
        config
    }

    pub fn load(path: &Path) -> Result<Self, RemoteError> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| RemoteError::Config(format!("invalid remote config: {e}")))
    }

    pub fn save(&self, path: &Path) -> Result<(), RemoteError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| RemoteError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn artifact_url(&self, mirror: &str, info: &BuildInfo, platform: Platform) -> String {
        self.url_template
            .replace("{mirror}", mirror.trim_end_matches('/'))
            .replace("{artifact}", &self.artifact)
            .replace("{platform}", &platform.identifier())
            .replace("{tag}", &info.release_tag)
    }
}
