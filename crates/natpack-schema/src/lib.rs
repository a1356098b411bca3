//! Platform identification, build descriptors, and configuration for natpack.
//!
//! This crate defines the schema layer: the `Platform` a native bundle is built
//! for (`Os` + `Arch`, detected from the running target), the `BuildInfo`
//! descriptor that names which bundle release to install (`build_meta.json`),
//! and the `natpack.toml` configuration file parsed into `ConfigFile`.

pub mod build_info;
pub mod config;
pub mod platform;

pub use build_info::{BuildInfo, BUILD_META_FILE};
pub use config::{
    parse_config_file, parse_config_str, ConfigFile, RemoteSection, DEFAULT_ARTIFACT,
    DEFAULT_INSTALL_DIR,
};
pub use platform::{Arch, Os, Platform, SUPPORTED_PLATFORMS};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("unsupported platform: os '{os}', arch '{arch}'")]
    UnsupportedPlatform { os: String, arch: String },
    #[error("unknown platform identifier: '{0}'")]
    UnknownPlatform(String),
    #[error("failed to read descriptor: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse build descriptor: {0}")]
    ParseJson(#[from] serde_json::Error),
    #[error("failed to parse config: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("invalid build descriptor: {0}")]
    InvalidBuildInfo(String),
}
