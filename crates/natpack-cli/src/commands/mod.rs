pub mod clean;
pub mod completions;
pub mod install;
pub mod platform;
pub mod status;

use indicatif::{ProgressBar, ProgressStyle};
use natpack_core::ErrorKind;
use natpack_schema::{parse_config_file, BuildInfo, ConfigFile};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_CONFIG_ERROR: u8 = 2;
pub const EXIT_UNSUPPORTED_PLATFORM: u8 = 3;
pub const EXIT_IO_ERROR: u8 = 4;
pub const EXIT_ARTIFACT_INVALID: u8 = 5;
pub const EXIT_EXTRACTION_ERROR: u8 = 6;
pub const EXIT_INIT_ERROR: u8 = 7;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "natpack.toml";

pub fn exit_code_for(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::UnsupportedPlatform => EXIT_UNSUPPORTED_PLATFORM,
        ErrorKind::Io => EXIT_IO_ERROR,
        ErrorKind::DownloadedArtifactInvalid => EXIT_ARTIFACT_INVALID,
        ErrorKind::Extraction => EXIT_EXTRACTION_ERROR,
        ErrorKind::Initialization => EXIT_INIT_ERROR,
        ErrorKind::InterruptedWait | ErrorKind::Internal => EXIT_FAILURE,
    }
}

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Bar that switches between a spinner and a percentage as estimates arrive.
pub fn stage_bar() -> ProgressBar {
    let pb = spinner("locating");
    pb.set_length(100);
    pb
}

pub fn bar_style_for(fraction_known: bool) -> ProgressStyle {
    if fraction_known {
        ProgressStyle::with_template("{spinner:.cyan} {msg:<12} [{bar:30.cyan/blue}] {pos:>3}%")
            .expect("valid template")
            .progress_chars("=> ")
    } else {
        ProgressStyle::with_template("{spinner:.cyan} {msg}").expect("valid template")
    }
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✗ {msg}"));
}

pub fn colorize_installed(installed: bool) -> String {
    use console::Style;
    if installed {
        Style::new().green().apply_to("installed").to_string()
    } else {
        Style::new().yellow().apply_to("not installed").to_string()
    }
}

/// `natpack.toml` together with the directory relative paths resolve against.
#[derive(Debug)]
pub struct LoadedConfig {
    pub file: ConfigFile,
    pub base_dir: PathBuf,
}

impl LoadedConfig {
    /// Install directory: the command-line value wins, then the config.
    pub fn install_dir(&self, cli_value: Option<&Path>) -> PathBuf {
        match cli_value {
            Some(dir) => dir.to_path_buf(),
            None => self.file.install_dir(&self.base_dir),
        }
    }

    /// Build descriptor: `--release-tag` wins over the config.
    pub fn build_info(&self, release_tag: Option<&str>) -> Result<BuildInfo, String> {
        if let Some(tag) = release_tag {
            let info = BuildInfo::new(tag);
            info.validate().map_err(|e| format!("config error: {e}"))?;
            return Ok(info);
        }
        self.file
            .build_info(&self.base_dir)
            .map_err(|e| format!("config error: cannot resolve build descriptor: {e}"))
    }
}

/// Load `natpack.toml`. An explicit path must exist; the default one is
/// optional and falls back to built-in defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig, String> {
    let (path, required) = match explicit {
        Some(p) => (p.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };
    let base_dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if !path.exists() {
        if required {
            return Err(format!("config error: {} not found", path.display()));
        }
        return Ok(LoadedConfig {
            file: ConfigFile::default(),
            base_dir,
        });
    }
    let file =
        parse_config_file(&path).map_err(|e| format!("config error: {}: {e}", path.display()))?;
    Ok(LoadedConfig { file, base_dir })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_pretty_serializes_object() {
        let val = serde_json::json!({"key": "value"});
        let result = json_pretty(&val).unwrap();
        assert!(result.contains("\"key\""));
        assert!(result.contains("\"value\""));
    }

    #[test]
    fn every_error_kind_has_a_distinct_nonzero_code() {
        let kinds = [
            ErrorKind::UnsupportedPlatform,
            ErrorKind::Io,
            ErrorKind::DownloadedArtifactInvalid,
            ErrorKind::Extraction,
            ErrorKind::Initialization,
        ];
        let mut codes: Vec<u8> = kinds.iter().map(|k| exit_code_for(*k)).collect();
        assert!(codes.iter().all(|c| *c != EXIT_SUCCESS));
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(err.starts_with("config error:"));
    }

    #[test]
    fn config_relative_paths_resolve_against_its_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("natpack.toml");
        std::fs::write(&path, "install_dir = \"bundle\"\nrelease_tag = \"r9\"\n").unwrap();
        let loaded = load_config(Some(&path)).unwrap();
        assert_eq!(loaded.install_dir(None), dir.path().join("bundle"));
        assert_eq!(
            loaded.install_dir(Some(Path::new("/elsewhere"))),
            PathBuf::from("/elsewhere")
        );
        assert_eq!(loaded.build_info(None).unwrap().release_tag, "r9");
        assert_eq!(loaded.build_info(Some("r10")).unwrap().release_tag, "r10");
    }

    #[test]
    fn invalid_release_tag_override_is_a_config_error() {
        let loaded = LoadedConfig {
            file: ConfigFile::default(),
            base_dir: PathBuf::from("."),
        };
        let err = loaded.build_info(Some("a/b")).unwrap_err();
        assert!(err.starts_with("config error:"));
    }

    #[test]
    fn colorize_installed_keeps_text() {
        assert!(colorize_installed(true).contains("installed"));
        assert!(colorize_installed(false).contains("not installed"));
    }
}
