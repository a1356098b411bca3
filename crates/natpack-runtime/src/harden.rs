use crate::RuntimeError;
use natpack_schema::Os;
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// OS-specific fixups applied to a freshly extracted bundle, before the
/// install marker is written.
pub trait PlatformHardener: Send + Sync {
    fn name(&self) -> &str;

    fn harden(&self, install_dir: &Path) -> Result<(), RuntimeError>;
}

/// Nothing to do (Linux, Windows).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHardener;

impl PlatformHardener for NoopHardener {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn harden(&self, _install_dir: &Path) -> Result<(), RuntimeError> {
        Ok(())
    }
}

/// Strips the download quarantine attribute recursively (macOS), which
/// would otherwise stop the helper binaries from launching.
#[derive(Debug, Clone)]
pub struct QuarantineHardener {
    program: String,
}

pub const QUARANTINE_ATTRIBUTE: &str = "com.apple.quarantine";

impl Default for QuarantineHardener {
    fn default() -> Self {
        Self {
            program: "xattr".to_owned(),
        }
    }
}

impl QuarantineHardener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different executable in place of `xattr`.
    pub fn with_program(program: &str) -> Self {
        Self {
            program: program.to_owned(),
        }
    }

    pub fn command(&self, install_dir: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(["-r", "-d", QUARANTINE_ATTRIBUTE]).arg(install_dir);
        cmd
    }
}

impl PlatformHardener for QuarantineHardener {
    fn name(&self) -> &'static str {
        "quarantine"
    }

    fn harden(&self, install_dir: &Path) -> Result<(), RuntimeError> {
        debug!("removing {QUARANTINE_ATTRIBUTE} from {}", install_dir.display());
        let output = self
            .command(install_dir)
            .output()
            .map_err(|e| RuntimeError::HardeningFailed(format!("{}: {e}", self.program)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RuntimeError::HardeningFailed(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

pub fn select_hardener(os: Os) -> Box<dyn PlatformHardener> {
    match os {
        Os::MacOs => Box::new(QuarantineHardener::new()),
        Os::Linux | Os::Windows => Box::new(NoopHardener),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_by_os() {
        assert_eq!(select_hardener(Os::MacOs).name(), "quarantine");
        assert_eq!(select_hardener(Os::Linux).name(), "noop");
        assert_eq!(select_hardener(Os::Windows).name(), "noop");
    }

    #[test]
    fn noop_always_succeeds() {
        assert!(NoopHardener.harden(Path::new("/nonexistent")).is_ok());
    }

    #[test]
    fn quarantine_command_shape() {
        let cmd = QuarantineHardener::new().command(Path::new("/Apps/bundle"));
        assert_eq!(cmd.get_program(), "xattr");
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, ["-r", "-d", "com.apple.quarantine", "/Apps/bundle"]);
    }

    #[cfg(unix)]
    #[test]
    fn quarantine_reports_nonzero_exit() {
        let err = QuarantineHardener::with_program("false")
            .harden(Path::new("/tmp"))
            .unwrap_err();
        assert!(matches!(err, RuntimeError::HardeningFailed(_)));
    }

    #[cfg(unix)]
    #[test]
    fn quarantine_succeeds_when_program_does() {
        assert!(QuarantineHardener::with_program("true")
            .harden(Path::new("/tmp"))
            .is_ok());
    }

    #[test]
    fn missing_program_is_hardening_failure() {
        let err = QuarantineHardener::with_program("natpack-no-such-binary")
            .harden(Path::new("/tmp"))
            .unwrap_err();
        assert!(matches!(err, RuntimeError::HardeningFailed(_)));
    }
}
