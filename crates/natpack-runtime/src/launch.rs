use natpack_schema::Platform;
use std::path::Path;
use tracing::warn;

/// Argument keys always derived from the install directory on macOS.
pub const RESERVED_MACOS_KEYS: &[&str] = &[
    "--framework-dir-path",
    "--main-bundle-path",
    "--browser-subprocess-path",
];

const FRAMEWORK_DIR: &str = "Chromium Embedded Framework.framework";
const HELPER_APP: &str = "jcef Helper.app";
const HELPER_BINARY: &str = "Contents/MacOS/jcef Helper";

/// Arguments the install location dictates for `platform`. Empty off macOS.
pub fn reserved_args(install_dir: &Path, platform: Platform) -> Vec<String> {
    if !platform.os.is_macos() {
        return Vec::new();
    }
    let helper = install_dir.join(HELPER_APP);
    vec![
        format!(
            "--framework-dir-path={}",
            install_dir.join(FRAMEWORK_DIR).display()
        ),
        format!("--main-bundle-path={}", helper.display()),
        format!(
            "--browser-subprocess-path={}",
            helper.join(HELPER_BINARY).display()
        ),
    ]
}

fn reserved_key(arg: &str) -> Option<&'static str> {
    RESERVED_MACOS_KEYS.iter().copied().find(|key| {
        arg.strip_prefix(key)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('='))
    })
}

/// Final argument list: reserved arguments first, then the caller's
/// arguments in their original order. On macOS caller-supplied values for
/// reserved keys are dropped.
pub fn plan_launch_args(install_dir: &Path, platform: Platform, user_args: &[String]) -> Vec<String> {
    let mut args = reserved_args(install_dir, platform);
    for arg in user_args {
        if platform.os.is_macos() {
            if let Some(key) = reserved_key(arg) {
                warn!("ignoring {key}: it is set from the install directory");
                continue;
            }
        }
        args.push(arg.clone());
    }
    args
}
