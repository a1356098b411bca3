use super::{colorize_installed, json_pretty, load_config, EXIT_FAILURE, EXIT_SUCCESS};
use natpack_store::{check_installation, InstallLayout};
use std::path::Path;

/// Exits non-zero when the install is missing or stale, so scripts can
/// test for it.
pub fn run(
    config_path: Option<&Path>,
    install_dir: Option<&Path>,
    release_tag: Option<&str>,
    json: bool,
) -> Result<u8, String> {
    let loaded = load_config(config_path)?;
    let info = loaded.build_info(release_tag)?;
    let dir = loaded.install_dir(install_dir);
    let installed = check_installation(&dir, &info);
    let layout = InstallLayout::new(&dir);

    if json {
        let payload = serde_json::json!({
            "install_dir": dir,
            "release_tag": info.release_tag,
            "marker_present": layout.is_marked(),
            "installed": installed,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!(
            "{} ({}) at {}",
            colorize_installed(installed),
            info.release_tag,
            dir.display()
        );
    }
    Ok(if installed { EXIT_SUCCESS } else { EXIT_FAILURE })
}
