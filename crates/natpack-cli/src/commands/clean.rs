use super::{json_pretty, load_config, EXIT_SUCCESS};
use natpack_store::InstallLayout;
use std::path::Path;

pub fn run(config_path: Option<&Path>, install_dir: Option<&Path>, json: bool) -> Result<u8, String> {
    let loaded = load_config(config_path)?;
    let dir = loaded.install_dir(install_dir);
    let removed = InstallLayout::new(&dir)
        .remove()
        .map_err(|e| format!("failed to remove {}: {e}", dir.display()))?;

    if json {
        let payload = serde_json::json!({
            "install_dir": dir,
            "removed": removed,
        });
        println!("{}", json_pretty(&payload)?);
    } else if removed {
        println!("removed {}", dir.display());
    } else {
        println!("nothing to remove at {}", dir.display());
    }
    Ok(EXIT_SUCCESS)
}
