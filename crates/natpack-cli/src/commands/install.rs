use super::{
    bar_style_for, exit_code_for, json_pretty, load_config, spin_fail, spin_ok, stage_bar,
    EXIT_SUCCESS, EXIT_UNSUPPORTED_PLATFORM,
};
use natpack_core::{BuildConfig, Estimate, LogProgress, Orchestrator, ProgressStage};
use natpack_remote::{HttpFetcher, RemoteConfig};
use natpack_runtime::{ProbeHandle, ProbeInitializer};
use natpack_schema::Platform;
use natpack_store::LocalBundleLocator;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Command-line overrides for `natpack install`.
#[derive(Debug, Default)]
pub struct InstallOptions {
    pub install_dir: Option<PathBuf>,
    pub release_tag: Option<String>,
    pub platform: Option<String>,
    pub mirrors: Vec<String>,
    pub bundle_dirs: Vec<PathBuf>,
}

pub fn run(config_path: Option<&Path>, options: &InstallOptions, json: bool) -> Result<u8, String> {
    let loaded = load_config(config_path)?;
    let info = loaded.build_info(options.release_tag.as_deref())?;
    let install_dir = loaded.install_dir(options.install_dir.as_deref());

    let platform = match options.platform {
        Some(ref id) => id.parse::<Platform>(),
        None => loaded.file.platform(),
    };
    let platform = match platform {
        Ok(p) => p,
        Err(e) => {
            report_failure("unsupported_platform", &e.to_string(), json)?;
            return Ok(EXIT_UNSUPPORTED_PLATFORM);
        }
    };

    let mut remote = RemoteConfig::from_section(&loaded.file.remote);
    if !options.mirrors.is_empty() {
        remote.mirrors = options
            .mirrors
            .iter()
            .map(|m| m.trim_end_matches('/').to_owned())
            .collect();
    }
    debug!(
        "installing {} for {platform} into {} (mirrors: {})",
        info.release_tag,
        install_dir.display(),
        remote.mirrors.join(", ")
    );
    let artifact = remote.artifact.clone();
    let locator = if options.bundle_dirs.is_empty() {
        LocalBundleLocator::beside_executable(&artifact)
    } else {
        LocalBundleLocator::new(options.bundle_dirs.clone(), &artifact)
    };

    let config = BuildConfig::with_settings(loaded.file.settings.clone())
        .install_dir(&install_dir)
        .args(loaded.file.args.iter().cloned());

    let initializer = ProbeInitializer::<toml::Table>::new();
    let orchestrator = Orchestrator::for_platform(config, info, initializer, platform)
        .with_locator(locator)
        .with_fetcher(HttpFetcher::new(remote));

    let pb = if json {
        None
    } else {
        Some(stage_bar())
    };
    let orchestrator = match pb {
        Some(ref pb) => {
            let bar = pb.clone();
            let showing_fraction = AtomicBool::new(false);
            orchestrator.with_progress(move |stage: ProgressStage, estimate: Estimate| {
                bar.set_message(stage.to_string());
                match estimate {
                    Estimate::Fraction(f) if stage == ProgressStage::Downloading => {
                        if !showing_fraction.swap(true, Ordering::Relaxed) {
                            bar.set_style(bar_style_for(true));
                        }
                        bar.set_position((f * 100.0) as u64);
                    }
                    _ => {
                        if showing_fraction.swap(false, Ordering::Relaxed) {
                            bar.set_style(bar_style_for(false));
                        }
                    }
                }
            })
        }
        None => orchestrator.with_progress(LogProgress::new()),
    };

    match orchestrator.build() {
        Ok(handle) => {
            if let Some(ref pb) = pb {
                spin_ok(pb, "bundle ready");
            }
            print_handle(handle, json)?;
            Ok(EXIT_SUCCESS)
        }
        Err(e) => {
            if let Some(ref pb) = pb {
                spin_fail(pb, "install failed");
            }
            let kind = e.kind();
            report_failure(kind.as_str(), &e.to_string(), json)?;
            Ok(exit_code_for(kind))
        }
    }
}

fn print_handle(handle: &ProbeHandle, json: bool) -> Result<(), String> {
    if json {
        let payload = serde_json::json!({
            "status": "installed",
            "bundle": handle,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("install_dir: {}", handle.install_dir.display());
        println!("platform:    {}", handle.platform);
        if let Some(ref tag) = handle.release_tag {
            println!("release:     {tag}");
        }
        if let Some(ref version) = handle.runtime_version {
            println!("runtime:     {version}");
        }
        println!("files:       {} ({} bytes)", handle.files, handle.bytes);
        if !handle.args.is_empty() {
            println!("args:        {}", handle.args.join(" "));
        }
    }
    Ok(())
}

fn report_failure(kind: &str, message: &str, json: bool) -> Result<(), String> {
    if json {
        let payload = serde_json::json!({
            "status": "failed",
            "kind": kind,
            "error": message,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        eprintln!("error ({kind}): {message}");
    }
    Ok(())
}
