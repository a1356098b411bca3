mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "natpack",
    version,
    about = "Prepare native runtime bundles ahead of first use"
)]
struct Cli {
    /// Path to natpack.toml. Defaults to ./natpack.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Install the bundle if needed and verify it.
    Install {
        /// Install directory (overrides config).
        #[arg(long)]
        install_dir: Option<PathBuf>,
        /// Release tag to install (overrides build_meta.json).
        #[arg(long)]
        release_tag: Option<String>,
        /// Target platform, e.g. linux-arm64 (overrides detection).
        #[arg(long)]
        platform: Option<String>,
        /// Download mirror; repeat for fallbacks (overrides config).
        #[arg(long = "mirror")]
        mirrors: Vec<String>,
        /// Directory holding shipped bundles; repeatable.
        #[arg(long = "bundle-dir")]
        bundle_dirs: Vec<PathBuf>,
    },
    /// Report whether a complete install is present.
    Status {
        #[arg(long)]
        install_dir: Option<PathBuf>,
        #[arg(long)]
        release_tag: Option<String>,
    },
    /// Delete the install directory.
    Clean {
        #[arg(long)]
        install_dir: Option<PathBuf>,
    },
    /// Show the detected platform.
    Platform {
        /// List every platform with published bundles.
        #[arg(long, default_value_t = false)]
        list: bool,
    },
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("NATPACK_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let json_output = cli.json;
    let config_path = cli.config.as_deref();

    let result = match cli.command {
        Commands::Install {
            install_dir,
            release_tag,
            platform,
            mirrors,
            bundle_dirs,
        } => commands::install::run(
            config_path,
            &commands::install::InstallOptions {
                install_dir,
                release_tag,
                platform,
                mirrors,
                bundle_dirs,
            },
            json_output,
        ),
        Commands::Status {
            install_dir,
            release_tag,
        } => commands::status::run(
            config_path,
            install_dir.as_deref(),
            release_tag.as_deref(),
            json_output,
        ),
        Commands::Clean { install_dir } => {
            commands::clean::run(config_path, install_dir.as_deref(), json_output)
        }
        Commands::Platform { list } => commands::platform::run(list, json_output),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with("config error:") {
                commands::EXIT_CONFIG_ERROR
            } else {
                commands::EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}
