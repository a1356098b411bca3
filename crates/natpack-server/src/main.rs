use clap::Parser;
use natpack_server::Mirror;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "natpack-server", about = "Reference mirror for natpack bundle artifacts")]
struct Cli {
    /// Port to listen on.
    #[arg(long, default_value_t = 8322)]
    port: u16,

    /// Directory whose files are served.
    #[arg(long, default_value = "./natpack-mirror-data")]
    data_dir: PathBuf,

    /// Require this bearer token on artifact requests.
    #[arg(long)]
    auth_token: Option<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("NATPACK_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = fs::create_dir_all(&cli.data_dir) {
        error!("cannot create {}: {e}", cli.data_dir.display());
        return ExitCode::FAILURE;
    }

    let addr = format!("0.0.0.0:{}", cli.port);
    info!("starting natpack-server on {addr}");
    info!("data directory: {}", cli.data_dir.display());

    let mut mirror = Mirror::new(cli.data_dir);
    if let Some(ref token) = cli.auth_token {
        mirror = mirror.with_auth_token(token);
    }
    match natpack_server::run_server(&Arc::new(mirror), &addr) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("server failed: {e}");
            ExitCode::FAILURE
        }
    }
}
