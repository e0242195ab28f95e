use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use env_logger::Env;
use log::error;

mod assets;
mod checksum;
mod config;
mod extract;
mod github;
mod pipeline;
mod resolve;
mod runtime;
mod util;

#[derive(Parser, Debug)]
#[command(
    name = "temurin-fetch",
    author,
    version,
    about = "Resolve, download, verify and install an Eclipse Temurin JRE/JDK"
)]
struct Cli {
    /// Base data directory; the runtime lands in <data-dir>/runtime (overrides DATA_DIR).
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Requested version: "latest", a major number, "21.0.1+12" or "jdk-21.0.1+12" (overrides JRE_VERSION).
    #[arg(long)]
    request: Option<String>,

    /// Fail instead of warning when checksum verification is impossible or mismatching (overrides FORCE_SHA_CHECK).
    #[arg(long)]
    strict: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = config::Config::from_env();
    if let Some(data_dir) = cli.data_dir {
        config.runtime_root = data_dir.join("runtime");
    }
    if let Some(request) = cli.request {
        config.request = request.trim().to_owned();
    }
    if cli.strict {
        config.strict = true;
    }

    match pipeline::run(&config).await {
        Ok(outputs) => {
            // Only the shell assignments go to stdout; callers eval them.
            println!("INSTALLED_JRE={}", util::sh_quote(&outputs.installed_jre));
            println!("RUNTIME_NAME={}", util::sh_quote(&outputs.runtime_name));
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
