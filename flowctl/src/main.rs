//! flowctl entry point.
//!
//! ```text
//! flowctl [--config <path>] [--host H] [--port P] <command>
//! flowctl --gen-config           Write default config to stdout
//! flowctl start 1233 -i 5
//! flowctl add-tunnels 1233 --tunnel 1:1001:10.0.0.1:192.168.1.1
//! flowctl send request.json
//! flowctl listen tcp://10.0.0.5:5557
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use flowctl::commands::{self, Command};
use flowctl::config::FlowctlConfig;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "flowctl", version, about = "Flow and tunnel management client")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "flowctl.toml")]
    config: PathBuf,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,

    /// Service host, overriding the config file.
    #[arg(long)]
    host: Option<String>,

    /// Service port, overriding the config file.
    #[arg(long)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Command>,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        return match toml::to_string_pretty(&FlowctlConfig::default()) {
            Ok(text) => {
                println!("{text}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: {e}");
                ExitCode::FAILURE
            }
        };
    }

    let Some(command) = cli.command else {
        eprintln!("error: no command given, see --help");
        return ExitCode::from(2);
    };

    // Load config.
    let config = FlowctlConfig::load(&cli.config).with_overrides(cli.host, cli.port);

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!("flowctl v{}", env!("CARGO_PKG_VERSION"));
    debug!("service endpoint: {}", config.network.endpoint());

    match commands::run(command, &config).await {
        Ok(value) => {
            match serde_json::to_string_pretty(&value) {
                Ok(text) => println!("{text}"),
                Err(e) => println!("{value} ({e})"),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
