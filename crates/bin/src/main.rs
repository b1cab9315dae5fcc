//! Tankfleet - runs a team of autonomous tanks against an arena server.

use anyhow::Context;
use clap::Parser;
use fleet::{Config, Fleet};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tankfleet", version)]
#[command(about = "Run a team of autonomous tanks against a tank arena server")]
struct Args {
    /// Log at debug level
    #[arg(short, long)]
    debug: bool,

    /// Game server host (default 127.0.0.1)
    #[arg(short = 'H', long)]
    hostname: Option<String>,

    /// Game server port (default 8052)
    #[arg(short, long)]
    port: Option<u16>,

    /// Team name; tanks are named `<name>:<index>`
    #[arg(short, long)]
    name: Option<String>,

    /// Number of tanks to run
    #[arg(short, long)]
    tanks: Option<usize>,

    /// Config file (default ./tankfleet.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Args {
    /// Command line values take precedence over the config file.
    fn apply(self, config: &mut Config) {
        if let Some(host) = self.hostname {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(name) = self.name {
            config.team.name = name;
        }
        if let Some(tanks) = self.tanks {
            config.team.size = tanks;
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_filter = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_thread_names(true)
        .init();

    info!("Tankfleet v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load(args.config.as_deref()).context("failed to load config")?;
    args.apply(&mut config);
    config.validate().context("invalid configuration")?;

    info!("  Server: {}:{}", config.server.host, config.server.port);
    info!("  Team: {} x{}", config.team.name, config.team.size);

    let fleet = Fleet::launch(&config)?;
    let stop = fleet.stop_handle();
    ctrlc::set_handler(move || {
        if stop.stop() {
            info!("Stopping; agents exit after their next message (Ctrl-C again to quit now)");
        } else {
            std::process::exit(130);
        }
    })
    .context("failed to install Ctrl-C handler")?;

    fleet.wait()?;
    info!("All agents stopped");
    Ok(())
}
