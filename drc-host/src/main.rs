//! DRC host: entry point.
//!
//! ```text
//! drc-host                      Run in the foreground
//! drc-host --config <path>      Load a custom config TOML
//! drc-host --gen-config         Write default config to stdout
//! drc-host --input-bind <addr>  Override the input listen address
//! ```

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::Ordering;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use drc_host::config::HostConfig;
use drc_host::service::InputMonitor;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "drc-host", about = "DRC gamepad host service")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "drc-host.toml")]
    config: PathBuf,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,

    /// Address to receive gamepad input on, overriding the config.
    #[arg(long)]
    input_bind: Option<String>,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&HostConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = HostConfig::load(&cli.config);
    if let Some(bind) = cli.input_bind {
        config.network.input_bind = bind;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    if config.logging.file.is_empty() {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    } else {
        let file = File::create(&config.logging.file)?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }

    info!("drc-host v{}", env!("CARGO_PKG_VERSION"));
    info!("input bind: {}", config.network.input_bind);
    info!("video dest: {}", config.network.video_dest);
    info!("command dest: {}", config.network.cmd_dest);

    let monitor = InputMonitor::new(config);
    let stop = monitor.stop_handle();

    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received, shutting down");
        stop.store(false, Ordering::SeqCst);
    });

    monitor.run().await?;

    Ok(())
}
