use std::path::PathBuf;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use keyboard_teleop::config::TeleopConfig;

/// Drive a robot with the arrow keys
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// JSON descriptor with the topic name and scale factors
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .with_writer(std::io::stderr)
        .init();

    // Config faults exit before the terminal is touched
    let config = match TeleopConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to parse file [{}]: {}", cli.config.display(), e);
            std::process::exit(2);
        }
    };

    if let Err(e) = keyboard_teleop::teleop::run(config).await {
        error!("Teleop error: {}", e);
        eprintln!("Teleop error: {}", e);
        std::process::exit(e.exit_code());
    }

    // An abandoned console read would otherwise hold up runtime shutdown
    std::process::exit(0);
}
