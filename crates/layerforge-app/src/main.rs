//! Main application entry point.

use clap::Parser;
use layerforge_app::Cli;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Starting layerforge");

    if let Err(e) = layerforge_app::run(Cli::parse()) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
