#![cfg(not(tarpaulin_include))]

use tablesnap::Config;
use tablesnap::app;

/// Main entry point for the extraction server
///
/// Reads its settings from the environment (see `tablesnap::config`) and
/// serves the extraction and export endpoints until killed.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env();
    app::run(config).await
}
