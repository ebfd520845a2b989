use anyhow::Result;
use devguide_logging::init_logging;
use devguide_server::{serve_stdio, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load()?;
    init_logging(&config.logging.level, config.logging.json)?;

    serve_stdio(config).await
}
