use tracing_subscriber::{EnvFilter, fmt};

use sessiongate::config::{self, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if config::has_flag(&args, "--help") || config::has_flag(&args, "-h") {
        println!("{}", config::USAGE);
        return Ok(());
    }

    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).init();

    let config = ServerConfig::from_env_and_args(&args)?;
    sessiongate::server::run(config).await
}
