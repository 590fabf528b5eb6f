//! Fixture seeder. Takes no flags; counts and value ranges are compile-time
//! constants in `medgate::seed`.

use anyhow::Result;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use medgate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load(Path::new("medgate.toml"))?;
    let (store, _identity) = medgate::init_backends(&config)?;

    medgate::seed::run(store.as_ref()).await
}
