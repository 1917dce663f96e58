//! Console logging for the CLI.
//!
//! Level comes from `RUST_LOG`, else the config's `[logging] level`. Output
//! goes to stderr so stdout stays machine-readable.

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn init_logging(config_level: &str) -> Result<()> {
    let level = std::env::var("RUST_LOG").unwrap_or_else(|_| config_level.to_string());
    let filter = EnvFilter::try_new(&level)
        .map_err(|e| anyhow!("invalid log filter '{level}': {e}"))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| anyhow!("failed to initialise logging: {e}"))?;

    Ok(())
}
