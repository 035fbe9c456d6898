use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOCAL_POLICY: &str = "config/rapidtap.yaml";

/// Installs the global subscriber. `RUST_LOG` wins over `level`; logs go to
/// stderr so command output stays parseable.
pub fn init_logging(level: &str, debug: bool, json: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    }
    .context("Failed to install log subscriber")?;

    Ok(())
}

/// An explicit path always wins; otherwise `./config/rapidtap.yaml` is used
/// when present.
pub fn resolve_policy_paths(config: Option<&PathBuf>) -> Vec<PathBuf> {
    if let Some(path) = config {
        return vec![path.clone()];
    }
    let local = PathBuf::from(LOCAL_POLICY);
    if local.exists() {
        debug!(path = %local.display(), "using local policy file");
        vec![local]
    } else {
        Vec::new()
    }
}
