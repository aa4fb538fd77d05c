use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber.
///
/// Logs go to stderr so stdout only carries the progress lines. `RUST_LOG` is
/// honoured; otherwise the level is `warn`, or `debug` when `verbose` is set.
pub fn init(verbose: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let default_level = if verbose { Level::DEBUG } else { Level::WARN };
    let filter_layer = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env()?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .compact();

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
