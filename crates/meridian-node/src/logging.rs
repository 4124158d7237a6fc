//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber.
///
/// `RUST_LOG` directives are honoured; `level` applies to the `meridian`
/// crates. Returns `false` if a global subscriber was already installed.
pub fn init(level: &str) -> anyhow::Result<bool> {
    let filter = EnvFilter::from_default_env().add_directive(format!("meridian={level}").parse()?);
    Ok(tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok())
}
