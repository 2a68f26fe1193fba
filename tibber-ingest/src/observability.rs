use tracing_subscriber::{filter::LevelFilter, EnvFilter};

use crate::config::{parse_level, ConfigError, LogFormat, LoggingConfig};

/// Install the global fmt subscriber. `RUST_LOG` takes precedence over the
/// configured level when it is set.
pub fn init_tracing(cfg: &LoggingConfig) -> Result<(), ConfigError> {
    let level = parse_level(&cfg.level)?;
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    match cfg.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
    Ok(())
}
