use std::sync::Once;

use crate::config::AppConfig;

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info",
/// "glide_core=debug,axum=warn"). `RUST_LOG`, when set, takes precedence.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    /// Level used when no filter is given at all.
    pub default_level: log::LevelFilter,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            default_level: log::LevelFilter::Info,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

impl LoggingConfig {
    /// Debug builds of an app log at `debug` unless a filter says otherwise.
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            env_filter: config.log_filter.clone(),
            default_level: if config.debug { log::LevelFilter::Debug } else { log::LevelFilter::Info },
            ..Self::default()
        }
    }

    fn filter(&self) -> Option<String> {
        std::env::var("RUST_LOG").ok().filter(|f| !f.trim().is_empty()).or_else(|| self.env_filter.clone())
    }
}

static INIT: Once = Once::new();

/// Initializes the global logger once. Later calls are ignored, as is a
/// logger installed by someone else first.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        match config.filter() {
            Some(filter) => {
                builder.parse_filters(&filter);
            }
            None => {
                builder.filter_level(config.default_level);
            }
        }
        builder.write_style(config.write_style);

        if builder.try_init().is_ok() {
            log::debug!("logging initialized");
        }
    });
}
