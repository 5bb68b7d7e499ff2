use std::sync::Once;

use log::LevelFilter;

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info",
/// "virtgl_renderer=debug"). When unset, `RUST_LOG` is honoured and
/// `default_level` applies if that is unset too.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub default_level: LevelFilter,
    pub write_style: env_logger::WriteStyle,
    /// Prefix records with a timestamp. Off for hosts that add their own.
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            default_level: LevelFilter::Info,
            write_style: env_logger::WriteStyle::Auto,
            timestamps: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Filter {
    Spec(String),
    Level(LevelFilter),
}

fn resolve_filter(config: &LoggingConfig, rust_log: Option<String>) -> Filter {
    config
        .env_filter
        .clone()
        .or(rust_log)
        .filter(|spec| !spec.trim().is_empty())
        .map_or(Filter::Level(config.default_level), Filter::Spec)
}

static INIT: Once = Once::new();

/// Initializes the global logger once.
///
/// Idempotent; later calls are ignored. Does nothing if the host already
/// installed another `log` implementation.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        match resolve_filter(&config, std::env::var("RUST_LOG").ok()) {
            Filter::Spec(spec) => builder.parse_filters(&spec),
            Filter::Level(level) => builder.filter_level(level),
        };

        builder.write_style(config.write_style);
        if !config.timestamps {
            builder.format_timestamp(None);
        }

        if builder.try_init().is_ok() {
            log::debug!("logging initialized");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_filter_wins_over_environment() {
        let config = LoggingConfig {
            env_filter: Some("virtgl_renderer=debug".into()),
            ..LoggingConfig::default()
        };
        assert_eq!(
            resolve_filter(&config, Some("warn".into())),
            Filter::Spec("virtgl_renderer=debug".into())
        );
    }

    #[test]
    fn environment_then_default_level() {
        let config = LoggingConfig::default();
        assert_eq!(resolve_filter(&config, Some("warn".into())), Filter::Spec("warn".into()));
        assert_eq!(resolve_filter(&config, None), Filter::Level(LevelFilter::Info));
        assert_eq!(resolve_filter(&config, Some("  ".into())), Filter::Level(LevelFilter::Info));
    }

    #[test]
    fn init_is_idempotent() {
        init_logging(LoggingConfig::default());
        init_logging(LoggingConfig {
            default_level: LevelFilter::Trace,
            ..LoggingConfig::default()
        });
    }
}
