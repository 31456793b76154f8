use std::sync::Once;

/// Logger setup. `env_filter` uses the `env_logger` filter syntax, e.g. "debug" or
/// "tiny_shadow_renderer::model=warn". When it's None `RUST_LOG` is used, then `info`.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        return Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
        };
    }
}

static INIT: Once = Once::new();

/// Installs the global logger. Only the first call has any effect.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();
        match config.env_filter {
            Some(filter) => { builder.parse_filters(&filter); }
            None => match std::env::var("RUST_LOG") {
                Ok(filter) => { builder.parse_filters(&filter); }
                Err(_) => { builder.filter_level(log::LevelFilter::Info); }
            },
        }
        builder.write_style(config.write_style);
        builder.init();
        log::debug!("Logging initialized");
    });
}
