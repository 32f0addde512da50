use env_logger::{Builder, Env};
use log::LevelFilter;

/// Log to stderr with millisecond timestamps. `RUST_LOG` overrides `default`.
pub fn initialize_logger(default: LevelFilter) {
    Builder::from_env(Env::default().default_filter_or(default.as_str()))
        .format_timestamp_millis()
        .format_target(false)
        .init();
}
