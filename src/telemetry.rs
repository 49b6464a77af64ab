use crate::config::AppConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Initializes the global tracing subscriber from config. `RUST_LOG` wins
/// over the configured level. Safe to call more than once (later calls are
/// no-ops), which keeps tests independent of init order.
pub fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    if config.log_format.eq_ignore_ascii_case("json") {
        let subscriber = Registry::default()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json());
        let _ = subscriber.try_init();
    } else {
        let subscriber = Registry::default()
            .with(filter)
            .with(tracing_subscriber::fmt::layer());
        let _ = subscriber.try_init();
    }
}
