//! Diagnostics setup for hosts that do not install their own subscriber.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingSettings;

/// Install a fmt subscriber. `RUST_LOG` wins over `default_filter`.
///
/// Returns `false` if a global subscriber was already set, in which case the
/// existing one keeps receiving events.
pub fn init(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}

pub fn init_from_settings(settings: &LoggingSettings) -> bool {
    init(&settings.filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_harmless() {
        init("debug");
        assert!(!init("info"));
        assert!(!init_from_settings(&LoggingSettings::default()));
    }
}
