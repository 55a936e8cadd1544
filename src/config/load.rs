use std::{env, path::PathBuf};

use tracing::warn;

use super::schema::Settings;

/// Configuration loading helpers.
///
/// `Settings::load` tries environment variables first (prefix `PLAYLOG__`), then an
/// optional config file and falls back to struct defaults.
impl Settings {
    /// Load settings from environment and optional config file.
    pub fn load() -> Result<Self, ::config::ConfigError> {
        let config_path = resolve_config_path();

        let mut builder = ::config::Config::builder();

        if let Some(path) = &config_path {
            builder = builder.add_source(::config::File::from(path.as_path()).required(false));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("PLAYLOG")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build()?;
        let settings: Settings = cfg.try_deserialize()?;
        Ok(settings)
    }

    /// Parse settings from TOML text supplied by the host.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Load settings, falling back to defaults when the config is missing,
    /// unreadable or invalid. The monitor must always be able to start.
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(s) => {
                if let Err(msg) = s.validate() {
                    warn!("playlog: invalid config, using defaults: {msg}");
                    Self::default()
                } else {
                    s
                }
            }
            Err(e) => {
                warn!("playlog: failed to load config, using defaults: {e}");
                Self::default()
            }
        }
    }

    /// Perform basic validation checks on loaded settings.
    pub fn validate(&self) -> Result<(), String> {
        let m = &self.monitor;
        if m.poll_interval_ms == 0 {
            return Err("monitor.poll_interval_ms must be >= 1".to_string());
        }
        if m.repeat_high_percent > 100 || m.repeat_low_percent > 100 {
            return Err("monitor.repeat_*_percent must be within 0..=100".to_string());
        }
        if m.repeat_low_percent >= m.repeat_high_percent {
            return Err(
                "monitor.repeat_low_percent must be below monitor.repeat_high_percent".to_string(),
            );
        }
        if self.source.call_timeout_ms == 0 {
            return Err("source.call_timeout_ms must be >= 1".to_string());
        }
        Ok(())
    }
}

/// Resolve the config path from `PLAYLOG_CONFIG_PATH` or XDG defaults.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os("PLAYLOG_CONFIG_PATH") {
        let p = PathBuf::from(p);
        return Some(p);
    }
    default_config_path()
}

/// Compute the default config path under `$XDG_CONFIG_HOME/playlog/config.toml`
/// or `~/.config/playlog/config.toml` when `XDG_CONFIG_HOME` is not set.
pub fn default_config_path() -> Option<PathBuf> {
    let config_home = if let Some(xdg) = env::var_os("XDG_CONFIG_HOME") {
        Some(PathBuf::from(xdg))
    } else {
        env::var_os("HOME").map(|home| PathBuf::from(home).join(".config"))
    };

    config_home.map(|d| d.join("playlog").join("config.toml"))
}
