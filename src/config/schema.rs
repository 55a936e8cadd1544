use std::path::PathBuf;

use serde::Deserialize;

use crate::source::CaptionFormat;

/// Top-level monitor settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/playlog/config.toml` or `~/.config/playlog/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `PLAYLOG__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub monitor: MonitorSettings,
    pub store: StoreSettings,
    pub source: SourceSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    /// How often the player is sampled (milliseconds).
    pub poll_interval_ms: u64,
    /// A track that had reached at least this percentage...
    pub repeat_high_percent: u8,
    /// ...and is now below this percentage is counted as a new play.
    pub repeat_low_percent: u8,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            repeat_high_percent: 90,
            repeat_low_percent: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Explicit location of the history store. When unset the XDG data
    /// directory is used.
    pub path: Option<PathBuf>,
    /// Which backend records plays.
    pub kind: StoreKind,
    /// How long a write may wait on a locked database (milliseconds).
    pub busy_timeout_ms: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            path: None,
            kind: StoreKind::Sqlite,
            busy_timeout_ms: 1000,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoreKind {
    #[serde(alias = "db", alias = "sqlite3", alias = "database")]
    Sqlite,
    #[serde(alias = "log", alias = "plain", alias = "txt")]
    Text,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    /// MPRIS player to follow, matched against the end of the bus name
    /// (`vlc` matches `org.mpris.MediaPlayer2.vlc`). Unset follows the first
    /// player found on the session bus.
    pub player: Option<String>,
    /// Upper bound for a single D-Bus call (milliseconds).
    pub call_timeout_ms: u64,
    /// Separator between the track title and the player name in window captions.
    pub caption_separator: String,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            player: None,
            call_timeout_ms: 250,
            caption_separator: " - ".to_string(),
        }
    }
}

impl SourceSettings {
    /// Caption layout `"<title><separator><player>"` using the configured separator.
    ///
    /// For hosts that supply their own [`PlaybackSource`](crate::source::PlaybackSource)
    /// with access to a window caption. MPRIS players expose no caption, so the
    /// bundled `MprisSource` never reads this.
    pub fn caption_format(&self, player: &str) -> CaptionFormat {
        CaptionFormat::suffix(player, self.caption_separator.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default `tracing` filter directive, used when `RUST_LOG` is not set.
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}
