use std::{env, path::PathBuf};

use crate::config::{StoreKind, StoreSettings};

pub const DEFAULT_DB_FILE: &str = "nowplaying.db";
pub const DEFAULT_LOG_FILE: &str = "nowplaying.log";

pub fn default_file_name(kind: StoreKind) -> &'static str {
    match kind {
        StoreKind::Sqlite => DEFAULT_DB_FILE,
        StoreKind::Text => DEFAULT_LOG_FILE,
    }
}

/// Where the history store lives.
///
/// Order: explicit `store.path`, then the user's data directory, then the bare
/// file name relative to the working directory.
pub fn resolve_store_path(settings: &StoreSettings) -> PathBuf {
    if let Some(p) = &settings.path {
        return p.clone();
    }
    let file_name = default_file_name(settings.kind);
    default_store_path(file_name).unwrap_or_else(|| PathBuf::from(file_name))
}

/// `$XDG_DATA_HOME/playlog/<file>` or `~/.local/share/playlog/<file>` when
/// `XDG_DATA_HOME` is not set.
pub fn default_store_path(file_name: &str) -> Option<PathBuf> {
    let data_home = if let Some(xdg) = env::var_os("XDG_DATA_HOME") {
        Some(PathBuf::from(xdg))
    } else {
        env::var_os("HOME").map(|home| PathBuf::from(home).join(".local").join("share"))
    };

    data_home.map(|d| d.join("playlog").join(file_name))
}
