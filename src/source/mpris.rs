//! Playback source backed by an MPRIS player on the D-Bus session bus.
//!
//! The connection and the player's bus name are acquired lazily and dropped
//! whenever a call fails, so a player that starts after the monitor (or
//! restarts) is picked up on a later tick.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use async_io::block_on;
use thiserror::Error;
use tracing::{debug, info};
use zbus::proxy::CacheProperties;
use zbus::{Connection, fdo::DBusProxy, proxy};
use zvariant::{OwnedValue, Value};

use crate::config::SourceSettings;

use super::adapter::PlaybackSource;
use super::model::{Metadata, MetadataField, Sample};
use super::tags;

const MPRIS_PREFIX: &str = "org.mpris.MediaPlayer2.";

#[proxy(
    interface = "org.mpris.MediaPlayer2.Player",
    default_path = "/org/mpris/MediaPlayer2",
    gen_blocking = false
)]
trait Player {
    #[zbus(property)]
    fn playback_status(&self) -> zbus::Result<String>;

    #[zbus(property(emits_changed_signal = "false"))]
    fn position(&self) -> zbus::Result<i64>;

    #[zbus(property)]
    fn metadata(&self) -> zbus::Result<HashMap<String, OwnedValue>>;
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("session bus unavailable: {0}")]
    Bus(#[source] zbus::Error),
    #[error("no MPRIS player found")]
    NoPlayer,
    #[error("call to {player} failed: {source}")]
    Call {
        player: String,
        #[source]
        source: zbus::Error,
    },
}

/// What one round of property reads produced.
#[derive(Debug, Default)]
struct PlayerSnapshot {
    status: String,
    position_us: Option<i64>,
    metadata: HashMap<String, OwnedValue>,
}

pub struct MprisSource {
    settings: SourceSettings,
    connection: Option<Connection>,
    player: Option<String>,
    /// Metadata from the last playing sample, used when file tags are missing.
    last_metadata: Metadata,
}

impl MprisSource {
    pub fn new(settings: SourceSettings) -> Self {
        Self {
            settings,
            connection: None,
            player: None,
            last_metadata: Metadata::new(),
        }
    }

    /// Bus name of the player currently followed, if attached.
    pub fn player(&self) -> Option<&str> {
        self.player.as_deref()
    }

    fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.settings.call_timeout_ms.max(1))
    }

    fn connection(&mut self) -> Result<Connection, SourceError> {
        if let Some(c) = &self.connection {
            return Ok(c.clone());
        }
        let timeout = self.call_timeout();
        let conn = block_on(async move {
            zbus::connection::Builder::session()?
                .method_timeout(timeout)
                .build()
                .await
        })
        .map_err(SourceError::Bus)?;
        self.connection = Some(conn.clone());
        Ok(conn)
    }

    fn attach(&mut self) -> Result<(Connection, String), SourceError> {
        let conn = self.connection()?;
        if let Some(p) = &self.player {
            return Ok((conn, p.clone()));
        }

        let wanted = self.settings.player.clone();
        let names = block_on(async {
            let dbus = DBusProxy::new(&conn).await?;
            dbus.list_names().await.map_err(zbus::Error::from)
        });
        let names = match names {
            Ok(n) => n,
            Err(e) => {
                self.connection = None;
                return Err(SourceError::Bus(e));
            }
        };

        let players = names
            .iter()
            .map(|n| n.as_str().to_string())
            .filter(|n| n.starts_with(MPRIS_PREFIX));
        let found = pick_player(players, wanted.as_deref()).ok_or(SourceError::NoPlayer)?;

        info!("following MPRIS player {found}");
        self.player = Some(found.clone());
        Ok((conn, found))
    }

    fn read_player(&mut self) -> Result<PlayerSnapshot, SourceError> {
        let (conn, player) = self.attach()?;

        let read = block_on(async {
            let proxy = PlayerProxy::builder(&conn)
                .destination(player.as_str())?
                .cache_properties(CacheProperties::No)
                .build()
                .await?;

            let status = proxy.playback_status().await?;
            if status != "Playing" {
                return Ok(PlayerSnapshot {
                    status,
                    ..PlayerSnapshot::default()
                });
            }
            let position_us = proxy.position().await.ok();
            let metadata = proxy.metadata().await.unwrap_or_default();
            Ok::<_, zbus::Error>(PlayerSnapshot {
                status,
                position_us,
                metadata,
            })
        });

        read.map_err(|source: zbus::Error| {
            // Re-discover on the next tick; the player may have gone away.
            self.player = None;
            SourceError::Call {
                player: player.clone(),
                source,
            }
        })
    }
}

impl PlaybackSource for MprisSource {
    fn sample(&mut self) -> Sample {
        let snapshot = match self.read_player() {
            Ok(s) => s,
            Err(e) => {
                debug!("player unavailable: {e}");
                return Sample::idle();
            }
        };

        if snapshot.status != "Playing" {
            return Sample::idle();
        }

        self.last_metadata = metadata_fields(&snapshot.metadata);

        let meta = &snapshot.metadata;
        Sample {
            is_playing: true,
            position_ms: snapshot.position_us.filter(|p| *p >= 0).map(|p| p / 1000),
            length_ms: meta
                .get("mpris:length")
                .and_then(value_as_i64)
                .filter(|l| *l > 0)
                .map(|l| l / 1000),
            title: meta
                .get("xesam:title")
                .and_then(value_as_string)
                .filter(|t| !t.trim().is_empty()),
            filepath: meta
                .get("xesam:url")
                .and_then(value_as_string)
                .map(|url| local_path_from_url(&url)),
        }
    }

    fn resolve_metadata(&mut self, filepath: &str, fields: &[MetadataField]) -> Metadata {
        let mut out = tags::read_fields(Path::new(filepath), fields);
        for field in fields {
            if out.contains_key(field) {
                continue;
            }
            if let Some(v) = self.last_metadata.get(field) {
                out.insert(*field, v.clone());
            }
        }
        out
    }
}

/// Choose the followed player: the first whose bus name ends with `wanted`,
/// or simply the first one when no preference is configured.
pub(crate) fn pick_player(
    mut players: impl Iterator<Item = String>,
    wanted: Option<&str>,
) -> Option<String> {
    match wanted.map(str::trim).filter(|w| !w.is_empty()) {
        Some(w) => players.find(|p| {
            p.strip_prefix(MPRIS_PREFIX)
                .is_some_and(|suffix| suffix == w || suffix.starts_with(&format!("{w}.")))
        }),
        None => players.next(),
    }
}

/// Turn a `file://` URL into a local path; other URLs are kept verbatim.
pub(crate) fn local_path_from_url(url: &str) -> String {
    match url.strip_prefix("file://") {
        Some(rest) => urlencoding::decode(rest)
            .map(|p| p.into_owned())
            .unwrap_or_else(|_| rest.to_string()),
        None => url.to_string(),
    }
}

fn value_as_string(v: &OwnedValue) -> Option<String> {
    match &**v {
        Value::Str(s) => Some(s.as_str().to_string()),
        Value::ObjectPath(p) => Some(p.as_str().to_string()),
        Value::Array(items) => {
            let joined = items
                .iter()
                .filter_map(|item| match item {
                    Value::Str(s) => Some(s.as_str().to_string()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join(", ");
            if joined.is_empty() { None } else { Some(joined) }
        }
        _ => None,
    }
}

fn value_as_i64(v: &OwnedValue) -> Option<i64> {
    match &**v {
        Value::I64(n) => Some(*n),
        Value::U64(n) => i64::try_from(*n).ok(),
        Value::I32(n) => Some(i64::from(*n)),
        Value::U32(n) => Some(i64::from(*n)),
        Value::F64(n) => Some(*n as i64),
        _ => None,
    }
}

fn metadata_fields(meta: &HashMap<String, OwnedValue>) -> Metadata {
    let mut out = Metadata::new();
    let keys = [
        (MetadataField::Title, "xesam:title"),
        (MetadataField::Artist, "xesam:artist"),
        (MetadataField::Album, "xesam:album"),
        (MetadataField::Genre, "xesam:genre"),
    ];
    for (field, key) in keys {
        if let Some(v) = meta.get(key).and_then(value_as_string) {
            if !v.trim().is_empty() {
                out.insert(field, v);
            }
        }
    }
    if let Some(n) = meta.get("xesam:trackNumber").and_then(value_as_i64) {
        out.insert(MetadataField::TrackNumber, n.to_string());
    }
    if let Some(date) = meta.get("xesam:contentCreated").and_then(value_as_string) {
        // ISO 8601; the year is the leading four digits.
        let year: String = date.chars().take(4).collect();
        if year.len() == 4 && year.chars().all(|c| c.is_ascii_digit()) {
            out.insert(MetadataField::Year, year);
        }
    }
    // `mpris:length` already reaches the sample in milliseconds.
    out
}
