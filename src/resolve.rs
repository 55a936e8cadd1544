//! Turns raw player output into a complete [`PlayEvent`].

use chrono::NaiveDateTime;

use crate::event::PlayEvent;
use crate::source::{Metadata, MetadataField, PlaybackSource};

/// Raw lengths below this are taken to be seconds rather than milliseconds.
pub const SECONDS_CUTOFF: i64 = 10_000;

/// Final path segment after the last `/` or `\`.
///
/// A path without separators is its own filename.
pub fn filename_of(filepath: &str) -> &str {
    filepath
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(filepath)
}

/// Bring a length that may be in seconds or milliseconds to milliseconds.
pub fn normalize_duration_ms(raw: Option<i64>) -> i64 {
    match raw {
        None => 0,
        Some(v) if v < 0 => 0,
        Some(v) if v < SECONDS_CUTOFF => v * 1000,
        Some(v) => v,
    }
}

/// Parse a length field as reported by a source (`"210"`, `"210000"`, `"210.4"`).
pub fn parse_length(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>()
        .ok()
        .or_else(|| raw.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.round() as i64))
}

/// Inputs of one resolution, taken from the sample that triggered it.
#[derive(Debug, Clone, Copy)]
pub struct RawTrack<'a> {
    pub title: &'a str,
    pub filepath: &'a str,
    /// Length from the sample itself, already in milliseconds.
    pub length_ms: Option<i64>,
}

fn field(meta: &mut Metadata, key: MetadataField) -> String {
    meta.remove(&key)
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

/// Build the event for a play that is about to be recorded.
///
/// Title precedence: file tags, then the sampled title, then the player's
/// window caption. Tags are looked up only when a filepath is known.
pub fn resolve(
    raw: RawTrack<'_>,
    source: &mut dyn PlaybackSource,
    played_at: NaiveDateTime,
) -> PlayEvent {
    let mut meta = if raw.filepath.is_empty() {
        Metadata::new()
    } else {
        source.resolve_metadata(raw.filepath, &MetadataField::ALL)
    };

    let mut title = field(&mut meta, MetadataField::Title);
    if title.is_empty() {
        title = raw.title.trim().to_string();
    }
    if title.is_empty() {
        title = source
            .best_effort_window_title()
            .map(|t| t.trim().to_string())
            .unwrap_or_default();
    }

    let duration_ms = match meta.get(&MetadataField::Length).and_then(|l| parse_length(l)) {
        Some(len) => normalize_duration_ms(Some(len)),
        None => raw.length_ms.unwrap_or(0).max(0),
    };

    PlayEvent {
        played_at,
        filepath: raw.filepath.to_string(),
        filename: filename_of(raw.filepath).to_string(),
        title,
        artist: field(&mut meta, MetadataField::Artist),
        album: field(&mut meta, MetadataField::Album),
        genre: field(&mut meta, MetadataField::Genre),
        track_number: field(&mut meta, MetadataField::TrackNumber),
        year: field(&mut meta, MetadataField::Year),
        duration_ms,
    }
}
