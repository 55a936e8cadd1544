//! The persisted "now playing" record.

use chrono::{Local, NaiveDateTime, SubsecRound};

/// Text layout of `played_at` in every store.
pub const PLAYED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One distinct listen, fully resolved and ready to be written.
///
/// Built once by the resolver when the detector reports a new play and never
/// modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayEvent {
    /// Local wall-clock time, second precision.
    pub played_at: NaiveDateTime,
    pub filepath: String,
    pub filename: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub genre: String,
    pub track_number: String,
    pub year: String,
    pub duration_ms: i64,
}

impl PlayEvent {
    pub fn played_at_text(&self) -> String {
        self.played_at.format(PLAYED_AT_FORMAT).to_string()
    }
}

/// Current local time truncated to whole seconds.
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local().trunc_subsecs(0)
}

/// Parse a `played_at` column value back into a timestamp.
pub fn parse_played_at(text: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(text, PLAYED_AT_FORMAT)
}
