//! SQLite play history (`play_history` table).
//!
//! The file and schema are created on the first append, so a missing or
//! temporarily unwritable location only costs the plays recorded meanwhile.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDateTime;
use rusqlite::{Connection, params};
use tracing::{debug, info};

use crate::event::{PLAYED_AT_FORMAT, PlayEvent, parse_played_at};

use super::EventSink;
use super::error::SinkError;

pub const TABLE: &str = "play_history";

pub const COLUMNS: [&str; 11] = [
    "id",
    "played_at",
    "filepath",
    "filename",
    "title",
    "artist",
    "album",
    "genre",
    "track_number",
    "year",
    "duration_ms",
];

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS play_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    played_at TEXT NOT NULL,
    filepath TEXT,
    filename TEXT,
    title TEXT NOT NULL,
    artist TEXT,
    album TEXT,
    genre TEXT,
    track_number TEXT,
    year TEXT,
    duration_ms INTEGER
);

CREATE INDEX IF NOT EXISTS idx_play_history_played_at ON play_history(played_at);
"#;

const SELECT_EVENT: &str = "SELECT played_at, filepath, filename, title, artist, album, genre, \
     track_number, year, duration_ms FROM play_history";

/// Create the table and index if they are missing. Safe to run repeatedly.
pub fn init_schema(conn: &Connection) -> Result<(), SinkError> {
    conn.execute_batch(SCHEMA).map_err(SinkError::Schema)
}

fn map_event_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PlayEvent> {
    let played_at: String = row.get(0)?;
    let played_at = parse_played_at(&played_at).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(PlayEvent {
        played_at,
        filepath: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        filename: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        title: row.get(3)?,
        artist: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        album: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        genre: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
        track_number: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
        year: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
        duration_ms: row.get::<_, Option<i64>>(9)?.unwrap_or(0),
    })
}

pub struct SqliteSink {
    path: PathBuf,
    busy_timeout: Duration,
    conn: Option<Connection>,
    closed: bool,
}

impl SqliteSink {
    /// A sink for `path`. Nothing is opened until the first append.
    pub fn new(path: impl Into<PathBuf>, busy_timeout: Duration) -> Self {
        Self {
            path: path.into(),
            busy_timeout,
            conn: None,
            closed: false,
        }
    }

    fn connection(&mut self) -> Result<&Connection, SinkError> {
        if self.closed {
            return Err(SinkError::Closed);
        }
        if self.conn.is_none() {
            self.conn = Some(self.open()?);
        }
        self.conn.as_ref().ok_or(SinkError::Closed)
    }

    fn open(&self) -> Result<Connection, SinkError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| SinkError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(&self.path).map_err(|source| SinkError::Open {
            path: self.path.clone(),
            source,
        })?;
        conn.busy_timeout(self.busy_timeout)
            .map_err(|source| SinkError::Open {
                path: self.path.clone(),
                source,
            })?;
        init_schema(&conn)?;

        info!("recording plays to {}", self.path.display());
        Ok(conn)
    }

    /// Most recent plays, newest first.
    pub fn recent(&mut self, limit: usize) -> Result<Vec<PlayEvent>, SinkError> {
        let conn = self.connection()?;
        let sql = format!("{SELECT_EVENT} ORDER BY played_at DESC, id DESC LIMIT ?1");
        let mut stmt = conn.prepare(&sql).map_err(SinkError::Read)?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(params![limit], map_event_row)
            .map_err(SinkError::Read)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(SinkError::Read)
    }

    /// Plays with `from <= played_at <= to`, oldest first.
    pub fn between(
        &mut self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<PlayEvent>, SinkError> {
        let conn = self.connection()?;
        let sql = format!("{SELECT_EVENT} WHERE played_at BETWEEN ?1 AND ?2 ORDER BY played_at, id");
        let mut stmt = conn.prepare(&sql).map_err(SinkError::Read)?;
        let rows = stmt
            .query_map(
                params![
                    from.format(PLAYED_AT_FORMAT).to_string(),
                    to.format(PLAYED_AT_FORMAT).to_string()
                ],
                map_event_row,
            )
            .map_err(SinkError::Read)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(SinkError::Read)
    }
}

impl EventSink for SqliteSink {
    fn append(&mut self, event: &PlayEvent) -> Result<(), SinkError> {
        let conn = self.connection()?;
        conn.execute(
            r#"
            INSERT INTO play_history
                (played_at, filepath, filename, title, artist, album, genre,
                 track_number, year, duration_ms)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                event.played_at_text(),
                event.filepath,
                event.filename,
                event.title,
                event.artist,
                event.album,
                event.genre,
                event.track_number,
                event.year,
                event.duration_ms,
            ],
        )
        .map_err(SinkError::Write)?;
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
        if let Some(conn) = self.conn.take() {
            if let Err((_, e)) = conn.close() {
                debug!("closing {} failed: {e}", self.path.display());
            }
        }
    }

    fn location(&self) -> &Path {
        &self.path
    }

    fn describe(&self) -> String {
        format!(
            "SQLite database:\n{}\n\nTable: {TABLE}\nColumns: {}",
            self.path.display(),
            COLUMNS.join(", ")
        )
    }
}

impl Drop for SqliteSink {
    fn drop(&mut self) {
        self.close();
    }
}
