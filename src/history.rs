//! Durable, append-only play history.
//!
//! A sink owns its backing store for the lifetime of the monitor. Appends are
//! best effort: the caller logs a failure and carries on.

mod error;
pub mod path;
mod sqlite;
mod text;

use std::path::Path;
use std::time::Duration;

use crate::config::{StoreKind, StoreSettings};
use crate::event::PlayEvent;

pub use error::SinkError;
pub use path::resolve_store_path;
pub use sqlite::{COLUMNS, SqliteSink, TABLE, init_schema};
pub use text::{TextLogSink, format_line};

pub trait EventSink {
    /// Record one play. Creates the store on first use.
    fn append(&mut self, event: &PlayEvent) -> Result<(), SinkError>;

    /// Release the store. Later appends fail with [`SinkError::Closed`].
    fn close(&mut self) {}

    fn location(&self) -> &Path;

    /// Human readable summary of where and how plays are recorded.
    fn describe(&self) -> String;
}

impl<K: EventSink + ?Sized> EventSink for Box<K> {
    fn append(&mut self, event: &PlayEvent) -> Result<(), SinkError> {
        (**self).append(event)
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn location(&self) -> &Path {
        (**self).location()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Build the sink selected by the store settings. Resolves the location once.
pub fn open_sink(settings: &StoreSettings) -> Box<dyn EventSink + Send> {
    let path = resolve_store_path(settings);
    match settings.kind {
        StoreKind::Sqlite => Box::new(SqliteSink::new(
            path,
            Duration::from_millis(settings.busy_timeout_ms),
        )),
        StoreKind::Text => Box::new(TextLogSink::new(path)),
    }
}
