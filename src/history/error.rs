use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to create store directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to open store {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
    #[error("failed to create play_history schema: {0}")]
    Schema(#[source] rusqlite::Error),
    #[error("failed to write play event: {0}")]
    Write(#[source] rusqlite::Error),
    #[error("failed to read play history: {0}")]
    Read(#[source] rusqlite::Error),
    #[error("i/o error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("store has been closed")]
    Closed,
}
