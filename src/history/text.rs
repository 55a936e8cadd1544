use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::event::PlayEvent;

use super::EventSink;
use super::error::SinkError;

/// Tabs and line breaks would break the one-play-per-line layout.
fn clean(field: &str) -> String {
    field
        .chars()
        .map(|c| if matches!(c, '\t' | '\n' | '\r') { ' ' } else { c })
        .collect()
}

/// Format one log line: `played_at<TAB>title<TAB>filepath`.
pub fn format_line(event: &PlayEvent) -> String {
    format!(
        "{}\t{}\t{}\n",
        event.played_at_text(),
        clean(&event.title),
        clean(&event.filepath)
    )
}

/// Plain append-only text log, one play per line.
pub struct TextLogSink {
    path: PathBuf,
    file: Option<File>,
    closed: bool,
}

impl TextLogSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
            closed: false,
        }
    }

    fn io_err(&self, source: std::io::Error) -> SinkError {
        SinkError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn file(&mut self) -> Result<&mut File, SinkError> {
        if self.closed {
            return Err(SinkError::Closed);
        }
        if self.file.is_none() {
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|source| SinkError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .map_err(|e| self.io_err(e))?;
            info!("recording plays to {}", self.path.display());
            self.file = Some(file);
        }
        self.file.as_mut().ok_or(SinkError::Closed)
    }
}

impl EventSink for TextLogSink {
    fn append(&mut self, event: &PlayEvent) -> Result<(), SinkError> {
        let line = format_line(event);
        let file = self.file()?;
        let written = file.write_all(line.as_bytes()).and_then(|_| file.flush());
        if let Err(source) = written {
            // Reopen next time; the file may have been rotated or removed.
            self.file = None;
            return Err(self.io_err(source));
        }
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
        if let Some(mut f) = self.file.take() {
            let _ = f.flush();
        }
    }

    fn location(&self) -> &Path {
        &self.path
    }

    fn describe(&self) -> String {
        format!(
            "Text log:\n{}\n\nOne line per play: played_at, title, filepath (tab separated)",
            self.path.display()
        )
    }
}
