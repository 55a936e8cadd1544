use super::model::{Metadata, MetadataField, Sample};

/// Read access to an external, independently running player.
///
/// Every query is best effort. Implementations report anything they cannot
/// obtain as unknown (`None` / missing key) and never panic on an unreachable
/// player.
pub trait PlaybackSource {
    /// Current playback state.
    fn sample(&mut self) -> Sample;

    /// Look up extended fields for a single file. Only called for a file that
    /// is about to be recorded.
    fn resolve_metadata(&mut self, filepath: &str, fields: &[MetadataField]) -> Metadata {
        let _ = (filepath, fields);
        Metadata::new()
    }

    /// Title recovered from the player's window caption, if the source has one.
    fn best_effort_window_title(&mut self) -> Option<String> {
        None
    }
}

impl<S: PlaybackSource + ?Sized> PlaybackSource for Box<S> {
    fn sample(&mut self) -> Sample {
        (**self).sample()
    }

    fn resolve_metadata(&mut self, filepath: &str, fields: &[MetadataField]) -> Metadata {
        (**self).resolve_metadata(filepath, fields)
    }

    fn best_effort_window_title(&mut self) -> Option<String> {
        (**self).best_effort_window_title()
    }
}
