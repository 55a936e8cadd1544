use std::collections::HashMap;

/// One point-in-time read of the player.
///
/// Every field other than `is_playing` may be unknown. A sample taken while
/// the player is paused or stopped carries nothing else, see [`Sample::normalized`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sample {
    pub is_playing: bool,
    pub position_ms: Option<i64>,
    pub length_ms: Option<i64>,
    pub title: Option<String>,
    pub filepath: Option<String>,
}

impl Sample {
    /// A sample for a player that is not currently playing.
    pub fn idle() -> Self {
        Self::default()
    }

    /// A sample for a playing track.
    pub fn playing(
        title: impl Into<String>,
        filepath: impl Into<String>,
        position_ms: i64,
        length_ms: i64,
    ) -> Self {
        Self {
            is_playing: true,
            position_ms: Some(position_ms),
            length_ms: Some(length_ms),
            title: Some(title.into()),
            filepath: Some(filepath.into()),
        }
    }

    /// Drop every field of a non-playing sample so stale values never reach
    /// the detector.
    pub fn normalized(self) -> Self {
        if self.is_playing { self } else { Self::idle() }
    }

    pub fn title_str(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }

    pub fn filepath_str(&self) -> &str {
        self.filepath.as_deref().unwrap_or("")
    }
}

/// Extended per-file fields a source may be able to look up.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MetadataField {
    Title,
    Artist,
    Album,
    Genre,
    TrackNumber,
    Year,
    /// Track length; seconds or milliseconds depending on the source.
    Length,
}

impl MetadataField {
    pub const ALL: [MetadataField; 7] = [
        MetadataField::Title,
        MetadataField::Artist,
        MetadataField::Album,
        MetadataField::Genre,
        MetadataField::TrackNumber,
        MetadataField::Year,
        MetadataField::Length,
    ];
}

/// Resolved field values. A missing key means "unknown".
pub type Metadata = HashMap<MetadataField, String>;
