//! Playback sources: where samples of the external player come from.
//!
//! The monitor only talks to a [`PlaybackSource`]. `MprisSource` follows a
//! desktop player over D-Bus; `ScriptedSource` replays canned samples.

mod adapter;
pub mod caption;
mod model;
mod mpris;
mod scripted;
pub mod tags;

pub use adapter::PlaybackSource;
pub use caption::{CaptionFormat, Placement};
pub use model::{Metadata, MetadataField, Sample};
pub use mpris::{MprisSource, SourceError};
pub use scripted::ScriptedSource;
