//! Watch a running media player and keep a deduplicated "now playing" history.
//!
//! A [`Monitor`] polls a [`PlaybackSource`] on a fixed interval, feeds each
//! sample to a [`Detector`] and appends one [`PlayEvent`] per distinct listen
//! to an [`EventSink`]. A track that loops back to its start counts as a new
//! listen.
//!
//! ```no_run
//! use playlog::config::Settings;
//!
//! let settings = Settings::load_or_default();
//! playlog::logging::init_from_settings(&settings.logging);
//! let handle = playlog::monitor::start_from_settings(&settings);
//! // ... host runs ...
//! let _last = handle.stop();
//! ```

pub mod config;
pub mod detector;
pub mod event;
pub mod history;
pub mod logging;
pub mod monitor;
pub mod resolve;
pub mod source;

#[cfg(test)]
mod test_support;

pub use detector::{Decision, Detector, DetectorState, RepeatThresholds, Trigger};
pub use event::PlayEvent;
pub use history::{EventSink, SinkError, SqliteSink, TextLogSink};
pub use monitor::{Monitor, Scheduler, SchedulerHandle, SchedulerStats, TickOutcome};
pub use source::{MprisSource, PlaybackSource, Sample, ScriptedSource};
