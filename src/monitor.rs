//! The monitor: one source, one detector, one sink.
//!
//! A tick samples the player, lets the detector decide and, for a new play,
//! resolves the full record and appends it. Nothing that goes wrong inside a
//! tick escapes it; the worst case is a tick that records nothing.

mod scheduler;

pub use scheduler::{Scheduler, SchedulerHandle, SchedulerStats};

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::detector::{Decision, Detector, DetectorState, RepeatThresholds, Trigger};
use crate::event::{PlayEvent, local_now};
use crate::history::{self, EventSink};
use crate::resolve::{self, RawTrack};
use crate::source::{MprisSource, PlaybackSource};

/// What a single tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Player not playing or unreachable.
    Idle,
    /// Playing the same thing as before.
    NoChange,
    /// A new play was detected but no title could be found for it.
    Suppressed,
    /// A new play was recorded.
    Emitted(PlayEvent),
    /// A new play was detected but the store rejected it.
    PersistFailed(PlayEvent),
}

pub struct Monitor {
    source: Box<dyn PlaybackSource + Send>,
    detector: Detector,
    sink: Box<dyn EventSink + Send>,
}

impl Monitor {
    pub fn new(
        source: Box<dyn PlaybackSource + Send>,
        sink: Box<dyn EventSink + Send>,
        thresholds: RepeatThresholds,
    ) -> Self {
        Self {
            source,
            detector: Detector::new(thresholds),
            sink,
        }
    }

    /// Follow an MPRIS player and record to the configured store.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            Box::new(MprisSource::new(settings.source.clone())),
            history::open_sink(&settings.store),
            thresholds_from(settings),
        )
    }

    pub fn detector_state(&self) -> &DetectorState {
        self.detector.state()
    }

    /// Summary for a host's about/config screen.
    pub fn describe(&self) -> String {
        format!(
            "playlog - Now Playing Logger\n\nLogs currently playing songs to {}",
            self.sink.describe()
        )
    }

    /// Run one poll-sample-decide-persist cycle.
    pub fn tick(&mut self) -> TickOutcome {
        let mut sample = self.source.sample().normalized();

        if sample.is_playing && sample.title_str().trim().is_empty() {
            sample.title = self
                .source
                .best_effort_window_title()
                .filter(|t| !t.trim().is_empty());
        }

        let source = self.source.as_mut();
        let decision = self.detector.decide(&sample, |_| {
            let raw = RawTrack {
                title: sample.title_str(),
                filepath: sample.filepath_str(),
                length_ms: sample.length_ms,
            };
            resolve::resolve(raw, source, local_now())
        });

        match decision {
            Decision::Idle => TickOutcome::Idle,
            Decision::NoChange => TickOutcome::NoChange,
            Decision::Suppressed(_) => TickOutcome::Suppressed,
            Decision::Emit(event, trigger) => self.persist(event, trigger),
        }
    }

    fn persist(&mut self, event: PlayEvent, trigger: Trigger) -> TickOutcome {
        match self.sink.append(&event) {
            Ok(()) => {
                info!(
                    title = %event.title,
                    file = %event.filename,
                    ?trigger,
                    "now playing"
                );
                TickOutcome::Emitted(event)
            }
            Err(e) => {
                warn!("could not record \"{}\": {e}", event.title);
                TickOutcome::PersistFailed(event)
            }
        }
    }

    /// Release the store. Called once, after the last tick.
    pub fn close(&mut self) {
        debug!("closing {}", self.sink.location().display());
        self.sink.close();
    }
}

pub fn thresholds_from(settings: &Settings) -> RepeatThresholds {
    RepeatThresholds {
        high_percent: settings.monitor.repeat_high_percent,
        low_percent: settings.monitor.repeat_low_percent,
    }
}

pub fn poll_interval_from(settings: &Settings) -> Duration {
    Duration::from_millis(settings.monitor.poll_interval_ms.max(1))
}

/// Build the monitor described by `settings` and start polling.
pub fn start_from_settings(settings: &Settings) -> SchedulerHandle {
    Scheduler::start(Monitor::from_settings(settings), poll_interval_from(settings))
}

#[cfg(test)]
mod tests;
