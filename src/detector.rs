//! Decides, one sample at a time, when a new play has started.
//!
//! Two rules can report a new play:
//!
//! - **new track**: the sampled title is non-empty and differs from the title
//!   of the last recorded play.
//! - **repeat**: same file as before, the previous tick was near the end and
//!   this one is near the start. This catches a single track looping, which a
//!   title comparison cannot see.
//!
//! At most one play is reported per tick. Pausing or stopping never clears
//! the remembered title, so resuming the same track is not a new play.

mod state;

pub use state::{DetectorState, RepeatThresholds, position_percent};

use tracing::debug;

use crate::event::PlayEvent;
use crate::source::Sample;

/// Which rule reported the new play.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Trigger {
    NewTrack,
    Repeat,
}

/// Result of feeding one sample to the detector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Player not playing; nothing was looked at.
    Idle,
    /// Playing, but not a new play.
    NoChange,
    /// A rule fired but no title could be resolved, so nothing is recorded.
    Suppressed(Trigger),
    /// A new play to record.
    Emit(PlayEvent, Trigger),
}

#[derive(Debug, Clone, Default)]
pub struct Detector {
    state: DetectorState,
    thresholds: RepeatThresholds,
}

impl Detector {
    pub fn new(thresholds: RepeatThresholds) -> Self {
        Self::with_state(DetectorState::default(), thresholds)
    }

    pub fn with_state(state: DetectorState, thresholds: RepeatThresholds) -> Self {
        Self { state, thresholds }
    }

    pub fn state(&self) -> &DetectorState {
        &self.state
    }

    pub fn thresholds(&self) -> RepeatThresholds {
        self.thresholds
    }

    fn rule_for(&self, sample: &Sample, percent: Option<u8>) -> Option<Trigger> {
        let title = sample.title_str();
        if !title.is_empty() && title != self.state.last_emitted_title {
            return Some(Trigger::NewTrack);
        }

        // A wrap cannot be judged without a usable length.
        let percent = percent?;
        let filepath = sample.filepath_str();
        let wrapped = !filepath.is_empty()
            && filepath == self.state.last_filepath
            && self.state.last_position_percent >= self.thresholds.high_percent
            && percent < self.thresholds.low_percent;
        wrapped.then_some(Trigger::Repeat)
    }

    /// Feed one sample.
    ///
    /// `resolve` is called only when a rule fires and builds the event to be
    /// recorded; an event with an empty title is suppressed and leaves the
    /// remembered title untouched.
    pub fn decide<F>(&mut self, sample: &Sample, resolve: F) -> Decision
    where
        F: FnOnce(Trigger) -> PlayEvent,
    {
        if !sample.is_playing {
            return Decision::Idle;
        }

        let percent = position_percent(sample.position_ms, sample.length_ms);

        let decision = match self.rule_for(sample, percent) {
            None => Decision::NoChange,
            Some(trigger) => {
                let event = resolve(trigger);
                if event.title.is_empty() {
                    debug!(?trigger, "new play without any title, not recorded");
                    Decision::Suppressed(trigger)
                } else {
                    // An untitled repeat keeps the last real title as the key.
                    if !sample.title_str().is_empty() {
                        self.state.last_emitted_title = sample.title_str().to_string();
                    }
                    self.state.last_filepath = sample.filepath_str().to_string();
                    Decision::Emit(event, trigger)
                }
            }
        };

        // Position tracking stays current on every tick with a usable length
        // so the repeat rule always has a baseline.
        if sample.length_ms.is_some_and(|l| l > 0) {
            self.state.last_position_percent = percent.unwrap_or(0);
            if !sample.filepath_str().is_empty() {
                self.state.last_filepath = sample.filepath_str().to_string();
            }
        }

        decision
    }
}
