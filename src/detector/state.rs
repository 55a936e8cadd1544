/// What the detector remembers between ticks.
///
/// `last_emitted_title` holds the sampled title that produced the last
/// recorded play (empty until the first one). It is the comparison key for
/// the next tick, not the tag title that ended up in the record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectorState {
    pub last_emitted_title: String,
    pub last_filepath: String,
    /// Progress through the track at the last tick with a usable length, `0..=100`.
    pub last_position_percent: u8,
}

/// Position window that marks a single track looping back to its start.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RepeatThresholds {
    /// The previous tick must have been at least this far in.
    pub high_percent: u8,
    /// The current tick must be below this.
    pub low_percent: u8,
}

impl Default for RepeatThresholds {
    fn default() -> Self {
        Self {
            high_percent: 90,
            low_percent: 5,
        }
    }
}

/// `floor(position * 100 / length)`, clamped to `0..=100`.
///
/// `None` when the length is missing or not positive. With a usable length,
/// a missing or negative position counts as 0 %.
pub fn position_percent(position_ms: Option<i64>, length_ms: Option<i64>) -> Option<u8> {
    let len = length_ms.filter(|l| *l > 0)?;
    let Some(pos) = position_ms.filter(|p| *p >= 0) else {
        return Some(0);
    };
    let pct = (i128::from(pos) * 100 / i128::from(len)).min(100);
    u8::try_from(pct).ok()
}
