use std::collections::VecDeque;

use super::adapter::PlaybackSource;
use super::model::{Metadata, MetadataField, Sample};

/// Deterministic source that replays a prepared list of samples.
///
/// Once the script runs out every further sample is idle. Useful for hosts
/// and tests that need to drive the monitor without a live player.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    samples: VecDeque<Sample>,
    metadata: Vec<(String, Metadata)>,
    window_title: Option<String>,
    /// Paths `resolve_metadata` was asked about, in call order.
    pub lookups: Vec<String>,
}

impl ScriptedSource {
    pub fn new(samples: impl IntoIterator<Item = Sample>) -> Self {
        Self {
            samples: samples.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push_back(sample);
    }

    /// Tag data returned for `filepath`.
    pub fn with_metadata(
        mut self,
        filepath: impl Into<String>,
        fields: impl IntoIterator<Item = (MetadataField, &'static str)>,
    ) -> Self {
        let fields = fields
            .into_iter()
            .map(|(k, v)| (k, v.to_string()))
            .collect();
        self.metadata.push((filepath.into(), fields));
        self
    }

    pub fn with_window_title(mut self, title: impl Into<String>) -> Self {
        self.window_title = Some(title.into());
        self
    }

    pub fn remaining(&self) -> usize {
        self.samples.len()
    }
}

impl PlaybackSource for ScriptedSource {
    fn sample(&mut self) -> Sample {
        self.samples.pop_front().unwrap_or_default()
    }

    fn resolve_metadata(&mut self, filepath: &str, fields: &[MetadataField]) -> Metadata {
        self.lookups.push(filepath.to_string());
        self.metadata
            .iter()
            .find(|(p, _)| p == filepath)
            .map(|(_, m)| {
                m.iter()
                    .filter(|(k, _)| fields.contains(k))
                    .map(|(k, v)| (*k, v.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn best_effort_window_title(&mut self) -> Option<String> {
        self.window_title.clone()
    }
}
