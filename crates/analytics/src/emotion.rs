//! Emotion and action-unit channel statistics.

use std::collections::{BTreeMap, BTreeSet};

use faceit_common::config::AnalyticsConfig;
use faceit_session_model::{is_action_unit, EmotionEntry, EMOTION_LABELS};
use serde::{Deserialize, Serialize};

use crate::peaks::{duration_above_threshold, find_peaks, Peak};
use crate::stats::{fraction_above, DistributionStats};

/// Channel excluded when picking a dominant emotion.
const NEUTRAL: &str = "neutral";

/// Statistics for one emotion channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionChannelStats {
    #[serde(flatten)]
    pub distribution: DistributionStats,
    pub peaks: Vec<Peak>,
    /// Approximate seconds above the configured threshold.
    pub duration_above_threshold: f64,
}

/// Statistics for one facial action-unit channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionUnitStats {
    #[serde(flatten)]
    pub distribution: DistributionStats,
    /// Fraction of samples above the activation threshold.
    pub activation_rate: f64,
    pub peaks: Vec<Peak>,
}

/// An emotion value that crossed the key-moment threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyMoment {
    pub timestamp: f64,
    pub emotion: String,
    pub value: f64,
    /// Position of the entry in the emotion history.
    pub frame_index: usize,
    /// Frame number the entry was tagged with.
    pub frame_number: u64,
}

/// A channel's values paired with the timestamps of the entries carrying it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelSeries {
    pub timestamps: Vec<f64>,
    pub values: Vec<f64>,
}

/// Collect `channel` across entries, skipping entries that lack it.
pub fn channel_series(entries: &[EmotionEntry], channel: &str) -> ChannelSeries {
    let mut series = ChannelSeries::default();
    for entry in entries {
        if let Some(value) = entry.value(channel) {
            series.timestamps.push(entry.timestamp);
            series.values.push(value);
        }
    }
    series
}

/// Every channel name present in at least one entry.
pub fn channel_names(entries: &[EmotionEntry]) -> BTreeSet<&str> {
    entries
        .iter()
        .flat_map(|e| e.channels.keys().map(String::as_str))
        .collect()
}

/// Statistics for every non-action-unit channel.
pub fn emotion_statistics(
    entries: &[EmotionEntry],
    config: &AnalyticsConfig,
) -> BTreeMap<String, EmotionChannelStats> {
    channel_names(entries)
        .into_iter()
        .filter(|name| !is_action_unit(name))
        .filter_map(|name| {
            let series = channel_series(entries, name);
            let distribution = DistributionStats::from_series(&series.values)?;
            Some((
                name.to_string(),
                EmotionChannelStats {
                    distribution,
                    peaks: find_peaks(&series.values, &series.timestamps, config.peak_min_height),
                    duration_above_threshold: duration_above_threshold(
                        &series.values,
                        config.duration_threshold,
                        config.emotion_frame_skip,
                        config.nominal_fps,
                    ),
                },
            ))
        })
        .collect()
}

/// Statistics for every action-unit channel.
pub fn action_unit_statistics(
    entries: &[EmotionEntry],
    config: &AnalyticsConfig,
) -> BTreeMap<String, ActionUnitStats> {
    channel_names(entries)
        .into_iter()
        .filter(|name| is_action_unit(name))
        .filter_map(|name| {
            let series = channel_series(entries, name);
            let distribution = DistributionStats::from_series(&series.values)?;
            Some((
                name.to_string(),
                ActionUnitStats {
                    distribution,
                    activation_rate: fraction_above(
                        &series.values,
                        config.au_activation_threshold,
                    ),
                    peaks: find_peaks(
                        &series.values,
                        &series.timestamps,
                        config.peak_min_height_au,
                    ),
                },
            ))
        })
        .collect()
}

/// Emotion values strictly above `threshold`, in entry order.
pub fn identify_key_moments(entries: &[EmotionEntry], threshold: f64) -> Vec<KeyMoment> {
    entries
        .iter()
        .enumerate()
        .flat_map(|(frame_index, entry)| {
            entry
                .channels
                .iter()
                .filter(|(name, value)| !is_action_unit(name) && **value > threshold)
                .map(move |(name, value)| KeyMoment {
                    timestamp: entry.timestamp,
                    emotion: name.clone(),
                    value: *value,
                    frame_index,
                    frame_number: entry.frame_number,
                })
        })
        .collect()
}

/// The emotion label with the highest mean, ignoring `neutral`.
///
/// Only the known emotion labels compete; other analyzer channels are
/// ignored. Returns `neutral` when no other label is present, `None` without
/// emotion data.
pub fn dominant_emotion(stats: &BTreeMap<String, EmotionChannelStats>) -> Option<String> {
    let best = stats
        .iter()
        .filter(|(name, _)| name.as_str() != NEUTRAL && EMOTION_LABELS.contains(&name.as_str()))
        .max_by(|a, b| a.1.distribution.mean.total_cmp(&b.1.distribution.mean))
        .map(|(name, _)| name.clone());

    best.or_else(|| stats.contains_key(NEUTRAL).then(|| NEUTRAL.to_string()))
}
