//! Tweaking of the tracker's behavior.

use core::fmt;
use core::ops::RangeInclusive;

/// Upper bound of taps that can be averaged together.
///
/// This sets the size of the statically allocated interval storage.
pub const MAX_TAP_VALUES: usize = 10;

/// Beat length used before any interval was measured. 120 BPM.
pub const DEFAULT_BEAT_LENGTH_MS: u32 = 500;

const TOTAL_TAP_VALUES_RANGE: RangeInclusive<usize> = 2..=MAX_TAP_VALUES;
const SKIPPED_TAP_THRESHOLD_LOW_RANGE: RangeInclusive<f32> = 1.0..=2.0;
const SKIPPED_TAP_THRESHOLD_HIGH_RANGE: RangeInclusive<f32> = 2.0..=4.0;

/// Parameters of tap chains, averaging and skipped tap detection.
///
/// Any of these can be changed while the tracker runs. Values outside of
/// their allowed range are rejected, keeping the previous value.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Configuration {
    /// The chain of taps finishes this many milliseconds after the most
    /// recent tap.
    pub chain_reset_timeout_ms: u32,
    /// The chain of taps finishes after this many taps, no matter how
    /// quickly they came.
    pub beats_until_chain_reset: u32,
    /// The number of most recent intervals averaged to calculate the tempo.
    pub total_tap_values: usize,
    /// Lower bound of interval to average ratio considered a skipped beat.
    pub skipped_tap_threshold_low: f32,
    /// Upper bound (exclusive) of interval to average ratio considered
    /// a skipped beat.
    pub skipped_tap_threshold_high: f32,
    pub skipped_tap_detection: bool,
    pub min_beat_length_ms: u32,
    pub max_beat_length_ms: u32,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            chain_reset_timeout_ms: 2000,
            beats_until_chain_reset: 8,
            total_tap_values: 5,
            skipped_tap_threshold_low: 1.75,
            skipped_tap_threshold_high: 2.75,
            skipped_tap_detection: true,
            min_beat_length_ms: 250,
            max_beat_length_ms: 2000,
        }
    }
}

/// Configuration parameter that was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InvalidConfiguration {
    ChainResetTimeout,
    BeatsUntilChainReset,
    TotalTapValues,
    SkippedTapThresholdLow,
    SkippedTapThresholdHigh,
    MinBeatLength,
    MaxBeatLength,
    BeatLength,
    Bpm,
}

impl fmt::Display for InvalidConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::ChainResetTimeout => "chain reset timeout must be at least 1 ms",
            Self::BeatsUntilChainReset => "beats until chain reset must be at least 1",
            Self::TotalTapValues => "total tap values must be between 2 and MAX_TAP_VALUES",
            Self::SkippedTapThresholdLow => "skipped tap low threshold must be between 1.0 and 2.0",
            Self::SkippedTapThresholdHigh => {
                "skipped tap high threshold must be between 2.0 and 4.0"
            }
            Self::MinBeatLength => "minimal beat length must be positive and below the maximum",
            Self::MaxBeatLength => "maximal beat length must be above the minimum",
            Self::BeatLength => "beat length must be positive",
            Self::Bpm => "bpm must be a positive finite number",
        };
        f.write_str(message)
    }
}

impl Configuration {
    /// Check all parameters, reporting the first one out of its range.
    ///
    /// # Errors
    ///
    /// Returns the offending parameter.
    pub fn validate(&self) -> Result<(), InvalidConfiguration> {
        check_chain_reset_timeout(self.chain_reset_timeout_ms)?;
        check_beats_until_chain_reset(self.beats_until_chain_reset)?;
        check_total_tap_values(self.total_tap_values)?;
        check_skipped_tap_threshold_low(self.skipped_tap_threshold_low)?;
        check_skipped_tap_threshold_high(self.skipped_tap_threshold_high)?;
        check_min_beat_length(self.min_beat_length_ms, self.max_beat_length_ms)?;
        check_max_beat_length(self.max_beat_length_ms, self.min_beat_length_ms)?;
        Ok(())
    }

    /// Take over all valid parameters of `other`, keeping the current value
    /// of those that are not.
    pub(crate) fn merge_valid(&mut self, other: &Self) {
        if check_chain_reset_timeout(other.chain_reset_timeout_ms).is_ok() {
            self.chain_reset_timeout_ms = other.chain_reset_timeout_ms;
        }
        if check_beats_until_chain_reset(other.beats_until_chain_reset).is_ok() {
            self.beats_until_chain_reset = other.beats_until_chain_reset;
        }
        if check_total_tap_values(other.total_tap_values).is_ok() {
            self.total_tap_values = other.total_tap_values;
        }
        if check_skipped_tap_threshold_low(other.skipped_tap_threshold_low).is_ok() {
            self.skipped_tap_threshold_low = other.skipped_tap_threshold_low;
        }
        if check_skipped_tap_threshold_high(other.skipped_tap_threshold_high).is_ok() {
            self.skipped_tap_threshold_high = other.skipped_tap_threshold_high;
        }
        self.skipped_tap_detection = other.skipped_tap_detection;
        if check_min_beat_length(other.min_beat_length_ms, other.max_beat_length_ms).is_ok() {
            self.min_beat_length_ms = other.min_beat_length_ms;
            self.max_beat_length_ms = other.max_beat_length_ms;
        }
    }
}

pub(crate) fn check_chain_reset_timeout(ms: u32) -> Result<(), InvalidConfiguration> {
    if ms >= 1 {
        Ok(())
    } else {
        Err(InvalidConfiguration::ChainResetTimeout)
    }
}

pub(crate) fn check_beats_until_chain_reset(beats: u32) -> Result<(), InvalidConfiguration> {
    if beats >= 1 {
        Ok(())
    } else {
        Err(InvalidConfiguration::BeatsUntilChainReset)
    }
}

pub(crate) fn check_total_tap_values(total: usize) -> Result<(), InvalidConfiguration> {
    if TOTAL_TAP_VALUES_RANGE.contains(&total) {
        Ok(())
    } else {
        Err(InvalidConfiguration::TotalTapValues)
    }
}

pub(crate) fn check_skipped_tap_threshold_low(threshold: f32) -> Result<(), InvalidConfiguration> {
    if SKIPPED_TAP_THRESHOLD_LOW_RANGE.contains(&threshold) {
        Ok(())
    } else {
        Err(InvalidConfiguration::SkippedTapThresholdLow)
    }
}

pub(crate) fn check_skipped_tap_threshold_high(threshold: f32) -> Result<(), InvalidConfiguration> {
    if SKIPPED_TAP_THRESHOLD_HIGH_RANGE.contains(&threshold) {
        Ok(())
    } else {
        Err(InvalidConfiguration::SkippedTapThresholdHigh)
    }
}

pub(crate) fn check_min_beat_length(min: u32, max: u32) -> Result<(), InvalidConfiguration> {
    if min >= 1 && min < max {
        Ok(())
    } else {
        Err(InvalidConfiguration::MinBeatLength)
    }
}

pub(crate) fn check_max_beat_length(max: u32, min: u32) -> Result<(), InvalidConfiguration> {
    if max > min {
        Ok(())
    } else {
        Err(InvalidConfiguration::MaxBeatLength)
    }
}
