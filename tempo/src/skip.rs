//! Recognize intervals where the user missed a beat.

/// Interval of a single tap after classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum Classification {
    Normal(u32),
    /// The measured interval spanned two beats. Holds the halved interval.
    Skipped(u32),
}

impl Classification {
    pub fn interval(self) -> u32 {
        match self {
            Self::Normal(x) | Self::Skipped(x) => x,
        }
    }

    pub fn is_skipped(self) -> bool {
        matches!(self, Self::Skipped(_))
    }
}

/// Detect an interval roughly double the running average.
///
/// Once a skip was detected, the following interval is always taken as
/// normal. Otherwise a genuine slowdown to half the tempo would be halved
/// over and over again.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) struct SkipDetector {
    pub threshold_low: f32,
    pub threshold_high: f32,
    pub enabled: bool,
    last_skipped: bool,
}

impl SkipDetector {
    pub fn new(threshold_low: f32, threshold_high: f32, enabled: bool) -> Self {
        Self {
            threshold_low,
            threshold_high,
            enabled,
            last_skipped: false,
        }
    }

    pub fn classify(&mut self, interval: u32, average: u32) -> Classification {
        let classification = if self.enabled && !self.last_skipped && average > 0 {
            let ratio = interval as f32 / average as f32;
            if ratio >= self.threshold_low && ratio < self.threshold_high {
                Classification::Skipped(interval / 2)
            } else {
                Classification::Normal(interval)
            }
        } else {
            Classification::Normal(interval)
        };
        self.last_skipped = classification.is_skipped();
        classification
    }

    /// Take the interval as normal without classifying it.
    pub fn accept(&mut self, interval: u32) -> Classification {
        self.last_skipped = false;
        Classification::Normal(interval)
    }

    pub fn last_skipped(&self) -> bool {
        self.last_skipped
    }
}
