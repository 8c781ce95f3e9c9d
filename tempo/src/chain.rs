//! Group taps into chains and fit the beat length from them.

use crate::configuration::{Configuration, DEFAULT_BEAT_LENGTH_MS};
use crate::intervals::Intervals;
use crate::log;
use crate::skip::SkipDetector;

/// What a single tap did to the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TapOutcome {
    /// The very first tap since the tracker was created.
    Started,
    /// The previous chain expired, this tap begins a new one and resets
    /// the phase.
    Restarted,
    /// The tap was added to the running chain, refining the beat length.
    Continued { skipped: bool },
}

/// Whether the chain still accepts corrections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChainState {
    Idle,
    Active,
}

/// State machine of the tap chain.
///
/// The learned intervals survive a chain reset. Only the phase and the
/// count of taps start over, so a single tap can realign the beat without
/// disturbing the tempo.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) struct TapChain {
    pub intervals: Intervals,
    pub skip_detector: SkipDetector,
    last_tap_ms: Option<u32>,
    taps_in_chain: u32,
    start_ms: u32,
    beat_length_ms: u32,
}

impl TapChain {
    pub fn new(configuration: &Configuration) -> Self {
        Self {
            intervals: Intervals::new(configuration.total_tap_values),
            skip_detector: SkipDetector::new(
                configuration.skipped_tap_threshold_low,
                configuration.skipped_tap_threshold_high,
                configuration.skipped_tap_detection,
            ),
            last_tap_ms: None,
            taps_in_chain: 0,
            start_ms: 0,
            beat_length_ms: clamp_beat_length(DEFAULT_BEAT_LENGTH_MS, configuration),
        }
    }

    pub fn tap(&mut self, now: u32, configuration: &Configuration) -> TapOutcome {
        let Some(last_tap_ms) = self.last_tap_ms else {
            self.last_tap_ms = Some(now);
            self.restart(now);
            log::info!("Tap chain started");
            return TapOutcome::Started;
        };

        let elapsed = now.saturating_sub(last_tap_ms);
        self.last_tap_ms = Some(now);

        if elapsed > configuration.chain_reset_timeout_ms
            || self.taps_in_chain >= configuration.beats_until_chain_reset
        {
            self.restart(now);
            log::info!("Tap chain restarted after {=u32}ms", elapsed);
            return TapOutcome::Restarted;
        }

        self.taps_in_chain += 1;

        // Duplicate timestamp or a clock going backwards. Count the tap but
        // keep it out of the average.
        if elapsed == 0 {
            return TapOutcome::Continued { skipped: false };
        }

        let classification = if self.intervals.is_empty() {
            self.skip_detector.accept(elapsed)
        } else {
            let average = self.intervals.average(self.beat_length_ms);
            self.skip_detector.classify(elapsed, average)
        };
        self.intervals.push(classification.interval());
        let skipped = classification.is_skipped();
        if skipped {
            log::debug!("Skipped beat detected in {=u32}ms interval", elapsed);
        }

        self.beat_length_ms = clamp_beat_length(
            self.intervals.average(self.beat_length_ms),
            configuration,
        );

        TapOutcome::Continued { skipped }
    }

    pub fn state(&self, now: u32, configuration: &Configuration) -> ChainState {
        let Some(last_tap_ms) = self.last_tap_ms else {
            return ChainState::Idle;
        };
        if now.saturating_sub(last_tap_ms) <= configuration.chain_reset_timeout_ms
            && self.taps_in_chain < configuration.beats_until_chain_reset
        {
            ChainState::Active
        } else {
            ChainState::Idle
        }
    }

    /// Realign the phase to `now`, keeping the learned tempo.
    pub fn reset(&mut self, now: u32) {
        self.start_ms = now;
        self.taps_in_chain = 0;
    }

    /// Force the beat length, dropping the measured history so it does not
    /// pull the tempo back on the next tap.
    pub fn set_beat_length(&mut self, beat_length_ms: u32, configuration: &Configuration) {
        self.beat_length_ms = clamp_beat_length(beat_length_ms, configuration);
        self.intervals.clear();
    }

    /// Re-apply beat length bounds after they changed.
    pub fn reclamp(&mut self, configuration: &Configuration) {
        self.beat_length_ms = clamp_beat_length(self.beat_length_ms, configuration);
    }

    pub fn beat_length_ms(&self) -> u32 {
        self.beat_length_ms
    }

    pub fn start_ms(&self) -> u32 {
        self.start_ms
    }

    pub fn taps_in_chain(&self) -> u32 {
        self.taps_in_chain
    }

    pub fn last_tap_ms(&self) -> Option<u32> {
        self.last_tap_ms
    }

    fn restart(&mut self, now: u32) {
        self.start_ms = now;
        self.taps_in_chain = 1;
    }
}

fn clamp_beat_length(beat_length_ms: u32, configuration: &Configuration) -> u32 {
    beat_length_ms
        .clamp(
            configuration.min_beat_length_ms,
            configuration.max_beat_length_ms,
        )
        .max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tap_all(chain: &mut TapChain, configuration: &Configuration, taps: &[u32]) {
        for tap in taps {
            chain.tap(*tap, configuration);
        }
    }

    #[test]
    fn when_tapped_first_time_it_starts_the_chain_without_interval() {
        let configuration = Configuration::default();
        let mut chain = TapChain::new(&configuration);
        assert_eq!(chain.state(0, &configuration), ChainState::Idle);

        assert_eq!(chain.tap(100, &configuration), TapOutcome::Started);
        assert_eq!(chain.taps_in_chain(), 1);
        assert_eq!(chain.start_ms(), 100);
        assert!(chain.intervals.is_empty());
        assert_eq!(chain.beat_length_ms(), DEFAULT_BEAT_LENGTH_MS);
    }

    #[test]
    fn when_tapped_in_exact_interval_it_detects_beat_length() {
        let configuration = Configuration::default();
        let mut chain = TapChain::new(&configuration);
        tap_all(&mut chain, &configuration, &[500, 1000, 1500, 2000]);
        assert_eq!(chain.beat_length_ms(), 500);
        assert_eq!(chain.taps_in_chain(), 4);
    }

    #[test]
    fn when_tapped_in_rough_interval_it_averages() {
        let configuration = Configuration::default();
        let mut chain = TapChain::new(&configuration);
        tap_all(&mut chain, &configuration, &[0, 600, 1250, 1870]);
        // (600 + 650 + 620) / 3
        assert_eq!(chain.beat_length_ms(), 623);
    }

    #[test]
    fn when_a_beat_is_skipped_the_interval_is_halved() {
        let configuration = Configuration::default();
        let mut chain = TapChain::new(&configuration);
        tap_all(&mut chain, &configuration, &[0, 500, 1000]);
        assert_eq!(
            chain.tap(2100, &configuration),
            TapOutcome::Continued { skipped: true }
        );
        assert!(chain.intervals.iter().copied().eq([500, 500, 550]));
        assert_eq!(chain.beat_length_ms(), 517);
    }

    #[test]
    fn when_the_first_interval_is_double_the_seed_it_is_not_halved() {
        let configuration = Configuration::default();
        let mut chain = TapChain::new(&configuration);
        tap_all(&mut chain, &configuration, &[0, 1000]);
        assert_eq!(chain.beat_length_ms(), 1000);
    }

    #[test]
    fn when_history_is_dropped_after_a_skip_the_next_skip_is_corrected() {
        let configuration = Configuration::default();
        let mut chain = TapChain::new(&configuration);
        tap_all(&mut chain, &configuration, &[0, 500, 1000, 2100]);
        assert!(chain.skip_detector.last_skipped());

        chain.set_beat_length(500, &configuration);
        assert_eq!(
            chain.tap(2600, &configuration),
            TapOutcome::Continued { skipped: false }
        );
        assert!(!chain.skip_detector.last_skipped());
        assert_eq!(
            chain.tap(3600, &configuration),
            TapOutcome::Continued { skipped: true }
        );
        assert!(chain.intervals.iter().copied().eq([500, 500]));
    }

    #[test]
    fn when_last_tap_is_over_timeout_it_restarts_keeping_tempo() {
        let configuration = Configuration::default();
        let mut chain = TapChain::new(&configuration);
        tap_all(&mut chain, &configuration, &[0, 400, 800]);
        assert_eq!(chain.tap(5000, &configuration), TapOutcome::Restarted);
        assert_eq!(chain.taps_in_chain(), 1);
        assert_eq!(chain.start_ms(), 5000);
        assert_eq!(chain.beat_length_ms(), 400);
        assert!(chain.intervals.iter().copied().eq([400, 400]));
    }

    #[test]
    fn when_chain_reaches_tap_limit_it_restarts() {
        let configuration = Configuration {
            beats_until_chain_reset: 3,
            ..Configuration::default()
        };
        let mut chain = TapChain::new(&configuration);
        tap_all(&mut chain, &configuration, &[0, 500, 1000]);
        assert_eq!(chain.state(1001, &configuration), ChainState::Idle);
        assert_eq!(chain.tap(1500, &configuration), TapOutcome::Restarted);
        assert_eq!(chain.start_ms(), 1500);
    }

    #[test]
    fn chain_is_active_until_timeout_passes() {
        let configuration = Configuration::default();
        let mut chain = TapChain::new(&configuration);
        chain.tap(0, &configuration);
        assert_eq!(chain.state(2000, &configuration), ChainState::Active);
        assert_eq!(chain.state(2001, &configuration), ChainState::Idle);
    }

    #[test]
    fn when_reset_it_keeps_last_tap_and_history() {
        let configuration = Configuration::default();
        let mut chain = TapChain::new(&configuration);
        tap_all(&mut chain, &configuration, &[0, 450, 900]);
        chain.reset(1000);
        assert_eq!(chain.start_ms(), 1000);
        assert_eq!(chain.taps_in_chain(), 0);
        assert_eq!(chain.last_tap_ms(), Some(900));
        assert_eq!(chain.beat_length_ms(), 450);
    }

    #[test]
    fn when_clock_goes_backwards_it_does_not_corrupt_the_average() {
        let configuration = Configuration::default();
        let mut chain = TapChain::new(&configuration);
        tap_all(&mut chain, &configuration, &[1000, 1500, 1200]);
        assert_eq!(chain.beat_length_ms(), 500);
        assert!(chain.intervals.iter().copied().eq([500]));
        assert_eq!(chain.last_tap_ms(), Some(1200));
    }

    #[test]
    fn beat_length_is_clamped_to_configured_bounds() {
        let configuration = Configuration::default();
        let mut chain = TapChain::new(&configuration);
        tap_all(&mut chain, &configuration, &[0, 100, 200]);
        assert_eq!(chain.beat_length_ms(), configuration.min_beat_length_ms);
    }

    #[test]
    fn when_beat_length_is_forced_history_is_dropped() {
        let configuration = Configuration::default();
        let mut chain = TapChain::new(&configuration);
        tap_all(&mut chain, &configuration, &[0, 400, 800]);
        chain.set_beat_length(1000, &configuration);
        assert_eq!(chain.beat_length_ms(), 1000);
        assert!(chain.intervals.is_empty());
        chain.set_beat_length(10_000, &configuration);
        assert_eq!(chain.beat_length_ms(), configuration.max_beat_length_ms);
    }
}
