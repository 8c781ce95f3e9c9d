//! Public face of the tap tempo tracker.

use crate::beat::Beat;
use crate::button::Button;
use crate::chain::{ChainState, TapChain, TapOutcome};
use crate::clock::Clock;
use crate::configuration::{
    check_beats_until_chain_reset, check_chain_reset_timeout, check_max_beat_length,
    check_min_beat_length, check_skipped_tap_threshold_high, check_skipped_tap_threshold_low,
    check_total_tap_values, Configuration, InvalidConfiguration,
};
use crate::log;

const MS_IN_MINUTE: f32 = 60_000.0;

/// Tempo tapped in on a button, with the beat clock it drives.
///
/// Call `update` once per control loop tick with the debounced state of the
/// button and the current time in milliseconds. Rising edges are taken as
/// taps. Between taps, the beat clock keeps running with the last estimated
/// beat length, so `on_beat` and `beat_progress` can drive a led or
/// a metronome.
///
/// Taps close to each other form a chain, refining the tempo. A tap coming
/// after the chain expired only realigns the phase, keeping the tempo.
///
/// Nothing in here allocates and no call blocks, so it is safe to use from
/// an interrupt handler, as long as the access is serialized.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TapTempo {
    configuration: Configuration,
    button: Button,
    chain: TapChain,
    beat: Beat,
}

impl Default for TapTempo {
    fn default() -> Self {
        Self::new(Configuration::default())
    }
}

impl TapTempo {
    /// Build the tracker. Parameters that are out of their range are replaced
    /// by their defaults.
    #[must_use]
    pub fn new(configuration: Configuration) -> Self {
        let mut valid = Configuration::default();
        valid.merge_valid(&configuration);
        if valid != configuration {
            log::info!("Some of the given configuration was invalid, using defaults instead");
        }
        Self {
            chain: TapChain::new(&valid),
            configuration: valid,
            button: Button::default(),
            beat: Beat::default(),
        }
    }

    /// # Errors
    ///
    /// This fails with `InvalidConfiguration` naming the first parameter
    /// out of its range.
    pub fn try_new(configuration: Configuration) -> Result<Self, InvalidConfiguration> {
        configuration.validate()?;
        Ok(Self::new(configuration))
    }

    /// Sample the button and advance the beat clock.
    ///
    /// Returns the outcome of the tap if the button was just pressed.
    pub fn update(&mut self, button_down: bool, now: u32) -> Option<TapOutcome> {
        self.button.update(button_down);
        if self.button.clicked {
            Some(self.tap(now))
        } else {
            self.advance(now);
            None
        }
    }

    /// Same as `update`, reading the time from the given clock.
    pub fn poll(&mut self, button_down: bool, clock: &mut impl Clock) -> Option<TapOutcome> {
        let now = clock.millis();
        self.update(button_down, now)
    }

    /// Register a tap detected by the caller.
    pub fn tap(&mut self, now: u32) -> TapOutcome {
        let outcome = self.chain.tap(now, &self.configuration);
        self.advance(now);
        if matches!(outcome, TapOutcome::Started | TapOutcome::Restarted) {
            self.beat.trigger();
        }
        outcome
    }

    /// Returns whether a beat passed since it was last asked, clearing the
    /// flag.
    pub fn on_beat(&mut self) -> bool {
        self.beat.take()
    }

    /// Position within the current beat, in `[0.0, 1.0)`.
    pub fn beat_progress(&self) -> f32 {
        self.beat.progress(self.chain.beat_length_ms())
    }

    pub fn bpm(&self) -> f32 {
        MS_IN_MINUTE / self.chain.beat_length_ms() as f32
    }

    pub fn beat_length_ms(&self) -> u32 {
        self.chain.beat_length_ms()
    }

    pub fn taps_in_chain(&self) -> u32 {
        self.chain.taps_in_chain()
    }

    /// Time of the most recent tap, `None` if there was none yet.
    pub fn last_tap_ms(&self) -> Option<u32> {
        self.chain.last_tap_ms()
    }

    pub fn last_tap_was_skip_corrected(&self) -> bool {
        self.chain.skip_detector.last_skipped()
    }

    /// Intervals currently averaged into the beat length, oldest first.
    pub fn tap_intervals(&self) -> impl Iterator<Item = u32> + '_ {
        self.chain.intervals.iter().copied()
    }

    pub fn chain_state(&self, now: u32) -> ChainState {
        self.chain.state(now, &self.configuration)
    }

    /// Whether further taps would still refine the running chain.
    ///
    /// Once this turns false, the tempo is considered locked and the next
    /// tap only realigns the phase.
    pub fn is_chain_active(&self, now: u32) -> bool {
        self.chain_state(now) == ChainState::Active
    }

    /// Start the beat from `now`, keeping the learned tempo.
    pub fn reset_tap_chain(&mut self, now: u32) {
        self.chain.reset(now);
        self.advance(now);
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn set_chain_reset_timeout(&mut self, ms: u32) {
        ignore_invalid(self.try_set_chain_reset_timeout(ms));
    }

    /// # Errors
    ///
    /// Fails if the timeout is zero.
    pub fn try_set_chain_reset_timeout(&mut self, ms: u32) -> Result<(), InvalidConfiguration> {
        check_chain_reset_timeout(ms)?;
        self.configuration.chain_reset_timeout_ms = ms;
        Ok(())
    }

    pub fn set_beats_until_chain_reset(&mut self, beats: u32) {
        ignore_invalid(self.try_set_beats_until_chain_reset(beats));
    }

    /// # Errors
    ///
    /// Fails if beats are zero.
    pub fn try_set_beats_until_chain_reset(
        &mut self,
        beats: u32,
    ) -> Result<(), InvalidConfiguration> {
        check_beats_until_chain_reset(beats)?;
        self.configuration.beats_until_chain_reset = beats;
        Ok(())
    }

    pub fn set_total_tap_values(&mut self, total: usize) {
        ignore_invalid(self.try_set_total_tap_values(total));
    }

    /// Change how many intervals are averaged. If there are more intervals
    /// stored than the new total, the oldest are dropped.
    ///
    /// # Errors
    ///
    /// Fails if the total is outside of `2..=MAX_TAP_VALUES`.
    pub fn try_set_total_tap_values(&mut self, total: usize) -> Result<(), InvalidConfiguration> {
        check_total_tap_values(total)?;
        self.chain.intervals.set_capacity(total);
        self.configuration.total_tap_values = total;
        Ok(())
    }

    pub fn set_skipped_tap_threshold_low(&mut self, threshold: f32) {
        ignore_invalid(self.try_set_skipped_tap_threshold_low(threshold));
    }

    /// # Errors
    ///
    /// Fails if the threshold is outside of `1.0..=2.0`.
    pub fn try_set_skipped_tap_threshold_low(
        &mut self,
        threshold: f32,
    ) -> Result<(), InvalidConfiguration> {
        check_skipped_tap_threshold_low(threshold)?;
        self.chain.skip_detector.threshold_low = threshold;
        self.configuration.skipped_tap_threshold_low = threshold;
        Ok(())
    }

    pub fn set_skipped_tap_threshold_high(&mut self, threshold: f32) {
        ignore_invalid(self.try_set_skipped_tap_threshold_high(threshold));
    }

    /// # Errors
    ///
    /// Fails if the threshold is outside of `2.0..=4.0`.
    pub fn try_set_skipped_tap_threshold_high(
        &mut self,
        threshold: f32,
    ) -> Result<(), InvalidConfiguration> {
        check_skipped_tap_threshold_high(threshold)?;
        self.chain.skip_detector.threshold_high = threshold;
        self.configuration.skipped_tap_threshold_high = threshold;
        Ok(())
    }

    pub fn set_skipped_tap_detection(&mut self, enabled: bool) {
        self.chain.skip_detector.enabled = enabled;
        self.configuration.skipped_tap_detection = enabled;
    }

    pub fn set_min_beat_length(&mut self, ms: u32) {
        ignore_invalid(self.try_set_min_beat_length(ms));
    }

    /// # Errors
    ///
    /// Fails if the length is zero or not below the maximal beat length.
    pub fn try_set_min_beat_length(&mut self, ms: u32) -> Result<(), InvalidConfiguration> {
        check_min_beat_length(ms, self.configuration.max_beat_length_ms)?;
        self.configuration.min_beat_length_ms = ms;
        self.chain.reclamp(&self.configuration);
        Ok(())
    }

    pub fn set_max_beat_length(&mut self, ms: u32) {
        ignore_invalid(self.try_set_max_beat_length(ms));
    }

    /// # Errors
    ///
    /// Fails if the length is not above the minimal beat length.
    pub fn try_set_max_beat_length(&mut self, ms: u32) -> Result<(), InvalidConfiguration> {
        check_max_beat_length(ms, self.configuration.min_beat_length_ms)?;
        self.configuration.max_beat_length_ms = ms;
        self.chain.reclamp(&self.configuration);
        Ok(())
    }

    pub fn set_beat_length(&mut self, ms: u32) {
        ignore_invalid(self.try_set_beat_length(ms));
    }

    /// Force the beat length, clamped to the configured bounds. Previously
    /// measured intervals are forgotten.
    ///
    /// # Errors
    ///
    /// Fails if the length is zero.
    pub fn try_set_beat_length(&mut self, ms: u32) -> Result<(), InvalidConfiguration> {
        if ms == 0 {
            return Err(InvalidConfiguration::BeatLength);
        }
        self.chain.set_beat_length(ms, &self.configuration);
        Ok(())
    }

    pub fn set_bpm(&mut self, bpm: f32) {
        ignore_invalid(self.try_set_bpm(bpm));
    }

    /// # Errors
    ///
    /// Fails if the tempo is not a positive finite number.
    pub fn try_set_bpm(&mut self, bpm: f32) -> Result<(), InvalidConfiguration> {
        if !bpm.is_finite() || bpm <= 0.0 {
            return Err(InvalidConfiguration::Bpm);
        }
        let ms = libm::roundf(MS_IN_MINUTE / bpm) as u32;
        self.try_set_beat_length(ms.max(1))
    }

    fn advance(&mut self, now: u32) {
        self.beat
            .observe(now, self.chain.start_ms(), self.chain.beat_length_ms());
    }
}

#[allow(unused_variables)]
fn ignore_invalid(result: Result<(), InvalidConfiguration>) {
    if let Err(error) = result {
        log::info!("Ignoring invalid configuration: {}", error);
    }
}
