//! Beat clock running from the chain start.

/// Track position within the beat and report crossed beat boundaries.
///
/// Call `observe` with every new timestamp. A beat is reported once the
/// time since the chain start crosses a multiple of the beat length, or
/// when the phase was reset. The flag stays raised until taken.
#[derive(Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) struct Beat {
    since_start_ms: u32,
    occurred: bool,
}

impl Beat {
    pub fn observe(&mut self, now: u32, start_ms: u32, beat_length_ms: u32) {
        let since_start_ms = now.saturating_sub(start_ms);
        let beat_length_ms = beat_length_ms.max(1);

        let phase_was_reset = since_start_ms < self.since_start_ms;
        let crossed_boundary =
            since_start_ms / beat_length_ms > self.since_start_ms / beat_length_ms;
        if phase_was_reset || crossed_boundary {
            self.occurred = true;
        }

        self.since_start_ms = since_start_ms;
    }

    /// Report a beat right away, e.g. when a tap marks the downbeat.
    pub fn trigger(&mut self) {
        self.occurred = true;
    }

    pub fn take(&mut self) -> bool {
        let occurred = self.occurred;
        self.occurred = false;
        occurred
    }

    pub fn progress(&self, beat_length_ms: u32) -> f32 {
        let beat_length_ms = beat_length_ms.max(1);
        (self.since_start_ms % beat_length_ms) as f32 / beat_length_ms as f32
    }
}
