//! Source of time for the tracker.

/// Monotonic millisecond clock.
///
/// Implement this over a hardware timer (e.g. a systick counter) to let the
/// tracker read the time on its own through `TapTempo::poll`.
pub trait Clock {
    fn millis(&mut self) -> u32;
}

impl<F> Clock for F
where
    F: FnMut() -> u32,
{
    fn millis(&mut self) -> u32 {
        self()
    }
}
