//! Tempo tapped in by the user, turned into a steady beat clock.
//!
//! It is mainly targetted to run in a firmware control loop, polling a
//! debounced button once per tick. However, it has no dependency on any
//! hardware and can be used in software as well.
//!
//! Following is the flow of data through the tracker:
//!
//! ```text
//!    (button, ms)
//!         |
//!         V
//!     [ Button ] --(tap)--> [ TapChain ] ----> {Intervals}
//!         |                     |    A             |
//!         |                     |    +--[ Skip ]---+
//!         V                     V
//!     [ Beat ] <----(beat length, chain start)
//!         |
//!         V
//!   (bpm, progress, on beat)
//! ```
//!
//! Typical usage:
//!
//! ```
//! use tactus_tempo::{Configuration, TapTempo};
//!
//! let mut tempo = TapTempo::new(Configuration::default());
//! for ms in (0..=2000).step_by(10) {
//!     let down = ms % 500 == 0;
//!     tempo.update(down, ms);
//!     if tempo.on_beat() {
//!         // Blink a led.
//!     }
//! }
//! assert_eq!(tempo.beat_length_ms(), 500);
//! ```

#![no_std]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]

#[cfg(test)]
#[macro_use]
extern crate approx;

mod beat;
mod button;
mod chain;
pub mod clock;
pub mod configuration;
mod intervals;
mod log;
mod skip;
mod tracker;

pub use chain::{ChainState, TapOutcome};
pub use clock::Clock;
pub use configuration::{Configuration, InvalidConfiguration, MAX_TAP_VALUES};
pub use tracker::TapTempo;
