//! Manage button's state.

/// Use this to hold button's state over time.
///
/// Detects clicking, meaning the transition from released to pressed.
#[derive(Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) struct Button {
    pub pressed: bool,
    pub clicked: bool,
}

impl Button {
    pub fn update(&mut self, down: bool) {
        let was_pressed = self.pressed;
        self.pressed = down;
        self.clicked = !was_pressed && self.pressed;
    }
}
