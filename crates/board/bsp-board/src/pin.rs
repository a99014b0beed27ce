//! Polarity-aware GPIO lines.

use bsp_core::id::GpioPin;
use bsp_driver_api::{Direction, Gpio};

/// Which electrical level means "asserted".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// High level is asserted.
    ActiveHigh,
    /// Low level is asserted.
    ActiveLow,
}

impl Polarity {
    /// Returns `true` if `level` is the asserted level.
    pub const fn is_asserted(self, level: bool) -> bool {
        match self {
            Self::ActiveHigh => level,
            Self::ActiveLow => !level,
        }
    }

    /// The electrical level that represents `state`.
    pub const fn level_for(self, state: PinState) -> bool {
        match state {
            PinState::Active => matches!(self, Self::ActiveHigh),
            PinState::Inactive => matches!(self, Self::ActiveLow),
        }
    }
}

/// Logical pin state, independent of polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinState {
    /// Asserted.
    Active,
    /// Deasserted.
    Inactive,
}

/// A board-described GPIO: pin number plus its active polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpioLine {
    /// Pin number.
    pub pin: GpioPin,
    /// Active polarity.
    pub polarity: Polarity,
}

impl GpioLine {
    /// Creates a line description.
    pub const fn new(pin: GpioPin, polarity: Polarity) -> Self {
        Self { pin, polarity }
    }

    /// Reads the pin and reports whether it is asserted.
    pub fn is_active(&self, gpio: &dyn Gpio) -> bool {
        self.polarity.is_asserted(gpio.read_level(self.pin))
    }

    /// Drives the pin to the level representing `state`.
    pub fn set_state(&self, gpio: &dyn Gpio, state: PinState) {
        gpio.set_level(self.pin, self.polarity.level_for(state));
    }

    /// Configures the pin as an input.
    pub fn configure_input(&self, gpio: &dyn Gpio) {
        gpio.set_direction(self.pin, Direction::Input);
    }

    /// Configures the pin as an output.
    pub fn configure_output(&self, gpio: &dyn Gpio) {
        gpio.set_direction(self.pin, Direction::Output);
    }
}
