//! Channel control through the sensors' XSHUT shutdown lines.

use embedded_hal::digital::OutputPin;

use crate::registers::{ConfigHigh, ConfigLow};
use crate::slave::SensorControl;

/// [`SensorControl`] driving the left and right sensor XSHUT pins.
///
/// XSHUT is active low: a channel is powered while its pin is high. The last
/// applied configuration is kept for the measurement loop, and an address
/// reprogrammed by the master is held until the platform takes it with
/// [`take_pending_address`](Self::take_pending_address).
pub struct XshutControl<L, R> {
    left: L,
    right: R,
    config_low: ConfigLow,
    config_high: ConfigHigh,
    pending_address: Option<u8>,
}

impl<L, R, E> XshutControl<L, R>
where
    L: OutputPin<Error = E>,
    R: OutputPin<Error = E>,
    E: core::fmt::Debug,
{
    /// Creates the controller; pins are not driven until the first low config write.
    pub fn new(left: L, right: R) -> Self {
        Self {
            left,
            right,
            config_low: ConfigLow::default(),
            config_high: ConfigHigh::default(),
            pending_address: None,
        }
    }

    /// Last applied low configuration.
    pub fn config_low(&self) -> ConfigLow {
        self.config_low
    }

    /// Last applied high configuration.
    pub fn config_high(&self) -> ConfigHigh {
        self.config_high
    }

    /// Takes the bus address programmed since the last call, if any.
    pub fn take_pending_address(&mut self) -> Option<u8> {
        self.pending_address.take()
    }

    /// Releases the pins.
    pub fn release(self) -> (L, R) {
        (self.left, self.right)
    }
}

fn power<P: OutputPin>(pin: &mut P, on: bool) -> Result<(), P::Error> {
    if on {
        pin.set_high()
    } else {
        pin.set_low()
    }
}

impl<L, R, E> SensorControl for XshutControl<L, R>
where
    L: OutputPin<Error = E>,
    R: OutputPin<Error = E>,
    E: core::fmt::Debug,
{
    type Error = E;

    fn apply_low_config(&mut self, config: u8) -> Result<(), E> {
        let config = ConfigLow::from(config);
        if config.xtalk != self.config_low.xtalk {
            info!("Cross-talk compensation {}", config.xtalk);
        }
        if config.continuous != self.config_low.continuous {
            info!("Continuous mode {}", config.continuous);
        }
        self.config_low = config;
        power(&mut self.left, config.left_enabled)?;
        power(&mut self.right, config.right_enabled)?;
        Ok(())
    }

    fn apply_high_config(&mut self, config: u8) -> Result<(), E> {
        self.config_high = ConfigHigh::from(config);
        debug!(
            "Interrupt mode {}, duration {}",
            self.config_high.interrupt_mode,
            self.config_high.duration
        );
        Ok(())
    }

    fn program_bus_address(&mut self, address: u8) -> Result<(), E> {
        info!("Bus address {:#x} pending", address);
        self.pending_address = Some(address);
        Ok(())
    }
}
